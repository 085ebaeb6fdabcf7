//! Consumption rate estimation
//!
//! Projects when the remaining high-speed volume will cross the refill threshold,
//! given the previous and current readings, and turns that projection into the next
//! polling interval.
//!
//! The rate is measured between the portal's own `updated_at` timestamps. Polling
//! faster than the portal refreshes its numbers would otherwise show zero consumption
//! over most poll gaps and a spike over the one that straddles an update.
//!
//! [`estimate`] is pure: the same inputs always produce the same [`RateEstimate`].

use crate::models::ConsumptionSnapshot;

/// Rates below this many GB per second count as no measurable consumption
pub const RATE_EPSILON_GB_PER_SEC: f64 = 1e-7;

/// Default fraction of the projected time-to-threshold to wait before polling again
pub const DEFAULT_SAFETY_FACTOR: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimate {
    /// Seconds until the next poll, always within `[min_interval, max_interval]`
    pub next_interval_secs: u64,
    /// Projected seconds until remaining volume reaches the threshold.
    /// `Some(0.0)` when already at or past it, `None` when no rate could be measured.
    pub seconds_to_threshold: Option<f64>,
    /// Measured consumption rate, when one exists
    pub rate_gb_per_sec: Option<f64>,
}

impl RateEstimate {
    fn at_threshold(min_interval: u64) -> Self {
        Self {
            next_interval_secs: min_interval,
            seconds_to_threshold: Some(0.0),
            rate_gb_per_sec: None,
        }
    }

    fn insufficient_data(max_interval: u64) -> Self {
        Self {
            next_interval_secs: max_interval,
            seconds_to_threshold: None,
            rate_gb_per_sec: None,
        }
    }

    /// Whether the estimate came from a measured rate
    pub fn is_projected(&self) -> bool {
        self.rate_gb_per_sec.is_some()
    }
}

/// Compute the next polling interval from two readings.
///
/// 1. A reading without an allowance (`limit_gb == 0`) has no defined remaining volume
///    and yields `(max_interval, None)`. This rule wins over rule 2 even though
///    such a reading reports `remaining_gb() == 0`: the zero means "unknown", not
///    "threshold reached", so callers must not read it as an exhausted allowance.
/// 2. At or below the threshold: `(min_interval, Some(0))`.
/// 3. No previous reading, no upstream time progress, no consumption progress or a
///    rate below [`RATE_EPSILON_GB_PER_SEC`]: `(max_interval, None)`.
/// 4. Otherwise `seconds_to_threshold = (remaining - threshold) / rate` and the
///    interval is `seconds_to_threshold * safety_factor` truncated and clamped.
pub fn estimate(
    previous: Option<&ConsumptionSnapshot>,
    current: &ConsumptionSnapshot,
    threshold_gb: f64,
    safety_factor: f64,
    min_interval: u64,
    max_interval: u64,
) -> RateEstimate {
    if !current.has_allowance() {
        return RateEstimate::insufficient_data(max_interval);
    }

    let remaining = current.remaining_gb();
    if remaining <= threshold_gb {
        return RateEstimate::at_threshold(min_interval);
    }

    let Some(rate) = previous.and_then(|prev| consumption_rate(prev, current)) else {
        return RateEstimate::insufficient_data(max_interval);
    };

    let seconds_to_threshold = (remaining - threshold_gb) / rate;
    let raw_interval = seconds_to_threshold * safety_factor;

    RateEstimate {
        next_interval_secs: clamp_interval(raw_interval, min_interval, max_interval),
        seconds_to_threshold: Some(seconds_to_threshold),
        rate_gb_per_sec: Some(rate),
    }
}

/// GB per second between two upstream updates, or `None` when not measurable
pub fn consumption_rate(previous: &ConsumptionSnapshot, current: &ConsumptionSnapshot) -> Option<f64> {
    if current.updated_at <= previous.updated_at || current.consumed_gb <= previous.consumed_gb {
        return None;
    }

    let elapsed_secs = (current.updated_at - previous.updated_at).num_milliseconds() as f64 / 1000.0;
    if elapsed_secs <= 0.0 {
        return None;
    }

    let rate = (current.consumed_gb - previous.consumed_gb) / elapsed_secs;
    if rate.is_finite() && rate >= RATE_EPSILON_GB_PER_SEC {
        Some(rate)
    } else {
        None
    }
}

/// Truncate to whole seconds and bound to `[min_interval, max_interval]`.
/// The lower bound wins when the pair is inverted; non-finite input maps to the maximum.
pub fn clamp_interval(raw_secs: f64, min_interval: u64, max_interval: u64) -> u64 {
    let upper_bounded = if raw_secs.is_nan() || raw_secs >= max_interval as f64 {
        max_interval
    } else if raw_secs <= 0.0 {
        0
    } else {
        raw_secs.trunc() as u64
    };
    upper_bounded.max(min_interval)
}
