mod common;

use common::reading;
use volume_refill::estimator::{clamp_interval, consumption_rate, estimate, DEFAULT_SAFETY_FACTOR};

const MIN: u64 = 5;
const MAX: u64 = 300;

#[test]
fn test_steady_consumption_projects_threshold_crossing() {
    let previous = reading(2.0, 10.0, 0);
    let current = reading(2.5, 10.0, 300);

    let est = estimate(Some(&previous), &current, 1.0, DEFAULT_SAFETY_FACTOR, MIN, MAX);
    let seconds = est.seconds_to_threshold.expect("projection");
    assert!((seconds - 3900.0).abs() < 1e-6, "got {seconds}");
    assert!((est.rate_gb_per_sec.unwrap() - 0.5 / 300.0).abs() < 1e-12);
    // 0.7 * 3900 = 2730, capped by the maximum
    assert_eq!(est.next_interval_secs, MAX);
    assert!(est.is_projected());

    let wide = estimate(Some(&previous), &current, 1.0, DEFAULT_SAFETY_FACTOR, MIN, 10_000);
    assert!((2729..=2730).contains(&wide.next_interval_secs), "got {}", wide.next_interval_secs);
}

#[test]
fn test_below_threshold_polls_at_minimum() {
    let current = reading(9.2, 10.0, 0);
    let est = estimate(None, &current, 1.0, DEFAULT_SAFETY_FACTOR, MIN, MAX);
    assert_eq!(est.next_interval_secs, MIN);
    assert_eq!(est.seconds_to_threshold, Some(0.0));
}

#[test]
fn test_exactly_at_threshold_counts_as_reached() {
    let est = estimate(None, &reading(9.0, 10.0, 0), 1.0, DEFAULT_SAFETY_FACTOR, MIN, MAX);
    assert_eq!(est.next_interval_secs, MIN);
    assert_eq!(est.seconds_to_threshold, Some(0.0));
}

#[test]
fn test_without_previous_reading_waits_maximum() {
    let est = estimate(None, &reading(2.0, 10.0, 0), 1.0, DEFAULT_SAFETY_FACTOR, MIN, MAX);
    assert_eq!(est.next_interval_secs, MAX);
    assert_eq!(est.seconds_to_threshold, None);
    assert!(!est.is_projected());
}

#[test]
fn test_zero_limit_is_insufficient_data() {
    let current = reading(0.0, 0.0, 60);
    assert_eq!(current.remaining_gb(), 0.0);
    assert_eq!(current.consumed_percent(), 0.0);
    assert!(!current.is_below(1.0));

    let est = estimate(Some(&reading(0.0, 0.0, 0)), &current, 1.0, DEFAULT_SAFETY_FACTOR, MIN, MAX);
    assert_eq!(est.next_interval_secs, MAX);
    assert_eq!(est.seconds_to_threshold, None);
}

#[test]
fn test_zero_limit_is_not_mistaken_for_exhausted_volume() {
    // remaining reads 0.0, which is below any threshold, yet no fast polling follows
    let current = reading(0.0, 0.0, 60);
    assert!(current.remaining_gb() <= 1.0);

    let est = estimate(Some(&reading(2.0, 10.0, 0)), &current, 1.0, DEFAULT_SAFETY_FACTOR, MIN, MAX);
    assert_eq!(est.next_interval_secs, MAX);
    assert_ne!(est.seconds_to_threshold, Some(0.0));
    assert!(!est.is_projected());
}

#[test]
fn test_no_progress_yields_no_rate() {
    // same upstream timestamp
    assert_eq!(consumption_rate(&reading(2.0, 10.0, 100), &reading(2.5, 10.0, 100)), None);
    // clock went backwards
    assert_eq!(consumption_rate(&reading(2.0, 10.0, 100), &reading(2.5, 10.0, 50)), None);
    // nothing consumed
    assert_eq!(consumption_rate(&reading(2.0, 10.0, 0), &reading(2.0, 10.0, 300)), None);
    // counter reset after a new billing period
    assert_eq!(consumption_rate(&reading(8.0, 10.0, 0), &reading(0.1, 10.0, 300)), None);
    // below epsilon: 1 KB over a day
    assert_eq!(
        consumption_rate(&reading(2.0, 10.0, 0), &reading(2.000001, 10.0, 86_400)),
        None
    );
}

#[test]
fn test_interval_always_within_bounds() {
    let previous = reading(1.0, 10.0, 0);
    for (consumed, offset) in [(1.001, 10_000), (1.5, 60), (4.0, 1), (8.99, 1), (1.0001, 3_600)] {
        let current = reading(consumed, 10.0, offset);
        for safety in [0.1, 0.7, 1.0, 2.0] {
            let est = estimate(Some(&previous), &current, 1.0, safety, MIN, MAX);
            assert!(
                (MIN..=MAX).contains(&est.next_interval_secs),
                "{consumed} after {offset}s with safety {safety}: {}",
                est.next_interval_secs
            );
        }
    }
}

#[test]
fn test_estimate_is_deterministic() {
    let previous = reading(3.0, 10.0, 0);
    let current = reading(3.4, 10.0, 600);
    let a = estimate(Some(&previous), &current, 1.0, 0.7, MIN, MAX);
    let b = estimate(Some(&previous), &current, 1.0, 0.7, MIN, MAX);
    assert_eq!(a, b);
}

#[test]
fn test_clamp_never_panics() {
    assert_eq!(clamp_interval(f64::NAN, MIN, MAX), MAX);
    assert_eq!(clamp_interval(f64::INFINITY, MIN, MAX), MAX);
    assert_eq!(clamp_interval(f64::NEG_INFINITY, MIN, MAX), MIN);
    assert_eq!(clamp_interval(-12.0, MIN, MAX), MIN);
    assert_eq!(clamp_interval(1e300, MIN, MAX), MAX);
    // inverted bounds: the minimum wins
    assert_eq!(clamp_interval(50.0, 100, 10), 100);
}
