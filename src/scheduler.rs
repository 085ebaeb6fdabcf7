//! Adaptive poll scheduling
//!
//! [`AdaptiveScheduler`] owns a single next-fire time for the repeating poll action.
//! It is a self-rescheduling one-shot timer: every cycle decides how long to wait
//! before the next one, either from the rate estimator (dynamic mode) or from a
//! two-speed normal/fast hysteresis (fixed mode).
//!
//! The interval, the hysteresis flag, the first-check flag and the next fire time
//! live behind one mutex so the tick loop, the running cycle and any outside reader
//! always observe them together.

use crate::config::MonitorConfig;
use crate::estimator::{self, RateEstimate};
use crate::models::ConsumptionSnapshot;
use async_trait::async_trait;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// The action fired by [`AdaptiveScheduler::run_forever`]
#[async_trait]
pub trait PollAction: Send {
    /// Run one complete cycle. Failures are handled inside the cycle.
    async fn run_cycle(&mut self);
}

/// Cadence settings the scheduler works with
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    pub dynamic: bool,
    pub initial_interval_secs: u64,
    pub normal_interval_secs: u64,
    pub fast_interval_secs: u64,
    pub max_interval_secs: u64,
    pub threshold_gb: f64,
    pub safety_factor: f64,
    pub tick: Duration,
}

impl From<&MonitorConfig> for SchedulePolicy {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            dynamic: config.dynamic_interval,
            initial_interval_secs: config.initial_dynamic_interval_seconds,
            normal_interval_secs: config.check_interval_seconds,
            fast_interval_secs: config.fast_check_interval_seconds,
            max_interval_secs: config.max_check_interval_seconds,
            threshold_gb: config.threshold_gb,
            safety_factor: config.safety_factor,
            tick: Duration::from_millis(config.tick_millis),
        }
    }
}

#[derive(Debug)]
struct ScheduleState {
    current_interval_secs: u64,
    below_threshold: bool,
    first_check: bool,
    next_fire: Option<Instant>,
    rearmed: bool,
}

/// How a cycle changed the cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalChange {
    /// First dynamic cycle, no rate available yet
    Initial,
    /// Recomputed from the rate estimator
    Estimated,
    /// Hysteresis engaged the fast interval
    SwitchedToFast,
    /// Hysteresis returned to the normal interval
    RestoredNormal,
    /// Interval kept as it was
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalPlan {
    pub interval_secs: u64,
    pub change: IntervalChange,
    pub estimate: Option<RateEstimate>,
}

pub struct AdaptiveScheduler {
    policy: SchedulePolicy,
    state: Mutex<ScheduleState>,
}

impl AdaptiveScheduler {
    pub fn new(policy: SchedulePolicy) -> Self {
        let current_interval_secs = if policy.dynamic {
            policy.initial_interval_secs
        } else {
            policy.normal_interval_secs
        };

        Self {
            policy,
            state: Mutex::new(ScheduleState {
                current_interval_secs,
                below_threshold: false,
                first_check: true,
                next_fire: None,
                rearmed: false,
            }),
        }
    }

    pub fn policy(&self) -> &SchedulePolicy {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, ScheduleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(state: &mut ScheduleState, interval_secs: u64) {
        state.current_interval_secs = interval_secs;
        state.next_fire = Some(Instant::now() + Duration::from_secs(interval_secs));
        state.rearmed = true;
    }

    /// Replace any pending fire with one `interval_secs` from now
    pub fn reschedule(&self, interval_secs: u64) {
        Self::arm(&mut self.lock(), interval_secs);
        debug!(interval_secs, "Poll rescheduled");
    }

    pub fn current_interval(&self) -> u64 {
        self.lock().current_interval_secs
    }

    pub fn next_run_at(&self) -> Option<Instant> {
        self.lock().next_fire
    }

    pub fn is_below_threshold(&self) -> bool {
        self.lock().below_threshold
    }

    /// Drop the pending fire
    pub fn cancel(&self) {
        self.lock().next_fire = None;
    }

    /// Decide the next interval after a successful fetch and arm it
    pub fn plan_next(
        &self,
        previous: Option<&ConsumptionSnapshot>,
        current: &ConsumptionSnapshot,
    ) -> IntervalPlan {
        let mut state = self.lock();

        let (interval_secs, change, estimate) = if self.policy.dynamic {
            if state.first_check {
                state.first_check = false;
                (self.policy.initial_interval_secs, IntervalChange::Initial, None)
            } else {
                let est = estimator::estimate(
                    previous,
                    current,
                    self.policy.threshold_gb,
                    self.policy.safety_factor,
                    self.policy.fast_interval_secs,
                    self.policy.max_interval_secs,
                );
                (est.next_interval_secs, IntervalChange::Estimated, Some(est))
            }
        } else {
            state.first_check = false;
            self.hysteresis(&mut state, current)
        };

        Self::arm(&mut state, interval_secs);
        IntervalPlan {
            interval_secs,
            change,
            estimate,
        }
    }

    fn hysteresis(
        &self,
        state: &mut ScheduleState,
        current: &ConsumptionSnapshot,
    ) -> (u64, IntervalChange, Option<RateEstimate>) {
        // A reading without an allowance says nothing about the threshold
        if !current.has_allowance() {
            return (state.current_interval_secs, IntervalChange::Unchanged, None);
        }

        let below = current.is_below(self.policy.threshold_gb);
        if below && !state.below_threshold {
            state.below_threshold = true;
            (self.policy.fast_interval_secs, IntervalChange::SwitchedToFast, None)
        } else if !below && state.below_threshold {
            state.below_threshold = false;
            (self.policy.normal_interval_secs, IntervalChange::RestoredNormal, None)
        } else {
            (state.current_interval_secs, IntervalChange::Unchanged, None)
        }
    }

    /// After a successful refill, leave fast polling right away.
    /// Returns whether hysteresis was engaged.
    pub fn reset_after_refill(&self) -> bool {
        let mut state = self.lock();
        if self.policy.dynamic || !state.below_threshold {
            return false;
        }
        state.below_threshold = false;
        Self::arm(&mut state, self.policy.normal_interval_secs);
        info!(
            interval_secs = self.policy.normal_interval_secs,
            "Refill succeeded, restored normal check interval"
        );
        true
    }

    /// Claim the pending fire if it is due
    fn take_due(&self) -> bool {
        let mut state = self.lock();
        match state.next_fire {
            Some(at) if Instant::now() >= at => {
                state.next_fire = None;
                state.rearmed = false;
                true
            }
            _ => false,
        }
    }

    /// Arm at the current interval unless the cycle already did
    fn rearm_if_needed(&self) {
        let mut state = self.lock();
        if !state.rearmed || state.next_fire.is_none() {
            let interval = state.current_interval_secs;
            Self::arm(&mut state, interval);
        }
    }

    fn arm_if_idle(&self) {
        let mut state = self.lock();
        if state.next_fire.is_none() {
            let interval = state.current_interval_secs;
            Self::arm(&mut state, interval);
        }
    }

    /// Tick until `shutdown` resolves, firing `action` whenever it is due.
    ///
    /// The action runs outside the select, so a shutdown arriving mid-cycle is
    /// observed once the cycle has completed.
    pub async fn run_forever<A, F>(&self, action: &mut A, shutdown: F)
    where
        A: PollAction + ?Sized,
        F: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.policy.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        self.arm_if_idle();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            if self.take_due() {
                action.run_cycle().await;
                self.rearm_if_needed();
            }
        }

        self.cancel();
        debug!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn policy(dynamic: bool) -> SchedulePolicy {
        SchedulePolicy {
            dynamic,
            initial_interval_secs: 60,
            normal_interval_secs: 120,
            fast_interval_secs: 5,
            max_interval_secs: 300,
            threshold_gb: 1.0,
            safety_factor: 0.7,
            tick: Duration::from_secs(1),
        }
    }

    fn snap(consumed: f64, secs: i64) -> ConsumptionSnapshot {
        ConsumptionSnapshot::new(consumed, 10.0, Utc.timestamp_opt(secs, 0).single().unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_dynamic_cycle_uses_initial_interval() {
        let scheduler = AdaptiveScheduler::new(policy(true));
        let plan = scheduler.plan_next(None, &snap(2.0, 0));
        assert_eq!(plan.interval_secs, 60);
        assert_eq!(plan.change, IntervalChange::Initial);

        let plan = scheduler.plan_next(None, &snap(2.0, 0));
        assert_eq!(plan.change, IntervalChange::Estimated);
        assert_eq!(plan.interval_secs, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hysteresis_is_edge_triggered() {
        let scheduler = AdaptiveScheduler::new(policy(false));
        assert_eq!(scheduler.current_interval(), 120);

        let plan = scheduler.plan_next(None, &snap(9.5, 0));
        assert_eq!(plan.change, IntervalChange::SwitchedToFast);
        assert_eq!(scheduler.current_interval(), 5);

        let plan = scheduler.plan_next(None, &snap(9.6, 10));
        assert_eq!(plan.change, IntervalChange::Unchanged);
        assert_eq!(plan.interval_secs, 5);

        let plan = scheduler.plan_next(None, &snap(1.0, 20));
        assert_eq!(plan.change, IntervalChange::RestoredNormal);
        assert_eq!(plan.interval_secs, 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_pending_fire() {
        let scheduler = AdaptiveScheduler::new(policy(false));
        scheduler.reschedule(100);
        let first = scheduler.next_run_at().unwrap();
        scheduler.reschedule(10);
        let second = scheduler.next_run_at().unwrap();
        assert!(second < first);
        assert_eq!(scheduler.current_interval(), 10);
    }
}
