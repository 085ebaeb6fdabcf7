//! Monitoring cycle orchestration
//!
//! A [`Monitor`] runs one contract through
//! `Idle → Authenticating → Polling ⇄ Refilling → … → Stopped`. Each cycle fetches a
//! reading, folds it into the history, lets the scheduler pick the next interval and
//! then applies the refill decision table:
//!
//! | below threshold | can refill | action                        |
//! |-----------------|------------|-------------------------------|
//! | yes             | yes        | refill                        |
//! | yes             | no         | report "refill unavailable"   |
//! | no              | yes        | refill anyway                 |
//! | no              | no         | nothing                       |
//!
//! The third row follows what the portal allows: it sometimes offers a refill before
//! the threshold is reached. Whether that is intended upstream is unconfirmed.
//!
//! A cycle never fails the run. Errors are logged and the next cycle starts over.

pub mod history;
pub mod runner;

use crate::models::{ConsumptionSnapshot, RefillResult};
use crate::scheduler::IntervalPlan;
use std::fmt;

pub use history::MonitorHistory;
pub use runner::Monitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Authenticating,
    Polling,
    Refilling,
    Stopped,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MonitorState::Idle => "idle",
            MonitorState::Authenticating => "authenticating",
            MonitorState::Polling => "polling",
            MonitorState::Refilling => "refilling",
            MonitorState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// What the decision table asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillDecision {
    Refill { below_threshold: bool },
    Unavailable,
    Nothing,
}

pub fn decide(snapshot: &ConsumptionSnapshot, threshold_gb: f64) -> RefillDecision {
    let below_threshold = snapshot.is_below(threshold_gb);
    match (below_threshold, snapshot.can_refill) {
        (_, true) => RefillDecision::Refill { below_threshold },
        (true, false) => RefillDecision::Unavailable,
        (false, false) => RefillDecision::Nothing,
    }
}

/// What a cycle did after a successful fetch
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    None,
    RefillUnavailable,
    Refill(RefillResult),
    RefillError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Polled {
        snapshot: ConsumptionSnapshot,
        plan: IntervalPlan,
        action: ActionOutcome,
    },
    Failed {
        reason: String,
    },
}

impl CycleOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, CycleOutcome::Failed { .. })
    }

    pub fn action(&self) -> Option<&ActionOutcome> {
        match self {
            CycleOutcome::Polled { action, .. } => Some(action),
            CycleOutcome::Failed { .. } => None,
        }
    }
}
