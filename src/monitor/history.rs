use crate::models::ConsumptionSnapshot;
use std::sync::{Mutex, PoisonError};

/// The reading before the current one, kept for rate estimation
#[derive(Debug, Default)]
pub struct MonitorHistory {
    previous: Mutex<Option<ConsumptionSnapshot>>,
}

impl MonitorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous(&self) -> Option<ConsumptionSnapshot> {
        self.previous.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Store `current` and hand back the reading it replaces, in one step
    pub fn record(&self, current: ConsumptionSnapshot) -> Option<ConsumptionSnapshot> {
        let mut guard = self.previous.lock().unwrap_or_else(PoisonError::into_inner);
        guard.replace(current)
    }
}
