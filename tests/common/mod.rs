#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use volume_refill::auth::Authenticator;
use volume_refill::error::{PortalError, PortalResult};
use volume_refill::models::{ConsumptionSnapshot, ConsumptionSummary, RefillResult};
use volume_refill::monitor::Monitor;
use volume_refill::portal::PortalClient;
use volume_refill::scheduler::{AdaptiveScheduler, SchedulePolicy};
use volume_refill::session::{Session, SessionKind};

pub const CONTRACT_ID: &str = "4711";

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// Reading `offset_secs` after [`base_time`]
pub fn reading(consumed_gb: f64, limit_gb: f64, offset_secs: i64) -> ConsumptionSnapshot {
    ConsumptionSnapshot::new(consumed_gb, limit_gb, base_time() + Duration::seconds(offset_secs))
}

pub fn refillable(consumed_gb: f64, limit_gb: f64, offset_secs: i64) -> ConsumptionSnapshot {
    reading(consumed_gb, limit_gb, offset_secs).with_refill(Some("/refill".to_string()))
}

pub fn policy(dynamic: bool) -> SchedulePolicy {
    SchedulePolicy {
        dynamic,
        initial_interval_secs: 60,
        normal_interval_secs: 60,
        fast_interval_secs: 5,
        max_interval_secs: 300,
        threshold_gb: 1.0,
        safety_factor: 0.7,
        tick: std::time::Duration::from_secs(1),
    }
}

/// Portal that replays scripted answers and counts calls
#[derive(Default)]
pub struct FakePortal {
    readings: Mutex<VecDeque<PortalResult<ConsumptionSnapshot>>>,
    refills: Mutex<VecDeque<PortalResult<RefillResult>>>,
    guest_contract: Mutex<Option<String>>,
    pub fetch_calls: AtomicUsize,
    pub refill_calls: AtomicUsize,
}

impl FakePortal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_reading(&self, reading: ConsumptionSnapshot) {
        self.readings.lock().unwrap().push_back(Ok(reading));
    }

    pub fn push_fetch_error(&self, error: PortalError) {
        self.readings.lock().unwrap().push_back(Err(error));
    }

    pub fn push_refill(&self, result: PortalResult<RefillResult>) {
        self.refills.lock().unwrap().push_back(result);
    }

    pub fn set_guest_contract(&self, contract_id: &str) {
        *self.guest_contract.lock().unwrap() = Some(contract_id.to_string());
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn refills(&self) -> usize {
        self.refill_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PortalClient for FakePortal {
    async fn fetch_snapshot(&self, _session: &mut Session, _contract_id: &str) -> PortalResult<ConsumptionSnapshot> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.readings
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PortalError::Parse("no scripted reading".to_string())))
    }

    async fn request_refill(&self, _session: &mut Session, _contract_id: &str) -> PortalResult<RefillResult> {
        self.refill_calls.fetch_add(1, Ordering::SeqCst);
        self.refills
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RefillResult::booked(204)))
    }

    async fn fetch_summary(&self, _session: &mut Session, _contract_id: &str) -> PortalResult<ConsumptionSummary> {
        Err(PortalError::Parse("summary not scripted".to_string()))
    }

    async fn guest_contract_id(&self, _session: &mut Session) -> PortalResult<Option<String>> {
        Ok(self.guest_contract.lock().unwrap().clone())
    }
}

/// Authenticator that always succeeds unless told otherwise
#[derive(Default)]
pub struct FakeAuthenticator {
    failures: Mutex<VecDeque<PortalError>>,
    pub logins: AtomicUsize,
    pub fresh_logins: AtomicUsize,
    pub remembered: AtomicUsize,
}

impl FakeAuthenticator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, error: PortalError) {
        self.failures.lock().unwrap().push_back(error);
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn fresh_login_count(&self) -> usize {
        self.fresh_logins.load(Ordering::SeqCst)
    }

    pub fn remember_count(&self) -> usize {
        self.remembered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    fn account_id(&self) -> &str {
        "tester"
    }

    async fn authenticate(&self) -> PortalResult<Session> {
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let n = self.logins.fetch_add(1, Ordering::SeqCst) + 1;
        let mut session = Session::new(SessionKind::Credential);
        session.set_cookie("SESSION", format!("session-{n}"));
        Ok(session)
    }

    async fn reauthenticate(&self) -> PortalResult<Session> {
        self.fresh_logins.fetch_add(1, Ordering::SeqCst);
        self.authenticate().await
    }

    fn remember(&self, _session: &Session) {
        self.remembered.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn monitor_with(
    portal: &Arc<FakePortal>,
    auth: &Arc<FakeAuthenticator>,
    policy: SchedulePolicy,
) -> Monitor {
    let scheduler = Arc::new(AdaptiveScheduler::new(policy));
    Monitor::new(
        Arc::clone(portal) as Arc<dyn PortalClient>,
        Arc::clone(auth) as Arc<dyn Authenticator>,
        scheduler,
        CONTRACT_ID,
    )
}
