use super::{decide, ActionOutcome, CycleOutcome, MonitorHistory, MonitorState, RefillDecision};
use crate::auth::Authenticator;
use crate::error::{PortalError, PortalResult};
use crate::estimator;
use crate::logging::new_cycle_id;
use crate::models::{ConsumptionSnapshot, RefillResult};
use crate::portal::PortalClient;
use crate::scheduler::{AdaptiveScheduler, IntervalChange, IntervalPlan, PollAction};
use crate::session::Session;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub struct Monitor {
    portal: Arc<dyn PortalClient>,
    authenticator: Arc<dyn Authenticator>,
    scheduler: Arc<AdaptiveScheduler>,
    history: MonitorHistory,
    contract_id: String,
    threshold_gb: f64,
    session: Option<Session>,
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        portal: Arc<dyn PortalClient>,
        authenticator: Arc<dyn Authenticator>,
        scheduler: Arc<AdaptiveScheduler>,
        contract_id: impl Into<String>,
    ) -> Self {
        let threshold_gb = scheduler.policy().threshold_gb;
        Self {
            portal,
            authenticator,
            scheduler,
            history: MonitorHistory::new(),
            contract_id: contract_id.into(),
            threshold_gb,
            session: None,
            state: MonitorState::Idle,
        }
    }

    /// Start from an already authenticated session
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn history(&self) -> &MonitorHistory {
        &self.history
    }

    pub fn scheduler(&self) -> &Arc<AdaptiveScheduler> {
        &self.scheduler
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Poll once right away, then keep polling on the adaptive schedule until
    /// `shutdown` resolves
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            contract_id = %self.contract_id,
            threshold_gb = self.threshold_gb,
            dynamic = self.scheduler.policy().dynamic,
            "Starting monitor"
        );

        self.poll().await;

        let scheduler = Arc::clone(&self.scheduler);
        scheduler.run_forever(self, shutdown).await;

        self.state = MonitorState::Stopped;
        info!(contract_id = %self.contract_id, "Monitor stopped");
    }

    /// One complete cycle. Never panics on portal failures; they end up in
    /// [`CycleOutcome::Failed`].
    pub async fn poll(&mut self) -> CycleOutcome {
        let span = info_span!("cycle", cycle_id = %new_cycle_id(), contract_id = %self.contract_id);
        let outcome = self.poll_inner().instrument(span).await;
        if self.state != MonitorState::Stopped {
            self.state = MonitorState::Polling;
        }
        outcome
    }

    async fn poll_inner(&mut self) -> CycleOutcome {
        let snapshot = match self.fetch_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(
                    contract_id = %self.contract_id,
                    action = "fetch consumption",
                    error = %e,
                    next_in_secs = self.scheduler.current_interval(),
                    "Cycle failed"
                );
                return CycleOutcome::Failed { reason: e.to_string() };
            }
        };

        // A reading without an allowance is no baseline for the next rate
        let previous = if snapshot.has_allowance() {
            self.history.record(snapshot.clone())
        } else {
            debug!("Reading carries no allowance, keeping the previous one as baseline");
            self.history.previous()
        };
        log_consumption(previous.as_ref(), &snapshot, self.threshold_gb);

        let plan = self.scheduler.plan_next(previous.as_ref(), &snapshot);
        log_plan(&plan);

        let action = match decide(&snapshot, self.threshold_gb) {
            RefillDecision::Refill { below_threshold } => {
                if below_threshold {
                    warn!(
                        remaining_gb = snapshot.remaining_gb(),
                        threshold_gb = self.threshold_gb,
                        "Below threshold and refill available"
                    );
                } else {
                    info!(
                        remaining_gb = snapshot.remaining_gb(),
                        "Refill offered although above threshold, booking it"
                    );
                }
                self.refill().await
            }
            RefillDecision::Unavailable => {
                warn!(
                    remaining_gb = snapshot.remaining_gb(),
                    threshold_gb = self.threshold_gb,
                    "Below threshold but refill unavailable"
                );
                ActionOutcome::RefillUnavailable
            }
            RefillDecision::Nothing => {
                debug!("Enough volume left, no refill offered");
                ActionOutcome::None
            }
        };

        CycleOutcome::Polled {
            snapshot,
            plan,
            action,
        }
    }

    async fn ensure_session(&mut self) -> PortalResult<()> {
        if self.session.is_none() {
            self.state = MonitorState::Authenticating;
            let session = self.authenticator.authenticate().await?;
            self.session = Some(session);
        }
        Ok(())
    }

    /// Replace the session after the portal rejected it. The cached copy is the one
    /// just rejected, so this always logs in fresh.
    async fn reauthenticate(&mut self) -> PortalResult<()> {
        warn!(account_id = %self.authenticator.account_id(), "Session expired, authenticating again");
        self.session = None;
        self.state = MonitorState::Authenticating;
        let session = self.authenticator.reauthenticate().await?;
        self.session = Some(session);
        Ok(())
    }

    async fn fetch_once(&mut self) -> PortalResult<ConsumptionSnapshot> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PortalError::AuthFailed("no session".to_string()))?;
        let snapshot = self.portal.fetch_snapshot(session, &self.contract_id).await?;
        self.authenticator.remember(session);
        Ok(snapshot)
    }

    async fn refill_once(&mut self) -> PortalResult<RefillResult> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PortalError::AuthFailed("no session".to_string()))?;
        let result = self.portal.request_refill(session, &self.contract_id).await?;
        if result.success {
            self.authenticator.remember(session);
        }
        Ok(result)
    }

    /// Fetch, re-authenticating and retrying exactly once on an expired session
    async fn fetch_snapshot(&mut self) -> PortalResult<ConsumptionSnapshot> {
        self.ensure_session().await?;
        self.state = MonitorState::Polling;

        match self.fetch_once().await {
            Err(e) if e.is_auth_expired() => {
                self.reauthenticate().await?;
                self.state = MonitorState::Polling;
                let retried = self.fetch_once().await;
                self.forget_rejected_session(&retried);
                retried
            }
            other => other,
        }
    }

    async fn request_refill(&mut self) -> PortalResult<RefillResult> {
        self.ensure_session().await?;
        self.state = MonitorState::Refilling;

        match self.refill_once().await {
            Err(e) if e.is_auth_expired() => {
                self.reauthenticate().await?;
                self.state = MonitorState::Refilling;
                let retried = self.refill_once().await;
                self.forget_rejected_session(&retried);
                retried
            }
            other => other,
        }
    }

    /// A session rejected right after login is not worth keeping for the next cycle
    fn forget_rejected_session<T>(&mut self, result: &PortalResult<T>) {
        if matches!(result, Err(e) if e.is_auth_expired()) {
            self.session = None;
        }
    }

    async fn refill(&mut self) -> ActionOutcome {
        self.state = MonitorState::Refilling;
        let outcome = match self.request_refill().await {
            Ok(result) if result.success => {
                info!(
                    contract_id = %self.contract_id,
                    status = ?result.status_code,
                    "High-speed volume refilled"
                );
                self.scheduler.reset_after_refill();
                ActionOutcome::Refill(result)
            }
            Ok(result) if result.is_denied() => {
                warn!(contract_id = %self.contract_id, message = %result.message, "Refill denied by portal");
                ActionOutcome::Refill(result)
            }
            Ok(result) => {
                error!(
                    contract_id = %self.contract_id,
                    status = ?result.status_code,
                    message = %result.message,
                    "Refill failed"
                );
                ActionOutcome::Refill(result)
            }
            Err(e) => {
                error!(contract_id = %self.contract_id, action = "refill", error = %e, "Refill failed");
                ActionOutcome::RefillError(e.to_string())
            }
        };
        self.state = MonitorState::Polling;
        outcome
    }
}

#[async_trait]
impl PollAction for Monitor {
    async fn run_cycle(&mut self) {
        self.poll().await;
    }
}

fn log_consumption(previous: Option<&ConsumptionSnapshot>, current: &ConsumptionSnapshot, threshold_gb: f64) {
    info!(
        consumed_gb = current.consumed_gb,
        limit_gb = current.limit_gb,
        remaining_gb = current.display_remaining_gb(),
        consumed_percent = current.consumed_percent(),
        threshold_gb,
        can_refill = current.can_refill,
        updated_at = %current.updated_at,
        "Consumption fetched"
    );

    let Some(previous) = previous else { return };
    if let Some(rate) = estimator::consumption_rate(previous, current) {
        let elapsed = (current.updated_at - previous.updated_at).num_seconds();
        let consumed_mb = (current.consumed_gb - previous.consumed_gb) * 1024.0;
        let mb_per_minute = rate * 60.0 * 1024.0;
        info!(
            elapsed_secs = elapsed,
            consumed_mb = (consumed_mb * 100.0).round() / 100.0,
            mb_per_minute = (mb_per_minute * 10.0).round() / 10.0,
            "Consumption since last upstream update"
        );
    }
}

fn log_plan(plan: &IntervalPlan) {
    match plan.change {
        IntervalChange::Initial => info!(next_in_secs = plan.interval_secs, "First check, using initial interval"),
        IntervalChange::SwitchedToFast => info!(next_in_secs = plan.interval_secs, "Below threshold, switched to fast interval"),
        IntervalChange::RestoredNormal => info!(next_in_secs = plan.interval_secs, "Back above threshold, restored normal interval"),
        IntervalChange::Unchanged => debug!(next_in_secs = plan.interval_secs, "Interval unchanged"),
        IntervalChange::Estimated => match plan.estimate.and_then(|e| e.seconds_to_threshold) {
            Some(secs) if secs > 0.0 => {
                let eta = ChronoDuration::try_seconds(secs as i64)
                    .and_then(|d| Local::now().checked_add_signed(d))
                    .map(|t| t.format("%d.%m.%Y %H:%M:%S").to_string())
                    .unwrap_or_else(|| "beyond calendar range".to_string());
                info!(
                    next_in_secs = plan.interval_secs,
                    seconds_to_threshold = secs as u64,
                    threshold_eta = %eta,
                    "Projected threshold crossing"
                );
            }
            Some(_) => info!(next_in_secs = plan.interval_secs, "At or below threshold, polling at minimum interval"),
            None => info!(next_in_secs = plan.interval_secs, "Not enough data for a rate, polling at maximum interval"),
        },
    }
}
