//! Command implementations for the volume-refill CLI
//!
//! Every command starts from a validated [`Config`]. [`PortalContext`] wires the
//! portal client, the session store and the matching authenticator together so the
//! commands only differ in what they do once connected.

pub mod login;
pub mod run;
pub mod status;

pub use login::run_login;
pub use run::run_monitor;
pub use status::show_status;

use crate::auth::{guest_account_id, Authenticator, CredentialAuthenticator, GuestLinkAuthenticator, SessionPersistence};
use crate::config::{Access, Config, Credentials};
use crate::error::ConfigError;
use crate::portal::{ControlCenterClient, PortalClient, PortalHttp};
use crate::session::{FileSessionStore, Session, SessionStore};
use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Command-line settings that take precedence over file and environment
#[derive(Args, Debug, Clone, Default)]
pub struct Overrides {
    /// Portal username
    #[arg(long, global = true)]
    pub username: Option<String>,
    /// Portal password
    #[arg(long, global = true)]
    pub password: Option<String>,
    /// Guest link (https://…/mc/<token>), used instead of username and password
    #[arg(long, global = true)]
    pub guest_url: Option<String>,
    /// Contract to watch
    #[arg(long, global = true)]
    pub contract_id: Option<String>,
    /// Refill when less than this many GB remain
    #[arg(long, global = true)]
    pub threshold: Option<f64>,
    /// Normal check interval in seconds
    #[arg(long, global = true)]
    pub interval: Option<u64>,
    /// Check interval below the threshold, and the dynamic minimum
    #[arg(long, global = true)]
    pub fast_interval: Option<u64>,
    /// Upper bound for dynamic intervals
    #[arg(long, global = true)]
    pub max_interval: Option<u64>,
    /// Interval after the first check in dynamic mode
    #[arg(long, global = true)]
    pub initial_interval: Option<u64>,
    /// Derive the interval from the consumption rate
    #[arg(long, global = true, overrides_with = "no_dynamic")]
    pub dynamic: bool,
    /// Use fixed normal and fast intervals
    #[arg(long, global = true, overrides_with = "dynamic")]
    pub no_dynamic: bool,
    /// Hours of log files to keep
    #[arg(long, global = true)]
    pub log_retention: Option<usize>,
}

impl Overrides {
    pub fn dynamic_interval(&self) -> Option<bool> {
        match (self.dynamic, self.no_dynamic) {
            (true, _) => Some(true),
            (false, true) => Some(false),
            (false, false) => None,
        }
    }

    pub fn apply(&self, config: &mut Config) {
        let account = &mut config.account;
        if self.username.is_some() {
            account.username = self.username.clone();
        }
        if self.password.is_some() {
            account.password = self.password.clone();
        }
        if self.guest_url.is_some() {
            account.guest_url = self.guest_url.clone();
        }
        if self.contract_id.is_some() {
            account.contract_id = self.contract_id.clone();
        }

        let monitor = &mut config.monitor;
        if let Some(threshold) = self.threshold {
            monitor.threshold_gb = threshold;
        }
        if let Some(secs) = self.interval {
            monitor.check_interval_seconds = secs;
        }
        if let Some(secs) = self.fast_interval {
            monitor.fast_check_interval_seconds = secs;
        }
        if let Some(secs) = self.max_interval {
            monitor.max_check_interval_seconds = secs;
        }
        if let Some(secs) = self.initial_interval {
            monitor.initial_dynamic_interval_seconds = secs;
        }
        if let Some(dynamic) = self.dynamic_interval() {
            monitor.dynamic_interval = dynamic;
        }
        if let Some(hours) = self.log_retention {
            config.logging.retention_hours = hours;
        }
    }
}

/// Load configuration and layer the command line on top
pub fn load_config(overrides: &Overrides) -> Result<Config> {
    let mut config = Config::load()?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Portal access for one account
pub struct PortalContext {
    pub portal: Arc<dyn PortalClient>,
    pub authenticator: Arc<dyn Authenticator>,
    pub access: Access,
}

impl PortalContext {
    pub fn connect(config: &Config, access: Access) -> Result<Self> {
        let http = PortalHttp::new(
            &config.portal.base_url,
            Duration::from_secs(config.portal.request_timeout_secs),
        )
        .context("Failed to create portal HTTP client")?;
        let portal: Arc<dyn PortalClient> = Arc::new(ControlCenterClient::new(http.clone()));
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(config.paths.session_file.clone()));

        let authenticator: Arc<dyn Authenticator> = match &access.credentials {
            Credentials::Guest { url } => {
                let account_id = guest_account_id(url)
                    .ok_or_else(|| ConfigError::Invalid("guest link has no /mc/<token> part".to_string()))?;
                Arc::new(GuestLinkAuthenticator::new(
                    http,
                    Arc::clone(&portal),
                    url,
                    SessionPersistence::new(store, account_id),
                )?)
            }
            Credentials::Password { username, password } => Arc::new(CredentialAuthenticator::new(
                http,
                Arc::clone(&portal),
                username.clone(),
                password.clone(),
                access.contract_id.clone(),
                SessionPersistence::new(store, username.clone()),
            )),
        };

        Ok(Self {
            portal,
            authenticator,
            access,
        })
    }

    /// Authenticate and settle the contract id. Guests without a configured id
    /// take the one their landing page exposes.
    pub async fn open_session(&self) -> Result<(Session, String)> {
        let mut session = self
            .authenticator
            .authenticate()
            .await
            .with_context(|| format!("Authentication failed for {}", self.authenticator.account_id()))?;

        if let Some(contract_id) = &self.access.contract_id {
            return Ok((session, contract_id.clone()));
        }

        let discovered = self
            .portal
            .guest_contract_id(&mut session)
            .await
            .map_err(|e| ConfigError::UnresolvedContractId(e.to_string()))?;
        let contract_id = discovered.ok_or_else(|| {
            ConfigError::UnresolvedContractId("guest landing page shows no contract".to_string())
        })?;
        info!(contract_id = %contract_id, "Contract id taken from guest landing page");

        Ok((session, contract_id))
    }
}
