//! Configuration
//!
//! Resolution order, later sources winning:
//! - built-in defaults
//! - the first config file found (`volume-refill.toml`, `.volume-refill.toml`,
//!   `<config dir>/volume-refill/config.toml`)
//! - environment variables, including a `.env` file in the working directory
//! - command line flags (applied by the `run` command)
//!
//! The resolved [`Config`] is passed explicitly to whatever needs it.
//! Loading happens before logging is set up, so nothing here logs directly;
//! [`Config::log_sources`] reports sources and warnings once a subscriber exists.

use crate::error::ConfigError;
use crate::estimator::DEFAULT_SAFETY_FACTOR;
use crate::portal::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub portal: PortalConfig,
    pub account: AccountConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
    pub paths: PathsConfig,
    /// Config file that was read, if any
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
    /// `.env` file that was read, if any
    #[serde(skip)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub guest_url: Option<String>,
    pub contract_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Remaining GB below which a refill is wanted
    pub threshold_gb: f64,
    /// Normal interval in fixed mode
    pub check_interval_seconds: u64,
    /// Fast interval in fixed mode, lower bound in dynamic mode
    pub fast_check_interval_seconds: u64,
    /// Upper bound in dynamic mode
    pub max_check_interval_seconds: u64,
    /// First interval in dynamic mode, before any rate is known
    pub initial_dynamic_interval_seconds: u64,
    pub dynamic_interval: bool,
    pub safety_factor: f64,
    /// Scheduler wake-up period
    pub tick_millis: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_gb: 1.0,
            check_interval_seconds: 60,
            fast_check_interval_seconds: 5,
            max_check_interval_seconds: 300,
            initial_dynamic_interval_seconds: 60,
            dynamic_interval: true,
            safety_factor: DEFAULT_SAFETY_FACTOR,
            tick_millis: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// `console`, `file` or `both`
    pub output: String,
    /// Hourly log files kept on disk
    pub retention_hours: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
            retention_hours: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
    pub session_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
            session_file: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".volume-refill")
                .join("sessions.json"),
        }
    }
}

/// How the portal is entered
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    Guest { url: String },
    Password { username: String, password: String },
}

/// Resolved login and contract
#[derive(Debug, Clone, PartialEq)]
pub struct Access {
    pub credentials: Credentials,
    /// Always set for credentialed access; guests may discover it from the portal
    pub contract_id: Option<String>,
}

/// Non-empty environment value
fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_value(name)
        .map(|raw| raw.parse::<T>().with_context(|| format!("Invalid {name}: {raw}")))
        .transpose()
}

impl Config {
    /// Load from file, `.env` and environment. CLI flags and validation come after.
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        let config_paths = [
            PathBuf::from("volume-refill.toml"),
            PathBuf::from(".volume-refill.toml"),
            dirs::config_dir()
                .map(|d| d.join("volume-refill").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in config_paths.iter().filter(|p| !p.as_os_str().is_empty()) {
            if path.exists() {
                config = Self::load_from_file(path)?;
                break;
            }
        }

        config.env_file = dotenvy::dotenv().ok();

        config.apply_env_overrides()?;

        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| ConfigError::File {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        config.loaded_from = Some(path.to_path_buf());

        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Account
        if let Some(val) = env_value("CONTROL_CENTER_USERNAME") {
            self.account.username = Some(val);
        }
        if let Some(val) = env_value("CONTROL_CENTER_PASSWORD") {
            self.account.password = Some(val);
        }
        if let Some(val) = env_value("GUEST_URL") {
            self.account.guest_url = Some(val);
        }
        if let Some(val) = env_value("CONTROL_CENTER_CONTRACT_IDS") {
            // Only one contract is monitored; the first listed wins
            self.account.contract_id = val
                .split(',')
                .map(str::trim)
                .find(|id| !id.is_empty())
                .map(str::to_string);
        }

        // Monitor
        if let Some(val) = parse_env("MONITOR_THRESHOLD_GB")? {
            self.monitor.threshold_gb = val;
        }
        if let Some(val) = parse_env("MONITOR_CHECK_INTERVAL_SECONDS")? {
            self.monitor.check_interval_seconds = val;
        }
        if let Some(val) = parse_env("MONITOR_FAST_CHECK_INTERVAL_SECONDS")? {
            self.monitor.fast_check_interval_seconds = val;
        }
        if let Some(val) = parse_env("MONITOR_MAX_CHECK_INTERVAL_SECONDS")? {
            self.monitor.max_check_interval_seconds = val;
        }
        if let Some(val) = parse_env("MONITOR_INITIAL_DYNAMIC_INTERVAL_SECONDS")? {
            self.monitor.initial_dynamic_interval_seconds = val;
        }
        if let Some(val) = env_value("MONITOR_DYNAMIC_INTERVAL") {
            self.monitor.dynamic_interval =
                parse_bool(&val).with_context(|| format!("Invalid MONITOR_DYNAMIC_INTERVAL: {val}"))?;
        }
        if let Some(val) = parse_env("MONITOR_SAFETY_FACTOR")? {
            self.monitor.safety_factor = val;
        }

        // Portal
        if let Some(val) = parse_env("API_TIMEOUT")? {
            self.portal.request_timeout_secs = val;
        }

        // Logging
        if let Some(val) = env_value("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = env_value("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Some(val) = env_value("LOG_OUTPUT") {
            self.logging.output = val;
        }
        if let Some(val) = parse_env("MONITOR_LOG_RETENTION_HOURS")? {
            self.logging.retention_hours = val;
        }

        // Paths
        if let Some(val) = env_value("VOLUME_REFILL_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }
        if let Some(val) = env_value("VOLUME_REFILL_SESSION_FILE") {
            self.paths.session_file = PathBuf::from(val);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let monitor = &self.monitor;

        if !monitor.threshold_gb.is_finite() || monitor.threshold_gb < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "threshold must be a non-negative number of GB, got {}",
                monitor.threshold_gb
            )));
        }

        if monitor.check_interval_seconds == 0
            || monitor.fast_check_interval_seconds == 0
            || monitor.max_check_interval_seconds == 0
            || monitor.initial_dynamic_interval_seconds == 0
        {
            return Err(ConfigError::Invalid("check intervals must be greater than 0".to_string()));
        }

        if !monitor.safety_factor.is_finite() || monitor.safety_factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "safety factor must be greater than 0, got {}",
                monitor.safety_factor
            )));
        }
        if monitor.tick_millis == 0 {
            return Err(ConfigError::Invalid("scheduler tick must be greater than 0".to_string()));
        }

        if self.portal.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request timeout must be greater than 0".to_string()));
        }

        if !matches!(self.logging.output.as_str(), "console" | "file" | "both") {
            return Err(ConfigError::Invalid(format!(
                "log output must be console, file or both, got {}",
                self.logging.output
            )));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "log format must be pretty or json, got {}",
                self.logging.format
            )));
        }

        Ok(())
    }

    /// Settings that are accepted but probably not what the user meant
    pub fn warnings(&self) -> Vec<String> {
        let monitor = &self.monitor;
        let mut warnings = Vec::new();

        if monitor.safety_factor > 1.0 {
            warnings.push(format!(
                "safety factor {} is above 1 and schedules polls after the projected threshold crossing",
                monitor.safety_factor
            ));
        }

        if monitor.fast_check_interval_seconds > monitor.max_check_interval_seconds {
            warnings.push(format!(
                "fast interval {}s exceeds the maximum {}s; dynamic mode will always use the fast interval",
                monitor.fast_check_interval_seconds, monitor.max_check_interval_seconds
            ));
        }

        warnings
    }

    /// Report where the configuration came from and any [`Config::warnings`].
    /// Call after `init_logging`.
    pub fn log_sources(&self) {
        match &self.loaded_from {
            Some(path) => info!(config_file = %path.display(), "Loaded configuration from file"),
            None => debug!("No configuration file found, using defaults"),
        }
        if let Some(path) = &self.env_file {
            info!(env_file = %path.display(), "Loaded environment file");
        }
        for warning in self.warnings() {
            warn!("{warning}");
        }
    }

    /// Decide how to log in. A guest link wins over credentials.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let account = &self.account;
        let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

        if let Some(url) = non_empty(&account.guest_url) {
            return Ok(Credentials::Guest { url });
        }

        match (non_empty(&account.username), non_empty(&account.password)) {
            (Some(username), Some(password)) => Ok(Credentials::Password { username, password }),
            _ => Err(ConfigError::MissingCredentials),
        }
    }

    /// Credentials plus contract id; credentialed access cannot work without one
    pub fn access(&self) -> Result<Access, ConfigError> {
        let credentials = self.credentials()?;
        let contract_id = self
            .account
            .contract_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        if contract_id.is_none() && matches!(credentials, Credentials::Password { .. }) {
            return Err(ConfigError::MissingContractId);
        }

        Ok(Access {
            credentials,
            contract_id,
        })
    }
}
