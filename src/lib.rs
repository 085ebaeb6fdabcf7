//! Volume Refill Library
//!
//! Watches the high-speed data allowance of a mobile contract on the provider's
//! control-center portal and books a refill before the allowance runs out.
//!
//! ## Core Features
//!
//! - **Adaptive polling**: the next check is derived from the observed consumption
//!   rate, so quiet periods cost few requests and fast consumption is caught early
//! - **Fixed polling**: a normal interval that drops to a fast one below the threshold
//! - **Automatic refills**: booked as soon as the portal offers one
//! - **Two ways in**: username/password login or a shared guest link, with sessions
//!   persisted across restarts
//!
//! ## Architecture Overview
//!
//! - [`models`] - Consumption readings, summaries and refill results
//! - [`estimator`] - Pure rate estimation and interval clamping
//! - [`scheduler`] - Adaptive interval state and the tick loop
//! - [`monitor`] - One contract's poll/decide/refill cycle
//! - [`portal`] - HTTP client, payload normalization and markup scraping
//! - [`auth`] - Credential and guest-link authenticators
//! - [`session`] - Typed sessions and their persistent store
//! - [`config`] - Configuration from file, `.env`, environment and CLI
//! - [`logging`] - Structured logging with rolling log files
//! - [`display`] - Terminal output for the one-shot commands
//! - [`commands`] - `run`, `status` and `login`
//!
//! ## Main Entry Point
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use volume_refill::config::Config;
//! use volume_refill::scheduler::{AdaptiveScheduler, SchedulePolicy};
//!
//! let config = Config::default();
//! let scheduler = Arc::new(AdaptiveScheduler::new(SchedulePolicy::from(&config.monitor)));
//! assert!(scheduler.current_interval() > 0);
//! ```

pub mod auth;
pub mod commands;
pub mod config;
pub mod display;
pub mod error;
pub mod estimator;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod portal;
pub mod scheduler;
pub mod session;
pub mod timestamp_parser;

pub use error::{ConfigError, PortalError, PortalResult};
pub use models::*;
