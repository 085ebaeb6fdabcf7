//! Long-running monitor command

use super::PortalContext;
use crate::config::Config;
use crate::logging::init_logging;
use crate::monitor::Monitor;
use crate::scheduler::{AdaptiveScheduler, SchedulePolicy};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Watch the configured contract until Ctrl+C
pub async fn run_monitor(config: Config) -> Result<()> {
    let access = config.access()?;
    let _guard = init_logging(&config.logging, &config.paths.log_directory)?;
    config.log_sources();
    let shutdown = shutdown_signal();

    let context = PortalContext::connect(&config, access)?;

    // Guests may not know their contract id yet, so they log in up front.
    // Credentialed logins happen inside the first cycle.
    let (session, contract_id) = match context.access.contract_id.clone() {
        Some(contract_id) => (None, contract_id),
        None => {
            let (session, contract_id) = context.open_session().await?;
            (Some(session), contract_id)
        }
    };

    let scheduler = Arc::new(AdaptiveScheduler::new(SchedulePolicy::from(&config.monitor)));
    let mut monitor = Monitor::new(context.portal, context.authenticator, scheduler, contract_id);
    if let Some(session) = session {
        monitor = monitor.with_session(session);
    }

    println!("🚀 Monitoring started, press Ctrl+C to stop");
    monitor.run(shutdown).await;
    println!("👋 Monitoring stopped.");

    Ok(())
}

/// Resolves on the first Ctrl+C.
///
/// The listener is spawned immediately so an interrupt during startup is not lost;
/// the future itself is only awaited once the scheduler loop runs.
fn shutdown_signal() -> impl Future<Output = ()> {
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, shutting down");
                let _ = tx.send(());
            }
            Err(e) => warn!(error = %e, "Unable to listen for Ctrl+C"),
        }
    });

    async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
