//! One-shot consumption report

use super::PortalContext;
use crate::config::Config;
use crate::display::DisplayManager;
use crate::logging::init_logging;
use anyhow::{Context, Result};

pub async fn show_status(config: Config, json_output: bool) -> Result<()> {
    let access = config.access()?;
    // JSON goes to stdout untouched
    let _guard = if json_output {
        None
    } else {
        init_logging(&config.logging, &config.paths.log_directory)?
    };
    config.log_sources();

    let context = PortalContext::connect(&config, access)?;
    let (mut session, contract_id) = context.open_session().await?;

    let summary = context
        .portal
        .fetch_summary(&mut session, &contract_id)
        .await
        .with_context(|| format!("Failed to fetch consumption for contract {contract_id}"))?;
    context.authenticator.remember(&session);

    DisplayManager::new(config.monitor.threshold_gb).display_summary(&summary, json_output);
    Ok(())
}
