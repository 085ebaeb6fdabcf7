//! Authenticate once and keep the session for later runs

use super::PortalContext;
use crate::config::Config;
use crate::display::DisplayManager;
use crate::logging::init_logging;
use anyhow::Result;

pub async fn run_login(config: Config) -> Result<()> {
    let access = config.access()?;
    let _guard = init_logging(&config.logging, &config.paths.log_directory)?;
    config.log_sources();

    let context = PortalContext::connect(&config, access)?;
    let (session, contract_id) = context.open_session().await?;
    context.authenticator.remember(&session);

    DisplayManager::new(config.monitor.threshold_gb)
        .display_login(context.authenticator.account_id(), Some(&contract_id));
    Ok(())
}
