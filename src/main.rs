use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use tez_harvest::crawling::Orchestrator;
use tez_harvest::infrastructure::config::ConfigManager;
use tez_harvest::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Optional explicit config path as the sole argument.
    let manager = match std::env::args().nth(1) {
        Some(path) => ConfigManager::with_path(PathBuf::from(path)),
        None => ConfigManager::new()?,
    };
    let config = manager.initialize_on_first_run().await?;

    let _log_guards = init_logging(&config.logging, &config.storage.log_dir)?;
    info!("Starting tez-harvest (config: {:?})", manager.config_path);

    let cancel = CancellationToken::new();
    let orchestrator = Orchestrator::new(Arc::new(config), cancel.clone());

    let mut run = tokio::spawn(async move { orchestrator.run().await });
    tokio::select! {
        result = &mut run => result??,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupt received, finishing the current partition before exit");
            cancel.cancel();
            run.await??;
        }
    }

    info!("tez-harvest finished");
    Ok(())
}
