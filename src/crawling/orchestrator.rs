//! # Crawling Orchestrator
//!
//! Drives the outer loop over (year × university) combinations and owns the
//! restart policy: any uncaught failure tears the pass down, the gateway is
//! dropped, and after a cooldown the whole pipeline restarts from dimension
//! enumeration. The progress ledger is the only durable state, so the
//! process is safely interruptible and resumable at any point.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::crawling::executor::{SearchExecutor, SearchGateway};
use crate::crawling::planner::{PartitionPlanner, RefinementStrategy};
use crate::domain::dimensions::{DimensionSource, DimensionValue, Dimensions};
use crate::domain::ledger::ProgressLedger;
use crate::error::{HarvestError, Result};
use crate::infrastructure::artifacts::ArtifactWriter;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::file_ledger::FileLedger;
use crate::infrastructure::http_gateway::HttpGateway;
use crate::infrastructure::page_parser::KayitBannerParser;

pub struct Orchestrator {
    config: Arc<AppConfig>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(config: Arc<AppConfig>, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Runs until every combination is processed or shutdown is requested.
    pub async fn run(&self) -> Result<()> {
        loop {
            let run_id = Uuid::new_v4();
            info!("Starting crawl pass | run_id={}", run_id);

            match self.run_once().await {
                Ok(()) => {
                    if self.cancel.is_cancelled() {
                        info!("Crawl pass interrupted by shutdown | run_id={}", run_id);
                    } else {
                        info!("All combinations processed | run_id={}", run_id);
                    }
                    return Ok(());
                }
                Err(e) => {
                    error!("Crawl pass failed | run_id={}: {}", run_id, e);
                    let cooldown = if e.is_maintenance() {
                        Duration::from_secs(self.config.crawl.maintenance_cooldown_secs)
                    } else {
                        Duration::from_secs(self.config.crawl.error_cooldown_secs)
                    };
                    info!("Cooling down for {:?} before restart", cooldown);
                    tokio::select! {
                        () = sleep(cooldown) => {}
                        () = self.cancel.cancelled() => {
                            info!("Shutdown requested during cooldown");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// One full pass: enumerate dimensions, then process every combination
    /// that the ledger does not already cover.
    async fn run_once(&self) -> Result<()> {
        let ledger = Arc::new(FileLedger::new(&self.config.storage.progress_file));
        ledger.ensure_exists().await?;
        ArtifactWriter::new(&self.config.storage.download_dir)
            .ensure_dir()
            .await?;

        // Dimension lists are re-fetched on every restart; all partitioning
        // decisions re-derive from the ledger's current content.
        let gateway = Arc::new(HttpGateway::new(
            &self.config.site,
            self.config.crawl.min_year,
        )?);
        let dims = Arc::new(gateway.fetch_dimensions().await?);

        // Newest years first, universities within each year.
        let combinations: Vec<(String, DimensionValue)> = dims
            .years
            .iter()
            .flat_map(|year| {
                dims.universities
                    .iter()
                    .map(move |uni| (year.clone(), uni.clone()))
            })
            .collect();
        info!(
            "Generated {} (year x university) combinations to process",
            combinations.len()
        );

        let workers = self.config.crawl.workers.max(1);
        if workers == 1 {
            let planner = build_planner(&self.config, gateway, ledger.clone(), &dims);
            process_slice(0, &planner, ledger.as_ref(), combinations, &self.cancel).await?;
            info!("Pass summary | {}", planner.stats().summary());
            return Ok(());
        }

        // Disjoint round-robin slices, one independent gateway context each.
        let mut slices: Vec<Vec<(String, DimensionValue)>> = vec![Vec::new(); workers];
        for (i, combo) in combinations.into_iter().enumerate() {
            slices[i % workers].push(combo);
        }

        let handles: Vec<_> = slices
            .into_iter()
            .enumerate()
            .map(|(worker_id, slice)| {
                let config = Arc::clone(&self.config);
                let ledger = Arc::clone(&ledger);
                let dims = Arc::clone(&dims);
                let cancel = self.cancel.clone();
                tokio::spawn(async move {
                    let gateway =
                        Arc::new(HttpGateway::new(&config.site, config.crawl.min_year)?);
                    let planner = build_planner(&config, gateway, ledger.clone(), &dims);
                    process_slice(worker_id, &planner, ledger.as_ref(), slice, &cancel).await?;
                    info!("Worker {} summary | {}", worker_id, planner.stats().summary());
                    Ok::<(), HarvestError>(())
                })
            })
            .collect();

        for handle in join_all(handles).await {
            handle.map_err(|e| HarvestError::Worker(e.to_string()))??;
        }
        Ok(())
    }
}

fn build_planner(
    config: &AppConfig,
    gateway: Arc<dyn SearchGateway>,
    ledger: Arc<dyn ProgressLedger>,
    dims: &Dimensions,
) -> PartitionPlanner {
    let executor = SearchExecutor::new(
        gateway,
        config.retry.clone(),
        Arc::new(KayitBannerParser),
        config.site.maintenance_markers.clone(),
        config.site.embedded_data_marker.clone(),
    );
    let strategies = RefinementStrategy::build(&config.crawl.refinement_order, dims);
    PartitionPlanner::new(
        executor,
        ledger,
        ArtifactWriter::new(&config.storage.download_dir),
        strategies,
        config.crawl.record_ceiling,
        config.crawl.on_persistent_overflow,
        config.crawl.subworkers,
    )
}

async fn process_slice(
    worker_id: usize,
    planner: &PartitionPlanner,
    ledger: &dyn ProgressLedger,
    slice: Vec<(String, DimensionValue)>,
    cancel: &CancellationToken,
) -> Result<()> {
    for (year, university) in slice {
        if cancel.is_cancelled() {
            warn!("Worker {} stopping before next combination", worker_id);
            return Ok(());
        }

        // Snapshot once per combination; staleness costs at most a
        // duplicate fetch.
        let snapshot = ledger.snapshot().await?;
        info!("Processing | {} | {}", university.name, year);
        match planner.plan(&university, &year, &snapshot).await {
            Ok(outcome) => {
                info!("Done | {} | {} | {:?}", university.name, year, outcome);
            }
            Err(e) if e.is_partition_local() => {
                warn!(
                    "Combination left unmarked for the next pass | {} | {}: {}",
                    university.name, year, e
                );
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
