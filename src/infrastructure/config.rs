//! Configuration infrastructure.
//!
//! One static configuration object supplied at process start; no runtime
//! reconfiguration. The `ConfigManager` persists it as JSON under the user
//! config directory and initializes defaults on first run.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::crawling::retry::RetryPolicy;
use crate::domain::dimensions::RefinementKind;

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upstream site integration.
    pub site: SiteConfig,

    /// Where artifacts, logs, and the progress ledger live.
    pub storage: StorageConfig,

    /// Partitioning and orchestration knobs.
    pub crawl: CrawlConfig,

    /// Retry policy for individual searches.
    pub retry: RetryPolicy,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Search form base URL.
    pub base_url: String,

    /// User agent sent on every request.
    pub user_agent: String,

    /// Bounded timeout for every navigation, in seconds.
    pub navigation_timeout_secs: u64,

    /// Minimum delay between requests, in milliseconds.
    pub request_delay_ms: u64,

    /// Body-text fragments that identify the site's maintenance page.
    pub maintenance_markers: Vec<String>,

    /// Marker whose absence means the result page carries no embedded data.
    pub embedded_data_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for raw result artifacts.
    pub download_dir: PathBuf,

    /// Directory for log files.
    pub log_dir: PathBuf,

    /// Append-only progress ledger path.
    pub progress_file: PathBuf,
}

/// What to do when a partition is still over the ceiling after the first
/// refinement level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowPolicy {
    /// Cascade through the remaining refinement dimensions before failing.
    Recurse,
    /// Treat a second-level overflow as an invariant violation.
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Site display ceiling: partitions at or below it are accepted as-is.
    pub record_ceiling: u64,

    /// Years below this are skipped entirely; `0` disables the filter.
    pub min_year: u32,

    /// Refinement dimensions in priority order.
    pub refinement_order: Vec<RefinementKind>,

    /// Behavior when refinement cannot get under the ceiling in one level.
    pub on_persistent_overflow: OverflowPolicy,

    /// Independent gateway contexts over disjoint combination slices.
    pub workers: usize,

    /// Concurrent refinement children within one over-ceiling partition.
    pub subworkers: usize,

    /// Cooldown before restarting after an ordinary failure, in seconds.
    pub error_cooldown_secs: u64,

    /// Longer cooldown after a detected maintenance window, in seconds.
    pub maintenance_cooldown_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,

    /// Enable console output.
    pub console_output: bool,

    /// Enable file output.
    pub file_output: bool,

    /// Log file name inside the configured log directory.
    pub file_name: String,
}

/// Built-in defaults, observed from the upstream integration.
pub mod defaults {
    pub const BASE_URL: &str = "https://tez.yok.gov.tr/UlusalTezMerkezi/tarama.jsp";
    pub const USER_AGENT: &str = "tez-harvest/0.1 (thesis metadata research)";
    pub const NAVIGATION_TIMEOUT_SECS: u64 = 10;
    pub const REQUEST_DELAY_MS: u64 = 2000;
    pub const MAINTENANCE_MARKERS: [&str; 2] = ["BAKIM CALISMASI", "undergoing maintenance"];
    pub const EMBEDDED_DATA_MARKER: &str = "getData()";

    pub const DOWNLOAD_DIR: &str = "downloads";
    pub const LOG_DIR: &str = "logs";
    pub const PROGRESS_FILE: &str = "progress.txt";
    pub const LOG_FILE_NAME: &str = "tez-harvest.log";

    /// The site stops paging meaningfully past this many records.
    pub const RECORD_CEILING: u64 = 2000;
    pub const MIN_YEAR: u32 = 0;
    pub const WORKERS: usize = 1;
    pub const SUBWORKERS: usize = 1;
    pub const ERROR_COOLDOWN_SECS: u64 = 5;
    pub const MAINTENANCE_COOLDOWN_SECS: u64 = 300;

    pub const LOG_LEVEL: &str = "info";
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            storage: StorageConfig::default(),
            crawl: CrawlConfig::default(),
            retry: RetryPolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BASE_URL.to_string(),
            user_agent: defaults::USER_AGENT.to_string(),
            navigation_timeout_secs: defaults::NAVIGATION_TIMEOUT_SECS,
            request_delay_ms: defaults::REQUEST_DELAY_MS,
            maintenance_markers: defaults::MAINTENANCE_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            embedded_data_marker: defaults::EMBEDDED_DATA_MARKER.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(defaults::DOWNLOAD_DIR),
            log_dir: PathBuf::from(defaults::LOG_DIR),
            progress_file: PathBuf::from(defaults::PROGRESS_FILE),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            record_ceiling: defaults::RECORD_CEILING,
            min_year: defaults::MIN_YEAR,
            refinement_order: vec![RefinementKind::ThesisType, RefinementKind::Institute],
            on_persistent_overflow: OverflowPolicy::Recurse,
            workers: defaults::WORKERS,
            subworkers: defaults::SUBWORKERS,
            error_cooldown_secs: defaults::ERROR_COOLDOWN_SECS,
            maintenance_cooldown_secs: defaults::MAINTENANCE_COOLDOWN_SECS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            console_output: true,
            file_output: true,
            file_name: defaults::LOG_FILE_NAME.to_string(),
        }
    }
}

/// Configuration manager for loading and saving settings.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// The application configuration directory.
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("tez-harvest");
        Ok(config_dir)
    }

    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("tez_harvest_config.json");
        Ok(Self { config_path })
    }

    /// Manager bound to an explicit config file path.
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Loads the configuration, writing defaults on first run.
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        if let Some(config_dir) = self.config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)
                    .await
                    .context("Failed to create config directory")?;
                info!("Created configuration directory: {:?}", config_dir);
            }
        }

        if !self.config_path.exists() {
            info!("First run detected - initializing default configuration");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        self.load_config().await
    }

    pub async fn load_config(&self) -> Result<AppConfig> {
        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", self.config_path))?;
        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", self.config_path))?;
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .with_context(|| format!("Failed to write config file: {:?}", self.config_path))?;
        Ok(())
    }
}
