//! Error taxonomy for the harvesting pipeline.
//!
//! One enum covers the whole crawl path so the retry wrapper and the
//! orchestrator can classify failures without downcasting: transient
//! failures are retried locally, partition-local failures abort a single
//! partition for the current pass, everything else takes the orchestrator's
//! cooldown-and-restart path.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarvestError>;

#[derive(Error, Debug)]
pub enum HarvestError {
    /// Network-level navigation failure (connect, DNS, protocol).
    #[error("navigation failed: {reason}")]
    Navigation { reason: String },

    /// Navigation did not settle within the bounded timeout.
    #[error("navigation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The site answered with its maintenance page. Never retried locally;
    /// the orchestrator applies the long cooldown instead.
    #[error("site is in maintenance mode")]
    MaintenanceDetected,

    /// The result page carried no parseable record-count banner. Surfaced
    /// rather than defaulted to zero, which would poison the ledger with
    /// false completions.
    #[error("record count banner not found for {partition}")]
    RecordCountNotFound { partition: String },

    /// The result page is missing the embedded-data marker the downstream
    /// extractor depends on.
    #[error("unexpected page shape for {partition}: missing {marker:?}")]
    UnexpectedPageShape { partition: String, marker: String },

    /// A partition still exceeds the display ceiling after every configured
    /// refinement dimension was exhausted (or the fail-fast policy cut the
    /// cascade short). Unrecoverable.
    #[error(
        "partition {partition} holds {record_count} records, over the ceiling of {ceiling}, \
         and cannot be refined further"
    )]
    PartitionOverflow {
        partition: String,
        record_count: u64,
        ceiling: u64,
    },

    /// Some refinement children of this partition failed this pass; the
    /// parent key was left unmarked and is safe to retry on the next run.
    #[error("partition {partition} left incomplete: {failed} of {attempted} refinements failed")]
    PartitionIncomplete {
        partition: String,
        failed: usize,
        attempted: usize,
    },

    #[error("progress ledger I/O failed: {0}")]
    Ledger(#[source] std::io::Error),

    #[error("artifact write failed for {path}: {source}")]
    Artifact {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("dimension enumeration failed: {0}")]
    Dimension(String),

    #[error("malformed page: {0}")]
    PageParse(String),

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl HarvestError {
    /// Failures the search executor may retry with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Navigation { .. } | Self::Timeout { .. })
    }

    pub fn is_maintenance(&self) -> bool {
        matches!(self, Self::MaintenanceDetected)
    }

    /// Failures that abort only the current partition. The orchestrator
    /// logs them and moves on to the next combination; anything else tears
    /// the pass down and triggers the cooldown-and-restart path.
    pub fn is_partition_local(&self) -> bool {
        matches!(
            self,
            Self::Navigation { .. }
                | Self::Timeout { .. }
                | Self::RecordCountNotFound { .. }
                | Self::UnexpectedPageShape { .. }
                | Self::PartitionIncomplete { .. }
                | Self::PageParse(_)
        )
    }

    /// Maps a transport error onto the taxonomy, tagging timeouts with the
    /// bound that was in force.
    pub fn from_transport(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else {
            Self::Navigation {
                reason: err.to_string(),
            }
        }
    }
}
