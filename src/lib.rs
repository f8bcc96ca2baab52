//! tez-harvest - adaptive partitioned harvester for a national thesis
//! registry.
//!
//! Harvests raw thesis-search result pages by (university, year), splitting
//! any partition that exceeds the site's display ceiling along further
//! dimensions (thesis type, institute, subject), with an append-only
//! progress ledger so restarted runs never redo completed work.

// Module declarations
pub mod crawling;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export the common surface
pub use crawling::{Orchestrator, PartitionPlanner, SearchExecutor};
pub use domain::{DimensionValue, Dimensions, PartitionKey, RefinementKind};
pub use error::{HarvestError, Result};
pub use infrastructure::{AppConfig, ConfigManager};
