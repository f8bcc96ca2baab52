//! Domain module - partitioning dimensions, partition keys, and the
//! progress ledger contract.

pub mod dimensions;
pub mod ledger;
pub mod partition;

// Re-export commonly used items
pub use dimensions::{DimensionSource, DimensionValue, Dimensions, RefinementKind};
pub use ledger::{LedgerSnapshot, MemoryLedger, ProgressLedger};
pub use partition::PartitionKey;
