//! Infrastructure: configuration, logging, the upstream HTTP gateway, and
//! file-backed persistence for artifacts and the progress ledger.

pub mod artifacts;
pub mod config;
pub mod file_ledger;
pub mod http_gateway;
pub mod logging;
pub mod page_parser;

pub use artifacts::ArtifactWriter;
pub use config::{AppConfig, ConfigManager, OverflowPolicy};
pub use file_ledger::FileLedger;
pub use http_gateway::HttpGateway;
