//! Data models: configuration and run statistics.

pub mod config;
pub mod stats;

pub use config::{CompanyConfig, ReconcileConfig, DEFAULT_SPECIAL_VENDOR};
pub use stats::{CompanyDetail, ExcludedRow, ExcludedXml, ProcessingStats};
