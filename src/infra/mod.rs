//! Infrastructure - configuration and metrics
//!
//! - `config` - Application configuration (TOML loading, defaults, trip seeds)
//! - `metrics` - Lock-free metrics collection

pub mod config;
pub mod metrics;

pub use config::{Config, StorageKind, TripSeed};
pub use metrics::Metrics;
