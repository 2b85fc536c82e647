//! # Core Logic - Shared Utilities for Account Farmers
//!
//! This crate provides the pieces every farmer binary needs regardless of the
//! remote service it talks to.
//!
//! ## Modules
//!
//! - [`config`] - Proxy configuration and parsing
//! - [`error`] - Typed error handling with thiserror
//! - [`metrics`] - Process-wide run counters
//! - [`traits`] - Worker trait and per-worker stats
//! - `utils` - Logger, key and proxy loading, retry policy, concurrency gate, runner

pub mod config;
pub mod error;
pub mod metrics;
pub mod traits;
pub(crate) mod utils;

pub use config::ProxyConfig;
pub use error::{ConfigError, CoreError, GateError, NetworkError, RetryError, WalletError};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use traits::{Worker, WorkerStats};

pub use utils::{
    setup_logger, AdmissionGate, ConcurrencyGate, GatePermit, PrivateKey, ProxyManager,
    RetryBudget, RetryConfig, WalletManager, WorkerRunner, FARM_EVENT_TARGET,
};
