//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod concurrency_gate;
pub(crate) mod logger;
pub(crate) mod proxy_manager;
pub(crate) mod retry;
pub(crate) mod runner;
pub(crate) mod wallet_manager;

pub use concurrency_gate::{AdmissionGate, ConcurrencyGate, GatePermit};
pub use logger::{setup_logger, FARM_EVENT_TARGET};
pub use proxy_manager::ProxyManager;
pub use retry::{RetryBudget, RetryConfig};
pub use runner::WorkerRunner;
pub use wallet_manager::{PrivateKey, WalletManager};
