//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Unified error type for core-logic operations.
///
/// This enum wraps all specific error types and provides a unified
/// error interface for the application layer.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Retry(#[from] RetryError),

    #[error(transparent)]
    Gate(#[from] GateError),
}

/// Configuration-related errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error reading {path}: {msg}")]
    IoError { path: String, msg: String },
}

/// Private key loading errors
#[derive(Error, Debug, Clone)]
pub enum WalletError {
    #[error("Invalid private key format on line {line}: expected hex string")]
    InvalidKeyFormat { line: usize },

    #[error("Private key on line {line} has wrong length: expected 64 hex chars, got {length}")]
    InvalidKeyLength { line: usize, length: usize },

    #[error("No private keys found in {path}")]
    Empty { path: String },
}

/// Transport-level failures. Carries no status code: a request that failed
/// here never produced a response.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    #[error("Request timeout after {timeout_ms}ms to {endpoint}")]
    Timeout { timeout_ms: u64, endpoint: String },

    #[error("Connection to {endpoint} failed: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("Request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("Failed to read response body from {endpoint}: {reason}")]
    Body { endpoint: String, reason: String },
}

/// Raised only by bounded retry policies; the default policy never gives up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    #[error("{operation} gave up after {attempts} attempts")]
    Exhausted { operation: String, attempts: u32 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("Concurrency gate is closed")]
    Closed,
}
