//! # Core Logic - Concurrency Gate
//!
//! Admission control for the expensive phase of a worker (login and
//! challenge solving). The gate bounds how many workers are inside that phase
//! across the whole process; workers outside it are never throttled.

use crate::error::GateError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Anything that hands out admission permits. Dropping the permit releases
/// the slot.
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    type Permit: Send;

    async fn acquire(&self) -> Result<Self::Permit, GateError>;
}

/// Counting semaphore with a capacity fixed at construction.
///
/// Cloning shares the same pool of slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyGate {
    /// Capacity below 1 would deadlock every worker, so it is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Non-blocking variant, `None` when every slot is taken.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|permit| GatePermit { _permit: permit })
    }

    pub fn close(&self) {
        self.semaphore.close();
    }
}

#[async_trait]
impl AdmissionGate for ConcurrencyGate {
    type Permit = GatePermit;

    async fn acquire(&self) -> Result<GatePermit, GateError> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        debug!(
            "Gate slot acquired ({}/{} free)",
            self.semaphore.available_permits(),
            self.capacity
        );
        Ok(GatePermit { _permit: permit })
    }
}

/// One held slot of a [`ConcurrencyGate`].
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}
