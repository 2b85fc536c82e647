use anyhow::Result;
use async_trait::async_trait;
use std::ops::AddAssign;

/// Per-worker counters returned when a worker stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    pub logins: u64,
    pub polls: u64,
    pub relogins: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: Self) {
        self.logins += other.logins;
        self.polls += other.polls;
        self.relogins += other.relogins;
    }
}

/// One long-lived unit of work, normally one account.
#[async_trait]
pub trait Worker: Send + Sync {
    /// Human readable id used in logs, e.g. `001 | 0xAbc...`
    fn label(&self) -> String;

    /// Runs until the token is cancelled or an irrecoverable error occurs.
    async fn start(
        &self,
        cancellation_token: tokio_util::sync::CancellationToken,
    ) -> Result<WorkerStats>;
}
