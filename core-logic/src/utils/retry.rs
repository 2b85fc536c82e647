use crate::error::RetryError;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Retry strategy shared by every unbounded loop in the farmer.
///
/// `max_retries: None` retries forever. With `base_delay_ms == 0` the next
/// attempt starts immediately (after yielding to the scheduler).
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_retries: Option<u32>,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub exponential_base: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::forever()
    }
}

impl RetryConfig {
    pub fn forever() -> Self {
        Self {
            max_retries: None,
            base_delay_ms: 0,
            max_delay_ms: 0,
            exponential_base: 2.0,
            jitter: false,
        }
    }

    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries: Some(max_retries),
            base_delay_ms,
            max_delay_ms: base_delay_ms.saturating_mul(30),
            jitter: true,
            ..Self::forever()
        }
    }

    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_retries.is_none()
    }

    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }

        let delay_ms = self.base_delay_ms as f64 * self.exponential_base.powi(attempt as i32);
        let delay_ms = delay_ms.min(self.max_delay_ms.max(self.base_delay_ms) as f64);

        let delay_ms = if self.jitter {
            let rng_factor = rand::thread_rng().gen_range(0.5..=1.5);
            delay_ms * rng_factor
        } else {
            delay_ms
        };

        Duration::from_millis(delay_ms as u64)
    }

    /// Starts a fresh retry budget for one logical operation.
    pub fn budget(&self, operation: &str) -> RetryBudget {
        RetryBudget {
            config: self.clone(),
            operation: operation.to_string(),
            retries: 0,
        }
    }
}

/// Tracks retries of one operation. Call [`RetryBudget::backoff`] after every
/// failed attempt; it sleeps per the policy or reports exhaustion.
#[derive(Debug)]
pub struct RetryBudget {
    config: RetryConfig,
    operation: String,
    retries: u32,
}

impl RetryBudget {
    pub async fn backoff(&mut self) -> Result<(), RetryError> {
        if let Some(max) = self.config.max_retries {
            if self.retries >= max {
                return Err(RetryError::Exhausted {
                    operation: self.operation.clone(),
                    attempts: self.retries + 1,
                });
            }
        }

        let delay = self.config.calculate_delay(self.retries);
        self.retries = self.retries.saturating_add(1);

        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            debug!(
                "{} failed (retry {}). Retrying in {:?}",
                self.operation, self.retries, delay
            );
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
