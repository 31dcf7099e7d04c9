use std::time::Duration;

use rand::Rng;

use crate::error::StoreError;

/// Retry budget for store calls. Only `StoreError::Unavailable` is retried;
/// every other error is returned on the first attempt. Reads go through
/// [`RetryPolicy::read`]; writes loop on `write_attempts` themselves because
/// they must re-read before trying again.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub read_attempts: u32,
    pub write_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            read_attempts: 3,
            write_attempts: 2,
            base_delay: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Tests only care about attempt counts.
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub async fn read<T>(
        &self,
        op: &'static str,
        f: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        self.run(op, self.read_attempts, f).await
    }

    /// Exponential backoff with up to 50% jitter.
    pub async fn pause(&self, attempt: u32) {
        if self.base_delay.is_zero() {
            return;
        }
        let exp = self.base_delay.saturating_mul(1 << attempt.saturating_sub(1).min(6));
        let jitter_ms = rand::thread_rng().gen_range(0..=exp.as_millis() as u64 / 2);
        tokio::time::sleep(exp + Duration::from_millis(jitter_ms)).await;
    }

    async fn run<T>(
        &self,
        op: &'static str,
        attempts: u32,
        mut f: impl FnMut() -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match f() {
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::warn!(op, attempt, error = %e, "store call failed, retrying");
                    self.pause(attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}
