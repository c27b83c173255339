use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

use crate::{AppError, Result};

/// Backoff schedule for establishing the database connection at startup.
/// Request handlers never retry; each request runs in one transaction.
#[derive(Debug, Clone)]
pub struct DatabaseRetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for DatabaseRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 250,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl DatabaseRetryConfig {
    /// Delay before attempt `attempt + 1`, capped at `max_delay_ms`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay = (self.initial_delay_ms as f64 * factor).min(self.max_delay_ms as f64);
        Duration::from_millis(delay as u64)
    }
}

/// Retry a database operation with exponential backoff
pub async fn retry_database_operation<F, Fut, T>(operation: F, config: &DatabaseRetryConfig) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = AppError::DatabaseError("Operation was never attempted".to_string());

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!("✅ DATABASE_RETRY: Operation succeeded on attempt {}", attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt < config.max_attempts {
                    let delay = config.delay_after(attempt);
                    tracing::warn!(
                        "⚠️ DATABASE_RETRY: Attempt {}/{} failed: {}, retrying in {}ms",
                        attempt,
                        config.max_attempts,
                        e,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                }
                last_error = e;
            }
        }
    }

    tracing::error!(
        "❌ DATABASE_RETRY: All {} attempts failed, last error: {}",
        config.max_attempts,
        last_error
    );
    Err(last_error)
}
