use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Retry policy for read operations. Writes never go through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Run `read`, trying again on transient store failures.
    pub async fn read<T, F, Fut>(&self, what: &'static str, mut read: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;

        loop {
            match read().await {
                Err(e) if e.is_transient() && attempt < attempts => {
                    tracing::warn!(error = %e, attempt, attempts, what, "Transient read failure, retrying");
                    attempt += 1;
                    if !self.backoff.is_zero() {
                        actix_web::rt::time::sleep(self.backoff).await;
                    }
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttendanceError;
    use std::cell::Cell;

    #[actix_web::test]
    async fn retries_transient_failures_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            attempts: 3,
            backoff: Duration::ZERO,
        };

        let value = policy
            .read("test", || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(AttendanceError::Store(sqlx::Error::PoolTimedOut))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.get(), 3);
    }

    #[actix_web::test]
    async fn gives_up_after_the_configured_attempts() {
        let calls = Cell::new(0);
        let result: Result<()> = RetryPolicy {
            attempts: 2,
            backoff: Duration::ZERO,
        }
        .read("test", || {
            calls.set(calls.get() + 1);
            async { Err(AttendanceError::Store(sqlx::Error::PoolTimedOut)) }
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.get(), 2);
    }

    #[actix_web::test]
    async fn domain_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = RetryPolicy::default()
            .read("test", || {
                calls.set(calls.get() + 1);
                async { Err(AttendanceError::authorization("HR only")) }
            })
            .await;

        assert!(matches!(result, Err(AttendanceError::Authorization(_))));
        assert_eq!(calls.get(), 1);
    }
}
