//! Repeated snapshot reads for pages that only get a token after a login.

use crate::types::Result;
use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Call `read` up to `attempts` times, `interval` apart, until `accept`
/// returns true. Returns the accepted value, or the last one read.
///
/// `attempts` of 0 is treated as 1. A read error ends polling immediately.
pub async fn poll_until<T, R, Fut, A>(
    attempts: u32,
    interval: Duration,
    mut read: R,
    mut accept: A,
) -> Result<T>
where
    R: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    A: FnMut(&T) -> bool,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let value = read().await?;
        if accept(&value) || attempt >= attempts {
            return Ok(value);
        }

        info!(
            "Attempt {}/{}: nothing yet, waiting {}s",
            attempt,
            attempts,
            interval.as_secs()
        );
        tokio::time::sleep(interval).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JwtScoutError;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_stops_at_first_accepted_value() {
        let reads = Cell::new(0u32);
        let value = poll_until(
            5,
            Duration::ZERO,
            || {
                reads.set(reads.get() + 1);
                let n = reads.get();
                async move { Ok(n) }
            },
            |n| *n == 3,
        )
        .await
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(reads.get(), 3);
    }

    #[tokio::test]
    async fn test_returns_last_value_after_all_attempts() {
        let reads = Cell::new(0u32);
        let value = poll_until(
            4,
            Duration::ZERO,
            || {
                reads.set(reads.get() + 1);
                let n = reads.get();
                async move { Ok(n) }
            },
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(value, 4);
        assert_eq!(reads.get(), 4);
    }

    #[tokio::test]
    async fn test_zero_attempts_reads_once() {
        let reads = Cell::new(0u32);
        let value = poll_until(
            0,
            Duration::ZERO,
            || {
                reads.set(reads.get() + 1);
                async { Ok("page") }
            },
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(value, "page");
        assert_eq!(reads.get(), 1);
    }

    #[tokio::test]
    async fn test_read_error_stops_polling() {
        let reads = Cell::new(0u32);
        let result: Result<u32> = poll_until(
            3,
            Duration::ZERO,
            || {
                reads.set(reads.get() + 1);
                async { Err(JwtScoutError::Browser("page closed".to_string())) }
            },
            |_| false,
        )
        .await;

        assert!(matches!(result, Err(JwtScoutError::Browser(_))));
        assert_eq!(reads.get(), 1);
    }
}
