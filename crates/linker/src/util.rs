use std::future::Future;
use std::time::Duration;

use opmatch_store::StoreError;

/// Runs a store call up to `attempts` times with linear backoff.
/// Transient failures are logged; the last error surfaces.
pub(crate) async fn with_retries<T, F, Fut>(
    attempts: u32,
    backoff: Duration,
    what: &str,
    mut call: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < attempts => {
                tracing::warn!(attempt, %error, "{what} failed, retrying");
                tokio::time::sleep(backoff * attempt).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
