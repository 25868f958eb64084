use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;

pub(crate) const DEFAULT_ATTEMPTS: u32 = 3;
const BASE_DELAY: Duration = Duration::from_millis(500);

/// Every outbound request gets a hard deadline; a hung connection must not
/// block a flow (the facade holds the per-account lock across these calls).
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client with the crate-wide request timeout applied.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Run an idempotent call, retrying transient failures with doubling delays.
///
/// Transport errors and chain-node read failures are retried; both come from
/// read-only queries that are safe to re-issue. A JSON-RPC error means the
/// service already made a decision and retrying would not change it;
/// submission calls must not go through here at all (double-submission risk).
pub(crate) async fn idempotent<T, F, Fut>(attempts: u32, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut delay = BASE_DELAY;
    let mut last: Option<Error> = None;

    for attempt in 0..attempts.max(1) {
        match call().await {
            Ok(v) => return Ok(v),
            Err(e) if is_transient(&e) => {
                tracing::warn!(error = %e, attempt, "transient network error, will retry");
                last = Some(e);
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => return Err(e),
        }
    }

    Err(last.unwrap_or_else(|| Error::Response("retry loop made no attempt".into())))
}

fn is_transient(e: &Error) -> bool {
    // Provider errors only arise from read-only chain queries in this crate,
    // so re-issuing them cannot double-apply anything.
    matches!(e, Error::Transport(_) | Error::Provider(_))
}
