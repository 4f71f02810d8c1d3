//! Request helpers shared by every gateway: single-shot JSON POST and
//! bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::GatewayError;

/// Upper bound on a single call to a service that is not retried.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(50);

/// Attempt budget for [`fetch_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Upper bound on a single attempt.
    pub timeout: Duration,
    /// Wait after the first failure; doubles after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            timeout: Duration::from_secs(30),
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// One attempt, no waiting.
    pub fn single_attempt(timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            timeout,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay after failed attempt `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Send a request and turn any non-2xx status into [`GatewayError::Server`]
/// carrying the response text.
pub async fn send_checked(request: RequestBuilder) -> Result<Response, GatewayError> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = match resp.text().await {
            Ok(text) => text,
            Err(e) => format!("<unreadable body: {e}>"),
        };
        return Err(GatewayError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

/// Read a successful response body as JSON.
pub async fn read_json<R: DeserializeOwned>(resp: Response) -> Result<R, GatewayError> {
    let text = resp.text().await?;
    Ok(serde_json::from_str(&text)?)
}

/// POST `body` as JSON once and parse the JSON reply. No retry.
pub async fn post_json<B, R>(
    client: &Client,
    url: &str,
    bearer: Option<&str>,
    body: &B,
) -> Result<R, GatewayError>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    info!(url = %url, "POST");
    let mut request = client.post(url).json(body);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }
    let resp = send_checked(request).await?;
    read_json(resp).await
}

/// Await `fut`, giving up with [`GatewayError::Timeout`] after `limit`.
pub async fn bounded<T, Fut>(limit: Duration, fut: Fut) -> Result<T, GatewayError>
where
    Fut: Future<Output = Result<T, GatewayError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(GatewayError::Timeout(limit)))
}

/// Run `op` up to `policy.max_attempts` times.
///
/// Each attempt is cut off after `policy.timeout`. Between attempts the task
/// sleeps for [`RetryPolicy::delay_for`]. When every attempt fails, the error
/// of the last attempt is returned as is. Configuration errors are returned
/// immediately.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, GatewayError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match bounded(policy.timeout, op(attempt)).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 >= attempts || !e.is_retryable() => return Err(e),
            Err(e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    error = %e,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Issue the request built by `make_request` with retry, backoff and a
/// per-attempt timeout. The builder is called once per attempt.
pub async fn fetch_with_retry<F>(policy: &RetryPolicy, make_request: F) -> Result<Response, GatewayError>
where
    F: Fn() -> RequestBuilder,
{
    retry_with_backoff(policy, |_| send_checked(make_request())).await
}
