//! Shared utilities for talking to Ethereum JSON-RPC endpoints.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between polling attempts when waiting for a receipt.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Make a JSON-RPC call and deserialize the result.
///
/// A `null` result is passed to `T` as is, so `Option<T>` can be used for
/// methods like `eth_getTransactionReceipt` that return `null` while pending.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1
    });

    let response: RpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .with_context(|| format!("Failed to send {} request to {}", method, url))?
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = response.error {
        anyhow::bail!("{} returned error {}: {}", method, error.code, error.message);
    }

    serde_json::from_value(response.result.unwrap_or(Value::Null))
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Parse a hex-encoded JSON-RPC quantity (e.g. `"0x1a"`).
pub fn parse_quantity(value: &str) -> Result<u64, anyhow::Error> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {}", value))
}

/// Poll `check_fn` until it yields a value.
///
/// # Arguments
/// * `name` - What is being waited for (for error messages)
/// * `timeout` - Maximum time to wait
/// * `interval` - Delay between attempts
/// * `check_fn` - Returns `Ok(Some(value))` when done, `Ok(None)` to keep waiting
///
/// Errors from `check_fn` are treated as transient and retried.
///
/// # Returns
/// The value, or an error carrying the last failure once the timeout elapses.
pub async fn poll_until<T, F, Fut>(
    name: &str,
    timeout: Duration,
    interval: Duration,
    check_fn: F,
) -> Result<T, anyhow::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, anyhow::Error>>,
{
    let start = std::time::Instant::now();
    let mut last_error = None;

    loop {
        match check_fn().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => tracing::trace!(target_name = %name, "Still waiting..."),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), target_name = %name, "Check failed, retrying...");
                last_error = Some(e);
            }
        }

        if start.elapsed() > timeout {
            return Err(match last_error {
                Some(e) => e.context(format!(
                    "Timeout waiting for {} after {}s",
                    name,
                    timeout.as_secs()
                )),
                None => anyhow::anyhow!("Timeout waiting for {} after {}s", name, timeout.as_secs()),
            });
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x3").unwrap(), 3);
        assert_eq!(parse_quantity("0x539").unwrap(), 1337);
        assert!(parse_quantity("0xzz").is_err());
    }

    #[test]
    fn test_response_envelope() {
        let ok: RpcResponse =
            serde_json::from_value(serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": "0x1" }))
                .unwrap();
        assert_eq!(ok.result, Some(Value::String("0x1".to_string())));
        assert!(ok.error.is_none());

        let pending: RpcResponse =
            serde_json::from_value(serde_json::json!({ "jsonrpc": "2.0", "id": 1, "result": null }))
                .unwrap();
        assert!(pending.result.is_none());

        let failed: RpcResponse = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32000, "message": "insufficient funds for gas * price + value" }
        }))
        .unwrap();
        let error = failed.error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.starts_with("insufficient funds"));
    }

    #[tokio::test]
    async fn test_poll_until_returns_value() {
        let attempts = AtomicU32::new(0);

        let value = poll_until(
            "counter",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || async {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                Ok((n >= 2).then_some(n))
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let result: Result<(), _> = poll_until(
            "nothing",
            Duration::from_millis(5),
            Duration::from_millis(1),
            || async { Ok(None) },
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Timeout waiting for nothing"));
    }

    #[tokio::test]
    async fn test_poll_until_retries_after_errors() {
        let attempts = AtomicU32::new(0);

        let value = poll_until(
            "flaky",
            Duration::from_secs(5),
            Duration::from_millis(1),
            || async {
                match attempts.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(anyhow::anyhow!("connection reset")),
                    n => Ok(Some(n)),
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn test_poll_until_timeout_reports_last_error() {
        let result: Result<(), _> = poll_until(
            "failing",
            Duration::from_millis(5),
            Duration::from_millis(1),
            || async { Err(anyhow::anyhow!("boom")) },
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("Timeout waiting for failing"));
        assert!(format!("{:#}", err).contains("boom"));
    }
}
