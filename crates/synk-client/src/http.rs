//! Response handling shared by both clients.

use serde::de::DeserializeOwned;
use synk_core::{Result, SynkError};
use tracing::warn;
use url::Url;

/// Join `path` onto `base`, keeping any path prefix `base` already has.
pub(crate) fn join_url(base: &str, path: &str) -> Result<Url> {
    let base = format!("{}/", base.trim_end_matches('/'));
    let base = Url::parse(&base).map_err(|e| SynkError::Config(format!("invalid base URL {base}: {e}")))?;
    base.join(path.trim_start_matches('/'))
        .map_err(|e| SynkError::Config(format!("invalid request path {path}: {e}")))
}

/// Convert a transport-level failure into a `SynkError`
pub(crate) fn transport_error(err: &reqwest::Error, timeout_secs: u64) -> SynkError {
    if err.is_timeout() {
        SynkError::Timeout(timeout_secs)
    } else {
        SynkError::Http(err.to_string())
    }
}

/// Handle a response that returns JSON
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if status.is_success() {
        let body = response
            .text()
            .await
            .map_err(|e| SynkError::Http(e.to_string()))?;
        serde_json::from_str(&body).map_err(SynkError::Json)
    } else {
        handle_error(status.as_u16(), response).await
    }
}

/// Handle a response whose body is ignored
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        Ok(())
    } else {
        handle_error(status.as_u16(), response).await
    }
}

/// Convert an error response to a `SynkError`
async fn handle_error<T>(status: u16, response: reqwest::Response) -> Result<T> {
    let body = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(|e| e.as_str()).map(String::from))
        })
        .unwrap_or(body);

    match status {
        401 | 403 => Err(SynkError::Unauthorized),
        429 => {
            warn!("rate limited by the management API");
            Err(SynkError::Api {
                code: status,
                message,
            })
        }
        _ => Err(SynkError::Api {
            code: status,
            message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_keeps_prefix() {
        let url = join_url("https://api.zerotier.com/api/v1", "/network/abc/member").unwrap();
        assert_eq!(url.as_str(), "https://api.zerotier.com/api/v1/network/abc/member");

        let url = join_url("http://192.168.192.7:3000/", "api/config/node").unwrap();
        assert_eq!(url.as_str(), "http://192.168.192.7:3000/api/config/node");
    }

    #[test]
    fn test_join_url_rejects_garbage() {
        let err = join_url("not a url", "/x").unwrap_err();
        assert!(err.is_fatal());
    }
}
