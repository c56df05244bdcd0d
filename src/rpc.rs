//! Client for the legacy spreadsheet tracker's RPC endpoint.
//!
//! Each call goes to the primary endpoint first and, only if that attempt
//! fails or times out, exactly once to the backup endpoint. The request is
//! `{action, ...payload}` serialised as JSON and sent as the single `data`
//! query parameter; the tracker answers `{success, error?, ...}`.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::config::LegacyRpcConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("legacy tracker endpoint not configured")]
    NotConfigured,
    #[error("network error: {0}")]
    Network(String),
    #[error("timeout")]
    Timeout,
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcResponse {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct LegacyRpcClient {
    http: reqwest::Client,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl LegacyRpcClient {
    /// Blank endpoints are ignored; with neither set every call fails fast
    /// with [`TransportError::NotConfigured`].
    pub fn new(primary: &str, backup: &str, timeout: Duration) -> Self {
        let endpoints = [primary, backup]
            .into_iter()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(String::from)
            .collect();
        Self {
            http: reqwest::Client::new(),
            endpoints,
            timeout,
        }
    }

    pub fn from_config(config: &LegacyRpcConfig) -> Self {
        Self::new(&config.primary_url, &config.backup_url, config.timeout)
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoints.is_empty()
    }

    pub async fn call(&self, action: &str, payload: Value) -> Result<RpcResponse, TransportError> {
        if self.endpoints.is_empty() {
            return Err(TransportError::NotConfigured);
        }

        let body = request_body(action, payload).to_string();
        let mut last_error = TransportError::NotConfigured;
        for (attempt, endpoint) in self.endpoints.iter().enumerate() {
            match self.attempt(endpoint, &body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    log::warn!(
                        "legacy rpc '{}' attempt {} against {} failed: {}",
                        action,
                        attempt + 1,
                        endpoint,
                        e
                    );
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    /// One request whose outcome is delivered through a oneshot channel that
    /// is consumed exactly once: either the response wins or the timeout does.
    /// A response landing after the timeout finds the receiver dropped and is
    /// discarded. The request itself is not cancelled.
    async fn attempt(&self, endpoint: &str, body: &str) -> Result<RpcResponse, TransportError> {
        let (tx, rx) = oneshot::channel();
        let request = self.http.get(endpoint).query(&[("data", body)]).send();

        tokio::spawn(async move {
            let outcome = match request.await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => response
                        .json::<RpcResponse>()
                        .await
                        .map_err(|e| TransportError::InvalidResponse(e.to_string())),
                    Err(e) => Err(TransportError::Network(e.to_string())),
                },
                Err(e) => Err(TransportError::Network(e.to_string())),
            };
            let _ = tx.send(outcome);
        });

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(TransportError::Network(
                "request task ended without a result".to_string(),
            )),
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

/// `{action, ...payload}`. A non-object payload is carried under `data`.
pub fn request_body(action: &str, payload: Value) -> Value {
    let mut body = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map
        }
    };
    body.insert("action".to_string(), Value::String(action.to_string()));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    const FAST: Duration = Duration::from_millis(500);

    #[test]
    fn request_body_flattens_payload_next_to_action() {
        let body = request_body("updateOrderStatus", json!({"orderNumber": "NOV-12345678"}));
        assert_eq!(body["action"], "updateOrderStatus");
        assert_eq!(body["orderNumber"], "NOV-12345678");
    }

    #[test]
    fn request_body_wraps_non_object_payload() {
        let body = request_body("ping", json!([1, 2]));
        assert_eq!(body["action"], "ping");
        assert_eq!(body["data"], json!([1, 2]));

        let body = request_body("ping", Value::Null);
        assert_eq!(body, json!({"action": "ping"}));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_fast() {
        let client = LegacyRpcClient::new("", "  ", FAST);
        assert!(!client.is_configured());

        let err = client.call("createOrder", json!({})).await.unwrap_err();
        assert_eq!(err, TransportError::NotConfigured);
        assert_eq!(err.to_string(), "legacy tracker endpoint not configured");
    }

    #[tokio::test]
    async fn primary_success_skips_backup() {
        let primary = MockServer::start_async().await;
        let backup = MockServer::start_async().await;
        let primary_mock = primary
            .mock_async(|when, then| {
                when.method(GET).path("/exec").query_param_exists("data");
                then.status(200).json_body(json!({"success": true, "row": 7}));
            })
            .await;
        let backup_mock = backup
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let client = LegacyRpcClient::new(&primary.url("/exec"), &backup.url("/exec"), FAST);
        let response = client
            .call("createOrder", json!({"orderNumber": "NOV-12345678"}))
            .await
            .expect("call should succeed");

        assert!(response.success);
        assert_eq!(response.data["row"], 7);
        primary_mock.assert_async().await;
        backup_mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn unsuccessful_reply_is_returned_without_retry() {
        let primary = MockServer::start_async().await;
        let backup = MockServer::start_async().await;
        primary
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(200)
                    .json_body(json!({"success": false, "error": "sheet locked"}));
            })
            .await;
        let backup_mock = backup
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let client = LegacyRpcClient::new(&primary.url("/exec"), &backup.url("/exec"), FAST);
        let response = client.call("createOrder", json!({})).await.expect("delivered");

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("sheet locked"));
        backup_mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn server_error_falls_back_to_backup() {
        let primary = MockServer::start_async().await;
        let backup = MockServer::start_async().await;
        let primary_mock = primary
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(500);
            })
            .await;
        let backup_mock = backup
            .mock_async(|when, then| {
                when.method(GET).path("/exec").query_param_exists("data");
                then.status(200).json_body(json!({"success": true, "via": "backup"}));
            })
            .await;

        let client = LegacyRpcClient::new(&primary.url("/exec"), &backup.url("/exec"), FAST);
        let response = client.call("createOrder", json!({})).await.expect("backup answers");

        assert_eq!(response.data["via"], "backup");
        primary_mock.assert_async().await;
        backup_mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_primary_falls_back_to_backup() {
        let backup = MockServer::start_async().await;
        backup
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(200).json_body(json!({"success": true}));
            })
            .await;

        let client = LegacyRpcClient::new("http://127.0.0.1:1/exec", &backup.url("/exec"), FAST);
        let response = client.call("createOrder", json!({})).await.expect("backup answers");
        assert!(response.success);
    }

    #[tokio::test]
    async fn slow_primary_times_out_and_late_reply_is_ignored() {
        let primary = MockServer::start_async().await;
        let backup = MockServer::start_async().await;
        let primary_mock = primary
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(200)
                    .json_body(json!({"success": true, "via": "primary"}))
                    .delay(Duration::from_millis(400));
            })
            .await;
        backup
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(200).json_body(json!({"success": true, "via": "backup"}));
            })
            .await;

        let client = LegacyRpcClient::new(
            &primary.url("/exec"),
            &backup.url("/exec"),
            Duration::from_millis(100),
        );
        let response = client.call("createOrder", json!({})).await.expect("backup answers");
        assert_eq!(response.data["via"], "backup");

        // Let the primary's late reply arrive; it must not disturb anything.
        tokio::time::sleep(Duration::from_millis(500)).await;
        primary_mock.assert_async().await;
    }

    #[tokio::test]
    async fn both_endpoints_timing_out_reports_timeout() {
        let primary = MockServer::start_async().await;
        let backup = MockServer::start_async().await;
        for server in [&primary, &backup] {
            server
                .mock_async(|when, then| {
                    when.method(GET).path("/exec");
                    then.status(200)
                        .json_body(json!({"success": true}))
                        .delay(Duration::from_millis(400));
                })
                .await;
        }

        let client = LegacyRpcClient::new(
            &primary.url("/exec"),
            &backup.url("/exec"),
            Duration::from_millis(100),
        );
        let err = client.call("createOrder", json!({})).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout);
        assert_eq!(err.to_string(), "timeout");
    }

    #[tokio::test]
    async fn single_endpoint_is_attempted_once() {
        let primary = MockServer::start_async().await;
        let primary_mock = primary
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(503);
            })
            .await;

        let client = LegacyRpcClient::new(&primary.url("/exec"), "", FAST);
        let err = client.call("createOrder", json!({})).await.unwrap_err();

        assert!(matches!(err, TransportError::Network(_)));
        assert!(err.to_string().starts_with("network error"));
        primary_mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn malformed_body_is_an_invalid_response() {
        let primary = MockServer::start_async().await;
        primary
            .mock_async(|when, then| {
                when.method(GET).path("/exec");
                then.status(200).body("<html>login required</html>");
            })
            .await;

        let client = LegacyRpcClient::new(&primary.url("/exec"), "", FAST);
        let err = client.call("createOrder", json!({})).await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidResponse(_)));
    }
}
