//! Shared HTTP plumbing for calls routed through the API gateway.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};

use crate::error::{ErrorPayload, ServiceError};

/// HTTP client bound to the API gateway base URL.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
}

impl GatewayClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Transport {
                operation: "build gateway client",
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }
}

/// Sends a request and turns any non-2xx answer into [`ServiceError::Status`].
pub(crate) async fn send(
    operation: &'static str,
    request: RequestBuilder,
) -> Result<Response, ServiceError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            ServiceError::Timeout { operation }
        } else {
            ServiceError::Transport {
                operation,
                reason: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let payload = error_payload(response).await;
    Err(ServiceError::Status {
        operation,
        status: status.as_u16(),
        payload,
    })
}

/// Decodes a success body as JSON. An empty body decodes to `null`.
pub(crate) async fn json_body(
    operation: &'static str,
    response: Response,
) -> Result<serde_json::Value, ServiceError> {
    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            ServiceError::Timeout { operation }
        } else {
            ServiceError::Transport {
                operation,
                reason: e.to_string(),
            }
        }
    })?;

    if bytes.is_empty() {
        return Ok(serde_json::Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| ServiceError::MalformedResponse {
        operation,
        reason: e.to_string(),
    })
}

async fn error_payload(response: Response) -> ErrorPayload {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let text = response.text().await.unwrap_or_default();
    if is_json
        && let Ok(value) = serde_json::from_str(&text)
    {
        return ErrorPayload::Structured(value);
    }
    ErrorPayload::Text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = GatewayClient::new("http://gateway:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://gateway:8080");
        assert_eq!(
            client.url("/payments-api/payments"),
            "http://gateway:8080/payments-api/payments"
        );
        assert_eq!(
            client.url("store-manager-api/stocks"),
            "http://gateway:8080/store-manager-api/stocks"
        );
    }
}
