//! Thin HTTP wrapper around the stock-analyzer backend.
//!
//! One entry point, [`ApiClient::call`], normalizes all success and
//! error handling: a JSON content-type header by default, non-2xx
//! statuses mapped to [`ClientError::Http`] with the body text
//! preserved, and a content-type branch that parses JSON bodies and
//! passes everything else through as raw text. No retries; failures
//! propagate to the caller for display.

use crate::error::ClientError;
use reqwest::{Method, header};
use std::time::Duration;
use tracing::{debug, warn};

/// Default backend address, overridable via `ANALYZER_API_URL`.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// A successfully resolved response body.
#[derive(Debug, Clone)]
pub enum ApiBody {
    /// The response declared `application/json` and parsed.
    Json(serde_json::Value),
    /// Any other content type, returned verbatim.
    Text(String),
}

impl ApiBody {
    /// Unwrap a JSON body, or fail with [`ClientError::Decode`].
    pub fn into_json(self) -> Result<serde_json::Value, ClientError> {
        match self {
            ApiBody::Json(value) => Ok(value),
            ApiBody::Text(text) => Err(ClientError::Decode(format!(
                "expected JSON response, got text: {}",
                truncate(&text, 120)
            ))),
        }
    }

    /// Unwrap a text body; JSON bodies are re-serialized.
    pub fn into_text(self) -> String {
        match self {
            ApiBody::Text(text) => text,
            ApiBody::Json(value) => value.to_string(),
        }
    }
}

/// Per-call overrides for [`ApiClient::call`].
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// HTTP method; GET when unset.
    pub method: Option<Method>,
    /// JSON request body.
    pub body: Option<serde_json::Value>,
}

impl CallOptions {
    pub fn post() -> Self {
        Self {
            method: Some(Method::POST),
            body: None,
        }
    }

    pub fn post_json(body: serde_json::Value) -> Self {
        Self {
            method: Some(Method::POST),
            body: Some(body),
        }
    }
}

/// HTTP client bound to one backend base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self { http, base_url }
    }

    /// Create a client from `ANALYZER_API_URL`, falling back to
    /// `http://127.0.0.1:8080`.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ANALYZER_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Issue a GET request against `endpoint` (path + query).
    pub async fn call(&self, endpoint: &str) -> Result<ApiBody, ClientError> {
        self.call_with(endpoint, CallOptions::default()).await
    }

    /// Issue a request with method/body overrides.
    pub async fn call_with(
        &self,
        endpoint: &str,
        options: CallOptions,
    ) -> Result<ApiBody, ClientError> {
        let method = options.method.unwrap_or(Method::GET);
        let url = self.url_for(endpoint);
        debug!(%method, %url, "issuing API request");

        let mut request = self
            .http
            .request(method, &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = options.body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %url, "API request failed");
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));

        if is_json {
            Ok(ApiBody::Json(response.json().await?))
        } else {
            Ok(ApiBody::Text(response.text().await?))
        }
    }

    /// Fetch an endpoint as an opaque blob (CSV, ZIP) for saving.
    pub async fn fetch_bytes(&self, endpoint: &str) -> Result<Vec<u8>, ClientError> {
        let url = self.url_for(endpoint);
        debug!(%url, "fetching download blob");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.url_for("/actuator/health"),
            "http://localhost:8080/actuator/health"
        );
    }

    #[test]
    fn test_api_body_into_json_rejects_text() {
        let body = ApiBody::Text("Live data fetched successfully".to_string());
        assert!(matches!(body.into_json(), Err(ClientError::Decode(_))));
    }

    #[test]
    fn test_api_body_into_text_passes_both_kinds() {
        let text = ApiBody::Text("ok".to_string());
        assert_eq!(text.into_text(), "ok");

        let json = ApiBody::Json(serde_json::json!({"success": true}));
        assert_eq!(json.into_text(), r#"{"success":true}"#);
    }
}
