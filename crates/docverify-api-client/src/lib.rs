//! HTTP client for the verification and document service.
//!
//! Provides a minimal client with JSON and multipart helpers, and an implementation of
//! [`docverify_core::VerificationService`] over the service's REST contract (see `api`).
//! The CLI uses this client directly; the workflow only sees the trait.

pub mod api;

use anyhow::{Context, Result};
use docverify_core::{ServiceError, WorkflowConfig};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Error body shape used by the service: `{ "error": ..., "errorDetails": ... }`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_details: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

/// Best message from a failed response body: `error`, `errorDetails`, `message`, then raw text.
pub fn error_message(body: &str) -> String {
    if let Some(parsed) = ErrorBody::parse(body) {
        if let Some(msg) = parsed
            .error
            .or(parsed.error_details)
            .or(parsed.message)
            .filter(|m| !m.trim().is_empty())
        {
            return msg;
        }
    }
    body.trim().to_string()
}

/// HTTP client for the verification service.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.http_timeout)
    }

    /// Create client from environment (see [`WorkflowConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        let config = WorkflowConfig::from_env()?;
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a request; transport failures become [`ServiceError::Transport`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, ServiceError> {
        request
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))
    }

    /// Turn a non-success response into [`ServiceError::Rejected`].
    async fn rejection(response: Response) -> ServiceError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        ServiceError::Rejected {
            status,
            message: error_message(&body),
        }
    }

    /// Send and deserialize a JSON success body.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(format!("Failed to parse response as JSON: {}", e)))
    }

    /// Send and ignore the success body.
    async fn execute(&self, request: RequestBuilder) -> Result<(), ServiceError> {
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error": "Invalid OTP", "errorDetails": "x"}"#),
            "Invalid OTP"
        );
        assert_eq!(
            error_message(r#"{"errorDetails": "Link is invalid or expired"}"#),
            "Link is invalid or expired"
        );
    }

    #[test]
    fn error_message_falls_back_to_text() {
        assert_eq!(error_message("  File rejected \n"), "File rejected");
        assert_eq!(error_message(r#"{"error": ""}"#), r#"{"error": ""}"#);
    }

    #[test]
    fn base_url_is_trimmed() {
        let client =
            ApiClient::new("http://localhost:3000/api/".to_string(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000/api");
        assert_eq!(client.build_url("/upload"), "http://localhost:3000/api/upload");
    }
}
