//! Configuration module
//!
//! Settings for the verification service endpoint and the workflow's timers and
//! document conventions. Values come from the environment (with `.env` support);
//! [`WorkflowConfig::default`] carries the same defaults for tests and embedding.

use std::env;
use std::time::Duration;

use crate::models::DocumentType;

// Common constants
const API_URL: &str = "http://localhost:3000/api";
const HTTP_TIMEOUT_SECS: u64 = 60;
const RESEND_COOLDOWN_SECS: u64 = 30;
const COMPLETION_DWELL_SECS: u64 = 15;
const PRIMARY_ID_DOCUMENT: &str = "AADHAR_CARD";
const SECONDARY_ID_DOCUMENT: &str = "PAN_CARD";

/// Workflow configuration
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub api_base_url: String,
    pub http_timeout: Duration,
    /// Countdown before an OTP resend is offered again
    pub resend_cooldown: Duration,
    /// Dwell on the completion screen before returning to the case landing
    pub completion_dwell: Duration,
    /// Document whose code is the primary identity number (Aadhaar)
    pub primary_id_document: DocumentType,
    /// Document whose code is the secondary identity number (PAN)
    pub secondary_id_document: DocumentType,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            api_base_url: API_URL.to_string(),
            http_timeout: Duration::from_secs(HTTP_TIMEOUT_SECS),
            resend_cooldown: Duration::from_secs(RESEND_COOLDOWN_SECS),
            completion_dwell: Duration::from_secs(COMPLETION_DWELL_SECS),
            primary_id_document: DocumentType::new(PRIMARY_ID_DOCUMENT),
            secondary_id_document: DocumentType::new(SECONDARY_ID_DOCUMENT),
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("DOCVERIFY_API_URL")
            .or_else(|_| env::var("API_URL"))
            .unwrap_or_else(|_| API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let config = WorkflowConfig {
            api_base_url,
            http_timeout: Duration::from_secs(
                env::var("DOCVERIFY_HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("DOCVERIFY_HTTP_TIMEOUT_SECS must be a number"))?,
            ),
            resend_cooldown: Duration::from_secs(
                env::var("DOCVERIFY_RESEND_COOLDOWN_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(RESEND_COOLDOWN_SECS),
            ),
            completion_dwell: Duration::from_secs(
                env::var("DOCVERIFY_COMPLETION_DWELL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(COMPLETION_DWELL_SECS),
            ),
            primary_id_document: DocumentType::new(
                env::var("DOCVERIFY_PRIMARY_ID_DOCUMENT")
                    .unwrap_or_else(|_| PRIMARY_ID_DOCUMENT.to_string()),
            ),
            secondary_id_document: DocumentType::new(
                env::var("DOCVERIFY_SECONDARY_ID_DOCUMENT")
                    .unwrap_or_else(|_| SECONDARY_ID_DOCUMENT.to_string()),
            ),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "DOCVERIFY_API_URL must be an http(s) URL, got '{}'",
                self.api_base_url
            ));
        }

        if self.http_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "DOCVERIFY_HTTP_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.primary_id_document == self.secondary_id_document {
            return Err(anyhow::anyhow!(
                "Primary and secondary identity documents must differ"
            ));
        }

        Ok(())
    }
}
