//! [`VerificationService`] over the service's REST contract.
//!
//! Header names (`requestId`, `documentType`, `fileType`) follow the service; HTTP
//! header names are case-insensitive so reqwest's lowercasing is harmless.

use async_trait::async_trait;
use docverify_core::models::{
    ConsentRequest, CustomerLink, DocumentSubmission, DocumentType, FileCandidate, FileType,
    OtpVerification, RequirementSchema,
};
use docverify_core::service::ServiceResult;
use docverify_core::{ServiceError, VerificationService};
use serde::{Deserialize, Serialize};

use crate::{error_message, ApiClient, ErrorBody};

const EXPIRED_MARKER: &str = "link is invalid or expired";

/// `GET /customer` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerLookup {
    #[serde(default)]
    mobile_number: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

/// `POST /file-upload` response: the remote file identifier is carried in `requestId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadReceipt {
    #[serde(default)]
    request_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestIdBody<'a> {
    request_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyBody<'a> {
    request_id: &'a str,
    otp: &'a str,
}

fn is_expired_body(body: &str) -> bool {
    ErrorBody::parse(body)
        .map(|parsed| {
            [parsed.error_details, parsed.error]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(EXPIRED_MARKER))
        })
        .unwrap_or(false)
}

#[async_trait]
impl VerificationService for ApiClient {
    async fn resolve_customer(&self, link_id: &str) -> ServiceResult<CustomerLink> {
        let request = self
            .client()
            .get(self.build_url("/customer"))
            .query(&[("request", link_id)]);
        let response = self.send(request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if is_expired_body(&body) {
                tracing::info!(link_id = %link_id, "Case link reported as invalid or expired");
                return Err(ServiceError::LinkExpired);
            }
            return Err(ServiceError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let lookup: CustomerLookup = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("Failed to parse customer: {}", e)))?;

        let mobile_number = lookup
            .mobile_number
            .filter(|m| !m.trim().is_empty())
            .ok_or_else(|| ServiceError::Decode("Customer response has no mobileNumber".to_string()))?;

        Ok(CustomerLink {
            request_id: lookup
                .request_id
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| link_id.to_string()),
            mobile_number,
        })
    }

    async fn send_otp(&self, request_id: &str) -> ServiceResult<()> {
        let request = self
            .client()
            .post(self.build_url("/verification/send"))
            .json(&RequestIdBody { request_id });
        self.execute(request).await
    }

    async fn resend_otp(&self, request_id: &str) -> ServiceResult<()> {
        let request = self
            .client()
            .post(self.build_url("/verification/resend"))
            .json(&RequestIdBody { request_id });
        self.execute(request).await
    }

    async fn verify_otp(&self, request_id: &str, otp: &str) -> ServiceResult<OtpVerification> {
        let request = self
            .client()
            .post(self.build_url("/verification/verify"))
            .json(&VerifyBody { request_id, otp });
        self.execute_json(request).await
    }

    async fn submit_consent(
        &self,
        request_id: &str,
        token: &str,
        consent: &ConsentRequest,
    ) -> ServiceResult<()> {
        let request = self
            .client()
            .post(self.build_url("/consent"))
            .header("Authorization", format!("Bearer {}", token))
            .header("requestId", request_id)
            .json(consent);
        self.execute(request).await
    }

    async fn fetch_requirements(&self, request_id: &str) -> ServiceResult<RequirementSchema> {
        let request = self
            .client()
            .get(self.build_url("/upload"))
            .header("requestId", request_id);
        self.execute_json(request).await
    }

    async fn upload_file(
        &self,
        request_id: &str,
        document_type: &DocumentType,
        file_type: &FileType,
        file: &FileCandidate,
    ) -> ServiceResult<String> {
        let mut part = reqwest::multipart::Part::bytes(file.data.to_vec())
            .file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                ServiceError::Transport(format!("Invalid content type {}: {}", content_type, e))
            })?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self
            .client()
            .post(self.build_url("/file-upload"))
            .header("requestId", request_id)
            .header("documentType", document_type.as_str())
            .header("fileType", file_type.as_str())
            .multipart(form);

        let receipt: UploadReceipt = self.execute_json(request).await?;
        receipt
            .request_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ServiceError::Decode("Upload response has no file identifier".to_string()))
    }

    async fn submit_documents(
        &self,
        request_id: &str,
        submission: &DocumentSubmission,
    ) -> ServiceResult<()> {
        let request = self
            .client()
            .post(self.build_url("/documents/submit"))
            .header("requestId", request_id)
            .json(submission);
        self.execute(request).await
    }
}
