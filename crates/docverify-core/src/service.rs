//! Verification service abstraction
//!
//! The verification/document service issues and checks OTPs, declares the document
//! requirements of a case, and stores uploaded files. The workflow only consumes its
//! contract; implementations live in `docverify-api-client` (HTTP) and in test helpers.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::models::{
    ConsentRequest, CustomerLink, DocumentSubmission, DocumentType, FileCandidate, FileType,
    OtpVerification, RequirementSchema,
};

/// Result type for service calls
pub type ServiceResult<T> = Result<T, ServiceError>;

#[async_trait]
pub trait VerificationService: Send + Sync {
    /// `GET /customer?request={link_id}`
    ///
    /// Returns [`ServiceError::LinkExpired`] when the service reports the link as invalid
    /// or expired.
    async fn resolve_customer(&self, link_id: &str) -> ServiceResult<CustomerLink>;

    /// `POST /verification/send`
    async fn send_otp(&self, request_id: &str) -> ServiceResult<()>;

    /// `POST /verification/resend`
    async fn resend_otp(&self, request_id: &str) -> ServiceResult<()>;

    /// `POST /verification/verify`
    async fn verify_otp(&self, request_id: &str, otp: &str) -> ServiceResult<OtpVerification>;

    /// `POST /consent` with `Authorization: Bearer {token}`
    async fn submit_consent(
        &self,
        request_id: &str,
        token: &str,
        consent: &ConsentRequest,
    ) -> ServiceResult<()>;

    /// `GET /upload`
    async fn fetch_requirements(&self, request_id: &str) -> ServiceResult<RequirementSchema>;

    /// `POST /file-upload` (multipart). Returns the remote file identifier.
    async fn upload_file(
        &self,
        request_id: &str,
        document_type: &DocumentType,
        file_type: &FileType,
        file: &FileCandidate,
    ) -> ServiceResult<String>;

    /// `POST /documents/submit`
    async fn submit_documents(
        &self,
        request_id: &str,
        submission: &DocumentSubmission,
    ) -> ServiceResult<()>;
}
