//! Error types module
//!
//! Two layers of errors live here. [`ServiceError`] is what the verification service
//! boundary returns; [`WorkflowError`] is the taxonomy the workflow surfaces to a
//! presenter. Workflow errors self-describe through [`ErrorMetadata`] so callers can
//! decide how to render and log them without matching on every variant.

use std::fmt;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues and best-effort failures
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error presentation - defines how an error should be surfaced
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "LINK_EXPIRED")
    fn error_code(&self) -> &'static str;

    /// Whether the user can correct or retry and carry on in the same stage
    fn is_recoverable(&self) -> bool;

    /// Whether the error keeps the workflow in its current stage
    fn blocks_transition(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Calls made against the verification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceOperation {
    ResolveLink,
    SendOtp,
    ResendOtp,
    VerifyOtp,
    SubmitConsent,
    FetchRequirements,
    UploadFile,
    SubmitDocuments,
}

impl ServiceOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceOperation::ResolveLink => "resolve_link",
            ServiceOperation::SendOtp => "send_otp",
            ServiceOperation::ResendOtp => "resend_otp",
            ServiceOperation::VerifyOtp => "verify_otp",
            ServiceOperation::SubmitConsent => "submit_consent",
            ServiceOperation::FetchRequirements => "fetch_requirements",
            ServiceOperation::UploadFile => "upload_file",
            ServiceOperation::SubmitDocuments => "submit_documents",
        }
    }

    /// Failures of these calls are logged and notified but the workflow advances.
    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            ServiceOperation::SubmitConsent | ServiceOperation::SubmitDocuments
        )
    }
}

impl fmt::Display for ServiceOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by a [`crate::VerificationService`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The case link is invalid or has expired; only the dealer can issue a new one.
    #[error("Link is invalid or expired")]
    LinkExpired,

    /// The service answered with a non-success status.
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response (connection, timeout, ...).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be understood.
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Server-supplied message when there is one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ServiceError::Rejected { message, .. } if !message.trim().is_empty() => {
                Some(message.as_str())
            }
            _ => None,
        }
    }
}

/// Workflow error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Link is invalid or expired")]
    LinkInvalidOrExpired,

    #[error("Link resolution failed: {0}")]
    LinkResolutionFailed(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{operation} failed: {source}")]
    Transport {
        operation: ServiceOperation,
        #[source]
        source: ServiceError,
    },

    #[error("Action {action} is not accepted in stage {stage}")]
    ActionNotAllowed { stage: String, action: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub fn transport(operation: ServiceOperation, source: ServiceError) -> Self {
        WorkflowError::Transport { operation, source }
    }
}

impl ErrorMetadata for WorkflowError {
    fn error_code(&self) -> &'static str {
        match self {
            WorkflowError::LinkInvalidOrExpired => "LINK_EXPIRED",
            WorkflowError::LinkResolutionFailed(_) => "LINK_RESOLUTION_FAILED",
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::Transport { .. } => "TRANSPORT_FAILURE",
            WorkflowError::ActionNotAllowed { .. } => "ACTION_NOT_ALLOWED",
            WorkflowError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            WorkflowError::LinkInvalidOrExpired | WorkflowError::LinkResolutionFailed(_) => false,
            WorkflowError::Validation(_) | WorkflowError::Transport { .. } => true,
            WorkflowError::ActionNotAllowed { .. } => true,
            WorkflowError::Internal(_) => false,
        }
    }

    fn blocks_transition(&self) -> bool {
        match self {
            WorkflowError::Transport { operation, .. } => !operation.is_best_effort(),
            _ => true,
        }
    }

    fn client_message(&self) -> String {
        match self {
            WorkflowError::LinkInvalidOrExpired => {
                "Link is invalid or expired, Contact your dealer.".to_string()
            }
            WorkflowError::LinkResolutionFailed(_) => {
                "Something went wrong. Kindly check the SMS or link again.".to_string()
            }
            WorkflowError::Validation(msg) => msg.clone(),
            WorkflowError::Transport { source, .. } => source
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| "Something went wrong. Please try again.".to_string()),
            WorkflowError::ActionNotAllowed { .. } => "This step is not available".to_string(),
            WorkflowError::Internal(_) => "Internal error".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            WorkflowError::Validation(_) | WorkflowError::ActionNotAllowed { .. } => LogLevel::Debug,
            WorkflowError::LinkInvalidOrExpired => LogLevel::Debug,
            WorkflowError::LinkResolutionFailed(_) | WorkflowError::Transport { .. } => {
                LogLevel::Warn
            }
            WorkflowError::Internal(_) => LogLevel::Error,
        }
    }
}
