//! DocVerify Core Library
//!
//! This crate provides the domain models, error types, configuration, and validation
//! shared across all DocVerify components. It performs no I/O: the verification
//! service is reached through the [`VerificationService`] trait.

pub mod config;
pub mod error;
pub mod models;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use config::WorkflowConfig;
pub use error::{ErrorMetadata, LogLevel, ServiceError, WorkflowError};
pub use models::{
    Collection, CollectionType, CustomerLink, DocumentSpec, DocumentType, FileCandidate,
    FileSlotSpec, FileType, RequirementSchema,
};
pub use service::VerificationService;
pub use validation::{FieldRule, Normalization, SlotValidator, UploadValidationError};
