//! Validation modules

pub mod field;
pub mod file;

pub use field::{
    validate_field, FieldRule, Normalization, PRIMARY_ID_FALLBACK_PATTERN,
    SECONDARY_ID_FALLBACK_PATTERN,
};
pub use file::{SlotValidator, UploadValidationError};
