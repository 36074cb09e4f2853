//! Identity code validation.
//!
//! A code is checked against the pattern the requirement schema supplies for its
//! document, or against a built-in pattern when the schema has none or supplies one
//! that does not compile.

use regex::Regex;

use crate::models::DocumentSpec;

/// Built-in pattern for the primary identity number (Aadhaar).
pub const PRIMARY_ID_FALLBACK_PATTERN: &str = r"^[2-9]{1}[0-9]{3}\s?[0-9]{4}\s?[0-9]{4}$";

/// Built-in pattern for the secondary identity number (PAN).
pub const SECONDARY_ID_FALLBACK_PATTERN: &str = r"^[A-Z]{5}[0-9]{4}[A-Z]{1}$";

/// Text normalization applied before matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Trim,
    /// For alphanumeric codes entered in mixed case.
    TrimUppercase,
}

impl Normalization {
    pub fn apply(&self, value: &str) -> String {
        match self {
            Normalization::Trim => value.trim().to_string(),
            Normalization::TrimUppercase => value.trim().to_uppercase(),
        }
    }
}

/// Check `value` against `governing`, falling back to `fallback` when `governing` is
/// absent or malformed. Empty values never match.
pub fn validate_field(
    value: &str,
    governing: Option<&str>,
    fallback: &str,
    normalization: Normalization,
) -> bool {
    let normalized = normalization.apply(value);
    if normalized.is_empty() {
        return false;
    }

    let compiled = governing
        .filter(|p| !p.trim().is_empty())
        .and_then(|pattern| match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::debug!(pattern = %pattern, error = %e, "Schema pattern does not compile, using built-in pattern");
                None
            }
        });

    let regex = match compiled {
        Some(re) => re,
        None => match Regex::new(fallback) {
            Ok(re) => re,
            Err(e) => {
                tracing::error!(pattern = %fallback, error = %e, "Built-in pattern does not compile");
                return false;
            }
        },
    };

    regex.is_match(&normalized)
}

/// Presentation and validation rule for one identity code field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub label: String,
    pub hint: String,
    pub pattern: Option<String>,
    pub fallback_pattern: &'static str,
    pub normalization: Normalization,
}

impl FieldRule {
    /// Rule for the primary identity number, shaped by its document definition when present.
    pub fn primary_identity(document: Option<&DocumentSpec>) -> Self {
        Self::from_document(
            document,
            "Enter Aadhaar Number",
            "Aadhaar Number",
            PRIMARY_ID_FALLBACK_PATTERN,
            Normalization::Trim,
        )
    }

    /// Rule for the secondary identity number.
    pub fn secondary_identity(document: Option<&DocumentSpec>) -> Self {
        Self::from_document(
            document,
            "Enter PAN Number",
            "PAN Number",
            SECONDARY_ID_FALLBACK_PATTERN,
            Normalization::TrimUppercase,
        )
    }

    fn from_document(
        document: Option<&DocumentSpec>,
        default_label: &str,
        default_hint: &str,
        fallback_pattern: &'static str,
        normalization: Normalization,
    ) -> Self {
        Self {
            label: document
                .and_then(|d| d.code_label.clone())
                .unwrap_or_else(|| default_label.to_string()),
            hint: document
                .and_then(|d| d.code_hint.clone())
                .unwrap_or_else(|| default_hint.to_string()),
            pattern: document.and_then(|d| d.regex.clone()),
            fallback_pattern,
            normalization,
        }
    }

    pub fn validate(&self, value: &str) -> bool {
        validate_field(
            value,
            self.pattern.as_deref(),
            self.fallback_pattern,
            self.normalization,
        )
    }

    pub fn normalize(&self, value: &str) -> String {
        self.normalization.apply(value)
    }
}
