use crate::models::{FileCandidate, FileSlotSpec};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Local checks a file must pass before it is uploaded into a slot
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadValidationError {
    #[error("Invalid file type: {extension} (allowed: {allowed:?})")]
    InvalidFileType {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {filename} (allowed: {allowed:?})")]
    InvalidFilename {
        filename: String,
        allowed: Vec<String>,
    },

    #[error("File too large: {size} bytes (max: {max_mb} MB)")]
    FileTooLarge { size: u64, max_mb: f64 },
}

impl UploadValidationError {
    /// Notification text shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            UploadValidationError::InvalidFileType { allowed, .. }
            | UploadValidationError::InvalidFilename { allowed, .. } => {
                format!("Invalid file type. Allowed: {}", allowed.join(", "))
            }
            UploadValidationError::FileTooLarge { max_mb, .. } => {
                format!("File too large. Max {}MB allowed.", max_mb)
            }
        }
    }
}

/// Slot file validator
///
/// Checks a candidate against the extension set and size limit a [`FileSlotSpec`]
/// declares. Content is never inspected.
#[derive(Debug, Clone)]
pub struct SlotValidator {
    allowed_extensions: Vec<String>,
    max_file_size_mb: Option<f64>,
}

impl SlotValidator {
    pub fn new(allowed_extensions: Vec<String>, max_file_size_mb: Option<f64>) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            max_file_size_mb,
        }
    }

    pub fn for_slot(spec: &FileSlotSpec) -> Self {
        Self::new(spec.allowed_file_types.clone(), spec.max_file_size_mb)
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Validate file extension (case-insensitive)
    pub fn validate_extension(&self, file: &FileCandidate) -> Result<(), UploadValidationError> {
        let extension =
            file.extension()
                .ok_or_else(|| UploadValidationError::InvalidFilename {
                    filename: file.file_name.clone(),
                    allowed: self.allowed_extensions.clone(),
                })?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(UploadValidationError::InvalidFileType {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    /// Validate file size against `maxFileSizeMB × 1024 × 1024` bytes
    pub fn validate_file_size(&self, size: u64) -> Result<(), UploadValidationError> {
        if let Some(max_mb) = self.max_file_size_mb {
            if size as f64 > max_mb * BYTES_PER_MB {
                return Err(UploadValidationError::FileTooLarge { size, max_mb });
            }
        }
        Ok(())
    }

    /// Extension first, then size.
    pub fn validate_all(&self, file: &FileCandidate) -> Result<(), UploadValidationError> {
        self.validate_extension(file)?;
        self.validate_file_size(file.size_bytes)?;
        Ok(())
    }
}
