use bytes::Bytes;
use std::path::Path;

/// A file the user picked for an upload slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub file_name: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl FileCandidate {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            size_bytes: data.len() as u64,
            content_type: None,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Lowercased extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| e.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(
            FileCandidate::new("scan.JPG", vec![0u8; 4]).extension().as_deref(),
            Some("jpg")
        );
        assert_eq!(
            FileCandidate::new("archive.tar.gz", vec![]).extension().as_deref(),
            Some("gz")
        );
    }

    #[test]
    fn missing_extension() {
        assert!(FileCandidate::new("noextension", vec![]).extension().is_none());
        assert!(FileCandidate::new(".hidden", vec![]).extension().is_none());
    }

    #[test]
    fn size_follows_data() {
        let file = FileCandidate::new("a.png", vec![1u8; 42]);
        assert_eq!(file.size_bytes, 42);
    }
}
