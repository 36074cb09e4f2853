//! Document requirement schema.
//!
//! The verification service declares, per case, which documents, identity codes and
//! file uploads it needs. The payload is loosely shaped: collections, documents and
//! fields may be missing or `null`. Parsing never fails on missing optional parts and
//! every lookup returns `Option` so an unknown or absent branch simply renders nothing.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Collection tag (`collectionType`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CollectionType {
    IdProof,
    AddressProof,
    RentedAddressProof,
    Other(String),
}

impl CollectionType {
    pub fn as_str(&self) -> &str {
        match self {
            CollectionType::IdProof => "ID_PROOF",
            CollectionType::AddressProof => "ADDRESS_PROOF",
            CollectionType::RentedAddressProof => "RENTED_ADDRESS_PROOF",
            CollectionType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CollectionType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "ID_PROOF" => CollectionType::IdProof,
            "ADDRESS_PROOF" => CollectionType::AddressProof,
            "RENTED_ADDRESS_PROOF" => CollectionType::RentedAddressProof,
            _ => CollectionType::Other(tag),
        }
    }
}

impl From<CollectionType> for String {
    fn from(tag: CollectionType) -> Self {
        tag.as_str().to_string()
    }
}

/// File position within a document (`fileType`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    Front,
    Back,
    Document,
    Other(String),
}

impl FileType {
    pub fn as_str(&self) -> &str {
        match self {
            FileType::Front => "FRONT",
            FileType::Back => "BACK",
            FileType::Document => "DOCUMENT",
            FileType::Other(tag) => tag,
        }
    }
}

impl From<String> for FileType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "FRONT" => FileType::Front,
            "BACK" => FileType::Back,
            "DOCUMENT" => FileType::Document,
            _ => FileType::Other(tag),
        }
    }
}

impl From<FileType> for String {
    fn from(tag: FileType) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document tag (`documentType`), e.g. `AADHAR_CARD` or `LIGHT_BILL`.
///
/// The set is open: address documents vary per case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentType(String);

impl DocumentType {
    pub const RENT_AGREEMENT: &'static str = "RENT_AGREEMENT";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human label: `LIGHT_BILL` -> `Light Bill`.
    pub fn display_label(&self) -> String {
        self.0
            .split('_')
            .filter(|word| !word.is_empty())
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// One required file of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSlotSpec {
    pub file_type: FileType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allowed_file_types: Vec<String>,
    /// Absent means the service imposes no size limit.
    #[serde(rename = "maxFileSizeMB", default)]
    pub max_file_size_mb: Option<f64>,
}

impl FileSlotSpec {
    /// Hint shown under the upload control.
    pub fn size_hint(&self) -> Option<String> {
        self.max_file_size_mb
            .map(|mb| format!("(max file size {} MB)", mb))
    }
}

/// One acceptable document within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSpec {
    pub document_type: DocumentType,
    #[serde(default, deserialize_with = "non_empty")]
    pub code_label: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub code_hint: Option<String>,
    /// Pattern for the document's identity code. Empty strings count as absent.
    #[serde(default, deserialize_with = "non_empty")]
    pub regex: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub required_files: Vec<FileSlotSpec>,
}

impl DocumentSpec {
    /// Required file slots, in declaration order.
    pub fn file_slots(&self) -> &[FileSlotSpec] {
        &self.required_files
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub collection_type: CollectionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<DocumentSpec>,
}

impl Collection {
    pub fn find_document(&self, document_type: &DocumentType) -> Option<&DocumentSpec> {
        self.documents
            .iter()
            .find(|d| &d.document_type == document_type)
    }
}

/// Requirement schema for one case, as returned by `GET /upload`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequirementSchema {
    #[serde(default, deserialize_with = "null_as_default")]
    pub collections: Vec<Collection>,
}

impl RequirementSchema {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// First collection with the given tag.
    pub fn find_collection(&self, collection_type: &CollectionType) -> Option<&Collection> {
        self.collections
            .iter()
            .find(|c| &c.collection_type == collection_type)
    }

    /// Document lookup across a collection that may itself be absent.
    pub fn find_document(
        &self,
        collection_type: &CollectionType,
        document_type: &DocumentType,
    ) -> Option<&DocumentSpec> {
        self.find_collection(collection_type)
            .and_then(|c| c.find_document(document_type))
    }
}
