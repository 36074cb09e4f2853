use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::schema::DocumentType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HouseType {
    #[default]
    Owned,
    Rented,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdProof {
    pub aadhar_number: String,
    pub pan_number: String,
    /// Submission key -> remote file identifier
    pub documents: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressProof {
    pub house_type: HouseType,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub address_doc_type: Option<DocumentType>,
    pub documents: BTreeMap<String, String>,
}

/// Body of `POST /documents/submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSubmission {
    pub request_id: String,
    pub id_proof: IdProof,
    pub address_proof: AddressProof,
}
