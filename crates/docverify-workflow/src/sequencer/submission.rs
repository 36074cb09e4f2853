//! Final submission payload.
//!
//! Uploaded files are referenced by their remote ids under the keys the document
//! service expects: `aadharFront`, `aadharBack`, `panCard`, `addressProof`,
//! `rentAgreement`, `ownerLightBill`. Any other slot is keyed by its camel-cased
//! document type, with the file type appended when the document has several files.

use std::collections::BTreeMap;

use docverify_core::models::{AddressProof, DocumentSubmission, HouseType, IdProof};
use docverify_core::{DocumentType, FileType, WorkflowError};

use super::context::UploadContext;
use crate::requirements::RequiredSlot;

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// `SELFIE_IMAGE` -> `SelfieImage`
fn pascal(tag: &str) -> String {
    tag.split('_').map(capitalize).collect()
}

/// `HOME_TAX_RECEIPT` -> `homeTaxReceipt`
fn camel(tag: &str) -> String {
    let mut words = tag.split('_').filter(|w| !w.is_empty());
    match words.next() {
        Some(first) => first.to_lowercase() + &words.map(capitalize).collect::<String>(),
        None => String::new(),
    }
}

fn keyed(base: &str, file_type: &FileType, several_files: bool) -> String {
    if several_files {
        format!("{}{}", base, pascal(file_type.as_str()))
    } else {
        base.to_string()
    }
}

fn files_per_document(slots: &[RequiredSlot], document_type: &DocumentType) -> usize {
    slots
        .iter()
        .filter(|s| &s.key.document_type == document_type)
        .count()
}

fn remote_id(ctx: &UploadContext, slot: &RequiredSlot) -> Result<String, WorkflowError> {
    ctx.tracker()
        .remote_id(&slot.key)
        .map(str::to_string)
        .ok_or_else(|| WorkflowError::Internal(format!("No uploaded file for {}", slot.key)))
}

fn identity_documents(ctx: &UploadContext) -> Result<BTreeMap<String, String>, WorkflowError> {
    let view = ctx.view();
    let slots = view.identity_slots();
    let mut documents = BTreeMap::new();
    for slot in &slots {
        let document_type = &slot.key.document_type;
        let several = files_per_document(&slots, document_type) > 1;
        let key = if document_type == view.primary_document_type() {
            keyed("aadhar", &slot.key.file_type, true)
        } else if document_type == view.secondary_document_type() {
            keyed("panCard", &slot.key.file_type, several)
        } else {
            keyed(&camel(document_type.as_str()), &slot.key.file_type, several)
        };
        documents.insert(key, remote_id(ctx, slot)?);
    }
    Ok(documents)
}

fn address_documents(ctx: &UploadContext) -> Result<BTreeMap<String, String>, WorkflowError> {
    let slots = ctx.address_slots();
    let mut documents = BTreeMap::new();
    let mut owner_bill: Option<&DocumentType> = None;

    for slot in &slots {
        let document_type = &slot.key.document_type;
        let several = files_per_document(&slots, document_type) > 1;
        let base = match ctx.house_type() {
            HouseType::Owned => "addressProof".to_string(),
            HouseType::Rented if document_type.as_str() == DocumentType::RENT_AGREEMENT => {
                "rentAgreement".to_string()
            }
            HouseType::Rented => match owner_bill {
                None => {
                    owner_bill = Some(document_type);
                    "ownerLightBill".to_string()
                }
                Some(bill) if bill == document_type => "ownerLightBill".to_string(),
                Some(_) => camel(document_type.as_str()),
            },
        };
        documents.insert(
            keyed(&base, &slot.key.file_type, several),
            remote_id(ctx, slot)?,
        );
    }
    Ok(documents)
}

/// Build the payload for `POST /documents/submit`. Fails only if a required slot has
/// no remote id, which the step-2 checks rule out.
pub(crate) fn build_submission(
    request_id: &str,
    ctx: &UploadContext,
) -> Result<DocumentSubmission, WorkflowError> {
    let view = ctx.view();
    Ok(DocumentSubmission {
        request_id: request_id.to_string(),
        id_proof: IdProof {
            aadhar_number: view.primary_rule().normalize(ctx.primary_id()),
            pan_number: view.secondary_rule().normalize(ctx.secondary_id()),
            documents: identity_documents(ctx)?,
        },
        address_proof: AddressProof {
            house_type: ctx.house_type(),
            address_doc_type: match ctx.house_type() {
                HouseType::Owned => ctx.address_document().cloned(),
                HouseType::Rented => None,
            },
            documents: address_documents(ctx)?,
        },
    })
}
