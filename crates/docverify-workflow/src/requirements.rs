//! Requirement schema queries used by the upload steps.
//!
//! Resolves the loosely shaped schema into what each step renders: the two identity
//! code fields, the identity file slots, the address document choice, and the
//! rented-house slots. Any branch the schema omits yields nothing.

use std::collections::HashSet;

use docverify_core::{
    CollectionType, DocumentSpec, DocumentType, FieldRule, FileSlotSpec, RequirementSchema,
};

use crate::upload::SlotKey;

/// One selectable address proof document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressChoice {
    pub document_type: DocumentType,
    pub label: String,
}

/// A file slot a step requires, with the key it is tracked under.
#[derive(Debug, Clone, PartialEq)]
pub struct RequiredSlot {
    pub key: SlotKey,
    pub spec: FileSlotSpec,
}

#[derive(Debug, Clone)]
pub struct RequirementView {
    schema: RequirementSchema,
    primary_doc: DocumentType,
    secondary_doc: DocumentType,
}

impl RequirementView {
    pub fn new(
        schema: RequirementSchema,
        primary_doc: DocumentType,
        secondary_doc: DocumentType,
    ) -> Self {
        Self {
            schema,
            primary_doc,
            secondary_doc,
        }
    }

    pub fn schema(&self) -> &RequirementSchema {
        &self.schema
    }

    pub fn primary_document_type(&self) -> &DocumentType {
        &self.primary_doc
    }

    pub fn secondary_document_type(&self) -> &DocumentType {
        &self.secondary_doc
    }

    pub fn primary_document(&self) -> Option<&DocumentSpec> {
        self.schema
            .find_document(&CollectionType::IdProof, &self.primary_doc)
    }

    pub fn secondary_document(&self) -> Option<&DocumentSpec> {
        self.schema
            .find_document(&CollectionType::IdProof, &self.secondary_doc)
    }

    pub fn primary_rule(&self) -> FieldRule {
        FieldRule::primary_identity(self.primary_document())
    }

    pub fn secondary_rule(&self) -> FieldRule {
        FieldRule::secondary_identity(self.secondary_document())
    }

    /// File slots of both identity documents, primary first.
    pub fn identity_slots(&self) -> Vec<RequiredSlot> {
        collect_slots(
            &CollectionType::IdProof,
            [self.primary_document(), self.secondary_document()]
                .into_iter()
                .flatten(),
        )
    }

    /// The house-type choice is offered only when the rented branch exists.
    pub fn offers_rented_branch(&self) -> bool {
        self.schema
            .find_collection(&CollectionType::RentedAddressProof)
            .is_some()
    }

    pub fn address_documents(&self) -> Vec<AddressChoice> {
        self.schema
            .find_collection(&CollectionType::AddressProof)
            .map(|collection| {
                collection
                    .documents
                    .iter()
                    .map(|doc| AddressChoice {
                        label: doc.document_type.display_label(),
                        document_type: doc.document_type.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn address_document(&self, document_type: &DocumentType) -> Option<&DocumentSpec> {
        self.schema
            .find_document(&CollectionType::AddressProof, document_type)
    }

    /// Slots of the chosen owned-house address document.
    pub fn address_slots(&self, document_type: &DocumentType) -> Vec<RequiredSlot> {
        collect_slots(
            &CollectionType::AddressProof,
            self.address_document(document_type),
        )
    }

    /// Slots of every document in the rented branch, in declaration order.
    pub fn rented_slots(&self) -> Vec<RequiredSlot> {
        match self
            .schema
            .find_collection(&CollectionType::RentedAddressProof)
        {
            Some(collection) => collect_slots(
                &CollectionType::RentedAddressProof,
                collection.documents.iter(),
            ),
            None => Vec::new(),
        }
    }

    /// Documents of the rented branch.
    pub fn rented_documents(&self) -> &[DocumentSpec] {
        self.schema
            .find_collection(&CollectionType::RentedAddressProof)
            .map(|c| c.documents.as_slice())
            .unwrap_or(&[])
    }
}

fn collect_slots<'a>(
    collection: &CollectionType,
    documents: impl IntoIterator<Item = &'a DocumentSpec>,
) -> Vec<RequiredSlot> {
    let mut seen = HashSet::new();
    let mut slots = Vec::new();
    for doc in documents {
        for spec in doc.file_slots() {
            let key = SlotKey::new(
                collection.clone(),
                doc.document_type.clone(),
                spec.file_type.clone(),
            );
            if !seen.insert(key.clone()) {
                tracing::warn!(slot = %key, "Schema declares the same file slot twice, keeping the first");
                continue;
            }
            slots.push(RequiredSlot {
                key,
                spec: spec.clone(),
            });
        }
    }
    slots
}
