use std::fmt;

use docverify_core::models::HouseType;
use docverify_core::{DocumentType, WorkflowError};

use crate::notify::Notifier;
use crate::requirements::{RequiredSlot, RequirementView};
use crate::upload::{SlotKey, UploadSlotTracker};

/// Reason an upload step cannot be left yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Blocker {
    InvalidPrimaryId,
    InvalidSecondaryId,
    MissingIdProofUpload(SlotKey),
    RequirementsUnavailable,
    AddressDocumentNotSelected,
    MissingAddressProofUpload(SlotKey),
    MissingRentedProofUpload(SlotKey),
    /// The schema's rented branch declares no files to upload.
    RentedProofUnavailable,
}

impl Blocker {
    pub fn message(&self) -> &'static str {
        match self {
            Blocker::InvalidPrimaryId => "Please enter a valid Aadhaar number",
            Blocker::InvalidSecondaryId => "Please enter a valid PAN number",
            Blocker::MissingIdProofUpload(_) => "Please upload all required ID proof documents",
            Blocker::RequirementsUnavailable => "Failed to load document requirements",
            Blocker::AddressDocumentNotSelected | Blocker::MissingAddressProofUpload(_) => {
                "Please select and upload address proof document"
            }
            Blocker::MissingRentedProofUpload(_) | Blocker::RentedProofUnavailable => {
                "Please upload both rent agreement and owner's light bill"
            }
        }
    }
}

impl fmt::Display for Blocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Field values and upload slots of the two upload steps.
///
/// Built when step 1 is entered with a freshly fetched schema and dropped when the
/// workflow leaves the upload stages.
#[derive(Debug)]
pub struct UploadContext {
    view: RequirementView,
    tracker: UploadSlotTracker,
    primary_id: String,
    secondary_id: String,
    house_type: HouseType,
    address_document: Option<DocumentType>,
    identity_keys: Vec<SlotKey>,
}

impl UploadContext {
    pub fn new(view: RequirementView, notifier: Notifier) -> Self {
        let mut tracker = UploadSlotTracker::new(notifier);
        let identity_keys = view
            .identity_slots()
            .iter()
            .map(|slot| {
                tracker.activate(&slot.key.collection, &slot.key.document_type, &slot.spec)
            })
            .collect();

        Self {
            view,
            tracker,
            primary_id: String::new(),
            secondary_id: String::new(),
            house_type: HouseType::default(),
            address_document: None,
            identity_keys,
        }
    }

    pub fn view(&self) -> &RequirementView {
        &self.view
    }

    pub fn tracker(&self) -> &UploadSlotTracker {
        &self.tracker
    }

    /// Direct access for presenters running uploads concurrently through
    /// [`UploadSlotTracker::begin_upload`] and [`UploadSlotTracker::apply_upload_result`].
    pub fn tracker_mut(&mut self) -> &mut UploadSlotTracker {
        &mut self.tracker
    }

    pub fn primary_id(&self) -> &str {
        &self.primary_id
    }

    pub fn secondary_id(&self) -> &str {
        &self.secondary_id
    }

    pub fn set_primary_id(&mut self, value: impl Into<String>) {
        self.primary_id = value.into();
    }

    pub fn set_secondary_id(&mut self, value: impl Into<String>) {
        self.secondary_id = value.into();
    }

    pub fn house_type(&self) -> HouseType {
        self.house_type
    }

    pub fn address_document(&self) -> Option<&DocumentType> {
        self.address_document.as_ref()
    }

    pub fn identity_keys(&self) -> &[SlotKey] {
        &self.identity_keys
    }

    /// Slots the selected house-type branch requires.
    pub fn address_slots(&self) -> Vec<RequiredSlot> {
        match self.house_type {
            HouseType::Owned => self
                .address_document
                .as_ref()
                .map(|doc| self.view.address_slots(doc))
                .unwrap_or_default(),
            HouseType::Rented => self.view.rented_slots(),
        }
    }

    pub fn address_keys(&self) -> Vec<SlotKey> {
        self.address_slots().into_iter().map(|s| s.key).collect()
    }

    pub fn step1_blockers(&self) -> Vec<Blocker> {
        let mut blockers = Vec::new();
        if !self.view.primary_rule().validate(&self.primary_id) {
            blockers.push(Blocker::InvalidPrimaryId);
        }
        if !self.view.secondary_rule().validate(&self.secondary_id) {
            blockers.push(Blocker::InvalidSecondaryId);
        }
        blockers.extend(
            self.tracker
                .pending(&self.identity_keys)
                .into_iter()
                .map(Blocker::MissingIdProofUpload),
        );
        blockers
    }

    /// An address proof is always required. A schema that offers no address
    /// document, or only one declaring no files, keeps the step blocked.
    pub fn step2_blockers(&self) -> Vec<Blocker> {
        let keys = self.address_keys();
        match self.house_type {
            HouseType::Owned => {
                if self.address_document.is_none() || keys.is_empty() {
                    return vec![Blocker::AddressDocumentNotSelected];
                }
                self.tracker
                    .pending(&keys)
                    .into_iter()
                    .map(Blocker::MissingAddressProofUpload)
                    .collect()
            }
            HouseType::Rented => {
                if keys.is_empty() {
                    return vec![Blocker::RentedProofUnavailable];
                }
                self.tracker
                    .pending(&keys)
                    .into_iter()
                    .map(Blocker::MissingRentedProofUpload)
                    .collect()
            }
        }
    }

    /// Whether `key` is presented in the given upload step.
    pub fn presents(&self, step_two: bool, key: &SlotKey) -> bool {
        if step_two {
            self.address_keys().contains(key)
        } else {
            self.identity_keys.contains(key)
        }
    }

    pub fn set_house_type(&mut self, house_type: HouseType) -> Result<(), WorkflowError> {
        if house_type == HouseType::Rented && !self.view.offers_rented_branch() {
            return Err(WorkflowError::Validation(
                "Rented house documents are not requested for this case".to_string(),
            ));
        }
        if self.house_type != house_type {
            tracing::debug!(house_type = ?house_type, "House type changed");
            self.house_type = house_type;
            self.rebuild_address_slots();
        }
        Ok(())
    }

    pub fn select_address_document(
        &mut self,
        document_type: DocumentType,
    ) -> Result<(), WorkflowError> {
        if self.view.address_document(&document_type).is_none() {
            return Err(WorkflowError::Validation(format!(
                "Unknown address proof document {}",
                document_type
            )));
        }
        if self.address_document.as_ref() != Some(&document_type) {
            tracing::debug!(document_type = %document_type, "Address proof document changed");
            self.address_document = Some(document_type);
            self.rebuild_address_slots();
        }
        Ok(())
    }

    /// Present the slots of the selected branch, keeping any already active.
    pub(crate) fn activate_address_slots(&mut self) {
        for slot in self.address_slots() {
            self.tracker
                .activate(&slot.key.collection, &slot.key.document_type, &slot.spec);
        }
    }

    /// Destroy every address slot and present the selected branch afresh.
    fn rebuild_address_slots(&mut self) {
        let identity = &self.identity_keys;
        self.tracker.retain(|key| identity.contains(key));
        self.activate_address_slots();
    }
}
