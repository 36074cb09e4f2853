//! Upload slot tracker.
//!
//! One slot per required file (collection x document type x file type) that is
//! currently presented. A selection is validated locally, uploaded, and its outcome
//! recorded against the slot. Every selection and removal bumps the slot's generation;
//! an upload result is applied only if it still carries the slot's current generation,
//! so a late response can never resurrect a removed or replaced file.

use std::fmt;

use docverify_core::service::ServiceResult;
use docverify_core::{
    CollectionType, DocumentType, FileCandidate, FileSlotSpec, FileType, SlotValidator,
    UploadValidationError, VerificationService,
};

use crate::notify::Notifier;

/// Identifies a slot.
///
/// The collection is part of the identity: a document offered both as ID proof and
/// as address proof is two slots, each with its own file rules and upload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub collection: CollectionType,
    pub document_type: DocumentType,
    pub file_type: FileType,
}

impl SlotKey {
    pub fn new(
        collection: CollectionType,
        document_type: impl Into<DocumentType>,
        file_type: FileType,
    ) -> Self {
        Self {
            collection,
            document_type: document_type.into(),
            file_type,
        }
    }

    pub fn id_proof(document_type: impl Into<DocumentType>, file_type: FileType) -> Self {
        Self::new(CollectionType::IdProof, document_type, file_type)
    }

    pub fn address_proof(document_type: impl Into<DocumentType>, file_type: FileType) -> Self {
        Self::new(CollectionType::AddressProof, document_type, file_type)
    }

    pub fn rented_proof(document_type: impl Into<DocumentType>, file_type: FileType) -> Self {
        Self::new(CollectionType::RentedAddressProof, document_type, file_type)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.collection, self.document_type, self.file_type
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    /// Held only while [`UploadSlotTracker::begin_upload`] runs the local checks.
    /// The call either moves on to `Uploading` or restores the previous state, so
    /// no caller observes it between calls.
    Validating,
    Uploading,
    Succeeded { remote_id: String },
    Failed { reason: String },
}

impl SlotState {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, SlotState::Succeeded { .. })
    }

    pub fn remote_id(&self) -> Option<&str> {
        match self {
            SlotState::Succeeded { remote_id } => Some(remote_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadSlot {
    spec: FileSlotSpec,
    key: SlotKey,
    state: SlotState,
    selected_file: Option<FileCandidate>,
    generation: u64,
    validator: SlotValidator,
}

impl UploadSlot {
    fn new(key: SlotKey, spec: &FileSlotSpec, generation: u64) -> Self {
        Self {
            key,
            validator: SlotValidator::for_slot(spec),
            spec: spec.clone(),
            state: SlotState::Empty,
            selected_file: None,
            generation,
        }
    }

    pub fn key(&self) -> &SlotKey {
        &self.key
    }

    pub fn spec(&self) -> &FileSlotSpec {
        &self.spec
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn selected_file(&self) -> Option<&FileCandidate> {
        self.selected_file.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The control is disabled while an upload is in flight.
    pub fn accepts_selection(&self) -> bool {
        !matches!(self.state, SlotState::Uploading | SlotState::Validating)
    }
}

/// Proof that a selection passed local checks. Carries what the upload needs and the
/// generation the result must match.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub key: SlotKey,
    pub generation: u64,
    pub file: FileCandidate,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectError {
    #[error("No active upload slot {0}")]
    UnknownSlot(SlotKey),

    #[error("An upload is already in flight for {0}")]
    UploadInFlight(SlotKey),

    #[error(transparent)]
    Invalid(#[from] UploadValidationError),
}

/// Result of applying an upload response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(SlotState),
    /// The slot was removed, replaced or re-selected since the ticket was issued.
    Stale,
}

#[derive(Debug)]
pub struct UploadSlotTracker {
    slots: Vec<UploadSlot>,
    next_generation: u64,
    notifier: Notifier,
}

impl UploadSlotTracker {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            slots: Vec::new(),
            next_generation: 1,
            notifier,
        }
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn position(&self, key: &SlotKey) -> Option<usize> {
        self.slots.iter().position(|s| &s.key == key)
    }

    /// Present a slot. An already active slot keeps its state.
    pub fn activate(
        &mut self,
        collection: &CollectionType,
        document_type: &DocumentType,
        spec: &FileSlotSpec,
    ) -> SlotKey {
        let key = SlotKey::new(
            collection.clone(),
            document_type.clone(),
            spec.file_type.clone(),
        );
        if self.position(&key).is_none() {
            let generation = self.bump();
            tracing::debug!(slot = %key, generation, "Activating upload slot");
            self.slots
                .push(UploadSlot::new(key.clone(), spec, generation));
        }
        key
    }

    /// Destroy a slot; any in-flight response for it becomes stale.
    pub fn deactivate(&mut self, key: &SlotKey) -> bool {
        match self.position(key) {
            Some(idx) => {
                tracing::debug!(slot = %key, "Destroying upload slot");
                self.slots.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Keep only the slots whose key satisfies `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&SlotKey) -> bool) {
        self.slots.retain(|slot| {
            let kept = keep(&slot.key);
            if !kept {
                tracing::debug!(slot = %slot.key, "Destroying upload slot");
            }
            kept
        });
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn slots(&self) -> impl Iterator<Item = &UploadSlot> {
        self.slots.iter()
    }

    pub fn slot(&self, key: &SlotKey) -> Option<&UploadSlot> {
        self.slots.iter().find(|s| &s.key == key)
    }

    pub fn state(&self, key: &SlotKey) -> Option<&SlotState> {
        self.slot(key).map(UploadSlot::state)
    }

    pub fn remote_id(&self, key: &SlotKey) -> Option<&str> {
        self.state(key).and_then(SlotState::remote_id)
    }

    pub fn is_succeeded(&self, key: &SlotKey) -> bool {
        self.state(key).is_some_and(SlotState::is_succeeded)
    }

    pub fn all_succeeded<'a>(&self, keys: impl IntoIterator<Item = &'a SlotKey>) -> bool {
        keys.into_iter().all(|key| self.is_succeeded(key))
    }

    /// Keys among `keys` that are not yet `Succeeded`, in the given order.
    pub fn pending<'a>(&self, keys: impl IntoIterator<Item = &'a SlotKey>) -> Vec<SlotKey> {
        keys.into_iter()
            .filter(|key| !self.is_succeeded(key))
            .cloned()
            .collect()
    }

    /// Validate `candidate` for the slot and, when it passes, mark the slot
    /// `Uploading` and hand back a ticket for the upload.
    ///
    /// A rejected candidate leaves the slot exactly as it was and raises an error
    /// notification.
    pub fn begin_upload(
        &mut self,
        key: &SlotKey,
        candidate: FileCandidate,
    ) -> Result<UploadTicket, SelectError> {
        let idx = self
            .position(key)
            .ok_or_else(|| SelectError::UnknownSlot(key.clone()))?;
        if !self.slots[idx].accepts_selection() {
            return Err(SelectError::UploadInFlight(key.clone()));
        }

        let previous = std::mem::replace(&mut self.slots[idx].state, SlotState::Validating);
        if let Err(e) = self.slots[idx].validator.validate_all(&candidate) {
            self.slots[idx].state = previous;
            tracing::debug!(slot = %key, file = %candidate.file_name, error = %e, "Rejected file selection");
            self.notifier.error(e.user_message());
            return Err(SelectError::Invalid(e));
        }

        let generation = self.bump();
        let slot = &mut self.slots[idx];
        slot.generation = generation;
        slot.state = SlotState::Uploading;
        slot.selected_file = Some(candidate.clone());

        tracing::info!(
            slot = %key,
            generation,
            size_bytes = candidate.size_bytes,
            "Uploading file"
        );

        Ok(UploadTicket {
            key: key.clone(),
            generation,
            file: candidate,
        })
    }

    /// Record the outcome of the upload a ticket was issued for.
    pub fn apply_upload_result(
        &mut self,
        ticket: &UploadTicket,
        result: ServiceResult<String>,
    ) -> ApplyOutcome {
        let Some(idx) = self.position(&ticket.key) else {
            tracing::debug!(slot = %ticket.key, "Ignoring upload result for destroyed slot");
            return ApplyOutcome::Stale;
        };
        let slot = &mut self.slots[idx];
        if slot.generation != ticket.generation || slot.state != SlotState::Uploading {
            tracing::debug!(
                slot = %ticket.key,
                ticket_generation = ticket.generation,
                slot_generation = slot.generation,
                "Ignoring stale upload result"
            );
            return ApplyOutcome::Stale;
        }

        match result {
            Ok(remote_id) => {
                tracing::info!(slot = %ticket.key, generation = ticket.generation, "File uploaded");
                slot.state = SlotState::Succeeded { remote_id };
                self.notifier.success("File uploaded successfully");
            }
            Err(e) => {
                tracing::warn!(slot = %ticket.key, error = %e, "File upload failed");
                let server_message = e.server_message().map(str::to_string);
                slot.selected_file = None;
                slot.state = SlotState::Failed {
                    reason: server_message.clone().unwrap_or_else(|| e.to_string()),
                };
                self.notifier
                    .error(server_message.unwrap_or_else(|| "Upload failed".to_string()));
            }
        }

        ApplyOutcome::Applied(slot.state.clone())
    }

    /// Validate, upload and record in one step.
    pub async fn select_file<S>(
        &mut self,
        service: &S,
        request_id: &str,
        key: &SlotKey,
        candidate: FileCandidate,
    ) -> Result<ApplyOutcome, SelectError>
    where
        S: VerificationService + ?Sized,
    {
        let ticket = self.begin_upload(key, candidate)?;
        let result = service
            .upload_file(
                request_id,
                &ticket.key.document_type,
                &ticket.key.file_type,
                &ticket.file,
            )
            .await;
        Ok(self.apply_upload_result(&ticket, result))
    }

    /// Reset a slot to `Empty`, discarding any remote id. Idempotent.
    pub fn remove_file(&mut self, key: &SlotKey) -> Result<(), SelectError> {
        let idx = self
            .position(key)
            .ok_or_else(|| SelectError::UnknownSlot(key.clone()))?;
        let generation = self.bump();
        let slot = &mut self.slots[idx];
        slot.state = SlotState::Empty;
        slot.selected_file = None;
        slot.generation = generation;
        tracing::debug!(slot = %key, generation, "Removed file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Notification, NotificationLevel};
    use docverify_core::ServiceError;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn front_spec() -> FileSlotSpec {
        FileSlotSpec {
            file_type: FileType::Front,
            display_name: "Aadhaar Front".to_string(),
            allowed_file_types: vec!["jpg".to_string(), "png".to_string()],
            max_file_size_mb: Some(1.0),
        }
    }

    fn tracker() -> (UploadSlotTracker, SlotKey, UnboundedReceiver<Notification>) {
        let (notifier, rx) = Notifier::channel();
        let mut tracker = UploadSlotTracker::new(notifier);
        let key = tracker.activate(
            &CollectionType::IdProof,
            &DocumentType::new("AADHAR_CARD"),
            &front_spec(),
        );
        (tracker, key, rx)
    }

    fn file(name: &str, size: usize) -> FileCandidate {
        FileCandidate::new(name, vec![0u8; size])
    }

    #[test]
    fn invalid_type_leaves_slot_unchanged() {
        let (mut tracker, key, mut rx) = tracker();
        let err = tracker.begin_upload(&key, file("scan.pdf", 10)).unwrap_err();
        assert!(matches!(
            err,
            SelectError::Invalid(UploadValidationError::InvalidFileType { .. })
        ));
        assert_eq!(tracker.state(&key), Some(&SlotState::Empty));
        assert!(tracker.slot(&key).unwrap().selected_file().is_none());

        let note = rx.try_recv().unwrap();
        assert_eq!(note.level, NotificationLevel::Error);
        assert_eq!(note.message, "Invalid file type. Allowed: jpg, png");
    }

    #[test]
    fn oversized_file_keeps_previous_success() {
        let (mut tracker, key, _rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.apply_upload_result(&ticket, Ok("f1".to_string()));

        let err = tracker
            .begin_upload(&key, file("b.jpg", 1024 * 1024 + 1))
            .unwrap_err();
        assert!(matches!(
            err,
            SelectError::Invalid(UploadValidationError::FileTooLarge { .. })
        ));
        assert_eq!(tracker.remote_id(&key), Some("f1"));
    }

    #[test]
    fn successful_upload_records_remote_id() {
        let (mut tracker, key, mut rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.JPG", 10)).unwrap();
        assert_eq!(tracker.state(&key), Some(&SlotState::Uploading));

        let outcome = tracker.apply_upload_result(&ticket, Ok("remote-1".to_string()));
        assert_eq!(
            outcome,
            ApplyOutcome::Applied(SlotState::Succeeded {
                remote_id: "remote-1".to_string()
            })
        );
        assert_eq!(rx.try_recv().unwrap().message, "File uploaded successfully");
    }

    #[test]
    fn failed_upload_clears_selection_and_uses_server_message() {
        let (mut tracker, key, mut rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.apply_upload_result(
            &ticket,
            Err(ServiceError::Rejected {
                status: 400,
                message: "Blurry image".to_string(),
            }),
        );
        assert_eq!(
            tracker.state(&key),
            Some(&SlotState::Failed {
                reason: "Blurry image".to_string()
            })
        );
        assert!(tracker.slot(&key).unwrap().selected_file().is_none());
        assert_eq!(rx.try_recv().unwrap().message, "Blurry image");
    }

    #[test]
    fn failed_upload_without_server_message_uses_generic_text() {
        let (mut tracker, key, mut rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.apply_upload_result(&ticket, Err(ServiceError::Transport("timeout".to_string())));
        assert!(matches!(tracker.state(&key), Some(SlotState::Failed { .. })));
        assert_eq!(rx.try_recv().unwrap().message, "Upload failed");
    }

    #[test]
    fn second_selection_while_uploading_is_refused() {
        let (mut tracker, key, _rx) = tracker();
        tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        assert!(matches!(
            tracker.begin_upload(&key, file("b.jpg", 10)),
            Err(SelectError::UploadInFlight(_))
        ));
    }

    #[test]
    fn reselection_drops_previous_remote_id() {
        let (mut tracker, key, _rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.apply_upload_result(&ticket, Ok("f1".to_string()));

        tracker.begin_upload(&key, file("b.jpg", 10)).unwrap();
        assert_eq!(tracker.state(&key), Some(&SlotState::Uploading));
        assert!(tracker.remote_id(&key).is_none());
    }

    #[test]
    fn late_result_after_remove_is_stale() {
        let (mut tracker, key, _rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.remove_file(&key).unwrap();

        assert_eq!(
            tracker.apply_upload_result(&ticket, Ok("late".to_string())),
            ApplyOutcome::Stale
        );
        assert_eq!(tracker.state(&key), Some(&SlotState::Empty));
    }

    #[test]
    fn late_result_after_reactivation_is_stale() {
        let (mut tracker, key, _rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.deactivate(&key);
        tracker.activate(
            &CollectionType::IdProof,
            &DocumentType::new("AADHAR_CARD"),
            &front_spec(),
        );

        assert_eq!(
            tracker.apply_upload_result(&ticket, Ok("late".to_string())),
            ApplyOutcome::Stale
        );
        assert_eq!(tracker.state(&key), Some(&SlotState::Empty));
    }

    #[test]
    fn remove_file_is_idempotent() {
        let (mut tracker, key, _rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.apply_upload_result(&ticket, Ok("f1".to_string()));

        tracker.remove_file(&key).unwrap();
        let once = tracker.state(&key).cloned();
        tracker.remove_file(&key).unwrap();
        assert_eq!(tracker.state(&key).cloned(), once);
        assert_eq!(once, Some(SlotState::Empty));
    }

    #[test]
    fn unknown_slot_is_reported() {
        let (mut tracker, _key, _rx) = tracker();
        let other = SlotKey::id_proof("PAN_CARD", FileType::Front);
        assert!(matches!(
            tracker.begin_upload(&other, file("a.jpg", 1)),
            Err(SelectError::UnknownSlot(_))
        ));
        assert!(tracker.remove_file(&other).is_err());
    }

    #[test]
    fn pending_lists_unfinished_slots_in_order() {
        let (mut tracker, front, _rx) = tracker();
        let back_spec = FileSlotSpec {
            file_type: FileType::Back,
            ..front_spec()
        };
        let back = tracker.activate(
            &CollectionType::IdProof,
            &DocumentType::new("AADHAR_CARD"),
            &back_spec,
        );

        let ticket = tracker.begin_upload(&back, file("b.png", 10)).unwrap();
        tracker.apply_upload_result(&ticket, Ok("b".to_string()));

        assert_eq!(tracker.pending([&front, &back]), vec![front.clone()]);
        assert!(!tracker.all_succeeded([&front, &back]));
        assert!(tracker.all_succeeded([&back]));
    }

    #[test]
    fn activate_keeps_existing_state() {
        let (mut tracker, key, _rx) = tracker();
        let ticket = tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        tracker.apply_upload_result(&ticket, Ok("f1".to_string()));

        tracker.activate(
            &CollectionType::IdProof,
            &DocumentType::new("AADHAR_CARD"),
            &front_spec(),
        );
        assert_eq!(tracker.remote_id(&key), Some("f1"));
        assert_eq!(tracker.slots().count(), 1);
    }

    #[test]
    fn slot_key_display() {
        assert_eq!(
            SlotKey::address_proof("LIGHT_BILL", FileType::Document).to_string(),
            "ADDRESS_PROOF/LIGHT_BILL/DOCUMENT"
        );
    }

    #[test]
    fn same_document_in_two_collections_is_two_slots() {
        let (mut tracker, id_front, _rx) = tracker();
        let pdf_front = FileSlotSpec {
            allowed_file_types: vec!["pdf".to_string()],
            ..front_spec()
        };
        let address_front = tracker.activate(
            &CollectionType::AddressProof,
            &DocumentType::new("AADHAR_CARD"),
            &pdf_front,
        );
        assert_ne!(id_front, address_front);
        assert_eq!(tracker.slots().count(), 2);

        let ticket = tracker.begin_upload(&id_front, file("a.jpg", 10)).unwrap();
        tracker.apply_upload_result(&ticket, Ok("id-file".to_string()));
        assert!(!tracker.is_succeeded(&address_front));

        // Each slot applies its own file rules.
        assert!(tracker
            .begin_upload(&address_front, file("a.jpg", 10))
            .is_err());
        let ticket = tracker
            .begin_upload(&address_front, file("bill.pdf", 10))
            .unwrap();
        tracker.apply_upload_result(&ticket, Ok("address-file".to_string()));

        tracker.remove_file(&address_front).unwrap();
        assert_eq!(tracker.remote_id(&id_front), Some("id-file"));
    }

    #[test]
    fn rejected_selection_never_leaves_slot_validating() {
        let (mut tracker, key, _rx) = tracker();
        tracker.begin_upload(&key, file("a.gif", 10)).unwrap_err();
        assert_eq!(tracker.state(&key), Some(&SlotState::Empty));
        assert!(tracker.slot(&key).unwrap().accepts_selection());

        tracker.begin_upload(&key, file("a.jpg", 10)).unwrap();
        assert_eq!(tracker.state(&key), Some(&SlotState::Uploading));
    }
}
