//! Verification and document upload workflow.
//!
//! A session-scoped state machine that walks a customer from a case link through OTP
//! verification and consent to schema-driven document upload:
//!
//! ```text
//! Landing -> AwaitingOtpSend -> OtpEntry -> Consent -> UploadStep1 -> UploadStep2 -> Complete
//!    \                                                                       (15 s) -> Landing
//!     -> Error
//! ```
//!
//! The [`StageSequencer`] owns the transitions; it consults the [`SessionStore`] on
//! every stage entry, reads the case's requirement schema through [`RequirementView`],
//! and tracks per-file upload state with the [`UploadSlotTracker`]. All service calls
//! go through [`docverify_core::VerificationService`].

pub mod notify;
pub mod requirements;
pub mod sequencer;
pub mod session;
pub mod upload;

pub use notify::{Notification, NotificationLevel, Notifier};
pub use requirements::{AddressChoice, RequiredSlot, RequirementView};
pub use sequencer::{
    Action, Blocker, ErrorReason, Stage, StageSequencer, StageTag, Transition, UploadContext,
};
pub use session::{SessionKey, SessionStanding, SessionState, SessionStore};
pub use upload::{
    ApplyOutcome, SelectError, SlotKey, SlotState, UploadSlot, UploadSlotTracker, UploadTicket,
};
