use std::fmt;
use std::time::Duration;

use docverify_core::models::{ConsentRequest, HouseType};
use docverify_core::{CustomerLink, DocumentType, FileCandidate};

use crate::upload::SlotKey;

/// Stage tag without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageTag {
    Landing,
    AwaitingOtpSend,
    OtpEntry,
    Consent,
    UploadStep1,
    UploadStep2,
    Complete,
    Error,
}

impl StageTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageTag::Landing => "landing",
            StageTag::AwaitingOtpSend => "awaiting_otp_send",
            StageTag::OtpEntry => "otp_entry",
            StageTag::Consent => "consent",
            StageTag::UploadStep1 => "upload_step1",
            StageTag::UploadStep2 => "upload_step2",
            StageTag::Complete => "complete",
            StageTag::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StageTag::Complete | StageTag::Error)
    }
}

impl fmt::Display for StageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the workflow ended in [`Stage::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    /// The dealer has to issue a new link.
    Expired,
    Generic,
}

impl ErrorReason {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorReason::Expired => "Link is invalid or expired, Contact your dealer.",
            ErrorReason::Generic => "Something went wrong. Kindly check the SMS or link again.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Entry point for a case link. Without a link this renders the generic
    /// "check the SMS or link again" view.
    Landing {
        link_id: Option<String>,
        /// Set once resolution has been attempted in this activation.
        resolution_requested: bool,
    },
    AwaitingOtpSend {
        link: CustomerLink,
    },
    OtpEntry {
        resend_countdown: Duration,
    },
    Consent,
    UploadStep1,
    UploadStep2,
    Complete {
        /// Time left before returning to the case landing; `None` when there is no
        /// case to return to.
        redirect_in: Option<Duration>,
    },
    Error(ErrorReason),
}

impl Stage {
    pub(crate) fn landing(link_id: Option<String>) -> Self {
        Stage::Landing {
            link_id,
            resolution_requested: false,
        }
    }

    pub fn tag(&self) -> StageTag {
        match self {
            Stage::Landing { .. } => StageTag::Landing,
            Stage::AwaitingOtpSend { .. } => StageTag::AwaitingOtpSend,
            Stage::OtpEntry { .. } => StageTag::OtpEntry,
            Stage::Consent => StageTag::Consent,
            Stage::UploadStep1 => StageTag::UploadStep1,
            Stage::UploadStep2 => StageTag::UploadStep2,
            Stage::Complete { .. } => StageTag::Complete,
            Stage::Error(_) => StageTag::Error,
        }
    }
}

/// Inputs accepted by [`super::StageSequencer::dispatch`].
#[derive(Debug, Clone)]
pub enum Action {
    /// Enter the workflow with a case link (or none). Always starts a fresh session.
    OpenLink(Option<String>),
    ResolveLink,
    SendOtp,
    SubmitOtp(String),
    ResendOtp,
    SubmitConsent(ConsentRequest),
    SetPrimaryId(String),
    SetSecondaryId(String),
    SelectFile { slot: SlotKey, file: FileCandidate },
    RemoveFile(SlotKey),
    /// Step 1 to step 2.
    Continue,
    SelectHouseType(HouseType),
    SelectAddressDocument(DocumentType),
    Submit,
    /// Advance the stage timers.
    Elapse(Duration),
    /// Direct navigation to a stage, subject to its entry checks.
    Navigate(StageTag),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::OpenLink(_) => "open_link",
            Action::ResolveLink => "resolve_link",
            Action::SendOtp => "send_otp",
            Action::SubmitOtp(_) => "submit_otp",
            Action::ResendOtp => "resend_otp",
            Action::SubmitConsent(_) => "submit_consent",
            Action::SetPrimaryId(_) => "set_primary_id",
            Action::SetSecondaryId(_) => "set_secondary_id",
            Action::SelectFile { .. } => "select_file",
            Action::RemoveFile(_) => "remove_file",
            Action::Continue => "continue",
            Action::SelectHouseType(_) => "select_house_type",
            Action::SelectAddressDocument(_) => "select_address_document",
            Action::Submit => "submit",
            Action::Elapse(_) => "elapse",
            Action::Navigate(_) => "navigate",
        }
    }
}

/// Stage before and after a dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: StageTag,
    pub to: StageTag,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}
