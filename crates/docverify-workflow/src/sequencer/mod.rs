//! Stage sequencer.
//!
//! A tagged-union state machine with one transition function, [`StageSequencer::dispatch`].
//! Every stage entry re-checks the session: missing case or token state sends the
//! customer back to the landing stage instead of silently skipping ahead.
//!
//! `dispatch` returns `Err` only when the action was refused and the stage did not
//! change. Link resolution failures are not refusals; they move the workflow to
//! [`Stage::Error`] and are kept as [`StageSequencer::failure`]. Consent and final
//! submission are best-effort: a failed call is logged, notified and kept in
//! [`StageSequencer::tolerated_failures`], but the workflow advances.

mod context;
mod stage;
mod submission;

pub use context::{Blocker, UploadContext};
pub use stage::{Action, ErrorReason, Stage, StageTag, Transition};

use std::sync::Arc;
use std::time::Duration;

use docverify_core::error::ServiceOperation;
use docverify_core::models::{ConsentRequest, HouseType};
use docverify_core::{
    DocumentType, ErrorMetadata, FileCandidate, ServiceError, VerificationService, WorkflowConfig,
    WorkflowError,
};

use crate::notify::Notifier;
use crate::requirements::RequirementView;
use crate::session::{SessionKey, SessionStanding, SessionStore};
use crate::upload::{SelectError, SlotKey};

const OTP_LENGTH: usize = 4;

fn is_valid_otp(code: &str) -> bool {
    code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit())
}

pub struct StageSequencer<S: ?Sized> {
    service: Arc<S>,
    config: WorkflowConfig,
    session: SessionStore,
    notifier: Notifier,
    stage: Stage,
    inline_error: Option<String>,
    upload: Option<UploadContext>,
    failure: Option<WorkflowError>,
    tolerated: Vec<WorkflowError>,
}

impl<S> StageSequencer<S>
where
    S: VerificationService + ?Sized,
{
    pub fn new(service: Arc<S>, config: WorkflowConfig, notifier: Notifier) -> Self {
        Self {
            service,
            config,
            session: SessionStore::new(),
            notifier,
            stage: Stage::landing(None),
            inline_error: None,
            upload: None,
            failure: None,
            tolerated: Vec::new(),
        }
    }

    /// Continue a browsing session that already holds state.
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = session;
        self
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn tag(&self) -> StageTag {
        self.stage.tag()
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Inline message of the current stage, cleared on every stage entry.
    pub fn inline_error(&self) -> Option<&str> {
        self.inline_error.as_deref()
    }

    /// Why the workflow sits in [`Stage::Error`].
    pub fn failure(&self) -> Option<&WorkflowError> {
        self.failure.as_ref()
    }

    /// Best-effort calls that failed since the case was entered.
    pub fn tolerated_failures(&self) -> &[WorkflowError] {
        &self.tolerated
    }

    pub fn upload_context(&self) -> Option<&UploadContext> {
        self.upload.as_ref()
    }

    pub fn upload_context_mut(&mut self) -> Option<&mut UploadContext> {
        self.upload.as_mut()
    }

    /// Everything keeping the current upload step from being left.
    pub fn blockers(&self) -> Vec<Blocker> {
        match (self.stage.tag(), &self.upload) {
            (StageTag::UploadStep1 | StageTag::UploadStep2, None) => {
                vec![Blocker::RequirementsUnavailable]
            }
            (StageTag::UploadStep1, Some(ctx)) => ctx.step1_blockers(),
            (StageTag::UploadStep2, Some(ctx)) => ctx.step2_blockers(),
            _ => Vec::new(),
        }
    }

    /// Apply one action.
    pub async fn dispatch(&mut self, action: Action) -> Result<Transition, WorkflowError> {
        let from = self.stage.tag();
        tracing::debug!(stage = %from, action = action.name(), "Dispatching action");

        let result = match action {
            Action::OpenLink(link_id) => {
                self.land(link_id);
                Ok(())
            }
            Action::ResolveLink => self.resolve_link().await,
            Action::SendOtp => self.send_otp().await,
            Action::SubmitOtp(code) => self.submit_otp(&code).await,
            Action::ResendOtp => self.resend_otp().await,
            Action::SubmitConsent(consent) => self.submit_consent(consent).await,
            Action::SetPrimaryId(value) => self
                .upload_step(StageTag::UploadStep1, "set_primary_id")
                .map(|ctx| ctx.set_primary_id(value)),
            Action::SetSecondaryId(value) => self
                .upload_step(StageTag::UploadStep1, "set_secondary_id")
                .map(|ctx| ctx.set_secondary_id(value)),
            Action::SelectFile { slot, file } => self.select_file(slot, file).await,
            Action::RemoveFile(slot) => self.remove_file(&slot),
            Action::Continue => self.continue_to_step2().await,
            Action::SelectHouseType(house_type) => self.select_house_type(house_type),
            Action::SelectAddressDocument(document_type) => {
                self.select_address_document(document_type)
            }
            Action::Submit => self.submit().await,
            Action::Elapse(elapsed) => {
                self.elapse(elapsed);
                Ok(())
            }
            Action::Navigate(target) => {
                self.navigate(target).await;
                Ok(())
            }
        };

        result.map(|()| Transition {
            from,
            to: self.stage.tag(),
        })
    }

    fn enter(&mut self, stage: Stage) {
        let from = self.stage.tag();
        let to = stage.tag();
        if from != to {
            tracing::info!(from = %from, to = %to, "Stage transition");
        }
        if !matches!(to, StageTag::UploadStep1 | StageTag::UploadStep2) {
            self.upload = None;
        }
        self.inline_error = None;
        self.failure = None;
        self.stage = stage;
    }

    fn fail(&mut self, reason: ErrorReason, error: WorkflowError) {
        self.enter(Stage::Error(reason));
        self.failure = Some(error);
    }

    /// Record a failed best-effort call. The workflow advances regardless.
    fn tolerate(&mut self, operation: ServiceOperation, source: ServiceError, notice: &str) {
        let error = WorkflowError::transport(operation, source);
        debug_assert!(!error.blocks_transition());
        tracing::warn!(
            request_id = ?self.session.link_request_id(),
            code = error.error_code(),
            error = %error,
            "Best-effort call failed, continuing"
        );
        self.notifier.error(notice);
        self.tolerated.push(error);
    }

    fn not_allowed(&self, action: &str) -> WorkflowError {
        WorkflowError::ActionNotAllowed {
            stage: self.stage.tag().to_string(),
            action: action.to_string(),
        }
    }

    /// Surface a refusal inline and as a notification.
    fn refuse(&mut self, message: &str) -> WorkflowError {
        self.inline_error = Some(message.to_string());
        self.notifier.error(message);
        WorkflowError::Validation(message.to_string())
    }

    /// Fresh workflow entry: the only point where the session is cleared.
    fn land(&mut self, link_id: Option<String>) {
        self.session.clear();
        self.tolerated.clear();
        tracing::info!(link_id = ?link_id, "Entering workflow");
        self.enter(Stage::landing(link_id));
    }

    /// Checks shared by every stage after OTP entry. Redirects and returns `false`
    /// when the session does not prove a verified case.
    fn admit_verified(&mut self) -> bool {
        let link = self.session.link_request_id().map(str::to_string);
        match self.session.standing() {
            SessionStanding::Verified => true,
            SessionStanding::NoCase => {
                tracing::info!("No case in session, redirecting to landing");
                self.land(None);
                false
            }
            SessionStanding::Unverified => {
                tracing::info!(request_id = ?link, "Case not verified, redirecting to landing");
                self.land(link);
                false
            }
            SessionStanding::Inconsistent => {
                tracing::warn!(request_id = ?link, "Verification token does not belong to the case, resetting session");
                self.land(link);
                false
            }
        }
    }

    fn request_id(&self) -> Result<String, WorkflowError> {
        self.session
            .link_request_id()
            .map(str::to_string)
            .ok_or_else(|| WorkflowError::Internal("No case in session".to_string()))
    }

    async fn resolve_link(&mut self) -> Result<(), WorkflowError> {
        if self.stage.tag() != StageTag::Landing {
            return Err(self.not_allowed("resolve_link"));
        }
        let link_id = match &mut self.stage {
            Stage::Landing {
                link_id,
                resolution_requested,
            } => {
                if *resolution_requested {
                    tracing::debug!("Link resolution already requested in this activation");
                    return Ok(());
                }
                *resolution_requested = true;
                link_id.clone()
            }
            _ => return Ok(()),
        };

        let Some(link_id) = link_id else {
            self.fail(
                ErrorReason::Generic,
                WorkflowError::LinkResolutionFailed("No case link to resolve".to_string()),
            );
            return Ok(());
        };

        match self.service.resolve_customer(&link_id).await {
            Ok(link) => {
                tracing::info!(request_id = %link.request_id, "Resolved case link");
                self.session
                    .set(SessionKey::MaskedMobile, link.masked_mobile());
                self.enter(Stage::AwaitingOtpSend { link });
            }
            Err(ServiceError::LinkExpired) => {
                tracing::info!(link_id = %link_id, "Case link is invalid or expired");
                self.fail(ErrorReason::Expired, WorkflowError::LinkInvalidOrExpired);
            }
            Err(e) => {
                tracing::warn!(link_id = %link_id, error = %e, "Failed to resolve case link");
                self.fail(
                    ErrorReason::Generic,
                    WorkflowError::LinkResolutionFailed(e.to_string()),
                );
            }
        }
        Ok(())
    }

    async fn send_otp(&mut self) -> Result<(), WorkflowError> {
        let request_id = match &self.stage {
            Stage::AwaitingOtpSend { link } => link.request_id.clone(),
            _ => return Err(self.not_allowed("send_otp")),
        };

        match self.service.send_otp(&request_id).await {
            Ok(()) => {
                self.session.set(SessionKey::LinkRequestId, request_id);
                self.notifier.success("OTP Sent Successfully");
                self.enter_otp_entry();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to send OTP");
                self.notifier.error("Failed to send OTP. Please try again.");
                Err(WorkflowError::transport(ServiceOperation::SendOtp, e))
            }
        }
    }

    fn enter_otp_entry(&mut self) {
        match self.session.standing() {
            SessionStanding::Unverified => self.enter(Stage::OtpEntry {
                resend_countdown: self.config.resend_cooldown,
            }),
            SessionStanding::Verified => {
                tracing::debug!("Already verified, forwarding to consent");
                self.enter_consent();
            }
            SessionStanding::NoCase | SessionStanding::Inconsistent => {
                self.admit_verified();
            }
        }
    }

    async fn submit_otp(&mut self, code: &str) -> Result<(), WorkflowError> {
        if self.stage.tag() != StageTag::OtpEntry {
            return Err(self.not_allowed("submit_otp"));
        }
        if !is_valid_otp(code) {
            let message = "Please enter a valid 4-digit OTP";
            self.inline_error = Some(message.to_string());
            return Err(WorkflowError::Validation(message.to_string()));
        }
        let request_id = self.request_id()?;

        match self.service.verify_otp(&request_id, code).await {
            Ok(verification) => {
                tracing::info!(request_id = %request_id, "OTP verified");
                self.session
                    .set_verification_token(&request_id, verification.token);
                self.notifier.success("OTP verified successfully");
                self.enter_consent();
                Ok(())
            }
            Err(e) => {
                tracing::info!(request_id = %request_id, error = %e, "OTP rejected");
                let message = e.server_message().unwrap_or("Invalid OTP").to_string();
                self.inline_error = Some(message.clone());
                self.notifier.error(message);
                Err(WorkflowError::transport(ServiceOperation::VerifyOtp, e))
            }
        }
    }

    async fn resend_otp(&mut self) -> Result<(), WorkflowError> {
        let countdown = match &self.stage {
            Stage::OtpEntry { resend_countdown } => *resend_countdown,
            _ => return Err(self.not_allowed("resend_otp")),
        };
        if !countdown.is_zero() {
            tracing::debug!(remaining_secs = countdown.as_secs(), "Resend not yet available");
            return Ok(());
        }
        let request_id = self.request_id()?;

        match self.service.resend_otp(&request_id).await {
            Ok(()) => {
                self.stage = Stage::OtpEntry {
                    resend_countdown: self.config.resend_cooldown,
                };
                self.notifier.success("OTP resend successfully");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to resend OTP");
                self.notifier.error("Failed to resend OTP. Please try again.");
                Err(WorkflowError::transport(ServiceOperation::ResendOtp, e))
            }
        }
    }

    fn enter_consent(&mut self) {
        if self.admit_verified() {
            self.enter(Stage::Consent);
        }
    }

    async fn submit_consent(&mut self, consent: ConsentRequest) -> Result<(), WorkflowError> {
        if self.stage.tag() != StageTag::Consent {
            return Err(self.not_allowed("submit_consent"));
        }
        if !consent.consent_checkbox {
            let message = "Please accept the terms and conditions";
            self.inline_error = Some(message.to_string());
            return Err(WorkflowError::Validation(message.to_string()));
        }
        if !self.admit_verified() {
            return Ok(());
        }
        let request_id = self.request_id()?;
        let token = self
            .session
            .verification_token()
            .map(str::to_string)
            .unwrap_or_default();

        match self
            .service
            .submit_consent(&request_id, &token, &consent)
            .await
        {
            Ok(()) => {
                self.session.set(SessionKey::ConsentSubmitted, "true");
                self.notifier.success("Consent submitted successfully");
            }
            Err(e) => self.tolerate(
                ServiceOperation::SubmitConsent,
                e,
                "Error in Submitting Consent, Try Again after sometime",
            ),
        }

        self.enter_upload_step1().await;
        Ok(())
    }

    /// Fetches the requirement schema afresh on every entry.
    async fn enter_upload_step1(&mut self) {
        if !self.admit_verified() {
            return;
        }
        let request_id = match self.request_id() {
            Ok(id) => id,
            Err(_) => return,
        };

        let fetched = self.service.fetch_requirements(&request_id).await;
        self.enter(Stage::UploadStep1);
        match fetched {
            Ok(schema) => {
                tracing::info!(
                    request_id = %request_id,
                    collections = schema.collections.len(),
                    "Loaded document requirements"
                );
                let view = RequirementView::new(
                    schema,
                    self.config.primary_id_document.clone(),
                    self.config.secondary_id_document.clone(),
                );
                self.upload = Some(UploadContext::new(view, self.notifier.clone()));
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to load document requirements");
                self.upload = None;
                let message = Blocker::RequirementsUnavailable.message();
                self.inline_error = Some(message.to_string());
                self.notifier.error(message);
            }
        }
    }

    /// Step 2 needs a step-1 context whose checks all pass; otherwise step 1 is shown.
    async fn enter_upload_step2(&mut self) {
        if !self.admit_verified() {
            return;
        }
        let ready = self
            .upload
            .as_ref()
            .is_some_and(|ctx| ctx.step1_blockers().is_empty());
        if !ready {
            if self.upload.is_none() {
                self.enter_upload_step1().await;
            } else {
                self.enter(Stage::UploadStep1);
            }
            return;
        }
        if let Some(ctx) = self.upload.as_mut() {
            ctx.activate_address_slots();
        }
        self.enter(Stage::UploadStep2);
    }

    fn upload_step(
        &mut self,
        step: StageTag,
        action: &str,
    ) -> Result<&mut UploadContext, WorkflowError> {
        if self.stage.tag() != step {
            return Err(self.not_allowed(action));
        }
        self.upload.as_mut().ok_or_else(|| {
            WorkflowError::Validation(Blocker::RequirementsUnavailable.message().to_string())
        })
    }

    fn current_upload_step(&mut self, action: &str) -> Result<bool, WorkflowError> {
        match self.stage.tag() {
            StageTag::UploadStep1 => Ok(false),
            StageTag::UploadStep2 => Ok(true),
            _ => Err(self.not_allowed(action)),
        }
    }

    async fn select_file(&mut self, slot: SlotKey, file: FileCandidate) -> Result<(), WorkflowError> {
        let step_two = self.current_upload_step("select_file")?;
        let request_id = self.request_id()?;
        let service = Arc::clone(&self.service);
        let ctx = self.upload.as_mut().ok_or_else(|| {
            WorkflowError::Validation(Blocker::RequirementsUnavailable.message().to_string())
        })?;
        if !ctx.presents(step_two, &slot) {
            return Err(WorkflowError::Validation(format!(
                "No upload slot {} in this step",
                slot
            )));
        }

        match ctx
            .tracker_mut()
            .select_file(service.as_ref(), &request_id, &slot, file)
            .await
        {
            Ok(_) => Ok(()),
            Err(SelectError::Invalid(e)) => Err(WorkflowError::Validation(e.user_message())),
            Err(e) => Err(WorkflowError::Validation(e.to_string())),
        }
    }

    fn remove_file(&mut self, slot: &SlotKey) -> Result<(), WorkflowError> {
        let step_two = self.current_upload_step("remove_file")?;
        let ctx = self.upload.as_mut().ok_or_else(|| {
            WorkflowError::Validation(Blocker::RequirementsUnavailable.message().to_string())
        })?;
        if !ctx.presents(step_two, slot) {
            return Err(WorkflowError::Validation(format!(
                "No upload slot {} in this step",
                slot
            )));
        }
        ctx.tracker_mut()
            .remove_file(slot)
            .map_err(|e| WorkflowError::Validation(e.to_string()))
    }

    async fn continue_to_step2(&mut self) -> Result<(), WorkflowError> {
        if self.stage.tag() != StageTag::UploadStep1 {
            return Err(self.not_allowed("continue"));
        }
        if let Some(blocker) = self.blockers().into_iter().next() {
            tracing::debug!(blocker = ?blocker, "Step 1 incomplete");
            return Err(self.refuse(blocker.message()));
        }
        self.enter_upload_step2().await;
        Ok(())
    }

    fn select_house_type(&mut self, house_type: HouseType) -> Result<(), WorkflowError> {
        self.upload_step(StageTag::UploadStep2, "select_house_type")?
            .set_house_type(house_type)
    }

    fn select_address_document(&mut self, document_type: DocumentType) -> Result<(), WorkflowError> {
        self.upload_step(StageTag::UploadStep2, "select_address_document")?
            .select_address_document(document_type)
    }

    async fn submit(&mut self) -> Result<(), WorkflowError> {
        if self.stage.tag() != StageTag::UploadStep2 {
            return Err(self.not_allowed("submit"));
        }
        if let Some(blocker) = self.blockers().into_iter().next() {
            tracing::debug!(blocker = ?blocker, "Step 2 incomplete");
            return Err(self.refuse(blocker.message()));
        }
        let request_id = self.request_id()?;
        let submission = match &self.upload {
            Some(ctx) => submission::build_submission(&request_id, ctx)?,
            None => {
                return Err(WorkflowError::Validation(
                    Blocker::RequirementsUnavailable.message().to_string(),
                ))
            }
        };

        match self
            .service
            .submit_documents(&request_id, &submission)
            .await
        {
            Ok(()) => {
                tracing::info!(request_id = %request_id, "Documents submitted");
                self.notifier.success("Documents submitted successfully");
            }
            Err(e) => self.tolerate(
                ServiceOperation::SubmitDocuments,
                e,
                "Failed to submit documents. Please try again.",
            ),
        }

        self.enter_complete();
        Ok(())
    }

    fn enter_complete(&mut self) {
        let redirect_in = self
            .session
            .link_request_id()
            .map(|_| self.config.completion_dwell);
        self.enter(Stage::Complete { redirect_in });
    }

    fn elapse(&mut self, elapsed: Duration) {
        match &mut self.stage {
            Stage::OtpEntry { resend_countdown } => {
                *resend_countdown = resend_countdown.saturating_sub(elapsed);
            }
            Stage::Complete {
                redirect_in: Some(remaining),
            } => {
                *remaining = remaining.saturating_sub(elapsed);
                if remaining.is_zero() {
                    let link = self.session.link_request_id().map(str::to_string);
                    tracing::info!(request_id = ?link, "Returning to case landing");
                    self.land(link);
                }
            }
            _ => {}
        }
    }

    async fn navigate(&mut self, target: StageTag) {
        tracing::debug!(target = %target, "Direct navigation");
        match target {
            StageTag::Landing => self.land(None),
            StageTag::AwaitingOtpSend => {
                let link = self.session.link_request_id().map(str::to_string);
                self.land(link);
            }
            StageTag::OtpEntry => self.enter_otp_entry(),
            StageTag::Consent => self.enter_consent(),
            StageTag::UploadStep1 => self.enter_upload_step1().await,
            StageTag::UploadStep2 => self.enter_upload_step2().await,
            StageTag::Complete => {
                if self.admit_verified() {
                    self.enter_complete();
                }
            }
            StageTag::Error => self.fail(
                ErrorReason::Generic,
                WorkflowError::LinkResolutionFailed("Error view opened directly".to_string()),
            ),
        }
    }
}
