//! Support code for the `docverify` binary: file arguments, file loading and the
//! scripted journey.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use docverify_core::models::{ConsentRequest, HouseType};
use docverify_core::{
    CollectionType, DocumentType, ErrorMetadata, FileCandidate, FileType, VerificationService,
};
use docverify_workflow::{Action, SlotKey, SlotState, StageSequencer, StageTag};
use serde::Serialize;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// `[COLLECTION/]DOC:FILE=path`, e.g. `AADHAR_CARD:FRONT=./front.jpg`.
///
/// Without a collection the file goes to every slot of that document and file type.
/// `ADDRESS_PROOF/AADHAR_CARD:FRONT=...` targets the address proof copy only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub collection: Option<CollectionType>,
    pub document_type: DocumentType,
    pub file_type: FileType,
    pub path: PathBuf,
}

impl FileArg {
    fn matches(&self, slot: &SlotKey) -> bool {
        self.document_type == slot.document_type
            && self.file_type == slot.file_type
            && self
                .collection
                .as_ref()
                .map_or(true, |collection| collection == &slot.collection)
    }
}

impl FromStr for FileArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (slot, path) = s
            .split_once('=')
            .ok_or_else(|| format!("expected DOC:FILE=path, got '{}'", s))?;
        let (collection, slot) = match slot.split_once('/') {
            Some((collection, slot)) => (Some(collection.trim()), slot),
            None => (None, slot),
        };
        let (document, file) = slot
            .split_once(':')
            .ok_or_else(|| format!("expected DOC:FILE before '=', got '{}'", slot))?;
        let (document, file, path) = (document.trim(), file.trim(), path.trim());
        if document.is_empty() || file.is_empty() || path.is_empty() {
            return Err(format!("document type, file type and path are required in '{}'", s));
        }
        if collection.is_some_and(str::is_empty) {
            return Err(format!("empty collection in '{}'", s));
        }

        Ok(FileArg {
            collection: collection.map(|c| CollectionType::from(c.to_uppercase())),
            document_type: DocumentType::new(document.to_uppercase()),
            file_type: FileType::from(file.to_uppercase()),
            path: PathBuf::from(path),
        })
    }
}

/// Content type sent with the multipart part, by extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_lowercase();
    let content_type = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(content_type)
}

/// Read a file from disk into an upload candidate.
pub async fn load_candidate(path: &Path) -> anyhow::Result<FileCandidate> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Invalid file name: {}", path.display()))?;

    let candidate = FileCandidate::new(file_name, data);
    Ok(match content_type_for(path) {
        Some(content_type) => candidate.with_content_type(content_type),
        None => candidate,
    })
}

/// Inputs of a scripted journey.
#[derive(Debug, Clone, Default)]
pub struct JourneyOptions {
    pub link: String,
    pub otp: String,
    pub primary_id: String,
    pub secondary_id: String,
    pub files: Vec<FileArg>,
    pub rented: bool,
    pub address_document: Option<DocumentType>,
    pub whatsapp: bool,
    pub sms: bool,
}

impl JourneyOptions {
    /// A file naming the slot's collection wins over one that names none.
    fn file_for(&self, slot: &SlotKey) -> anyhow::Result<&Path> {
        let candidates = self.files.iter().filter(|f| f.matches(slot));
        candidates
            .clone()
            .find(|f| f.collection.is_some())
            .or_else(|| candidates.clone().next())
            .map(|f| f.path.as_path())
            .with_context(|| {
                format!(
                    "No file given for {}; pass --file {}:{}=<path>",
                    slot, slot.document_type, slot.file_type
                )
            })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneySummary {
    pub request_id: String,
    pub stage: String,
    pub consent_submitted: bool,
    pub uploaded: Vec<UploadedFile>,
    /// Best-effort calls that failed while the journey still completed.
    pub warnings: Vec<JourneyWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyWarning {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub slot: String,
    pub remote_id: String,
}

async fn upload<S>(
    seq: &mut StageSequencer<S>,
    options: &JourneyOptions,
    slots: Vec<SlotKey>,
    uploaded: &mut Vec<UploadedFile>,
) -> anyhow::Result<()>
where
    S: VerificationService + ?Sized,
{
    for slot in slots {
        let file = load_candidate(options.file_for(&slot)?).await?;
        seq.dispatch(Action::SelectFile {
            slot: slot.clone(),
            file,
        })
        .await
        .with_context(|| format!("Failed to select file for {}", slot))?;

        let state = seq
            .upload_context()
            .and_then(|ctx| ctx.tracker().state(&slot).cloned());
        match state {
            Some(SlotState::Succeeded { remote_id }) => uploaded.push(UploadedFile {
                slot: slot.to_string(),
                remote_id,
            }),
            Some(SlotState::Failed { reason }) => bail!("Upload for {} failed: {}", slot, reason),
            other => bail!("Upload for {} did not complete: {:?}", slot, other),
        }
    }
    Ok(())
}

/// Walk one case from its link to the completion stage.
pub async fn run_journey<S>(
    seq: &mut StageSequencer<S>,
    options: &JourneyOptions,
) -> anyhow::Result<JourneySummary>
where
    S: VerificationService + ?Sized,
{
    seq.dispatch(Action::OpenLink(Some(options.link.clone())))
        .await?;
    seq.dispatch(Action::ResolveLink).await?;
    if let Some(failure) = seq.failure() {
        return Err(failure.clone().into());
    }

    seq.dispatch(Action::SendOtp)
        .await
        .context("Failed to send OTP")?;
    seq.dispatch(Action::SubmitOtp(options.otp.clone()))
        .await
        .context("OTP verification failed")?;
    seq.dispatch(Action::SubmitConsent(ConsentRequest {
        consent_checkbox: true,
        whatsapp_toggle: options.whatsapp,
        sms_toggle: options.sms,
    }))
    .await?;
    if seq.tag() != StageTag::UploadStep1 || seq.upload_context().is_none() {
        bail!(
            "{}",
            seq.inline_error()
                .unwrap_or("Could not reach the document upload step")
        );
    }

    let mut uploaded = Vec::new();

    seq.dispatch(Action::SetPrimaryId(options.primary_id.clone()))
        .await?;
    seq.dispatch(Action::SetSecondaryId(options.secondary_id.clone()))
        .await?;
    let identity = seq
        .upload_context()
        .map(|ctx| ctx.identity_keys().to_vec())
        .unwrap_or_default();
    upload(seq, options, identity, &mut uploaded).await?;
    seq.dispatch(Action::Continue).await?;

    if options.rented {
        seq.dispatch(Action::SelectHouseType(HouseType::Rented))
            .await?;
    } else {
        let choice = match &options.address_document {
            Some(doc) => Some(doc.clone()),
            None => seq.upload_context().and_then(|ctx| {
                ctx.view()
                    .address_documents()
                    .into_iter()
                    .next()
                    .map(|c| c.document_type)
            }),
        };
        if let Some(document_type) = choice {
            tracing::info!(document_type = %document_type, "Using address proof document");
            seq.dispatch(Action::SelectAddressDocument(document_type))
                .await?;
        }
    }
    let address = seq
        .upload_context()
        .map(|ctx| ctx.address_keys())
        .unwrap_or_default();
    upload(seq, options, address, &mut uploaded).await?;
    seq.dispatch(Action::Submit).await?;

    let session = seq.session();
    Ok(JourneySummary {
        request_id: session
            .link_request_id()
            .unwrap_or(options.link.as_str())
            .to_string(),
        stage: seq.tag().to_string(),
        consent_submitted: session.consent_submitted(),
        uploaded,
        warnings: seq
            .tolerated_failures()
            .iter()
            .map(|e| JourneyWarning {
                code: e.error_code().to_string(),
                message: e.to_string(),
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_file_argument() {
        let arg: FileArg = "AADHAR_CARD:FRONT=./scans/front.jpg".parse().unwrap();
        assert_eq!(arg.collection, None);
        assert_eq!(arg.document_type, DocumentType::new("AADHAR_CARD"));
        assert_eq!(arg.file_type, FileType::Front);
        assert_eq!(arg.path, PathBuf::from("./scans/front.jpg"));

        let arg: FileArg = "address_proof/light_bill:document=bill.pdf".parse().unwrap();
        assert_eq!(arg.collection, Some(CollectionType::AddressProof));
        assert_eq!(arg.document_type, DocumentType::new("LIGHT_BILL"));
        assert_eq!(arg.file_type, FileType::Document);
    }

    #[test]
    fn path_may_contain_separators() {
        let arg: FileArg = "PAN_CARD:FRONT=C:/docs/pan=1.png".parse().unwrap();
        assert_eq!(arg.path, PathBuf::from("C:/docs/pan=1.png"));
    }

    #[test]
    fn rejects_malformed_file_arguments() {
        assert!("AADHAR_CARD=front.jpg".parse::<FileArg>().is_err());
        assert!("AADHAR_CARD:FRONT".parse::<FileArg>().is_err());
        assert!(":FRONT=front.jpg".parse::<FileArg>().is_err());
        assert!("AADHAR_CARD:FRONT= ".parse::<FileArg>().is_err());
        assert!("/AADHAR_CARD:FRONT=front.jpg".parse::<FileArg>().is_err());
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(content_type_for(Path::new("a.pdf")), Some("application/pdf"));
        assert_eq!(content_type_for(Path::new("a.docx")), None);
        assert_eq!(content_type_for(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn loads_candidate_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bill.pdf");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();

        let candidate = load_candidate(&path).await.unwrap();
        assert_eq!(candidate.file_name, "bill.pdf");
        assert_eq!(candidate.size_bytes, 13);
        assert_eq!(candidate.content_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_candidate(&dir.path().join("absent.jpg"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn journey_requires_a_file_per_slot() {
        let options = JourneyOptions {
            files: vec!["AADHAR_CARD:FRONT=front.jpg".parse().unwrap()],
            ..Default::default()
        };
        assert!(options
            .file_for(&SlotKey::id_proof("AADHAR_CARD", FileType::Front))
            .is_ok());
        let err = options
            .file_for(&SlotKey::id_proof("AADHAR_CARD", FileType::Back))
            .unwrap_err();
        assert!(err.to_string().contains("--file AADHAR_CARD:BACK=<path>"));
    }

    #[test]
    fn collection_specific_file_wins() {
        let options = JourneyOptions {
            files: vec![
                "AADHAR_CARD:FRONT=id.jpg".parse().unwrap(),
                "ADDRESS_PROOF/AADHAR_CARD:FRONT=address.pdf".parse().unwrap(),
            ],
            ..Default::default()
        };
        assert_eq!(
            options
                .file_for(&SlotKey::id_proof("AADHAR_CARD", FileType::Front))
                .unwrap(),
            Path::new("id.jpg")
        );
        assert_eq!(
            options
                .file_for(&SlotKey::address_proof("AADHAR_CARD", FileType::Front))
                .unwrap(),
            Path::new("address.pdf")
        );
    }

    /// Service whose every case link has expired.
    struct ExpiredLinks;

    #[async_trait::async_trait]
    impl VerificationService for ExpiredLinks {
        async fn resolve_customer(
            &self,
            _link_id: &str,
        ) -> docverify_core::service::ServiceResult<docverify_core::CustomerLink> {
            Err(docverify_core::ServiceError::LinkExpired)
        }

        async fn send_otp(&self, _request_id: &str) -> docverify_core::service::ServiceResult<()> {
            Err(unreachable_call())
        }

        async fn resend_otp(&self, _request_id: &str) -> docverify_core::service::ServiceResult<()> {
            Err(unreachable_call())
        }

        async fn verify_otp(
            &self,
            _request_id: &str,
            _otp: &str,
        ) -> docverify_core::service::ServiceResult<docverify_core::models::OtpVerification> {
            Err(unreachable_call())
        }

        async fn submit_consent(
            &self,
            _request_id: &str,
            _token: &str,
            _consent: &ConsentRequest,
        ) -> docverify_core::service::ServiceResult<()> {
            Err(unreachable_call())
        }

        async fn fetch_requirements(
            &self,
            _request_id: &str,
        ) -> docverify_core::service::ServiceResult<docverify_core::RequirementSchema> {
            Err(unreachable_call())
        }

        async fn upload_file(
            &self,
            _request_id: &str,
            _document_type: &DocumentType,
            _file_type: &FileType,
            _file: &FileCandidate,
        ) -> docverify_core::service::ServiceResult<String> {
            Err(unreachable_call())
        }

        async fn submit_documents(
            &self,
            _request_id: &str,
            _submission: &docverify_core::models::DocumentSubmission,
        ) -> docverify_core::service::ServiceResult<()> {
            Err(unreachable_call())
        }
    }

    fn unreachable_call() -> docverify_core::ServiceError {
        docverify_core::ServiceError::Transport("not expected in this test".to_string())
    }

    #[tokio::test]
    async fn expired_link_stops_journey_with_workflow_error() {
        let mut seq = StageSequencer::new(
            std::sync::Arc::new(ExpiredLinks),
            docverify_core::WorkflowConfig::default(),
            docverify_workflow::Notifier::disabled(),
        );
        let options = JourneyOptions {
            link: "R404".to_string(),
            otp: "1234".to_string(),
            ..Default::default()
        };

        let err = run_journey(&mut seq, &options).await.unwrap_err();
        let workflow = err.downcast_ref::<docverify_core::WorkflowError>().unwrap();
        assert_eq!(workflow, &docverify_core::WorkflowError::LinkInvalidOrExpired);
        assert_eq!(workflow.error_code(), "LINK_EXPIRED");
        assert!(workflow.client_message().contains("Contact your dealer"));
    }
}
