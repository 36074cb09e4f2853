//! Test helpers for workflow integration tests
//!
//! Provides an in-memory verification service with call recording and scripted
//! failures, plus fixtures for schemas, files and pre-driven sequencers.

#![allow(dead_code)]

use async_trait::async_trait;
use docverify_core::error::ServiceOperation;
use docverify_core::models::{ConsentRequest, DocumentSubmission, OtpVerification};
use docverify_core::service::ServiceResult;
use docverify_core::{
    CustomerLink, DocumentType, FileCandidate, FileType, RequirementSchema, ServiceError,
    VerificationService, WorkflowConfig,
};
use docverify_workflow::{Action, Notification, Notifier, StageSequencer, StageTag};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::UnboundedReceiver;

pub const OTP: &str = "1234";
pub const TOKEN: &str = "jwt-token";

/// One recorded service call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub operation: ServiceOperation,
    pub request_id: String,
    pub detail: Option<String>,
}

/// In-memory verification service
#[derive(Default)]
pub struct MockVerificationService {
    customers: Mutex<HashMap<String, ServiceResult<CustomerLink>>>,
    schema: Mutex<RequirementSchema>,
    failures: Mutex<HashMap<ServiceOperation, VecDeque<ServiceError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    submissions: Mutex<Vec<DocumentSubmission>>,
    consents: Mutex<Vec<ConsentRequest>>,
    next_file: Mutex<u64>,
}

impl MockVerificationService {
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.schema.lock().unwrap() = standard_schema();
        mock
    }

    /// Make `link_id` resolvable to a case with the same request id.
    pub fn with_customer(self, link_id: &str, mobile: &str) -> Self {
        self.customers.lock().unwrap().insert(
            link_id.to_string(),
            Ok(CustomerLink {
                request_id: link_id.to_string(),
                mobile_number: mobile.to_string(),
            }),
        );
        self
    }

    pub fn with_expired_link(self, link_id: &str) -> Self {
        self.customers
            .lock()
            .unwrap()
            .insert(link_id.to_string(), Err(ServiceError::LinkExpired));
        self
    }

    pub fn with_schema(self, schema: RequirementSchema) -> Self {
        *self.schema.lock().unwrap() = schema;
        self
    }

    /// Fail the next call of `operation` with `error`.
    pub fn fail_next(&self, operation: ServiceOperation, error: ServiceError) {
        self.failures
            .lock()
            .unwrap()
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: ServiceOperation) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn submissions(&self) -> Vec<DocumentSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn consents(&self) -> Vec<ConsentRequest> {
        self.consents.lock().unwrap().clone()
    }

    fn record(
        &self,
        operation: ServiceOperation,
        request_id: &str,
        detail: Option<String>,
    ) -> ServiceResult<()> {
        self.calls.lock().unwrap().push(RecordedCall {
            operation,
            request_id: request_id.to_string(),
            detail,
        });
        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VerificationService for MockVerificationService {
    async fn resolve_customer(&self, link_id: &str) -> ServiceResult<CustomerLink> {
        self.record(ServiceOperation::ResolveLink, link_id, None)?;
        self.customers
            .lock()
            .unwrap()
            .get(link_id)
            .cloned()
            .unwrap_or_else(|| {
                Err(ServiceError::Rejected {
                    status: 404,
                    message: "Customer not found".to_string(),
                })
            })
    }

    async fn send_otp(&self, request_id: &str) -> ServiceResult<()> {
        self.record(ServiceOperation::SendOtp, request_id, None)
    }

    async fn resend_otp(&self, request_id: &str) -> ServiceResult<()> {
        self.record(ServiceOperation::ResendOtp, request_id, None)
    }

    async fn verify_otp(&self, request_id: &str, otp: &str) -> ServiceResult<OtpVerification> {
        self.record(ServiceOperation::VerifyOtp, request_id, Some(otp.to_string()))?;
        if otp != OTP {
            return Err(ServiceError::Rejected {
                status: 400,
                message: "Invalid OTP".to_string(),
            });
        }
        Ok(OtpVerification {
            token: TOKEN.to_string(),
            request_id: Some(request_id.to_string()),
        })
    }

    async fn submit_consent(
        &self,
        request_id: &str,
        token: &str,
        consent: &ConsentRequest,
    ) -> ServiceResult<()> {
        self.record(
            ServiceOperation::SubmitConsent,
            request_id,
            Some(token.to_string()),
        )?;
        self.consents.lock().unwrap().push(*consent);
        Ok(())
    }

    async fn fetch_requirements(&self, request_id: &str) -> ServiceResult<RequirementSchema> {
        self.record(ServiceOperation::FetchRequirements, request_id, None)?;
        Ok(self.schema.lock().unwrap().clone())
    }

    async fn upload_file(
        &self,
        request_id: &str,
        document_type: &DocumentType,
        file_type: &FileType,
        file: &FileCandidate,
    ) -> ServiceResult<String> {
        self.record(
            ServiceOperation::UploadFile,
            request_id,
            Some(format!("{}/{}:{}", document_type, file_type, file.file_name)),
        )?;
        let mut next = self.next_file.lock().unwrap();
        *next += 1;
        Ok(format!("file-{}", *next))
    }

    async fn submit_documents(
        &self,
        request_id: &str,
        submission: &DocumentSubmission,
    ) -> ServiceResult<()> {
        self.record(ServiceOperation::SubmitDocuments, request_id, None)?;
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

/// Aadhaar front/back and PAN, two owned-house documents, and a rented branch.
pub fn standard_schema() -> RequirementSchema {
    RequirementSchema::from_value(json!({
        "collections": [
            {
                "collectionType": "ID_PROOF",
                "documents": [
                    {
                        "documentType": "AADHAR_CARD",
                        "codeLabel": "Enter Aadhaar Number",
                        "regex": "^[2-9]\\d{3}\\d{4}\\d{4}$",
                        "requiredFiles": [
                            {"fileType": "FRONT", "displayName": "Front", "allowedFileTypes": ["jpg", "png"], "maxFileSizeMB": 5},
                            {"fileType": "BACK", "displayName": "Back", "allowedFileTypes": ["jpg", "png"], "maxFileSizeMB": 5}
                        ]
                    },
                    {
                        "documentType": "PAN_CARD",
                        "regex": "^[A-Z]{5}\\d{4}[A-Z]$",
                        "requiredFiles": [
                            {"fileType": "FRONT", "displayName": "PAN", "allowedFileTypes": ["jpg", "png"], "maxFileSizeMB": 5}
                        ]
                    }
                ]
            },
            {
                "collectionType": "ADDRESS_PROOF",
                "documents": [
                    {"documentType": "LIGHT_BILL", "requiredFiles": [
                        {"fileType": "DOCUMENT", "displayName": "Light Bill", "allowedFileTypes": ["pdf", "jpg"], "maxFileSizeMB": 5}
                    ]},
                    {"documentType": "PASSPORT", "requiredFiles": [
                        {"fileType": "FRONT", "allowedFileTypes": ["jpg"], "maxFileSizeMB": 5},
                        {"fileType": "BACK", "allowedFileTypes": ["jpg"], "maxFileSizeMB": 5}
                    ]}
                ]
            },
            {
                "collectionType": "RENTED_ADDRESS_PROOF",
                "documents": [
                    {"documentType": "RENT_AGREEMENT", "requiredFiles": [
                        {"fileType": "DOCUMENT", "allowedFileTypes": ["pdf"], "maxFileSizeMB": 10}
                    ]},
                    {"documentType": "LIGHT_BILL", "requiredFiles": [
                        {"fileType": "DOCUMENT", "allowedFileTypes": ["pdf"], "maxFileSizeMB": 5}
                    ]}
                ]
            }
        ]
    }))
    .unwrap()
}

pub fn jpg(name: &str) -> FileCandidate {
    FileCandidate::new(format!("{}.jpg", name), vec![0xFFu8; 2048]).with_content_type("image/jpeg")
}

pub fn pdf(name: &str) -> FileCandidate {
    FileCandidate::new(format!("{}.pdf", name), vec![0x25u8; 4096])
        .with_content_type("application/pdf")
}

pub type TestSequencer = StageSequencer<MockVerificationService>;

pub fn sequencer(
    mock: Arc<MockVerificationService>,
) -> (TestSequencer, UnboundedReceiver<Notification>) {
    let (notifier, rx) = Notifier::channel();
    (
        StageSequencer::new(mock, WorkflowConfig::default(), notifier),
        rx,
    )
}

/// Drain every notification raised so far.
pub fn drain(rx: &mut UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut notes = Vec::new();
    while let Ok(note) = rx.try_recv() {
        notes.push(note);
    }
    notes
}

/// Open, resolve and send the OTP for `link_id`.
pub async fn drive_to_otp_entry(seq: &mut TestSequencer, link_id: &str) {
    seq.dispatch(Action::OpenLink(Some(link_id.to_string())))
        .await
        .unwrap();
    seq.dispatch(Action::ResolveLink).await.unwrap();
    seq.dispatch(Action::SendOtp).await.unwrap();
    assert_eq!(seq.tag(), StageTag::OtpEntry);
}

/// Continue through OTP and consent into upload step 1.
pub async fn drive_to_upload_step1(seq: &mut TestSequencer, link_id: &str) {
    drive_to_otp_entry(seq, link_id).await;
    seq.dispatch(Action::SubmitOtp(OTP.to_string()))
        .await
        .unwrap();
    seq.dispatch(Action::SubmitConsent(ConsentRequest {
        consent_checkbox: true,
        whatsapp_toggle: true,
        sms_toggle: false,
    }))
    .await
    .unwrap();
    assert_eq!(seq.tag(), StageTag::UploadStep1);
}
