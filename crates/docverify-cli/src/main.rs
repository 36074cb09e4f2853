//! DocVerify CLI: drives the verification journey against a live service.
//!
//! Set DOCVERIFY_API_URL (or API_URL). See `WorkflowConfig::from_env` for the rest.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use docverify_api_client::ApiClient;
use docverify_cli::{init_tracing, run_journey, FileArg, JourneyOptions};
use docverify_core::{
    DocumentType, ErrorMetadata, LogLevel, VerificationService, WorkflowConfig, WorkflowError,
};
use docverify_workflow::{NotificationLevel, Notifier, StageSequencer};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "docverify", about = "Customer document verification CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the document requirements of a case
    Requirements {
        /// Case request id
        #[arg(long)]
        request: String,
    },
    /// Run a complete journey: link, OTP, consent, uploads, submission
    Journey {
        /// Case link id
        #[arg(long)]
        link: String,
        /// 4-digit OTP received by SMS
        #[arg(long)]
        otp: String,
        /// Primary identity number (Aadhaar)
        #[arg(long)]
        primary_id: String,
        /// Secondary identity number (PAN)
        #[arg(long)]
        secondary_id: String,
        /// File per slot as [COLLECTION/]DOC:FILE=path, e.g. AADHAR_CARD:FRONT=front.jpg
        #[arg(long = "file", value_name = "[COLLECTION/]DOC:FILE=PATH")]
        files: Vec<FileArg>,
        /// Submit rented-house documents instead of an owned-house address proof
        #[arg(long)]
        rented: bool,
        /// Address proof document for an owned house (defaults to the first offered)
        #[arg(long)]
        address_doc: Option<String>,
        /// Opt in to WhatsApp updates
        #[arg(long)]
        whatsapp: bool,
        /// Opt in to SMS updates
        #[arg(long)]
        sms: bool,
    },
}

/// Log a failed journey the way its workflow error asks to be surfaced.
fn report_failure(err: &anyhow::Error) {
    let Some(workflow) = err.downcast_ref::<WorkflowError>() else {
        return;
    };
    let code = workflow.error_code();
    let recoverable = workflow.is_recoverable();
    let blocking = workflow.blocks_transition();
    match workflow.log_level() {
        LogLevel::Debug => {
            tracing::debug!(code, recoverable, blocking, error = %workflow, "Journey stopped")
        }
        LogLevel::Warn => {
            tracing::warn!(code, recoverable, blocking, error = %workflow, "Journey stopped")
        }
        LogLevel::Error => {
            tracing::error!(code, recoverable, blocking, error = %workflow, "Journey stopped")
        }
    }
    eprintln!("{}", workflow.client_message());
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = WorkflowConfig::from_env().context("Failed to load configuration")?;
    let client = Arc::new(
        ApiClient::from_config(&config)
            .context("Failed to create API client. Set DOCVERIFY_API_URL (or API_URL)")?,
    );

    let cli = Cli::parse();

    match cli.command {
        Commands::Requirements { request } => {
            let schema = client
                .fetch_requirements(&request)
                .await
                .context("Failed to fetch document requirements")?;
            print_json(&schema)?;
        }
        Commands::Journey {
            link,
            otp,
            primary_id,
            secondary_id,
            files,
            rented,
            address_doc,
            whatsapp,
            sms,
        } => {
            let (notifier, mut rx) = Notifier::channel();
            let printer = tokio::spawn(async move {
                while let Some(note) = rx.recv().await {
                    let marker = match note.level {
                        NotificationLevel::Success => "ok",
                        NotificationLevel::Error => "error",
                    };
                    eprintln!("[{}] {}", marker, note.message);
                }
            });

            let options = JourneyOptions {
                link,
                otp,
                primary_id,
                secondary_id,
                files,
                rented,
                address_document: address_doc.map(|d| DocumentType::new(d.to_uppercase())),
                whatsapp,
                sms,
            };
            let mut sequencer = StageSequencer::new(client, config, notifier);
            let result = run_journey(&mut sequencer, &options).await;

            // Closing the channel lets the printer finish.
            drop(sequencer);
            printer.await.ok();

            if let Err(e) = &result {
                report_failure(e);
            }
            print_json(&result?)?;
        }
    }

    Ok(())
}
