use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::client::{ClientError, WorkoutApi};
use crate::model::UploadContext;
use crate::orchestrator::Waker;

/// How an upload ended, with the text to show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Completed(UploadContext),
    /// The backend (or the local extension check) rejected the file.
    Rejected(String),
    Failed(String),
}

impl UploadOutcome {
    pub fn from_result(result: Result<UploadContext, ClientError>) -> Self {
        match result {
            Ok(ctx) => UploadOutcome::Completed(ctx),
            Err(ClientError::InvalidExport(messages)) if messages.is_empty() => {
                UploadOutcome::Rejected("This is not an Apple Health Export!".to_string())
            }
            Err(ClientError::InvalidExport(messages)) => UploadOutcome::Rejected(format!(
                "Error(s) occurred when uploading the export:\n{}",
                messages.join("\n")
            )),
            Err(e @ ClientError::UnsupportedArchive(_)) => UploadOutcome::Rejected(e.to_string()),
            Err(e) => {
                log::error!("Upload failed: {e}");
                UploadOutcome::Failed("An unexpected error occurred.".to_string())
            }
        }
    }

    pub fn message(&self) -> String {
        match self {
            UploadOutcome::Completed(ctx) => format!(
                "Export processed in {:.0} s",
                ctx.processing_time
            ),
            UploadOutcome::Rejected(msg) | UploadOutcome::Failed(msg) => msg.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Completed(_))
    }
}

/// A running upload. The outcome is delivered once.
pub struct UploadTask {
    file: PathBuf,
    rx: Receiver<UploadOutcome>,
}

impl UploadTask {
    pub fn spawn(api: Arc<dyn WorkoutApi>, file: PathBuf, waker: Option<Waker>) -> Self {
        let (tx, rx) = mpsc::channel();
        let path = file.clone();
        thread::spawn(move || {
            let outcome = UploadOutcome::from_result(api.upload_export(&path));
            if tx.send(outcome).is_ok() {
                if let Some(wake) = waker {
                    wake();
                }
            }
        });
        Self { file, rx }
    }

    pub fn file(&self) -> &PathBuf {
        &self.file
    }

    /// The outcome if the upload has finished.
    pub fn try_outcome(&self) -> Option<UploadOutcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(UploadOutcome::Failed("An unexpected error occurred.".to_string()))
            }
        }
    }

    pub fn wait(&self, timeout: Duration) -> Option<UploadOutcome> {
        self.rx.recv_timeout(timeout).ok()
    }
}
