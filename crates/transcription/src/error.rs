use thiserror::Error;

use crate::transcript::TranscriptEntry;

/// Failure taxonomy of the transcription pipeline.
///
/// Messages carry the backend-provided text only; reconciliation state
/// (registry, context tail) never ends up in an error.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload failed: {0}")]
    Upload(String),
    #[error("Transcription job failed: {0}")]
    JobFailed(String),
    #[error("Transcription backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Language model failure: {0}")]
    LanguageModel(String),
    #[error("Cancelled")]
    Cancelled,
}

impl TranscriptionError {
    /// Stable taxonomy name shown to users alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UnsupportedFormat",
            Self::Io(_) => "IOFailure",
            Self::Upload(_) => "UploadFailure",
            Self::JobFailed(_) => "TranscriptionJobFailed",
            Self::BackendUnavailable(_) => "BackendUnavailable",
            Self::LanguageModel(_) => "LanguageModelFailure",
            Self::Cancelled => "Cancelled",
        }
    }
}

pub type TranscriptionResult<T> = Result<T, TranscriptionError>;

/// A relabeling call failed part-way through an asset.
///
/// `completed` holds the entries of every chunk reconciled before the
/// failure so a best-effort caller can still surface them.
#[derive(Debug, Error)]
#[error("Reconciliation stopped at chunk {failed_chunk}: {source}")]
pub struct ReconcileError {
    pub failed_chunk: usize,
    pub completed: Vec<TranscriptEntry>,
    #[source]
    pub source: TranscriptionError,
}

impl From<ReconcileError> for TranscriptionError {
    fn from(err: ReconcileError) -> Self {
        err.source
    }
}
