use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::DiarizationConfig;

/// Status of a remote batch transcription job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// Local view of a submitted job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionJob {
    pub id: String,
    pub status: JobStatus,
    /// Source URLs in submission order.
    pub sources: Vec<String>,
}

impl TranscriptionJob {
    pub fn new(id: String, sources: Vec<String>) -> Self {
        Self {
            id,
            status: JobStatus::Submitted,
            sources,
        }
    }

    /// Records a polled status. Terminal states are never left.
    pub fn advance(&mut self, status: JobStatus) -> &JobStatus {
        if !self.status.is_terminal() {
            self.status = status;
        }
        &self.status
    }
}

/// Kind of a file attached to a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    Transcription,
    Report,
    Other(String),
}

/// A file listed for a finished job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFile {
    pub kind: ResultKind,
    pub name: String,
    pub content_url: String,
}

/// Parsed content of one transcription result file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendResult {
    /// Source URL the result belongs to, when the backend reports it.
    pub source: Option<String>,
    /// Backend's pre-combined display text.
    pub display_text: String,
    /// `(speaker label, text)` per recognized phrase, in order.
    pub phrases: Vec<(String, String)>,
}

/// Batch speech-to-text service with diarization.
#[async_trait]
pub trait TranscriptionBackend: Send + Sync + 'static {
    /// Submits all sources as one job and returns its id.
    async fn submit(&self, sources: &[String], config: &DiarizationConfig) -> anyhow::Result<String>;

    async fn poll(&self, job_id: &str) -> anyhow::Result<JobStatus>;

    async fn list_result_files(&self, job_id: &str) -> anyhow::Result<Vec<ResultFile>>;

    /// Downloads and parses one result file.
    async fn fetch_result(&self, file: &ResultFile) -> anyhow::Result<BackendResult>;

    fn name(&self) -> &str;
}

/// Blob store that stages audio where the speech service can read it.
#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Creates a container and returns its handle (the container name).
    async fn create_container(&self, name: &str) -> anyhow::Result<String>;

    /// Uploads bytes and returns a URL the speech service can fetch.
    async fn upload(&self, container: &str, name: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String>;

    /// Removes a container and everything staged in it.
    async fn delete_container(&self, name: &str) -> anyhow::Result<()>;
}

/// Speech-to-text service that answers a single upload with plain text,
/// without diarization.
#[async_trait]
pub trait DirectTranscriber: Send + Sync + 'static {
    async fn transcribe(&self, file_name: &str, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

/// Text completion service used for speaker relabeling.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}
