use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default payload ceiling accepted by the remote speech service.
pub const DEFAULT_MAX_CHUNK_BYTES: u64 = 25 * 1024 * 1024;

/// Diarization and recognition options submitted with every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizationConfig {
    pub speaker_count_min: u32,
    pub speaker_count_max: u32,
    /// BCP-47 locale of the recording (e.g. "uk-UA", "en-US").
    pub locale: String,
    pub punctuation_mode: String,
    pub profanity_filter_mode: String,
}

impl Default for DiarizationConfig {
    fn default() -> Self {
        Self {
            speaker_count_min: 1,
            speaker_count_max: 3,
            locale: "uk-UA".to_string(),
            punctuation_mode: "DictatedAndAutomatic".to_string(),
            profanity_filter_mode: "Masked".to_string(),
        }
    }
}

/// Settings for the speaker relabeling pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Token budget for the whole prompt (instructions + both context spans).
    pub max_prompt_tokens: usize,
    /// Completion length requested from the language model.
    pub max_completion_tokens: u32,
    pub temperature: f32,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_prompt_tokens: 4096,
            max_completion_tokens: 1000,
            temperature: 0.5,
        }
    }
}

/// Configuration for the chunked transcription pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Largest chunk payload the speech service accepts, in bytes.
    pub max_chunk_bytes: u64,
    /// Delay between job status polls.
    pub poll_interval: Duration,
    pub diarization: DiarizationConfig,
    pub reconciler: ReconcilerConfig,
    /// Directory for the per-result audit files.
    pub audit_dir: PathBuf,
    /// Prefix for the per-asset staging container name.
    pub container_prefix: String,
    /// When set, exported chunks are also written here.
    pub chunk_dir: Option<PathBuf>,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            poll_interval: Duration::from_secs(5),
            diarization: DiarizationConfig::default(),
            reconciler: ReconcilerConfig::default(),
            audit_dir: PathBuf::from("transcripts"),
            container_prefix: "diascribe".to_string(),
            chunk_dir: None,
        }
    }
}
