pub mod archive;
pub mod backend;
pub mod config;
pub mod direct;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod prompt;
pub mod reconciler;
pub mod splitter;
pub mod transcript;

pub use backend::{
    BackendResult, DirectTranscriber, JobStatus, LanguageModel, ObjectStorage, ResultFile, ResultKind,
    TranscriptionBackend, TranscriptionJob,
};
pub use config::{DiarizationConfig, ReconcilerConfig, TranscriptionConfig};
pub use direct::DirectTranscription;
pub use engine::TranscriptionEngine;
pub use error::{ReconcileError, TranscriptionError, TranscriptionResult};
pub use orchestrator::Orchestrator;
pub use prompt::{TokenCounter, build_prompt};
pub use reconciler::{Reconciler, SpeakerRegistry};
pub use splitter::{AudioAsset, AudioChunk, AudioFormat};
pub use transcript::{ChunkTranscript, DiarizedSegment, Transcript, TranscriptEntry};
