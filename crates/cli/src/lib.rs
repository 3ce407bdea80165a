use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use diascribe_config::Settings;
use diascribe_services::{
    ApproxTokenCounter, AzureBlobStorage, AzureSpeechBackend, OpenAiChatModel, OpenAiWhisper,
};
use diascribe_transcription::{
    DiarizationConfig, DirectTranscription, ReconcilerConfig, TokenCounter, TranscriptionConfig,
    TranscriptionEngine,
};
use tracing::warn;

#[derive(Debug, Parser)]
#[command(name = "diascribe", version, about = "Diarized transcription of long recordings")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split, transcribe and relabel speakers across the whole recording.
    Transcribe {
        file: PathBuf,
        /// Largest chunk sent to the speech service, in bytes.
        #[arg(long)]
        max_chunk_bytes: Option<u64>,
        /// Write the transcript here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Abort the run after this many seconds.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Also write the exported chunks next to the input file.
        #[arg(long)]
        keep_chunks: bool,
        /// Speech service to transcribe with.
        #[arg(long, value_enum, default_value_t = Service::Azure)]
        service: Service,
    },
    /// Only split the recording into chunk files.
    Split {
        file: PathBuf,
        #[arg(long)]
        max_chunk_bytes: Option<u64>,
        /// Parent directory for `<name>_chunks/`.
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Service {
    /// Batch diarization, then speaker relabeling across chunks.
    Azure,
    /// One request per chunk, single speaker, no relabeling.
    Whisper,
}

/// Pipeline configuration from loaded settings plus command-line overrides.
pub fn transcription_config(
    settings: &Settings,
    max_chunk_bytes: Option<u64>,
    chunk_dir: Option<PathBuf>,
) -> TranscriptionConfig {
    let speech = &settings.speech;
    let lm = &settings.language_model;

    TranscriptionConfig {
        max_chunk_bytes: max_chunk_bytes.unwrap_or(settings.pipeline.max_chunk_bytes),
        poll_interval: Duration::from_secs(speech.poll_interval_secs.max(1)),
        diarization: DiarizationConfig {
            speaker_count_min: speech.speaker_count_min,
            speaker_count_max: speech.speaker_count_max,
            locale: speech.locale.clone(),
            punctuation_mode: speech.punctuation_mode.clone(),
            profanity_filter_mode: speech.profanity_filter_mode.clone(),
        },
        reconciler: ReconcilerConfig {
            max_prompt_tokens: lm.context_window,
            max_completion_tokens: lm.max_completion_tokens,
            temperature: lm.temperature,
        },
        audit_dir: PathBuf::from(&settings.pipeline.audit_dir),
        container_prefix: settings.storage.container_prefix.clone(),
        chunk_dir: chunk_dir.or_else(|| settings.pipeline.chunk_dir.as_ref().map(PathBuf::from)),
    }
}

/// Directory that receives `<name>_chunks/` for `--keep-chunks`.
pub fn chunk_dir_for(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

pub fn token_counter(settings: &Settings) -> anyhow::Result<Arc<dyn TokenCounter>> {
    match &settings.language_model.tokenizer_path {
        #[cfg(feature = "hf-tokenizer")]
        Some(path) => Ok(Arc::new(diascribe_services::HfTokenCounter::from_file(path)?)),
        #[cfg(not(feature = "hf-tokenizer"))]
        Some(path) => {
            warn!(%path, "Built without hf-tokenizer, using approximate token counts");
            Ok(Arc::new(ApproxTokenCounter))
        }
        None => Ok(Arc::new(ApproxTokenCounter)),
    }
}

pub fn build_engine(settings: &Settings, config: TranscriptionConfig) -> anyhow::Result<TranscriptionEngine> {
    if settings.speech.subscription_key.is_empty() {
        warn!("No speech subscription key configured");
    }
    let model = OpenAiChatModel::from_settings(&settings.language_model);
    if !model.is_available() {
        warn!("No language model API key configured");
    }

    Ok(TranscriptionEngine::new(
        Arc::new(AzureBlobStorage::from_settings(&settings.storage)),
        Arc::new(AzureSpeechBackend::from_settings(&settings.speech)),
        Arc::new(model),
        token_counter(settings)?,
        config,
    ))
}

pub fn build_direct(settings: &Settings, config: &TranscriptionConfig) -> DirectTranscription {
    let whisper = OpenAiWhisper::from_settings(&settings.language_model, &settings.speech.locale);
    if !whisper.is_available() {
        warn!("No transcription API key configured");
    }
    DirectTranscription::new(Arc::new(whisper), config.max_chunk_bytes)
        .with_chunk_dir(config.chunk_dir.clone())
}
