use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::DirectTranscriber;
use crate::error::{TranscriptionError, TranscriptionResult};
use crate::splitter::{self, AudioAsset};
use crate::transcript::{Transcript, TranscriptEntry};

/// Label used for every entry of an undiarized transcript.
pub const SINGLE_SPEAKER: &str = "Speaker 1";

/// Synchronous, undiarized transcription: each chunk is sent straight to a
/// [`DirectTranscriber`] and the texts are concatenated in order.
///
/// No staging, no job polling and no speaker reconciliation. The whole
/// recording is attributed to one speaker.
pub struct DirectTranscription {
    transcriber: Arc<dyn DirectTranscriber>,
    max_chunk_bytes: u64,
    chunk_dir: Option<PathBuf>,
}

impl DirectTranscription {
    pub fn new(transcriber: Arc<dyn DirectTranscriber>, max_chunk_bytes: u64) -> Self {
        Self {
            transcriber,
            max_chunk_bytes,
            chunk_dir: None,
        }
    }

    /// Also writes the chunks under `<dir>/<name>_chunks/`.
    pub fn with_chunk_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.chunk_dir = dir;
        self
    }

    pub async fn transcribe_file(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> TranscriptionResult<Transcript> {
        let asset = AudioAsset::load(path).await?;
        self.transcribe(asset, cancel).await
    }

    pub async fn transcribe(
        &self,
        asset: AudioAsset,
        cancel: &CancellationToken,
    ) -> TranscriptionResult<Transcript> {
        let name = asset.name.clone();
        let max_chunk_bytes = self.max_chunk_bytes;
        let chunks = tokio::task::spawn_blocking(move || splitter::split(asset, max_chunk_bytes))
            .await
            .map_err(|e| TranscriptionError::Io(std::io::Error::other(e)))??;
        info!(
            %name,
            transcriber = %self.transcriber.name(),
            chunks = chunks.len(),
            "Transcribing without diarization"
        );
        if let Some(dir) = &self.chunk_dir {
            splitter::write_chunks(dir, &chunks).await?;
        }

        let mut entries = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let file_name = chunk.file_name();
            let request = self
                .transcriber
                .transcribe(&file_name, chunk.bytes, chunk.format.mime_type());
            let text = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TranscriptionError::Cancelled),
                text = request => text
                    .map_err(|e| TranscriptionError::BackendUnavailable(format!("{:#}", e)))?,
            };

            let text = text.trim();
            debug!(index = chunk.index, %file_name, chars = text.len(), "Chunk transcribed");
            if text.is_empty() {
                continue;
            }
            entries.push(TranscriptEntry {
                speaker: SINGLE_SPEAKER.to_string(),
                text: text.to_string(),
                chunk_index: chunk.index,
                position: 0,
            });
        }

        let speakers = if entries.is_empty() {
            Vec::new()
        } else {
            vec![SINGLE_SPEAKER.to_string()]
        };
        Ok(Transcript { entries, speakers })
    }
}
