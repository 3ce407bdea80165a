use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::LanguageModel;
use crate::config::ReconcilerConfig;
use crate::error::{ReconcileError, TranscriptionError, TranscriptionResult};
use crate::prompt::{RELABEL_INSTRUCTIONS, SPEAKER_PREFIX, TokenCounter, build_prompt};
use crate::transcript::{ChunkTranscript, Transcript, TranscriptEntry};

/// A `Speaker <id>: <text>` line parsed out of a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerLine {
    /// Everything before the first colon, e.g. "Speaker 2".
    pub speaker: String,
    pub text: String,
}

/// Extracts speaker lines from a relabeling response, ignoring everything else.
pub fn parse_speaker_lines(response: &str) -> Vec<SpeakerLine> {
    response
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(SPEAKER_PREFIX))
        .filter_map(|line| line.split_once(':'))
        .map(|(speaker, text)| SpeakerLine {
            speaker: speaker.trim().to_string(),
            text: text.trim().to_string(),
        })
        .collect()
}

/// Append-only mapping from model-reported labels to canonical ids.
#[derive(Debug, Default)]
pub struct SpeakerRegistry {
    by_label: HashMap<String, String>,
    order: Vec<String>,
}

impl SpeakerRegistry {
    /// Returns the canonical id for `label`, assigning `Speaker N` on first sight.
    pub fn resolve(&mut self, label: &str) -> String {
        if let Some(id) = self.by_label.get(label) {
            return id.clone();
        }
        let id = format!("Speaker {}", self.order.len() + 1);
        self.by_label.insert(label.to_string(), id.clone());
        self.order.push(id.clone());
        id
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.by_label.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Canonical ids in assignment order.
    pub fn canonical_ids(&self) -> &[String] {
        &self.order
    }
}

/// Relabels chunk-local speakers with canonical ids, one chunk at a time.
///
/// Identity across chunks is whatever the language model infers from the
/// previous chunk's reconciled tail; nothing here verifies it.
pub struct Reconciler {
    model: Arc<dyn LanguageModel>,
    counter: Arc<dyn TokenCounter>,
    config: ReconcilerConfig,
    registry: SpeakerRegistry,
    tail: String,
    entries: Vec<TranscriptEntry>,
    next_chunk: usize,
}

impl Reconciler {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        counter: Arc<dyn TokenCounter>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            model,
            counter,
            config,
            registry: SpeakerRegistry::default(),
            tail: String::new(),
            entries: Vec::new(),
            next_chunk: 0,
        }
    }

    pub fn registry(&self) -> &SpeakerRegistry {
        &self.registry
    }

    /// Reconciles the next chunk and returns the entries it produced.
    pub async fn reconcile_chunk(
        &mut self,
        chunk: &ChunkTranscript,
        cancel: &CancellationToken,
    ) -> TranscriptionResult<&[TranscriptEntry]> {
        let chunk_index = self.next_chunk;
        let first_new = self.entries.len();

        if chunk.segments.is_empty() {
            debug!(chunk_index, "No diarized speech in chunk, nothing to relabel");
            self.next_chunk += 1;
            return Ok(&[]);
        }

        let prompt = build_prompt(
            self.counter.as_ref(),
            &self.tail,
            &chunk.diarized_text(),
            RELABEL_INSTRUCTIONS,
            self.config.max_prompt_tokens,
        );
        debug!(
            chunk_index,
            prompt_tokens = self.counter.count_tokens(&prompt),
            "Relabeling chunk"
        );

        let completion = self.model.complete(
            &prompt,
            self.config.max_completion_tokens,
            self.config.temperature,
        );
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(chunk_index, "Relabeling cancelled");
                return Err(TranscriptionError::Cancelled);
            }
            response = completion => response
                .map_err(|e| TranscriptionError::LanguageModel(format!("{:#}", e)))?,
        };

        let lines = parse_speaker_lines(&response);
        if lines.is_empty() {
            warn!(chunk_index, model = %self.model.name(), "Relabeling response had no speaker lines");
            return Err(TranscriptionError::LanguageModel(
                "response contained no speaker lines".to_string(),
            ));
        }

        let known = self.registry.len();
        for (position, line) in lines.into_iter().enumerate() {
            let speaker = self.registry.resolve(&line.speaker);
            self.entries.push(TranscriptEntry {
                speaker,
                text: line.text,
                chunk_index,
                position,
            });
        }

        let emitted = &self.entries[first_new..];
        self.tail = emitted
            .iter()
            .map(|e| format!("{}: {}", e.speaker, e.text))
            .collect::<Vec<_>>()
            .join("\n");
        self.next_chunk += 1;

        info!(
            chunk_index,
            lines = emitted.len(),
            new_speakers = self.registry.len() - known,
            "Chunk reconciled"
        );
        Ok(emitted)
    }

    /// Reconciles every chunk in order and returns the final transcript.
    pub async fn reconcile_all(
        mut self,
        chunks: &[ChunkTranscript],
        cancel: &CancellationToken,
    ) -> Result<Transcript, ReconcileError> {
        for chunk in chunks {
            let outcome = self.reconcile_chunk(chunk, cancel).await.map(|_| ());
            if let Err(source) = outcome {
                return Err(ReconcileError {
                    failed_chunk: self.next_chunk,
                    completed: self.entries,
                    source,
                });
            }
        }
        Ok(self.finish())
    }

    /// Consumes the run's state into a transcript.
    pub fn finish(self) -> Transcript {
        Transcript {
            entries: self.entries,
            speakers: self.registry.order,
        }
    }
}
