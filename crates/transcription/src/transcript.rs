use serde::{Deserialize, Serialize};

/// A run of text attributed to one chunk-local speaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiarizedSegment {
    /// Speaker label as reported by the backend, meaningful only inside its chunk.
    pub speaker_label: String,
    pub text: String,
    pub chunk_index: usize,
    /// Position of the segment within its chunk.
    pub position: usize,
}

/// Orchestrator output for one submitted source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkTranscript {
    pub source: String,
    /// Backend's combined display text for the whole source.
    pub text: String,
    pub segments: Vec<DiarizedSegment>,
}

impl ChunkTranscript {
    /// Renders the segments as `Speaker <label>: <text>` lines.
    pub fn diarized_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| format!("Speaker {}: {}", s.speaker_label, s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One reconciled line of the final transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Canonical id, e.g. "Speaker 2".
    pub speaker: String,
    pub text: String,
    pub chunk_index: usize,
    pub position: usize,
}

/// The final artifact: reconciled entries in chunk-then-position order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub entries: Vec<TranscriptEntry>,
    /// Canonical speaker ids in the order they were assigned.
    pub speakers: Vec<String>,
}

impl Transcript {
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {}", e.speaker, e.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Merges consecutive segments that share a speaker label.
///
/// Input is the backend's phrase list in order; positions are renumbered
/// after merging.
pub fn merge_consecutive(chunk_index: usize, phrases: Vec<(String, String)>) -> Vec<DiarizedSegment> {
    let mut merged: Vec<DiarizedSegment> = Vec::with_capacity(phrases.len());
    for (label, text) in phrases {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.speaker_label == label => {
                last.text.push(' ');
                last.text.push_str(text);
            }
            _ => {
                let position = merged.len();
                merged.push(DiarizedSegment {
                    speaker_label: label,
                    text: text.to_string(),
                    chunk_index,
                    position,
                });
            }
        }
    }
    merged
}
