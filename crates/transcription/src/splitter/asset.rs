use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::decode;
use crate::error::{TranscriptionError, TranscriptionResult};

/// Container/codec tag of an audio payload, derived from its file extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    M4a,
    Mp4,
    Aac,
    Webm,
    Other(String),
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Self::Wav,
            "mp3" => Self::Mp3,
            "flac" => Self::Flac,
            "ogg" | "oga" => Self::Ogg,
            "m4a" => Self::M4a,
            "mp4" => Self::Mp4,
            "aac" => Self::Aac,
            "webm" | "mkv" => Self::Webm,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Ogg => "ogg",
            Self::M4a => "m4a",
            Self::Mp4 => "mp4",
            Self::Aac => "aac",
            Self::Webm => "webm",
            Self::Other(ext) => ext,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
            Self::Flac => "audio/flac",
            Self::Ogg => "audio/ogg",
            Self::M4a | Self::Mp4 => "audio/mp4",
            Self::Aac => "audio/aac",
            Self::Webm => "audio/webm",
            Self::Other(_) => "application/octet-stream",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An ingested recording: raw bytes plus the facts the splitter needs.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    /// File stem, used to name chunks and staged blobs.
    pub name: String,
    pub format: AudioFormat,
    pub bytes: Vec<u8>,
    pub duration_ms: u64,
}

impl AudioAsset {
    /// Reads a file from disk and measures its duration.
    pub async fn load(path: impl AsRef<Path>) -> TranscriptionResult<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio")
            .to_string();
        let ext = path.extension().and_then(|s| s.to_str()).ok_or_else(|| {
            TranscriptionError::UnsupportedFormat(format!(
                "{} has no file extension",
                path.display()
            ))
        })?;
        let format = AudioFormat::from_extension(ext);
        let bytes = tokio::fs::read(path).await?;

        tokio::task::spawn_blocking(move || Self::from_bytes(name, format, bytes))
            .await
            .map_err(|e| TranscriptionError::Io(std::io::Error::other(e)))?
    }

    /// Builds an asset from in-memory bytes, probing the duration with the decoder.
    pub fn from_bytes(
        name: impl Into<String>,
        format: AudioFormat,
        bytes: Vec<u8>,
    ) -> TranscriptionResult<Self> {
        let duration_ms = decode::read_duration_ms(&bytes, &format)?;
        Ok(Self {
            name: name.into(),
            format,
            bytes,
            duration_ms,
        })
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_mapping_is_case_insensitive() {
        assert_eq!(AudioFormat::from_extension("M4A"), AudioFormat::M4a);
        assert_eq!(AudioFormat::from_extension("wav"), AudioFormat::Wav);
        assert_eq!(
            AudioFormat::from_extension("xyz"),
            AudioFormat::Other("xyz".into())
        );
        assert_eq!(AudioFormat::Webm.extension(), "webm");
    }

    #[test]
    fn garbage_bytes_are_rejected_as_unsupported() {
        let err = AudioAsset::from_bytes("noise", AudioFormat::Mp3, vec![0x42; 512]).unwrap_err();
        assert_eq!(err.kind(), "UnsupportedFormat");
    }
}
