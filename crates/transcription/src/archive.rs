use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::transcript::DiarizedSegment;

/// Writes one plain-text audit file per fetched result.
#[derive(Debug, Clone)]
pub struct TranscriptArchive {
    dir: PathBuf,
}

impl TranscriptArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<result stem>_<YYYYMMDD_HHMMSS>.txt`
    pub fn file_name(result_name: &str, at: DateTime<Local>) -> String {
        let stem = Path::new(result_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(result_name);
        format!("{}_{}.txt", stem, at.format("%Y%m%d_%H%M%S"))
    }

    pub fn render(text: &str, segments: &[DiarizedSegment]) -> String {
        let mut out = String::from("Transcription Text:\n");
        out.push_str(text);
        out.push_str("\n\nSpeaker Information:\n");
        for segment in segments {
            out.push_str(&format!("Speaker {}: {}\n", segment.speaker_label, segment.text));
        }
        out
    }

    pub async fn save(
        &self,
        result_name: &str,
        text: &str,
        segments: &[DiarizedSegment],
    ) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(Self::file_name(result_name, Local::now()));
        tokio::fs::write(&path, Self::render(text, segments)).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn file_name_uses_result_stem_and_timestamp() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            TranscriptArchive::file_name("contenturl_0.json", at),
            "contenturl_0_20240309_140507.txt"
        );
    }

    #[tokio::test]
    async fn saved_file_has_both_sections() {
        let dir = tempfile::tempdir().unwrap();
        let archive = TranscriptArchive::new(dir.path().join("audit"));
        let segments = vec![DiarizedSegment {
            speaker_label: "1".into(),
            text: "Hello all.".into(),
            chunk_index: 0,
            position: 0,
        }];

        let path = archive.save("contenturl_0.json", "Hello all.", &segments).await.unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        assert_eq!(
            body,
            "Transcription Text:\nHello all.\n\nSpeaker Information:\nSpeaker 1: Hello all.\n"
        );
    }
}
