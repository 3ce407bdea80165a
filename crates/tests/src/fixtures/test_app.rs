use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::bail;
use async_trait::async_trait;
use diascribe_services::ApproxTokenCounter;
use diascribe_transcription::{
    BackendResult, DiarizationConfig, JobStatus, LanguageModel, ObjectStorage, ResultFile,
    ResultKind, TranscriptionBackend, TranscriptionConfig, TranscriptionEngine,
};
use tempfile::TempDir;

/// In-memory blob store. URLs look like `memory://<container>/<blob>`.
#[derive(Default)]
pub struct MemoryStorage {
    pub containers: Mutex<Vec<String>>,
    /// Containers removed after a run. Blobs stay readable for assertions.
    pub deleted: Mutex<Vec<String>>,
    pub blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_uploads: bool,
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn create_container(&self, name: &str) -> anyhow::Result<String> {
        self.containers.lock().unwrap().push(name.to_string());
        Ok(name.to_string())
    }

    async fn upload(
        &self,
        container: &str,
        name: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> anyhow::Result<String> {
        if self.fail_uploads {
            bail!("storage quota exceeded");
        }
        let url = format!("memory://{}/{}", container, name);
        self.blobs.lock().unwrap().insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete_container(&self, name: &str) -> anyhow::Result<()> {
        self.deleted.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

/// Speech backend that answers from a blob-name → phrases script.
///
/// Result files are listed in reverse submission order so callers must map
/// them back by source.
#[derive(Default)]
pub struct ScriptedSpeech {
    pub script: HashMap<String, Vec<(String, String)>>,
    pub fail_reason: Option<String>,
    pub submitted: Mutex<Vec<String>>,
    pub polls: AtomicUsize,
}

impl ScriptedSpeech {
    pub fn with_script(script: Vec<(&str, Vec<(String, String)>)>) -> Self {
        Self {
            script: script
                .into_iter()
                .map(|(name, phrases)| (name.to_string(), phrases))
                .collect(),
            ..Default::default()
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            fail_reason: Some(reason.to_string()),
            ..Default::default()
        }
    }
}

fn blob_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[async_trait]
impl TranscriptionBackend for ScriptedSpeech {
    async fn submit(&self, sources: &[String], _config: &DiarizationConfig) -> anyhow::Result<String> {
        self.submitted.lock().unwrap().extend(sources.iter().cloned());
        Ok("job-1".to_string())
    }

    async fn poll(&self, _job_id: &str) -> anyhow::Result<JobStatus> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst);
        if n == 0 {
            return Ok(JobStatus::Running);
        }
        Ok(match &self.fail_reason {
            Some(reason) => JobStatus::Failed {
                reason: reason.clone(),
            },
            None => JobStatus::Succeeded,
        })
    }

    async fn list_result_files(&self, _job_id: &str) -> anyhow::Result<Vec<ResultFile>> {
        let submitted = self.submitted.lock().unwrap();
        let mut files: Vec<ResultFile> = submitted
            .iter()
            .enumerate()
            .map(|(i, source)| ResultFile {
                kind: ResultKind::Transcription,
                name: format!("contenturl_{}.json", i),
                content_url: source.clone(),
            })
            .collect();
        files.reverse();
        files.push(ResultFile {
            kind: ResultKind::Report,
            name: "report.json".to_string(),
            content_url: "memory://report".to_string(),
        });
        Ok(files)
    }

    async fn fetch_result(&self, file: &ResultFile) -> anyhow::Result<BackendResult> {
        let phrases = self
            .script
            .get(blob_name(&file.content_url))
            .cloned()
            .unwrap_or_default();
        let display_text = phrases
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(BackendResult {
            source: Some(file.content_url.clone()),
            display_text,
            phrases,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Language model that echoes the prompt's current text back, optionally
/// swapping two speaker labels on a given call.
#[derive(Default)]
pub struct EchoModel {
    pub prompts: Mutex<Vec<String>>,
    /// `(call index, label a, label b)`
    pub swaps: Vec<(usize, String, String)>,
}

impl EchoModel {
    pub fn swapping(call: usize, a: &str, b: &str) -> Self {
        Self {
            swaps: vec![(call, a.to_string(), b.to_string())],
            ..Default::default()
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

fn current_text(prompt: &str) -> &str {
    let after = prompt
        .split_once("Current text:\n")
        .map_or("", |(_, rest)| rest);
    after.rsplit_once("\n\n").map_or(after, |(current, _)| current)
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn complete(&self, prompt: &str, _max_tokens: u32, _temperature: f32) -> anyhow::Result<String> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };

        let mut lines = Vec::new();
        for line in current_text(prompt).lines() {
            let Some((speaker, text)) = line.split_once(':') else {
                continue;
            };
            let mut speaker = speaker.to_string();
            for (at, a, b) in &self.swaps {
                if *at == call {
                    if speaker == *a {
                        speaker = b.clone();
                    } else if speaker == *b {
                        speaker = a.clone();
                    }
                }
            }
            lines.push(format!("{}:{}", speaker, text));
        }
        Ok(lines.join("\n"))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

/// Engine wired to in-memory collaborators, with a scratch directory.
pub struct TestApp {
    pub dir: TempDir,
    pub storage: Arc<MemoryStorage>,
    pub speech: Arc<ScriptedSpeech>,
    pub model: Arc<EchoModel>,
}

impl TestApp {
    pub fn new(storage: MemoryStorage, speech: ScriptedSpeech, model: EchoModel) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            storage: Arc::new(storage),
            speech: Arc::new(speech),
            model: Arc::new(model),
        }
    }

    pub fn config(&self, max_chunk_bytes: u64) -> TranscriptionConfig {
        TranscriptionConfig {
            max_chunk_bytes,
            poll_interval: Duration::from_millis(5),
            audit_dir: self.dir.path().join("transcripts"),
            ..Default::default()
        }
    }

    pub fn engine(&self, config: TranscriptionConfig) -> TranscriptionEngine {
        TranscriptionEngine::new(
            self.storage.clone(),
            self.speech.clone(),
            self.model.clone(),
            Arc::new(ApproxTokenCounter),
            config,
        )
    }
}
