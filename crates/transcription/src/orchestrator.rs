use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::archive::TranscriptArchive;
use crate::backend::{
    BackendResult, JobStatus, ResultFile, ResultKind, TranscriptionBackend, TranscriptionJob,
};
use crate::config::DiarizationConfig;
use crate::error::{TranscriptionError, TranscriptionResult};
use crate::transcript::{ChunkTranscript, merge_consecutive};

fn unavailable(e: anyhow::Error) -> TranscriptionError {
    TranscriptionError::BackendUnavailable(format!("{:#}", e))
}

fn without_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

/// Drives one batch job per call: submit, poll to a terminal state, fetch.
///
/// Holds no per-asset state, so one orchestrator can serve concurrent assets.
pub struct Orchestrator {
    backend: Arc<dyn TranscriptionBackend>,
    diarization: DiarizationConfig,
    poll_interval: Duration,
    archive: Option<TranscriptArchive>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn TranscriptionBackend>,
        diarization: DiarizationConfig,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            diarization,
            poll_interval,
            archive: None,
        }
    }

    /// Persists every fetched result as an audit file (best effort).
    pub fn with_archive(mut self, archive: TranscriptArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Transcribes all sources as a single job.
    ///
    /// Returns one entry per source, in submission order. Waits until the job
    /// is terminal; the only way out of a long-running job is `cancel`.
    pub async fn transcribe(
        &self,
        sources: &[String],
        cancel: &CancellationToken,
    ) -> TranscriptionResult<Vec<ChunkTranscript>> {
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let job_id = self
            .backend
            .submit(sources, &self.diarization)
            .await
            .map_err(unavailable)?;
        info!(
            %job_id,
            backend = %self.backend.name(),
            sources = sources.len(),
            "Transcription job submitted"
        );

        let mut job = TranscriptionJob::new(job_id, sources.to_vec());
        self.wait(&mut job, cancel).await?;

        match &job.status {
            JobStatus::Succeeded => self.collect(&job, cancel).await,
            JobStatus::Failed { reason } => {
                warn!(job_id = %job.id, %reason, "Transcription job failed");
                Err(TranscriptionError::JobFailed(reason.clone()))
            }
            other => Err(TranscriptionError::BackendUnavailable(format!(
                "job {} stopped in non-terminal state {:?}",
                job.id, other
            ))),
        }
    }

    async fn wait(&self, job: &mut TranscriptionJob, cancel: &CancellationToken) -> TranscriptionResult<()> {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(job_id = %job.id, "Polling cancelled");
                    return Err(TranscriptionError::Cancelled);
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(job_id = %job.id, "Polling cancelled");
                    return Err(TranscriptionError::Cancelled);
                }
                polled = self.backend.poll(&job.id) => polled.map_err(unavailable)?,
            };
            debug!(job_id = %job.id, ?status, "Job polled");
            if job.advance(status).is_terminal() {
                info!(job_id = %job.id, status = ?job.status, "Transcription job finished");
                return Ok(());
            }
        }
    }

    async fn collect(
        &self,
        job: &TranscriptionJob,
        cancel: &CancellationToken,
    ) -> TranscriptionResult<Vec<ChunkTranscript>> {
        let files: Vec<ResultFile> = self
            .backend
            .list_result_files(&job.id)
            .await
            .map_err(unavailable)?
            .into_iter()
            .filter(|f| f.kind == ResultKind::Transcription)
            .collect();

        let fetches = futures::future::try_join_all(files.into_iter().map(|file| async move {
            let result = self.backend.fetch_result(&file).await?;
            Ok::<_, anyhow::Error>((file, result))
        }));
        let fetched: Vec<(ResultFile, BackendResult)> = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TranscriptionError::Cancelled),
            fetched = fetches => fetched.map_err(unavailable)?,
        };

        let mut slots: Vec<Option<(ResultFile, BackendResult)>> = Vec::new();
        slots.resize_with(job.sources.len(), || None);
        let mut unmatched = Vec::new();
        for (file, result) in fetched {
            let index = result.source.as_deref().and_then(|src| {
                job.sources
                    .iter()
                    .position(|s| without_query(s) == without_query(src))
            });
            match index {
                Some(i) if slots[i].is_none() => slots[i] = Some((file, result)),
                _ => unmatched.push((file, result)),
            }
        }
        // Results without a recognisable source fill the gaps in listing order.
        let mut unmatched = unmatched.into_iter();
        for slot in slots.iter_mut().filter(|s| s.is_none()) {
            *slot = unmatched.next();
        }

        // A job missing any result fails as a whole, before anything is archived.
        if let Some(missing) = slots.iter().position(Option::is_none) {
            return Err(TranscriptionError::JobFailed(format!(
                "no transcription result for {}",
                without_query(&job.sources[missing])
            )));
        }

        let mut transcripts = Vec::with_capacity(slots.len());
        for (index, (file, result)) in slots.into_iter().flatten().enumerate() {
            let source = &job.sources[index];
            let segments = merge_consecutive(index, result.phrases);
            debug!(
                index,
                file = %file.name,
                segments = segments.len(),
                "Result fetched"
            );

            if let Some(archive) = &self.archive {
                match archive.save(&file.name, &result.display_text, &segments).await {
                    Ok(path) => debug!(path = %path.display(), "Audit transcript saved"),
                    Err(e) => warn!(file = %file.name, error = %e, "Failed to save audit transcript"),
                }
            }

            transcripts.push(ChunkTranscript {
                source: source.clone(),
                text: result.display_text,
                segments,
            });
        }

        Ok(transcripts)
    }
}
