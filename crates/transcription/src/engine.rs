use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::TranscriptArchive;
use crate::backend::{LanguageModel, ObjectStorage, TranscriptionBackend};
use crate::config::TranscriptionConfig;
use crate::error::{TranscriptionError, TranscriptionResult};
use crate::orchestrator::Orchestrator;
use crate::prompt::TokenCounter;
use crate::reconciler::Reconciler;
use crate::splitter::{self, AudioAsset, AudioChunk};
use crate::transcript::Transcript;

/// Runs the full pipeline for one asset at a time:
/// split → stage → transcribe → reconcile.
///
/// Clients are passed in at construction. Per-asset state (speaker
/// registry, context tail) lives inside each call, so concurrent calls
/// never share it.
pub struct TranscriptionEngine {
    storage: Arc<dyn ObjectStorage>,
    orchestrator: Orchestrator,
    model: Arc<dyn LanguageModel>,
    counter: Arc<dyn TokenCounter>,
    config: TranscriptionConfig,
}

impl TranscriptionEngine {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        backend: Arc<dyn TranscriptionBackend>,
        model: Arc<dyn LanguageModel>,
        counter: Arc<dyn TokenCounter>,
        config: TranscriptionConfig,
    ) -> Self {
        info!(
            backend = %backend.name(),
            model = %model.name(),
            max_chunk_bytes = config.max_chunk_bytes,
            "Transcription engine created"
        );

        let orchestrator = Orchestrator::new(
            backend,
            config.diarization.clone(),
            config.poll_interval,
        )
        .with_archive(TranscriptArchive::new(config.audit_dir.clone()));

        Self {
            storage,
            orchestrator,
            model,
            counter,
            config,
        }
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
        info!(
            %name,
            format = %asset.format,
            bytes = asset.byte_size(),
            duration_ms = asset.duration_ms,
            "Transcribing asset"
        );

        let max_chunk_bytes = self.config.max_chunk_bytes;
        let chunks = tokio::task::spawn_blocking(move || splitter::split(asset, max_chunk_bytes))
            .await
            .map_err(|e| TranscriptionError::Io(std::io::Error::other(e)))??;

        if let Some(dir) = &self.config.chunk_dir {
            splitter::write_chunks(dir, &chunks).await?;
        }

        let container = self.create_container().await?;
        let outcome = match self.stage(&container, chunks, cancel).await {
            Ok(sources) => self.orchestrator.transcribe(&sources, cancel).await,
            Err(e) => Err(e),
        };
        self.release(&container).await;
        let results = outcome?;

        let reconciler = Reconciler::new(
            self.model.clone(),
            self.counter.clone(),
            self.config.reconciler.clone(),
        );
        let transcript = reconciler.reconcile_all(&results, cancel).await.map_err(|e| {
            warn!(
                %name,
                failed_chunk = e.failed_chunk,
                reconciled_entries = e.completed.len(),
                "Reconciliation aborted"
            );
            TranscriptionError::from(e)
        })?;

        info!(
            %name,
            entries = transcript.entries.len(),
            speakers = transcript.speakers.len(),
            "Asset transcribed"
        );
        Ok(transcript)
    }

    async fn create_container(&self) -> TranscriptionResult<String> {
        let name = format!("{}-{}", self.config.container_prefix, Uuid::new_v4());
        self.storage
            .create_container(&name)
            .await
            .map_err(|e| TranscriptionError::Upload(format!("{:#}", e)))
    }

    /// Deletes the staging container once the job no longer needs it.
    /// Failures are logged only.
    async fn release(&self, container: &str) {
        match self.storage.delete_container(container).await {
            Ok(()) => debug!(%container, "Staging container deleted"),
            Err(e) => warn!(%container, error = %format!("{:#}", e), "Failed to delete staging container"),
        }
    }

    /// Uploads chunks into `container`; URLs come back in chunk order.
    async fn stage(
        &self,
        container: &str,
        chunks: Vec<AudioChunk>,
        cancel: &CancellationToken,
    ) -> TranscriptionResult<Vec<String>> {
        let upload_err = |e: anyhow::Error| TranscriptionError::Upload(format!("{:#}", e));
        debug!(%container, chunks = chunks.len(), "Staging chunks");

        let uploads = chunks.into_iter().map(|chunk| {
            let storage = Arc::clone(&self.storage);
            let container = container.to_string();
            async move {
                let name = chunk.file_name();
                let url = storage
                    .upload(&container, &name, chunk.bytes, chunk.format.mime_type())
                    .await?;
                debug!(index = chunk.index, %name, "Chunk uploaded");
                Ok::<_, anyhow::Error>(url)
            }
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TranscriptionError::Cancelled),
            urls = futures::future::try_join_all(uploads) => urls.map_err(upload_err),
        }
    }
}
