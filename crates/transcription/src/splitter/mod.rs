mod asset;
mod decode;
mod wav;

pub use asset::{AudioAsset, AudioFormat};
#[cfg(test)]
pub(crate) use wav::encode_wav;

use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::TranscriptionResult;

/// A time slice of an [`AudioAsset`], ready for upload.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub index: usize,
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Name of the asset this chunk was cut from.
    pub parent: String,
    /// Total number of chunks cut from the parent.
    pub total: usize,
}

impl AudioChunk {
    fn whole(asset: AudioAsset) -> Self {
        Self {
            index: 0,
            end_ms: asset.duration_ms,
            start_ms: 0,
            format: asset.format,
            bytes: asset.bytes,
            parent: asset.name,
            total: 1,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn byte_size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Upload/export name: the source name for an unsplit asset,
    /// `<parent>_chunk<n>.wav` (1-based) otherwise.
    pub fn file_name(&self) -> String {
        if self.total == 1 {
            format!("{}.{}", self.parent, self.format.extension())
        } else {
            format!("{}_chunk{}.{}", self.parent, self.index + 1, self.format.extension())
        }
    }
}

/// Computes chunk time ranges for an asset of `byte_size` bytes.
///
/// Returns a single `0..duration_ms` range when the asset fits, or when
/// the per-chunk duration would round down to zero.
pub fn plan_chunks(byte_size: u64, max_chunk_bytes: u64, duration_ms: u64) -> Vec<Range<u64>> {
    let max_chunk_bytes = max_chunk_bytes.max(1);
    if byte_size <= max_chunk_bytes {
        return vec![0..duration_ms];
    }

    let num_chunks = byte_size / max_chunk_bytes + 1;
    let chunk_duration = duration_ms / num_chunks;
    if chunk_duration == 0 {
        return vec![0..duration_ms];
    }

    (0..num_chunks)
        .map(|i| {
            let start = i * chunk_duration;
            let end = if i + 1 == num_chunks {
                duration_ms
            } else {
                start + chunk_duration
            };
            start..end
        })
        .collect()
}

/// Splits an asset into size-bounded chunks in timeline order.
///
/// Assets that fit in `max_chunk_bytes` come back as one chunk holding the
/// original bytes. Larger assets are decoded and every slice re-encoded as
/// 16-bit PCM WAV.
pub fn split(asset: AudioAsset, max_chunk_bytes: u64) -> TranscriptionResult<Vec<AudioChunk>> {
    let byte_size = asset.byte_size();
    let plan = plan_chunks(byte_size, max_chunk_bytes, asset.duration_ms);
    if plan.len() == 1 {
        if byte_size > max_chunk_bytes {
            warn!(
                name = %asset.name,
                duration_ms = asset.duration_ms,
                "Recording too short to split, submitting whole"
            );
        } else {
            debug!(name = %asset.name, byte_size, "Within size limit, no split needed");
        }
        return Ok(vec![AudioChunk::whole(asset)]);
    }

    info!(
        name = %asset.name,
        byte_size,
        max_chunk_bytes,
        chunks = plan.len(),
        "Splitting audio"
    );

    let decoded = decode::decode(&asset.bytes, &asset.format)?;
    let channels = decoded.channels as usize;
    let total = plan.len();

    let mut chunks = Vec::with_capacity(total);
    for (index, range) in plan.into_iter().enumerate() {
        let start_frame = decoded.frame_at(range.start);
        let end_frame = if index + 1 == total {
            decoded.frames()
        } else {
            decoded.frame_at(range.end)
        };
        let pcm = &decoded.samples[start_frame * channels..end_frame * channels];
        let bytes = wav::encode_wav(pcm, decoded.sample_rate, decoded.channels)?;

        debug!(
            index,
            start_ms = range.start,
            end_ms = range.end,
            bytes = bytes.len(),
            "Chunk exported"
        );
        chunks.push(AudioChunk {
            index,
            bytes,
            format: AudioFormat::Wav,
            start_ms: range.start,
            end_ms: range.end,
            parent: asset.name.clone(),
            total,
        });
    }

    Ok(chunks)
}

/// Writes chunks under `<dir>/<parent>_chunks/`.
///
/// If any write fails, files already written by this call are removed.
pub async fn write_chunks(dir: &Path, chunks: &[AudioChunk]) -> TranscriptionResult<Vec<PathBuf>> {
    let Some(first) = chunks.first() else {
        return Ok(Vec::new());
    };
    let out_dir = dir.join(format!("{}_chunks", first.parent));
    tokio::fs::create_dir_all(&out_dir).await?;

    let mut written = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let path = out_dir.join(chunk.file_name());
        if let Err(e) = tokio::fs::write(&path, &chunk.bytes).await {
            for stale in &written {
                let _ = tokio::fs::remove_file(stale).await;
            }
            return Err(e.into());
        }
        info!(path = %path.display(), duration_ms = chunk.duration_ms(), "Created chunk");
        written.push(path);
    }
    Ok(written)
}
