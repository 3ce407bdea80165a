use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use super::asset::AudioFormat;
use crate::error::{TranscriptionError, TranscriptionResult};

/// Interleaved 16-bit PCM decoded from a source payload.
pub(crate) struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Frame index corresponding to a millisecond offset, clamped to the end.
    pub fn frame_at(&self, ms: u64) -> usize {
        let frame = ms * self.sample_rate as u64 / 1000;
        (frame as usize).min(self.frames())
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.frames() as u64 * 1000 / self.sample_rate as u64
    }
}

fn unsupported(e: impl std::fmt::Display) -> TranscriptionError {
    TranscriptionError::UnsupportedFormat(e.to_string())
}

fn open(bytes: &[u8], format: &AudioFormat) -> TranscriptionResult<Box<dyn FormatReader>> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(format.extension());

    let opened = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(unsupported)?;
    Ok(opened.format)
}

/// Reads the duration from container metadata, decoding only when the
/// container does not record a frame count.
pub(crate) fn read_duration_ms(bytes: &[u8], format: &AudioFormat) -> TranscriptionResult<u64> {
    let reader = open(bytes, format)?;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| unsupported("no audio track"))?;

    if let (Some(frames), Some(rate)) = (track.codec_params.n_frames, track.codec_params.sample_rate) {
        if rate > 0 {
            return Ok(frames * 1000 / rate as u64);
        }
    }

    debug!(%format, "Container has no frame count, decoding to measure duration");
    Ok(decode(bytes, format)?.duration_ms())
}

/// Decodes the first audio track into interleaved i16 PCM.
pub(crate) fn decode(bytes: &[u8], format: &AudioFormat) -> TranscriptionResult<DecodedAudio> {
    let mut reader = open(bytes, format)?;
    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| unsupported("no audio track"))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(unsupported)?;

    let mut samples: Vec<i16> = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(unsupported(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;
                let mut buf = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!(error = %e, "Skipping undecodable packet");
            }
            Err(e) => return Err(unsupported(e)),
        }
    }

    if sample_rate == 0 || channels == 0 {
        return Err(unsupported("stream has no sample rate or channel layout"));
    }

    Ok(DecodedAudio {
        sample_rate,
        channels,
        samples,
    })
}
