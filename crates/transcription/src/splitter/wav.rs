use std::io::Cursor;

use crate::error::{TranscriptionError, TranscriptionResult};

fn io_err(e: hound::Error) -> TranscriptionError {
    match e {
        hound::Error::IoError(io) => TranscriptionError::Io(io),
        other => TranscriptionError::Io(std::io::Error::other(other)),
    }
}

/// Encodes interleaved 16-bit PCM as a WAV payload.
pub(crate) fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> TranscriptionResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::with_capacity(samples.len() * 2 + 44));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(io_err)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(io_err)?;
        }
        writer.finalize().map_err(io_err)?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_wav_reads_back() {
        let samples: Vec<i16> = (0..320).map(|i| (i * 10) as i16).collect();
        let bytes = encode_wav(&samples, 16000, 2).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.len(), 320);
    }
}
