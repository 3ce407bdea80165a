use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};

/// Writes a 16-bit PCM sine recording and returns its path.
pub fn write_wav(dir: &Path, name: &str, sample_rate: u32, channels: u16, seconds: u32) -> PathBuf {
    let path = dir.join(format!("{}.wav", name));
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&path, spec).unwrap();
    let frames = sample_rate as u64 * seconds as u64;
    for n in 0..frames {
        let t = n as f32 / sample_rate as f32;
        let sample = ((t * 440.0 * std::f32::consts::TAU).sin() * 8_000.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

/// A 90 s, 66 kHz mono recording: 11,880,044 bytes on disk.
pub fn long_call(dir: &Path) -> PathBuf {
    write_wav(dir, "long_call", 66_000, 1, 90)
}

/// A 2 s, 16 kHz mono recording.
pub fn short_call(dir: &Path) -> PathBuf {
    write_wav(dir, "short_call", 16_000, 1, 2)
}

/// Backend phrases `(speaker label, text)` for one chunk.
pub fn phrases(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(label, text)| (label.to_string(), text.to_string()))
        .collect()
}
