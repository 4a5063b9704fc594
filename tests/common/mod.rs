#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

pub fn pcm16_spec(channels: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write a 16-bit PCM WAV holding `samples`
pub fn write_wav(path: &Path, channels: u16, samples: &[i16]) {
    let mut writer = WavWriter::create(path, pcm16_spec(channels)).unwrap();
    for &s in samples {
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// Alternating loud samples, all above every default gate
pub fn loud(count: usize) -> Vec<i16> {
    (0..count)
        .map(|i| if i % 2 == 0 { 5000 } else { -5000 })
        .collect()
}

/// Deterministic non-trivial payload bytes
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}
