//! Gated bit channel over a stream of 16-bit samples.
//!
//! A [`ChannelRule`] decides which samples qualify (magnitude at or above a
//! threshold) and how many low-order magnitude bits each qualifying sample
//! carries. The same [`Embedder`]/[`Extractor`] pair drives both the fixed
//! bootstrap rule and the configurable payload rule.
//!
//! Bytes are split into bit groups least significant group first; group `k`
//! of a byte lands in the `k`-th qualifying sample used for that byte.

use crate::metadata::EmbeddingParameters;
use std::io::{self, Read, Write};

/// Gate threshold of the bootstrap channel
pub const BOOTSTRAP_THRESHOLD: i32 = 0x800;

/// Which samples carry data and how many bits each one holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRule {
    threshold: i32,
    bits: u8,
    skip_min: bool,
}

impl ChannelRule {
    /// Rule for the metadata record and filename, readable without any prior knowledge
    pub const BOOTSTRAP: ChannelRule = ChannelRule {
        threshold: BOOTSTRAP_THRESHOLD,
        bits: 1,
        skip_min: true,
    };

    /// Rule for the payload, taken from decoded or caller-supplied parameters
    pub fn payload(params: &EmbeddingParameters) -> Self {
        Self {
            threshold: params.threshold(),
            bits: params.embed_bits(),
            skip_min: params.skip_min_neg_sample_value,
        }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Bits carried per qualifying sample
    pub fn bits(&self) -> u8 {
        self.bits
    }

    fn mask(&self) -> i32 {
        (1 << self.bits) - 1
    }

    /// Magnitude of a sample that passes the gate, `None` if it does not
    pub fn magnitude(&self, sample: i16) -> Option<i32> {
        if sample == i16::MIN {
            if self.skip_min {
                return None;
            }
            // |MIN| has no positive i16; MAX keeps the rewritten sample in range
            return Some(i16::MAX as i32).filter(|&mag| mag >= self.threshold);
        }
        let mag = (sample as i32).abs();
        (mag >= self.threshold).then_some(mag)
    }

    pub fn qualifies(&self, sample: i16) -> bool {
        self.magnitude(sample).is_some()
    }

    /// Overwrite the low bits of a qualifying sample with `group`, keeping the sign
    pub fn embed(&self, sample: i16, group: u8) -> Option<i16> {
        let mag = self.magnitude(sample)?;
        let mag = (mag & !self.mask()) | (group as i32 & self.mask());
        let signed = if sample >= 0 { mag } else { -mag };
        Some(signed as i16)
    }

    /// Read the bit group carried by a qualifying sample
    pub fn extract(&self, sample: i16) -> Option<u8> {
        self.magnitude(sample).map(|mag| (mag & self.mask()) as u8)
    }
}

/// Result of pushing a run of bytes through a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Complete,
    /// The sample stream ended with this many bits of the run still outstanding
    Exhausted { missing_bits: u64 },
}

/// Sequential little-endian sample reader bounded by the data chunk size
pub struct SampleReader<R> {
    inner: io::Take<R>,
    pending: Vec<u8>,
    samples_read: u64,
}

impl<R: Read> SampleReader<R> {
    pub fn new(inner: R, data_size: u64) -> Self {
        Self {
            inner: inner.take(data_size),
            pending: Vec::new(),
            samples_read: 0,
        }
    }

    /// Next sample, or `None` once the data chunk (or the file) is exhausted
    pub fn next_sample(&mut self) -> io::Result<Option<i16>> {
        let mut buf = [0u8; 2];
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        if filled < buf.len() {
            // odd trailing byte is not a sample; keep it for the tail copy
            self.pending.extend_from_slice(&buf[..filled]);
            return Ok(None);
        }
        self.samples_read += 1;
        Ok(Some(i16::from_le_bytes(buf)))
    }

    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// Bytes consumed but not returned as a sample, and the underlying
    /// stream positioned right after them
    pub fn into_tail(self) -> (Vec<u8>, R) {
        (self.pending, self.inner.into_inner())
    }
}

/// Counters kept while embedding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedStats {
    /// Samples read from the input and written to the output
    pub samples: u64,
    /// Samples that carried embedded bits
    pub carriers: u64,
}

/// Writes samples through to an output stream, hiding bits in the ones that qualify
pub struct Embedder<R, W> {
    samples: SampleReader<R>,
    out: W,
    stats: EmbedStats,
}

impl<R: Read, W: Write> Embedder<R, W> {
    pub fn new(samples: SampleReader<R>, out: W) -> Self {
        Self {
            samples,
            out,
            stats: EmbedStats::default(),
        }
    }

    /// Hide one byte; returns how many of its 8 bits made it in
    pub fn embed_byte(&mut self, rule: &ChannelRule, byte: u8) -> io::Result<u8> {
        let mut value = byte as u16;
        let mut embedded = 0u8;
        while embedded < 8 {
            let Some(sample) = self.samples.next_sample()? else {
                break;
            };
            let written = match rule.embed(sample, value as u8) {
                Some(modified) => {
                    value >>= rule.bits();
                    embedded += rule.bits();
                    self.stats.carriers += 1;
                    modified
                }
                None => sample,
            };
            self.out.write_all(&written.to_le_bytes())?;
            self.stats.samples += 1;
        }
        Ok(embedded)
    }

    /// Hide every byte of `data` in order
    pub fn embed_bytes(&mut self, rule: &ChannelRule, data: &[u8]) -> io::Result<Fill> {
        for (index, &byte) in data.iter().enumerate() {
            let embedded = self.embed_byte(rule, byte)?;
            if embedded < 8 {
                let outstanding = (data.len() - index) as u64 * 8 - embedded as u64;
                return Ok(Fill::Exhausted {
                    missing_bits: outstanding,
                });
            }
        }
        Ok(Fill::Complete)
    }

    pub fn stats(&self) -> EmbedStats {
        self.stats
    }

    pub fn into_parts(self) -> (SampleReader<R>, W, EmbedStats) {
        (self.samples, self.out, self.stats)
    }
}

/// Reads bits back out of the qualifying samples of a stream
pub struct Extractor<R> {
    samples: SampleReader<R>,
}

impl<R: Read> Extractor<R> {
    pub fn new(samples: SampleReader<R>) -> Self {
        Self { samples }
    }

    /// Assemble one byte; `Err(bits)` carries how many bits were found before
    /// the stream ran out
    pub fn extract_byte(&mut self, rule: &ChannelRule) -> io::Result<Result<u8, u8>> {
        let mut byte = 0u16;
        let mut shift = 0u8;
        while shift < 8 {
            let Some(sample) = self.samples.next_sample()? else {
                return Ok(Err(shift));
            };
            if let Some(group) = rule.extract(sample) {
                byte |= (group as u16) << shift;
                shift += rule.bits();
            }
        }
        Ok(Ok(byte as u8))
    }

    /// Fill `buf` completely
    pub fn extract_bytes(&mut self, rule: &ChannelRule, buf: &mut [u8]) -> io::Result<Fill> {
        let len = buf.len();
        for (index, slot) in buf.iter_mut().enumerate() {
            match self.extract_byte(rule)? {
                Ok(byte) => *slot = byte,
                Err(found) => {
                    return Ok(Fill::Exhausted {
                        missing_bits: (len - index) as u64 * 8 - found as u64,
                    })
                }
            }
        }
        Ok(Fill::Complete)
    }

    pub fn samples_read(&self) -> u64 {
        self.samples.samples_read()
    }
}
