//! Encode and decode sequencing over already-open streams.
//!
//! ```text
//! encode: header → record (bootstrap rule) → filename (bootstrap rule)
//!         → payload (payload rule) → verbatim tail
//! decode: header → record → filename → payload
//! ```

use crate::channel::{ChannelRule, Embedder, Extractor, Fill, SampleReader};
use crate::error::{Phase, Result, WhisperError};
use crate::metadata::{EmbeddingParameters, MAX_FILENAME_LEN};
use crate::wav::WavHeader;
use serde::Serialize;
use std::io::{self, Read, Write};
use tracing::{debug, info, warn};

const CHUNK_SIZE: usize = 8192;

/// Caller overrides for the payload channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFactors {
    pub threshold_factor: u8,
    pub size_factor: u8,
}

/// The file being hidden: its recorded name, exact length and contents
pub struct Payload<'a, P> {
    pub name: &'a str,
    pub len: u64,
    pub reader: P,
}

/// Summary of a finished encode
#[derive(Debug, Clone)]
pub struct EncodeReport {
    pub header: WavHeader,
    pub params: EmbeddingParameters,
    /// Samples read while embedding (record, filename and payload)
    pub samples: u64,
    /// Samples that carry hidden bits
    pub carriers: u64,
    /// Data chunk samples after the payload, copied through untouched
    pub tail_samples: u64,
    /// Bytes copied through untouched after the payload, trailing chunks included
    pub tail_bytes: u64,
}

/// Parameters written for a container, with overrides already applied
pub fn resolve_parameters(
    header: &WavHeader,
    factors: Option<ChannelFactors>,
    filename_len: usize,
    payload_len: u64,
) -> Result<EmbeddingParameters> {
    let mut params = EmbeddingParameters::for_sample_bits(header.format.bits_per_sample)?;
    if let Some(f) = factors {
        params = params.with_factors(f.threshold_factor, f.size_factor)?;
    }
    params.with_payload(filename_len, payload_len)
}

fn phase_fill(fill: Fill, phase: Phase, pending_bits: u64) -> Result<()> {
    match fill {
        Fill::Complete => Ok(()),
        Fill::Exhausted { missing_bits } => Err(WhisperError::Capacity {
            phase,
            missing_bits: missing_bits + pending_bits,
        }),
    }
}

/// Hide `payload` in the samples of `container`, writing the result to `output`.
///
/// The container header is copied unchanged, and every byte after the last
/// sample used is copied verbatim so the output has the input's length.
pub fn encode<R, W, P>(
    mut container: R,
    output: W,
    payload: Payload<'_, P>,
    factors: Option<ChannelFactors>,
) -> Result<EncodeReport>
where
    R: Read,
    W: Write,
    P: Read,
{
    let header = WavHeader::read(&mut container).map_err(|e| e.in_phase(Phase::Header))?;
    let params = resolve_parameters(&header, factors, payload.name.len(), payload.len)?;
    debug!(?params, "resolved embedding parameters");

    let mut output = output;
    header
        .write(&mut output)
        .map_err(WhisperError::io_in(Phase::Header))?;

    let mut embedder = Embedder::new(
        SampleReader::new(container, header.data.size as u64),
        output,
    );

    let record = params.to_bytes();
    let fill = embedder
        .embed_bytes(&ChannelRule::BOOTSTRAP, &record)
        .map_err(WhisperError::io_in(Phase::Metadata))?;
    phase_fill(fill, Phase::Metadata, 0)?;
    debug!(samples = embedder.stats().samples, "metadata record written");

    let fill = embedder
        .embed_bytes(&ChannelRule::BOOTSTRAP, payload.name.as_bytes())
        .map_err(WhisperError::io_in(Phase::Filename))?;
    phase_fill(fill, Phase::Filename, 0)?;
    debug!(samples = embedder.stats().samples, name = payload.name, "filename written");

    let rule = ChannelRule::payload(&params);
    info!(
        threshold = rule.threshold(),
        bits = rule.bits(),
        bytes = payload.len,
        "embedding payload"
    );

    let mut reader = payload.reader;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut remaining = payload.len;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let chunk = &mut buf[..want];
        reader.read_exact(chunk).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                WhisperError::PhaseIo {
                    phase: Phase::Payload,
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "payload ended after {} of {} bytes",
                            payload.len - remaining,
                            payload.len
                        ),
                    ),
                }
            } else {
                WhisperError::PhaseIo {
                    phase: Phase::Payload,
                    source: e,
                }
            }
        })?;
        remaining -= want as u64;

        let fill = embedder
            .embed_bytes(&rule, chunk)
            .map_err(WhisperError::io_in(Phase::Payload))?;
        phase_fill(fill, Phase::Payload, remaining * 8)?;
    }

    let (samples, mut output, stats) = embedder.into_parts();
    let (pending, mut rest) = samples.into_tail();
    output
        .write_all(&pending)
        .map_err(WhisperError::io_in(Phase::TailCopy))?;
    let copied = io::copy(&mut rest, &mut output).map_err(WhisperError::io_in(Phase::TailCopy))?;
    output.flush().map_err(WhisperError::io_in(Phase::TailCopy))?;

    let tail_bytes = pending.len() as u64 + copied;
    let data_left = (header.data.size as u64).saturating_sub(stats.samples * 2);
    let tail_samples = data_left.min(tail_bytes) / 2;
    if tail_bytes < data_left {
        warn!(
            declared = header.data.size,
            missing = data_left - tail_bytes,
            "container is shorter than its data chunk declares"
        );
    }

    info!(
        samples = stats.samples,
        carriers = stats.carriers,
        tail_samples,
        tail_bytes,
        "encode complete"
    );

    Ok(EncodeReport {
        header,
        params,
        samples: stats.samples,
        carriers: stats.carriers,
        tail_samples,
        tail_bytes,
    })
}

/// Reduce a recorded filename to a single path component
fn safe_file_name(raw: &str) -> Option<&str> {
    let name = raw.rsplit(|c: char| c == '/' || c == '\\').next()?;
    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        return None;
    }
    Some(name)
}

/// A container whose bootstrap record and filename have been read
pub struct Decoder<R> {
    header: WavHeader,
    params: EmbeddingParameters,
    filename: String,
    extractor: Extractor<R>,
}

impl<R: Read> Decoder<R> {
    /// Read the header, the embedded record and the filename
    pub fn open(mut container: R) -> Result<Self> {
        let header = WavHeader::read(&mut container).map_err(|e| e.in_phase(Phase::Header))?;
        let mut extractor =
            Extractor::new(SampleReader::new(container, header.data.size as u64));

        let mut record = [0u8; EmbeddingParameters::SIZE];
        let fill = extractor
            .extract_bytes(&ChannelRule::BOOTSTRAP, &mut record)
            .map_err(WhisperError::io_in(Phase::Metadata))?;
        phase_fill(fill, Phase::Metadata, 0)?;
        let params = EmbeddingParameters::from_bytes(&record)?;
        info!(bytes = params.data_byte_count, "identified whisper content");
        debug!(?params, "decoded embedding parameters");

        let mut raw_name = vec![0u8; params.filename_size as usize];
        let fill = extractor
            .extract_bytes(&ChannelRule::BOOTSTRAP, &mut raw_name)
            .map_err(WhisperError::io_in(Phase::Filename))?;
        phase_fill(fill, Phase::Filename, 0)?;

        let raw_name = String::from_utf8(raw_name)
            .map_err(|_| WhisperError::Corrupt("embedded filename is not valid UTF-8".into()))?;
        let filename = safe_file_name(&raw_name)
            .ok_or_else(|| {
                WhisperError::Corrupt(format!("unusable embedded filename {:?}", raw_name))
            })?
            .to_string();
        if filename != raw_name {
            warn!(
                recorded = %raw_name,
                using = %filename,
                "stripped directories from embedded filename"
            );
        }

        Ok(Self {
            header,
            params,
            filename,
            extractor,
        })
    }

    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    pub fn params(&self) -> &EmbeddingParameters {
        &self.params
    }

    /// Name the payload was hidden under, reduced to a bare file name
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Stream the payload into `out`; returns the number of bytes written
    pub fn extract_to<W: Write>(self, out: &mut W) -> Result<u64> {
        let rule = ChannelRule::payload(&self.params);
        let mut extractor = self.extractor;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let total = self.params.data_byte_count as u64;
        let mut remaining = total;

        while remaining > 0 {
            let want = remaining.min(buf.len() as u64) as usize;
            let chunk = &mut buf[..want];
            let fill = extractor
                .extract_bytes(&rule, chunk)
                .map_err(WhisperError::io_in(Phase::Payload))?;
            remaining -= want as u64;
            phase_fill(fill, Phase::Payload, remaining * 8)?;
            out.write_all(chunk)
                .map_err(WhisperError::io_in(Phase::Payload))?;
        }
        out.flush().map_err(WhisperError::io_in(Phase::Payload))?;

        info!(
            bytes = total,
            samples = extractor.samples_read(),
            "decode complete"
        );
        Ok(total)
    }
}

/// How much a container can carry with a given filename length and overrides
#[derive(Debug, Clone, Serialize)]
pub struct CapacityReport {
    /// Sample slots read from the data chunk
    pub samples: u64,
    /// Bits needed by the record and filename
    pub bootstrap_bits: u64,
    /// Whether the record and filename fit at all
    pub bootstrap_fits: bool,
    /// Samples left after the bootstrap that pass the payload gate
    pub payload_carriers: u64,
    /// Whole payload bytes that fit
    pub payload_bytes: u64,
}

/// Count qualifying samples under the two-phase layout without writing anything
pub fn measure_capacity<R: Read>(
    mut container: R,
    factors: Option<ChannelFactors>,
    filename_len: usize,
) -> Result<CapacityReport> {
    if filename_len == 0 || filename_len > MAX_FILENAME_LEN {
        return Err(WhisperError::InvalidParameter(format!(
            "filename length must be 1 to {}, got {}",
            MAX_FILENAME_LEN, filename_len
        )));
    }
    let header = WavHeader::read(&mut container).map_err(|e| e.in_phase(Phase::Header))?;
    let mut params = EmbeddingParameters::for_sample_bits(header.format.bits_per_sample)?;
    if let Some(f) = factors {
        params = params.with_factors(f.threshold_factor, f.size_factor)?;
    }
    let rule = ChannelRule::payload(&params);

    let bootstrap_bits = (EmbeddingParameters::SIZE + filename_len) as u64 * 8;
    let mut bootstrap_left = bootstrap_bits;
    let mut payload_carriers = 0u64;
    let mut samples = SampleReader::new(container, header.data.size as u64);

    loop {
        let phase = if bootstrap_left > 0 {
            Phase::Metadata
        } else {
            Phase::Payload
        };
        let Some(sample) = samples.next_sample().map_err(WhisperError::io_in(phase))? else {
            break;
        };
        if bootstrap_left > 0 {
            if ChannelRule::BOOTSTRAP.qualifies(sample) {
                bootstrap_left -= 1;
            }
        } else if rule.qualifies(sample) {
            payload_carriers += 1;
        }
    }

    Ok(CapacityReport {
        samples: samples.samples_read(),
        bootstrap_bits,
        bootstrap_fits: bootstrap_left == 0,
        payload_carriers,
        payload_bytes: payload_carriers * rule.bits() as u64 / 8,
    })
}
