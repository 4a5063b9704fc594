use crate::cli::paths;
use crate::error::{Result, WhisperError};
use crate::metadata::EmbeddingParameters;
use crate::stego::Decoder;
use crate::wav::WavHeader;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Machine-readable view of a container
#[derive(Debug, Serialize)]
pub struct Inspection {
    pub file: String,
    /// RIFF, WAVE, fmt and data chunk identifiers, hex encoded
    pub tags: [String; 4],
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub data_size: u32,
    pub samples: u64,
    pub duration_secs: f64,
    pub content: Option<HiddenContent>,
}

/// What the bootstrap record and filename say about hidden content
#[derive(Debug, Serialize)]
pub struct HiddenContent {
    pub filename: String,
    pub payload_bytes: u32,
    pub threshold: i32,
    pub bits_per_sample: u8,
    pub params: EmbeddingParameters,
    /// The raw record, hex encoded
    pub record: String,
}

/// Read a container's header and, when present, its embedded record
pub fn inspect(path: &Path) -> Result<Inspection> {
    paths::require_regular_file(path, "container")?;
    let header = WavHeader::read(&mut BufReader::new(File::open(path)?))?;

    let content = match Decoder::open(BufReader::new(File::open(path)?)) {
        Ok(decoder) => {
            let params = *decoder.params();
            Some(HiddenContent {
                filename: decoder.filename().to_string(),
                payload_bytes: params.data_byte_count,
                threshold: params.threshold(),
                bits_per_sample: params.embed_bits(),
                params,
                record: hex::encode(params.to_bytes()),
            })
        }
        Err(e @ (WhisperError::Corrupt(_) | WhisperError::Capacity { .. })) => {
            debug!(error = %e, "no embedded content");
            None
        }
        Err(e) => return Err(e),
    };

    Ok(Inspection {
        file: path.display().to_string(),
        tags: [
            hex::encode(header.riff.id),
            hex::encode(header.riff.format),
            hex::encode(header.format.id),
            hex::encode(header.data.id),
        ],
        channels: header.format.channels,
        sample_rate: header.format.sample_rate,
        bits_per_sample: header.format.bits_per_sample,
        data_size: header.data.size,
        samples: header.sample_count(),
        duration_secs: header.duration_secs(),
        content,
    })
}

/// Display information about a container
pub fn show_info(path: &Path, json: bool) -> Result<String> {
    let inspection = inspect(path)?;
    if json {
        return Ok(serde_json::to_string_pretty(&inspection)?);
    }

    let mut output = String::new();
    output.push_str("Whisper Container Information\n");
    output.push_str("=============================\n\n");

    output.push_str(&format!("File: {}\n", inspection.file));
    output.push_str(&format!("Chunk tags: {}\n", inspection.tags.join(" ")));
    output.push_str(&format!("Channels: {}\n", inspection.channels));
    output.push_str(&format!("Sample rate: {} Hz\n", inspection.sample_rate));
    output.push_str(&format!("Bits per sample: {}\n", inspection.bits_per_sample));
    output.push_str(&format!("Data size: {}\n", format_size(inspection.data_size as u64)));
    output.push_str(&format!("Samples: {}\n", inspection.samples));
    output.push_str(&format!("Duration: {:.2} s\n", inspection.duration_secs));
    output.push('\n');

    match &inspection.content {
        Some(content) => {
            output.push_str("Hidden content:\n");
            output.push_str(&format!("  Filename: {}\n", content.filename));
            output.push_str(&format!(
                "  Payload size: {}\n",
                format_size(content.payload_bytes as u64)
            ));
            output.push_str(&format!(
                "  Threshold factor: {} (threshold {})\n",
                content.params.threshold_factor, content.threshold
            ));
            output.push_str(&format!(
                "  Size factor: {} ({} bits per sample)\n",
                content.params.mask_factor, content.bits_per_sample
            ));
            output.push_str(&format!(
                "  Skip minimum sample: {}\n",
                content.params.skip_min_neg_sample_value
            ));
            output.push_str(&format!("  Record: {}\n", content.record));
        }
        None => output.push_str("No hidden content found.\n"),
    }

    Ok(output)
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
