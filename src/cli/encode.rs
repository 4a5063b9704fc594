use crate::cli::paths;
use crate::error::Result;
use crate::metadata::EmbeddingParameters;
use crate::stego::{self, ChannelFactors, EncodeReport, Payload};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::{info, warn};

/// Options for hiding a file
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Threshold and size factor overrides for the payload channel
    pub factors: Option<ChannelFactors>,
}

/// Hide `payload` inside `container_in`, writing a new container to `container_out`
pub fn encode_file(
    payload: &Path,
    container_in: &Path,
    container_out: &Path,
    options: &EncodeOptions,
) -> Result<EncodeReport> {
    if let Some(f) = options.factors {
        EmbeddingParameters::default().with_factors(f.threshold_factor, f.size_factor)?;
    }

    paths::require_regular_file(payload, "payload")?;
    paths::require_regular_file(container_in, "input container")?;
    paths::require_absent(container_out, "output container")?;
    paths::require_distinct(&[
        (payload, "payload"),
        (container_in, "input container"),
        (container_out, "output container"),
    ])?;
    let name = paths::payload_file_name(payload)?;

    let payload_file = File::open(payload)?;
    let len = payload_file.metadata()?.len();
    let input = File::open(container_in)?;
    let output = paths::create_new(container_out, "output container")?;

    info!(
        payload = %payload.display(),
        container = %container_in.display(),
        bytes = len,
        "encoding"
    );

    let result = stego::encode(
        BufReader::new(input),
        BufWriter::new(output),
        Payload {
            name: &name,
            len,
            reader: BufReader::new(payload_file),
        },
        options.factors,
    );

    if result.is_err() {
        if let Err(e) = fs::remove_file(container_out) {
            warn!(path = %container_out.display(), error = %e, "could not remove partial output");
        }
    }
    result
}
