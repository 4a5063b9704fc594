use crate::cli::info::format_size;
use crate::cli::paths;
use crate::error::Result;
use crate::metadata::{EmbeddingParameters, DEFAULT_MASK_FACTOR, DEFAULT_THRESHOLD_FACTOR};
use crate::stego::{self, ChannelFactors};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Report how many payload bytes a container can hold
pub fn show_capacity(
    path: &Path,
    factors: Option<ChannelFactors>,
    filename_len: usize,
) -> Result<String> {
    paths::require_regular_file(path, "container")?;
    let report = stego::measure_capacity(BufReader::new(File::open(path)?), factors, filename_len)?;
    let f = factors.unwrap_or(ChannelFactors {
        threshold_factor: DEFAULT_THRESHOLD_FACTOR,
        size_factor: DEFAULT_MASK_FACTOR,
    });
    let params = EmbeddingParameters::default().with_factors(f.threshold_factor, f.size_factor)?;

    let mut output = String::new();
    output.push_str(&format!("File: {}\n", path.display()));
    output.push_str(&format!(
        "Payload channel: threshold {} ({} bits per sample)\n",
        params.threshold(),
        params.embed_bits()
    ));
    output.push_str(&format!("Samples: {}\n", report.samples));
    output.push_str(&format!(
        "Record and filename: {} bits ({})\n",
        report.bootstrap_bits,
        if report.bootstrap_fits { "fits" } else { "does not fit" }
    ));
    output.push_str(&format!("Payload carriers: {}\n", report.payload_carriers));
    output.push_str(&format!(
        "Capacity: {} bytes ({})\n",
        report.payload_bytes,
        format_size(report.payload_bytes)
    ));
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::WavHeader;
    use tempfile::tempdir;

    #[test]
    fn test_show_capacity() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let samples = vec![5000i16; 1000];
        let mut bytes = WavHeader::pcm16(1, 8000, 2000).to_bytes().to_vec();
        bytes.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
        std::fs::write(&input, bytes).unwrap();

        // (15 + 10) bytes of bootstrap use 200 samples, leaving 800 one-bit carriers
        let text = show_capacity(&input, None, 10).unwrap();
        assert!(text.contains("Record and filename: 200 bits (fits)"));
        assert!(text.contains("Payload carriers: 800"));
        assert!(text.contains("Capacity: 100 bytes"));

        let factors = ChannelFactors {
            threshold_factor: 8,
            size_factor: 2,
        };
        let text = show_capacity(&input, Some(factors), 10).unwrap();
        assert!(text.contains("Capacity: 400 bytes"));
    }
}
