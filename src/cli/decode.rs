use crate::cli::paths;
use crate::error::Result;
use crate::metadata::EmbeddingParameters;
use crate::stego::Decoder;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Options for recovering a hidden file
#[derive(Debug, Clone, Default)]
pub struct DecodeOptions {
    /// Directory to write the recovered file into (defaults to the working directory)
    pub output_dir: Option<PathBuf>,
}

/// Result of a successful decode
#[derive(Debug, Clone)]
pub struct DecodeReport {
    pub path: PathBuf,
    pub bytes: u64,
    pub params: EmbeddingParameters,
}

/// Recover the file hidden in `container_in`
pub fn decode_file(container_in: &Path, options: &DecodeOptions) -> Result<DecodeReport> {
    paths::require_regular_file(container_in, "input container")?;
    let dir = match &options.output_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    paths::require_directory(&dir, "output directory")?;

    let input = File::open(container_in)?;
    let decoder = Decoder::open(BufReader::new(input))?;
    let params = *decoder.params();

    let target = dir.join(decoder.filename());
    paths::require_distinct(&[
        (container_in, "input container"),
        (target.as_path(), "recovered file"),
    ])?;
    let file = paths::create_new(target.as_path(), "recovered file")?;

    info!(
        container = %container_in.display(),
        path = %target.display(),
        bytes = params.data_byte_count,
        "decoding"
    );

    let mut out = BufWriter::new(file);
    let result = decoder.extract_to(&mut out);
    drop(out);

    match result {
        Ok(bytes) => Ok(DecodeReport {
            path: target,
            bytes,
            params,
        }),
        Err(e) => {
            if let Err(rm) = fs::remove_file(&target) {
                warn!(path = %target.display(), error = %rm, "could not remove partial output");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::encode::{encode_file, EncodeOptions};
    use crate::error::WhisperError;
    use crate::wav::WavHeader;
    use tempfile::tempdir;

    fn write_container(path: &Path, samples: &[i16]) {
        let mut bytes = WavHeader::pcm16(2, 44100, (samples.len() * 2) as u32)
            .to_bytes()
            .to_vec();
        bytes.extend(samples.iter().flat_map(|s| s.to_le_bytes()));
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_decode_into_directory() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("recovered");
        std::fs::create_dir(&out_dir).unwrap();
        let payload = dir.path().join("plan.md");
        let input = dir.path().join("in.wav");
        let stego = dir.path().join("stego.wav");
        std::fs::write(&payload, b"# plan\n\nstep one").unwrap();
        let samples: Vec<i16> = (0..3000).map(|i| if i % 3 == 0 { -9000 } else { 9000 }).collect();
        write_container(&input, &samples);

        encode_file(&payload, &input, &stego, &EncodeOptions::default()).unwrap();
        let options = DecodeOptions {
            output_dir: Some(out_dir.clone()),
        };
        let report = decode_file(&stego, &options).unwrap();
        assert_eq!(report.path, out_dir.join("plan.md"));
        assert_eq!(report.bytes, 16);
        assert_eq!(std::fs::read(&report.path).unwrap(), b"# plan\n\nstep one");
    }

    #[test]
    fn test_decode_refuses_existing_target() {
        let dir = tempdir().unwrap();
        let out_dir = dir.path().join("recovered");
        std::fs::create_dir(&out_dir).unwrap();
        let payload = dir.path().join("plan.md");
        let input = dir.path().join("in.wav");
        let stego = dir.path().join("stego.wav");
        std::fs::write(&payload, b"secret").unwrap();
        write_container(&input, &vec![9000; 2000]);
        encode_file(&payload, &input, &stego, &EncodeOptions::default()).unwrap();

        std::fs::write(out_dir.join("plan.md"), b"mine").unwrap();
        let options = DecodeOptions {
            output_dir: Some(out_dir.clone()),
        };
        let err = decode_file(&stego, &options).unwrap_err();
        assert!(matches!(err, WhisperError::Path(_)));
        assert_eq!(std::fs::read(out_dir.join("plan.md")).unwrap(), b"mine");
    }

    #[test]
    fn test_plain_container_has_no_content() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("plain.wav");
        write_container(&input, &vec![9000; 2000]);
        let options = DecodeOptions {
            output_dir: Some(dir.path().to_path_buf()),
        };
        let err = decode_file(&input, &options).unwrap_err();
        assert!(matches!(err, WhisperError::Corrupt(_)));
    }

    #[test]
    fn test_missing_output_directory() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("plain.wav");
        write_container(&input, &vec![9000; 100]);
        let options = DecodeOptions {
            output_dir: Some(dir.path().join("nope")),
        };
        assert!(matches!(
            decode_file(&input, &options),
            Err(WhisperError::Path(_))
        ));
    }
}
