mod common;

use common::{loud, pattern, write_wav};
use hound::WavReader;
use std::fs;
use tempfile::tempdir;
use whisper::cli::{decode_file, encode_file, inspect, DecodeOptions, EncodeOptions};
use whisper::{ChannelFactors, Phase, WavHeader, WhisperError};

#[test]
fn file_roundtrip_keeps_name_and_bytes() {
    let dir = tempdir().unwrap();
    let payload = dir.path().join("report.pdf");
    let input = dir.path().join("music.wav");
    let output = dir.path().join("music-out.wav");
    let out_dir = dir.path().join("out");
    fs::create_dir(&out_dir).unwrap();

    let data = pattern(2000);
    fs::write(&payload, &data).unwrap();
    write_wav(&input, 2, &loud(40_000));

    let report = encode_file(&payload, &input, &output, &EncodeOptions::default()).unwrap();
    assert_eq!(report.params.data_byte_count, 2000);
    assert_eq!(report.params.filename_size, 10);
    assert_eq!(report.carriers, (15 + 10 + 2000) * 8);

    let decoded = decode_file(
        &output,
        &DecodeOptions {
            output_dir: Some(out_dir.clone()),
        },
    )
    .unwrap();
    assert_eq!(decoded.path, out_dir.join("report.pdf"));
    assert_eq!(fs::read(&decoded.path).unwrap(), data);
}

#[test]
fn output_is_still_valid_pcm() {
    let dir = tempdir().unwrap();
    let payload = dir.path().join("a.txt");
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");

    let samples: Vec<i16> = (0..20_000)
        .map(|i| match i % 4 {
            0 => 12,
            1 => -300,
            2 => 9000,
            _ => -9000,
        })
        .collect();
    write_wav(&input, 1, &samples);
    fs::write(&payload, pattern(600)).unwrap();
    encode_file(&payload, &input, &output, &EncodeOptions::default()).unwrap();

    let original = fs::read(&input).unwrap();
    let encoded = fs::read(&output).unwrap();
    assert_eq!(original.len(), encoded.len());
    assert_eq!(&original[..WavHeader::SIZE], &encoded[..WavHeader::SIZE]);

    let mut reader = WavReader::open(&output).unwrap();
    assert_eq!(reader.spec().bits_per_sample, 16);
    let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(decoded.len(), samples.len());
    for (before, after) in samples.iter().zip(&decoded) {
        if before.unsigned_abs() < 512 {
            assert_eq!(before, after, "quiet sample changed");
        } else {
            assert_eq!(before.signum(), after.signum(), "sign flipped");
            assert!((*before as i32 - *after as i32).abs() <= 1);
        }
    }
}

#[test]
fn exact_capacity_boundary() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    write_wav(&input, 1, &loud(100_000));

    // Record (15 bytes) plus "secret.bin" (10 bytes) take 200 samples
    let fits = (100_000 - 200) / 8;
    let payload = dir.path().join("secret.bin");
    let output = dir.path().join("fits.wav");
    fs::write(&payload, pattern(fits)).unwrap();
    encode_file(&payload, &input, &output, &EncodeOptions::default()).unwrap();
    assert!(output.exists());

    let big_dir = dir.path().join("big");
    fs::create_dir(&big_dir).unwrap();
    let payload = big_dir.join("secret.bin");
    let output = dir.path().join("overflow.wav");
    fs::write(&payload, pattern(fits + 1)).unwrap();
    let err = encode_file(&payload, &input, &output, &EncodeOptions::default()).unwrap_err();
    match err {
        WhisperError::Capacity {
            phase,
            missing_bits,
        } => {
            assert_eq!(phase, Phase::Payload);
            assert_eq!(missing_bits, 8);
        }
        other => panic!("expected capacity error, got {other}"),
    }
    assert!(!output.exists(), "partial output must be removed");
}

#[test]
fn multi_bit_channel_roundtrip() {
    let dir = tempdir().unwrap();
    let payload = dir.path().join("blob");
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_wav(&input, 2, &loud(10_000));
    fs::write(&payload, pattern(3000)).unwrap();

    let options = EncodeOptions {
        factors: Some(ChannelFactors {
            threshold_factor: 10,
            size_factor: 3,
        }),
    };
    let report = encode_file(&payload, &input, &output, &options).unwrap();
    assert_eq!(report.params.embed_bits(), 8);
    assert_eq!(report.carriers, (15 + 4) * 8 + 3000);

    let info = inspect(&output).unwrap();
    let content = info.content.unwrap();
    assert_eq!(content.filename, "blob");
    assert_eq!(content.threshold, 2048);

    let missing = decode_file(
        &output,
        &DecodeOptions {
            output_dir: Some(dir.path().join("x")),
        },
    );
    assert!(matches!(missing, Err(WhisperError::Path(_))));

    let out_dir = dir.path().join("x");
    fs::create_dir(&out_dir).unwrap();
    let decoded = decode_file(
        &output,
        &DecodeOptions {
            output_dir: Some(out_dir),
        },
    )
    .unwrap();
    assert_eq!(fs::read(decoded.path).unwrap(), pattern(3000));
}

#[test]
fn invalid_factors_touch_nothing() {
    let dir = tempdir().unwrap();
    let payload = dir.path().join("p");
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_wav(&input, 1, &loud(1000));
    fs::write(&payload, b"p").unwrap();

    for (threshold_factor, size_factor) in [(13, 0), (8, 4), (0, 1), (1, 2)] {
        let options = EncodeOptions {
            factors: Some(ChannelFactors {
                threshold_factor,
                size_factor,
            }),
        };
        let err = encode_file(&payload, &input, &output, &options).unwrap_err();
        assert!(
            matches!(err, WhisperError::InvalidParameter(_)),
            "({threshold_factor}, {size_factor}) should be rejected"
        );
        assert!(!output.exists());
    }
}

#[test]
fn path_roles_must_differ() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    write_wav(&input, 1, &loud(1000));

    let err = encode_file(&input, &input, &output, &EncodeOptions::default()).unwrap_err();
    assert!(matches!(err, WhisperError::Path(_)));
    assert!(!output.exists());

    let missing = dir.path().join("missing.wav");
    let err = encode_file(&input, &missing, &output, &EncodeOptions::default()).unwrap_err();
    assert!(matches!(err, WhisperError::Path(_)));
}

#[test]
fn non_pcm16_container_rejected() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    let payload = dir.path().join("p");
    fs::write(&payload, b"p").unwrap();

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8000,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&input, spec).unwrap();
    for i in 0..1000 {
        writer.write_sample((i % 100) as i8).unwrap();
    }
    writer.finalize().unwrap();

    let err = encode_file(&payload, &input, &output, &EncodeOptions::default()).unwrap_err();
    assert!(matches!(err, WhisperError::Format(_)));
    assert!(!output.exists());
}

#[test]
fn truncated_container_leaves_no_partial_payload() {
    let dir = tempdir().unwrap();
    let payload = dir.path().join("big.bin");
    let input = dir.path().join("in.wav");
    let output = dir.path().join("out.wav");
    let out_dir = dir.path().join("recovered");
    fs::create_dir(&out_dir).unwrap();

    fs::write(&payload, pattern(20_000)).unwrap();
    write_wav(&input, 1, &loud(200_000));
    encode_file(&payload, &input, &output, &EncodeOptions::default()).unwrap();

    // Keep the header and the first 100,000 samples; the data chunk still claims 200,000
    let encoded = fs::read(&output).unwrap();
    let cut = dir.path().join("cut.wav");
    fs::write(&cut, &encoded[..WavHeader::SIZE + 100_000 * 2]).unwrap();

    let err = decode_file(
        &cut,
        &DecodeOptions {
            output_dir: Some(out_dir.clone()),
        },
    )
    .unwrap_err();
    // record and "big.bin" use 176 samples, leaving 99,824 of the 160,000 payload bits
    match err {
        WhisperError::Capacity {
            phase,
            missing_bits,
        } => {
            assert_eq!(phase, Phase::Payload);
            assert_eq!(missing_bits, 160_000 - (100_000 - 176));
        }
        other => panic!("expected capacity error, got {other}"),
    }
    assert!(!out_dir.join("big.bin").exists());
    assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
}
