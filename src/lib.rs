//! Whisper - LSB steganography for 16-bit PCM WAV files
//!
//! Hides a file's bytes in the low-order bits of loud audio samples and
//! recovers it later. Quiet samples are never touched, so the hidden data
//! sits under the signal where it is hardest to hear.
//!
//! ## Layout
//!
//! ```text
//! [44-byte header] → [15-byte record, 1 bit/sample] → [filename, 1 bit/sample]
//!                  → [payload, 1..8 bits/sample] → [untouched tail]
//! ```
//!
//! - **Record and filename**: fixed bootstrap channel, samples with |s| ≥ 0x800
//! - **Payload**: channel chosen by the record, samples with |s| ≥ 2 << threshold_factor
//!
//! ## Example
//!
//! ```no_run
//! use whisper::cli::{decode_file, encode_file, DecodeOptions, EncodeOptions};
//! use std::path::Path;
//!
//! encode_file(
//!     Path::new("notes.txt"),
//!     Path::new("song.wav"),
//!     Path::new("song-stego.wav"),
//!     &EncodeOptions::default(),
//! ).unwrap();
//!
//! let report = decode_file(Path::new("song-stego.wav"), &DecodeOptions::default()).unwrap();
//! println!("recovered {}", report.path.display());
//! ```

pub mod channel;
pub mod cli;
pub mod error;
pub mod metadata;
pub mod stego;
pub mod wav;

pub use error::{Phase, Result, WhisperError};
pub use metadata::EmbeddingParameters;
pub use stego::{encode, measure_capacity, ChannelFactors, Decoder, EncodeReport, Payload};
pub use wav::WavHeader;
