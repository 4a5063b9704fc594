//! The bootstrap record written ahead of the payload.
//!
//! Layout (15 bytes): `[magic: 7]["flag word": 4 LE]["data byte count": 4 LE]`.
//! The flag word packs its fields from the least significant bit upward:
//!
//! ```text
//! bits  0..3   sample_bits_select         (sample byte width - 1)
//! bits  3..9   threshold_factor           (threshold = 2 << factor)
//! bits  9..15  mask_factor                (bits per sample = 1 << factor)
//! bit  15      ignore_sign                (reserved, always 0)
//! bit  16      skip_min_neg_sample_value
//! bits 17..22  unused                     (always 0)
//! bits 22..32  filename_size
//! ```

use crate::error::{Result, WhisperError};
use serde::Serialize;

/// Tag that opens every embedded record
pub const MAGIC: [u8; 7] = *b"WHISPER";

pub const DEFAULT_THRESHOLD_FACTOR: u8 = 8;
pub const DEFAULT_MASK_FACTOR: u8 = 0;

/// Largest accepted size (mask) factor: 8 bits per sample
pub const MAX_SIZE_FACTOR: u8 = 3;

/// Longest filename accepted when encoding; the 10-bit field could hold 1023
pub const MAX_FILENAME_LEN: usize = 1022;

#[derive(Debug, Clone, Copy)]
struct BitField {
    shift: u32,
    width: u32,
}

impl BitField {
    const fn max(&self) -> u32 {
        (1 << self.width) - 1
    }

    fn get(&self, word: u32) -> u32 {
        (word >> self.shift) & self.max()
    }

    fn put(&self, word: u32, value: u32) -> u32 {
        let mask = self.max() << self.shift;
        (word & !mask) | ((value << self.shift) & mask)
    }
}

const SAMPLE_BITS_SELECT: BitField = BitField { shift: 0, width: 3 };
const THRESHOLD_FACTOR: BitField = BitField { shift: 3, width: 6 };
const MASK_FACTOR: BitField = BitField { shift: 9, width: 6 };
const IGNORE_SIGN: BitField = BitField { shift: 15, width: 1 };
const SKIP_MIN_NEG: BitField = BitField { shift: 16, width: 1 };
const UNUSED: BitField = BitField { shift: 17, width: 5 };
const FILENAME_SIZE: BitField = BitField { shift: 22, width: 10 };

/// How the payload is laid into the samples, plus what was hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddingParameters {
    /// Sample width code: byte width - 1
    pub sample_bits_select: u8,
    /// Gate exponent for the payload channel
    pub threshold_factor: u8,
    /// Bits-per-sample exponent for the payload channel
    pub mask_factor: u8,
    /// Reserved, must be false
    pub ignore_sign: bool,
    /// Never touch samples at the type's minimum value
    pub skip_min_neg_sample_value: bool,
    /// Length of the embedded filename in bytes
    pub filename_size: u16,
    /// Payload length in bytes
    pub data_byte_count: u32,
}

impl Default for EmbeddingParameters {
    fn default() -> Self {
        Self {
            sample_bits_select: 1,
            threshold_factor: DEFAULT_THRESHOLD_FACTOR,
            mask_factor: DEFAULT_MASK_FACTOR,
            ignore_sign: false,
            skip_min_neg_sample_value: true,
            filename_size: 0,
            data_byte_count: 0,
        }
    }
}

impl EmbeddingParameters {
    /// Serialized size: magic (7) + flag word (4) + data byte count (4)
    pub const SIZE: usize = 15;

    /// Defaults for a container whose samples are `bits_per_sample` wide
    pub fn for_sample_bits(bits_per_sample: u16) -> Result<Self> {
        if bits_per_sample != 16 {
            return Err(WhisperError::Format(format!(
                "unsupported sample width: {}-bit",
                bits_per_sample
            )));
        }
        Ok(Self {
            sample_bits_select: (bits_per_sample / 8 - 1) as u8,
            ..Default::default()
        })
    }

    /// Width of one sample in bits, as encoded by `sample_bits_select`
    pub fn sample_bit_width(&self) -> u32 {
        8 * (self.sample_bits_select as u32 + 1)
    }

    /// Largest threshold factor the sample width allows
    pub fn max_threshold_factor(&self) -> u8 {
        self.sample_bit_width().saturating_sub(4) as u8
    }

    /// Payload gate: samples below this magnitude are left alone
    pub fn threshold(&self) -> i32 {
        2 << self.threshold_factor
    }

    /// Payload bits carried by each qualifying sample
    pub fn embed_bits(&self) -> u8 {
        1 << self.mask_factor
    }

    /// Apply caller overrides for the payload channel
    pub fn with_factors(self, threshold_factor: u8, size_factor: u8) -> Result<Self> {
        let params = Self {
            threshold_factor,
            mask_factor: size_factor,
            ..self
        };
        params.check().map_err(WhisperError::InvalidParameter)?;
        Ok(params)
    }

    /// Record the filename and payload length that will be hidden
    pub fn with_payload(self, filename_size: usize, data_byte_count: u64) -> Result<Self> {
        if filename_size == 0 || filename_size > MAX_FILENAME_LEN {
            return Err(WhisperError::Path(format!(
                "payload filename must be 1 to {} bytes long, got {}",
                MAX_FILENAME_LEN, filename_size
            )));
        }
        let data_byte_count = u32::try_from(data_byte_count).map_err(|_| {
            WhisperError::InvalidParameter(format!(
                "payload of {} bytes exceeds the 4 GiB record limit",
                data_byte_count
            ))
        })?;
        Ok(Self {
            filename_size: filename_size as u16,
            data_byte_count,
            ..self
        })
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.sample_bit_width() != 16 {
            return Err(format!(
                "unsupported sample width: {}-bit",
                self.sample_bit_width()
            ));
        }
        if self.threshold_factor > self.max_threshold_factor() {
            return Err(format!(
                "threshold factor {} exceeds maximum {} for {}-bit samples",
                self.threshold_factor,
                self.max_threshold_factor(),
                self.sample_bit_width()
            ));
        }
        if self.mask_factor > MAX_SIZE_FACTOR {
            return Err(format!(
                "size factor {} exceeds maximum {}",
                self.mask_factor, MAX_SIZE_FACTOR
            ));
        }
        // Rewritten bits must stay below the gate so the sample still qualifies
        if self.embed_bits() as u32 > self.threshold_factor as u32 + 1 {
            return Err(format!(
                "{} bits per sample do not fit below threshold {} (threshold factor {})",
                self.embed_bits(),
                self.threshold(),
                self.threshold_factor
            ));
        }
        if self.ignore_sign {
            return Err("ignore_sign is not supported".into());
        }
        if self.filename_size as u32 > FILENAME_SIZE.max() {
            return Err(format!("filename size {} too large", self.filename_size));
        }
        Ok(())
    }

    /// Pack the flag word
    pub fn flag_word(&self) -> u32 {
        let mut word = 0;
        word = SAMPLE_BITS_SELECT.put(word, self.sample_bits_select as u32);
        word = THRESHOLD_FACTOR.put(word, self.threshold_factor as u32);
        word = MASK_FACTOR.put(word, self.mask_factor as u32);
        word = IGNORE_SIGN.put(word, self.ignore_sign as u32);
        word = SKIP_MIN_NEG.put(word, self.skip_min_neg_sample_value as u32);
        word = UNUSED.put(word, 0);
        FILENAME_SIZE.put(word, self.filename_size as u32)
    }

    /// Serialize to the 15-byte record
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..7].copy_from_slice(&MAGIC);
        buf[7..11].copy_from_slice(&self.flag_word().to_le_bytes());
        buf[11..15].copy_from_slice(&self.data_byte_count.to_le_bytes());
        buf
    }

    /// Deserialize and validate a record
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(WhisperError::Corrupt("metadata record too short".into()));
        }
        if data[0..7] != MAGIC {
            return Err(WhisperError::Corrupt(format!(
                "magic tag mismatch (found {})",
                hex::encode(&data[0..7])
            )));
        }

        let word = u32::from_le_bytes([data[7], data[8], data[9], data[10]]);
        let data_byte_count = u32::from_le_bytes([data[11], data[12], data[13], data[14]]);

        let params = Self {
            sample_bits_select: SAMPLE_BITS_SELECT.get(word) as u8,
            threshold_factor: THRESHOLD_FACTOR.get(word) as u8,
            mask_factor: MASK_FACTOR.get(word) as u8,
            ignore_sign: IGNORE_SIGN.get(word) != 0,
            skip_min_neg_sample_value: SKIP_MIN_NEG.get(word) != 0,
            filename_size: FILENAME_SIZE.get(word) as u16,
            data_byte_count,
        };
        if UNUSED.get(word) != 0 {
            return Err(WhisperError::Corrupt(format!(
                "reserved flag bits set (flag word {:#010x})",
                word
            )));
        }
        params
            .check()
            .map_err(|e| WhisperError::Corrupt(format!("invalid embedding parameters: {}", e)))?;
        Ok(params)
    }
}
