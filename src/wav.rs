use crate::error::{Result, WhisperError};
use std::io::{self, Read, Write};

pub const RIFF_TAG: &[u8; 4] = b"RIFF";
pub const WAVE_TAG: &[u8; 4] = b"WAVE";
pub const FMT_TAG: &[u8; 4] = b"fmt ";
pub const DATA_TAG: &[u8; 4] = b"data";

/// Format code for linear PCM
pub const PCM_FORMAT: u16 = 1;

/// The only sample width the codec handles
pub const SUPPORTED_BITS_PER_SAMPLE: u16 = 16;

/// Size of a PCM format chunk body
const PCM_FMT_SIZE: u32 = 16;

/// RIFF chunk: tag, size, format tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffChunk {
    pub id: [u8; 4],
    pub size: u32,
    pub format: [u8; 4],
}

/// Format chunk of a canonical PCM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChunk {
    pub id: [u8; 4],
    pub size: u32,
    pub format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

/// Header of the data chunk; the samples follow it directly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub id: [u8; 4],
    pub size: u32,
}

/// The fixed 44-byte header at the start of a canonical WAV file.
///
/// Every field is kept exactly as read so that [`WavHeader::to_bytes`]
/// reproduces the input byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff: RiffChunk,
    pub format: FormatChunk,
    pub data: DataHeader,
}

fn tag(bytes: &[u8], at: usize) -> [u8; 4] {
    [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]
}

fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn le_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(tag(bytes, at))
}

fn printable(tag: &[u8; 4]) -> String {
    String::from_utf8_lossy(tag).escape_default().to_string()
}

impl WavHeader {
    /// RIFF (12) + fmt (24) + data header (8)
    pub const SIZE: usize = 44;

    /// Build a canonical 16-bit PCM header for the given layout
    pub fn pcm16(channels: u16, sample_rate: u32, data_size: u32) -> Self {
        let block_align = channels * (SUPPORTED_BITS_PER_SAMPLE / 8);
        Self {
            riff: RiffChunk {
                id: *RIFF_TAG,
                size: 36 + data_size,
                format: *WAVE_TAG,
            },
            format: FormatChunk {
                id: *FMT_TAG,
                size: PCM_FMT_SIZE,
                format: PCM_FORMAT,
                channels,
                sample_rate,
                byte_rate: sample_rate * block_align as u32,
                block_align,
                bits_per_sample: SUPPORTED_BITS_PER_SAMPLE,
            },
            data: DataHeader {
                id: *DATA_TAG,
                size: data_size,
            },
        }
    }

    /// Decode the raw layout without validating it
    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        Self {
            riff: RiffChunk {
                id: tag(bytes, 0),
                size: le_u32(bytes, 4),
                format: tag(bytes, 8),
            },
            format: FormatChunk {
                id: tag(bytes, 12),
                size: le_u32(bytes, 16),
                format: le_u16(bytes, 20),
                channels: le_u16(bytes, 22),
                sample_rate: le_u32(bytes, 24),
                byte_rate: le_u32(bytes, 28),
                block_align: le_u16(bytes, 32),
                bits_per_sample: le_u16(bytes, 34),
            },
            data: DataHeader {
                id: tag(bytes, 36),
                size: le_u32(bytes, 40),
            },
        }
    }

    /// Encode back to the 44-byte layout
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.riff.id);
        buf[4..8].copy_from_slice(&self.riff.size.to_le_bytes());
        buf[8..12].copy_from_slice(&self.riff.format);
        buf[12..16].copy_from_slice(&self.format.id);
        buf[16..20].copy_from_slice(&self.format.size.to_le_bytes());
        buf[20..22].copy_from_slice(&self.format.format.to_le_bytes());
        buf[22..24].copy_from_slice(&self.format.channels.to_le_bytes());
        buf[24..28].copy_from_slice(&self.format.sample_rate.to_le_bytes());
        buf[28..32].copy_from_slice(&self.format.byte_rate.to_le_bytes());
        buf[32..34].copy_from_slice(&self.format.block_align.to_le_bytes());
        buf[34..36].copy_from_slice(&self.format.bits_per_sample.to_le_bytes());
        buf[36..40].copy_from_slice(&self.data.id);
        buf[40..44].copy_from_slice(&self.data.size.to_le_bytes());
        buf
    }

    /// Read and validate the header from the start of a stream
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; Self::SIZE];
        reader.read_exact(&mut bytes).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => WhisperError::Format(format!(
                "file is shorter than a {}-byte WAV header",
                Self::SIZE
            )),
            _ => WhisperError::Io(e),
        })?;

        let header = Self::from_bytes(&bytes);
        header.validate()?;
        Ok(header)
    }

    /// Write the header verbatim
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }

    /// Check that this is a canonical 16-bit linear PCM header
    pub fn validate(&self) -> Result<()> {
        if &self.riff.id != RIFF_TAG || &self.riff.format != WAVE_TAG {
            return Err(WhisperError::Format(format!(
                "not a RIFF/WAVE file (found '{}'/'{}')",
                printable(&self.riff.id),
                printable(&self.riff.format)
            )));
        }
        if &self.format.id != FMT_TAG || self.format.size != PCM_FMT_SIZE {
            return Err(WhisperError::Format(format!(
                "expected a {}-byte 'fmt ' chunk, found '{}' of {} bytes",
                PCM_FMT_SIZE,
                printable(&self.format.id),
                self.format.size
            )));
        }
        if self.format.format != PCM_FORMAT {
            return Err(WhisperError::Format(format!(
                "not a PCM file (format code {})",
                self.format.format
            )));
        }
        if self.format.bits_per_sample != SUPPORTED_BITS_PER_SAMPLE {
            return Err(WhisperError::Format(format!(
                "unsupported bits per sample: {}",
                self.format.bits_per_sample
            )));
        }
        let expected_align =
            self.format.channels as u32 * self.format.bits_per_sample as u32 / 8;
        if self.format.channels == 0 || self.format.block_align as u32 != expected_align {
            return Err(WhisperError::Format(format!(
                "incorrect block alignment {} for {} channel(s) of {} bits",
                self.format.block_align, self.format.channels, self.format.bits_per_sample
            )));
        }
        if &self.data.id != DATA_TAG {
            return Err(WhisperError::Format(format!(
                "expected 'data' chunk after the format chunk, found '{}'",
                printable(&self.data.id)
            )));
        }
        Ok(())
    }

    /// Bytes per sample slot
    pub fn sample_bytes(&self) -> u8 {
        (self.format.bits_per_sample / 8) as u8
    }

    /// Number of sample slots declared by the data chunk
    pub fn sample_count(&self) -> u64 {
        self.data.size as u64 / self.sample_bytes().max(1) as u64
    }

    /// Playing time described by the data chunk
    pub fn duration_secs(&self) -> f64 {
        if self.format.sample_rate == 0 || self.format.block_align == 0 {
            return 0.0;
        }
        let frames = self.data.size as f64 / self.format.block_align as f64;
        frames / self.format.sample_rate as f64
    }
}
