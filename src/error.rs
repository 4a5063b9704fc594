use std::fmt;
use thiserror::Error;

/// Stage of an encode or decode run, used to say where a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Header,
    Metadata,
    Filename,
    Payload,
    TailCopy,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Header => "header",
            Phase::Metadata => "metadata",
            Phase::Filename => "filename",
            Phase::Payload => "payload",
            Phase::TailCopy => "tail copy",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum WhisperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error during {phase}: {source}")]
    PhaseIo {
        phase: Phase,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported container format: {0}")]
    Format(String),

    #[error("No whisper content found: {0}")]
    Corrupt(String),

    #[error("Sample stream ended during the {phase} with {missing_bits} bits still to go")]
    Capacity { phase: Phase, missing_bits: u64 },

    #[error("Invalid embedding parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid path: {0}")]
    Path(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WhisperError {
    /// Attach a phase to a bare IO error
    pub fn io_in(phase: Phase) -> impl FnOnce(std::io::Error) -> WhisperError {
        move |source| WhisperError::PhaseIo { phase, source }
    }

    /// Tag an untagged IO error with the phase it happened in
    pub fn in_phase(self, phase: Phase) -> WhisperError {
        match self {
            WhisperError::Io(source) => WhisperError::PhaseIo { phase, source },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, WhisperError>;
