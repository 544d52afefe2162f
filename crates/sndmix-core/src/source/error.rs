//! Sound source error types

use thiserror::Error;

/// Errors that can occur while building a sound source
#[derive(Error, Debug)]
pub enum SourceError {
    /// Failed to open or decode a WAV file
    #[error("Failed to read WAV data: {0}")]
    Wav(#[from] hound::Error),

    /// WAV layout the buffer cannot represent
    #[error("Unsupported WAV format: {0}")]
    UnsupportedFormat(String),

    /// Interleaved stereo data with an odd sample count
    #[error("Stereo sample data has odd length {0}")]
    OddStereoLength(usize),

    /// Sample rate of zero
    #[error("Sound source sample rate must be non-zero")]
    ZeroSampleRate,
}

/// Result type for source construction
pub type SourceResult<T> = Result<T, SourceError>;
