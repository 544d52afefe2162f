//! Engine error types

use thiserror::Error;

use super::command::SoundCommand;

/// The channel's command ring has no free slot
///
/// This is the only error the mixer reports at runtime. The rejected command
/// is handed back so the caller can drop it, retry later, or surface it.
#[derive(Error, Debug)]
#[error("sound command queue is full")]
pub struct QueueFull(pub SoundCommand);

impl QueueFull {
    /// Take back the command that could not be queued
    pub fn into_command(self) -> SoundCommand {
        self.0
    }
}

/// Malformed command, detected by [`SoundCommand::validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Loop end at or before loop start
    #[error("Invalid loop window: right ({right}) must be greater than left ({left})")]
    InvalidLoop { left: u32, right: u32 },

    /// Loop window reaches past the end of the buffer
    #[error("Loop window {left}..{right} exceeds buffer length {frames}")]
    LoopOutOfRange { left: u32, right: u32, frames: u32 },

    /// Play opcode does not match the buffer's channel layout
    #[error("{op} command carries a {actual} buffer")]
    LayoutMismatch { op: &'static str, actual: &'static str },

    /// Loop or repeat settings on a stream
    #[error("Streams cannot loop")]
    StreamLoop,

    /// Trigger flag index out of range
    #[error("Flag index {0} out of range (0-3)")]
    FlagIndex(usize),
}

/// Invalid mixer configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Channel count must be a non-zero power of two, got {0}")]
    ChannelCountNotPowerOfTwo(usize),

    #[error("Queue capacity must be a power of two, got {0}")]
    QueueCapacityNotPowerOfTwo(usize),

    #[error("Queue capacity must be at least 2, got {0}")]
    QueueCapacityTooSmall(usize),

    #[error("Output sample rate must be non-zero")]
    ZeroSampleRate,

    #[error("Maximum block size must be non-zero")]
    ZeroBlockSize,
}
