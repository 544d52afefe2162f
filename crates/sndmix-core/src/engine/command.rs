//! Sound commands: the only way to drive a channel
//!
//! A non-realtime thread builds a [`SoundCommand`] and pushes it into a
//! channel's ring with [`ChannelSender::queue_command`](super::ChannelSender::queue_command).
//! The audio thread promotes it to the active voice once its delay has run
//! out. Commands are plain data: nothing in them is evaluated until the
//! channel applies them.
//!
//! # Usage
//!
//! ```ignore
//! let cmd = SoundCommand::play(buffer.into_shared())
//!     .with_pan(PanMatrix::balance(0.8, -0.25))
//!     .with_rate(Pitch::from_f32(1.5))
//!     .with_loop(1000, 5000)
//!     .with_repeats(3)
//!     .with_delay(Delay::from_seconds(0.25, mixer.frame_rate()))
//!     .with_flag(0)?;
//! cmd.validate()?;
//! sender.queue_command(cmd)?;
//! ```

use std::fmt;

use basedrop::Shared;

use super::error::CommandError;
use crate::fixed::{Delay, PanMatrix, Pitch};
use crate::source::{Channels, SoundBuffer, StreamHandle};
use crate::types::NUM_FLAGS;

/// What a command does when it becomes active
pub enum SoundOp {
    /// Leave the voice alone; only the sticky pan/rate and the flags apply
    Nop,
    /// Play a mono buffer (duplicated into both source channels)
    PlayMono(Shared<SoundBuffer>),
    /// Play an interleaved stereo buffer
    PlayStereo(Shared<SoundBuffer>),
    /// Play a pull-based stream
    PlayStream(StreamHandle),
    /// Silence the voice and release its source
    Stop,
    /// Discard everything queued up to and including this command
    ///
    /// Consumed as soon as the channel sees it, regardless of delays.
    ClearQueue,
}

impl SoundOp {
    /// Opcode name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            SoundOp::Nop => "Nop",
            SoundOp::PlayMono(_) => "PlayMono",
            SoundOp::PlayStereo(_) => "PlayStereo",
            SoundOp::PlayStream(_) => "PlayStream",
            SoundOp::Stop => "Stop",
            SoundOp::ClearQueue => "ClearQueue",
        }
    }

    #[inline]
    pub fn is_clear_queue(&self) -> bool {
        matches!(self, SoundOp::ClearQueue)
    }
}

impl fmt::Debug for SoundOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundOp::PlayMono(buffer) | SoundOp::PlayStereo(buffer) => f
                .debug_struct(self.name())
                .field("frames", &buffer.frames())
                .field("sample_rate", &buffer.sample_rate())
                .finish(),
            SoundOp::PlayStream(stream) => f
                .debug_struct(self.name())
                .field("frame_rate", &stream.frame_rate())
                .finish(),
            _ => f.write_str(self.name()),
        }
    }
}

/// A single queued instruction for one channel
#[derive(Debug)]
pub struct SoundCommand {
    pub(crate) op: SoundOp,
    /// Replaces the channel's pan matrix when present
    pub(crate) pan: Option<PanMatrix>,
    /// Replaces the channel's rate when present
    pub(crate) rate: Option<Pitch>,
    /// 0 = play once, N > 0 = N extra passes over the loop window, < 0 = forever
    pub(crate) repeats: i32,
    pub(crate) loop_left: u32,
    /// 0 = end of the buffer
    pub(crate) loop_right: u32,
    pub(crate) delay: Delay,
    /// ORed into the channel's trigger flags on activation
    pub(crate) flags: [bool; NUM_FLAGS],
}

impl SoundCommand {
    /// Command with the given opcode and no optional fields
    pub fn new(op: SoundOp) -> Self {
        Self {
            op,
            pan: None,
            rate: None,
            repeats: 0,
            loop_left: 0,
            loop_right: 0,
            delay: Delay::NONE,
            flags: [false; NUM_FLAGS],
        }
    }

    /// Play a buffer, picking the opcode from its channel layout
    pub fn play(buffer: Shared<SoundBuffer>) -> Self {
        match buffer.channels() {
            Channels::Mono => Self::new(SoundOp::PlayMono(buffer)),
            Channels::Stereo => Self::new(SoundOp::PlayStereo(buffer)),
        }
    }

    pub fn play_stream(stream: StreamHandle) -> Self {
        Self::new(SoundOp::PlayStream(stream))
    }

    pub fn stop() -> Self {
        Self::new(SoundOp::Stop)
    }

    pub fn clear_queue() -> Self {
        Self::new(SoundOp::ClearQueue)
    }

    pub fn nop() -> Self {
        Self::new(SoundOp::Nop)
    }

    pub fn with_pan(mut self, pan: PanMatrix) -> Self {
        self.pan = Some(pan);
        self
    }

    pub fn with_rate(mut self, rate: Pitch) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Set the loop window `[left, right)`; `right == 0` means the whole buffer
    pub fn with_loop(mut self, left: u32, right: u32) -> Self {
        self.loop_left = left;
        self.loop_right = right;
        self
    }

    pub fn with_repeats(mut self, repeats: i32) -> Self {
        self.repeats = repeats;
        self
    }

    pub fn looping_forever(self) -> Self {
        self.with_repeats(-1)
    }

    pub fn with_delay(mut self, delay: Delay) -> Self {
        self.delay = delay;
        self
    }

    /// Raise trigger flag `index` when this command activates
    pub fn with_flag(mut self, index: usize) -> Result<Self, CommandError> {
        let flag = self
            .flags
            .get_mut(index)
            .ok_or(CommandError::FlagIndex(index))?;
        *flag = true;
        Ok(self)
    }

    pub fn op(&self) -> &SoundOp {
        &self.op
    }

    pub fn pan(&self) -> Option<PanMatrix> {
        self.pan
    }

    pub fn rate(&self) -> Option<Pitch> {
        self.rate
    }

    pub fn repeats(&self) -> i32 {
        self.repeats
    }

    /// `(loop_left, loop_right)` as given, before defaulting
    pub fn loop_window(&self) -> (u32, u32) {
        (self.loop_left, self.loop_right)
    }

    pub fn delay(&self) -> Delay {
        self.delay
    }

    pub fn flags(&self) -> [bool; NUM_FLAGS] {
        self.flags
    }

    /// Reject commands the mixer would play in a surprising way
    ///
    /// Meant for the command-building side; the mixer itself never calls it
    /// and tolerates anything (degenerate windows simply never wrap).
    pub fn validate(&self) -> Result<(), CommandError> {
        let (left, right) = (self.loop_left, self.loop_right);
        match &self.op {
            SoundOp::PlayMono(buffer) | SoundOp::PlayStereo(buffer) => {
                let expected = match self.op {
                    SoundOp::PlayMono(_) => Channels::Mono,
                    _ => Channels::Stereo,
                };
                if buffer.channels() != expected {
                    return Err(CommandError::LayoutMismatch {
                        op: self.op.name(),
                        actual: match buffer.channels() {
                            Channels::Mono => "mono",
                            Channels::Stereo => "stereo",
                        },
                    });
                }
                if right != 0 && right <= left {
                    return Err(CommandError::InvalidLoop { left, right });
                }
                let frames = buffer.frames();
                let end = if right == 0 { frames } else { right };
                if end > frames || (left > 0 && left >= frames) {
                    return Err(CommandError::LoopOutOfRange {
                        left,
                        right: end,
                        frames,
                    });
                }
                Ok(())
            }
            SoundOp::PlayStream(_) => {
                if left != 0 || right != 0 || self.repeats != 0 {
                    return Err(CommandError::StreamLoop);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
