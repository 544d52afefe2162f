//! Sound sources consumed by the mixer
//!
//! Two kinds of source feed a channel:
//!
//! - [`SoundBuffer`]: immutable mono or stereo 16-bit PCM with random access.
//!   Commands hold it through a `basedrop::Shared` handle, so any number of
//!   channels can play the same buffer, and the last handle released on the
//!   audio thread is reclaimed by the collector thread instead of being freed
//!   inside the callback.
//! - [`SoundStream`]: a stateful pull source that is advanced frame by frame.
//!   It moves into the engine inside a `basedrop::Owned` box.

mod error;
mod tone;
mod wav;

pub use error::{SourceError, SourceResult};
pub use tone::{tone_buffer, ToneStream, Waveform};
pub use wav::write_wav;

use basedrop::{Owned, Shared};

use crate::engine::gc_handle;
use crate::types::{Sample, StereoFrame};

/// Channel layout of a [`SoundBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    /// Samples per frame
    pub fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}

/// Immutable PCM sample data at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct SoundBuffer {
    channels: Channels,
    sample_rate: u32,
    /// Interleaved `[L, R, L, R, ...]` for stereo
    samples: Vec<Sample>,
}

impl SoundBuffer {
    /// Create a mono buffer
    pub fn mono(sample_rate: u32, samples: Vec<Sample>) -> SourceResult<Self> {
        if sample_rate == 0 {
            return Err(SourceError::ZeroSampleRate);
        }
        Ok(Self {
            channels: Channels::Mono,
            sample_rate,
            samples,
        })
    }

    /// Create a stereo buffer from interleaved samples
    pub fn stereo(sample_rate: u32, interleaved: Vec<Sample>) -> SourceResult<Self> {
        if sample_rate == 0 {
            return Err(SourceError::ZeroSampleRate);
        }
        if interleaved.len() % 2 != 0 {
            return Err(SourceError::OddStereoLength(interleaved.len()));
        }
        Ok(Self {
            channels: Channels::Stereo,
            sample_rate,
            samples: interleaved,
        })
    }

    /// Create a stereo buffer from frames
    pub fn from_frames(sample_rate: u32, frames: &[StereoFrame]) -> SourceResult<Self> {
        Self::stereo(sample_rate, bytemuck::cast_slice::<StereoFrame, Sample>(frames).to_vec())
    }

    pub fn channels(&self) -> Channels {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames
    ///
    /// Buffers longer than `u32::MAX` frames are addressed up to `u32::MAX`.
    pub fn frames(&self) -> u32 {
        let frames = self.samples.len() / self.channels.count();
        frames.min(u32::MAX as usize) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Frame at `index`; mono samples are duplicated into both channels
    ///
    /// Out-of-range indices read as silence.
    #[inline]
    pub fn frame(&self, index: u32) -> StereoFrame {
        let index = index as usize;
        match self.channels {
            Channels::Mono => self
                .samples
                .get(index)
                .map(|&s| StereoFrame::mono(s))
                .unwrap_or_default(),
            Channels::Stereo => match self.samples.get(index * 2..index * 2 + 2) {
                Some(&[left, right]) => StereoFrame::new(left, right),
                _ => StereoFrame::silence(),
            },
        }
    }

    /// Raw interleaved samples
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Wrap in a collector-backed handle for use in commands
    pub fn into_shared(self) -> Shared<SoundBuffer> {
        Shared::new(&gc_handle(), self)
    }
}

/// Pull-based streaming source
///
/// The mixer calls [`SoundStream::mix`] with a one-frame slice, in exact
/// lock-step with consumption, from the audio thread. Implementations must not
/// block or allocate there.
pub trait SoundStream: Send {
    /// Native frame rate of the stream
    fn frame_rate(&self) -> u32;

    /// Write up to `out.len()` frames and advance the stream by that many
    ///
    /// Returns the number of frames written. Fewer than requested means the
    /// stream has ended.
    fn mix(&mut self, out: &mut [StereoFrame]) -> usize;
}

/// Owned stream handle carried by play commands
pub type StreamHandle = Owned<Box<dyn SoundStream>>;

/// Box a stream for use in commands
pub fn stream_handle<S: SoundStream + 'static>(stream: S) -> StreamHandle {
    Owned::new(&gc_handle(), Box::new(stream) as Box<dyn SoundStream>)
}
