//! Common types for sndmix
//!
//! Frame types shared by the sources, the channels and the mixer output.
//! Samples are 16-bit signed PCM everywhere outside the mixer's accumulator.

/// Default output rate (48kHz)
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Number of trigger flags carried by each command and channel
pub const NUM_FLAGS: usize = 4;

/// Audio sample type (16-bit signed PCM)
pub type Sample = i16;

/// A single stereo frame of 16-bit PCM
///
/// Uses `#[repr(C)]` so `&[StereoFrame]` and interleaved `&[i16]` can be
/// reinterpreted in place with bytemuck.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoFrame {
    pub left: Sample,
    pub right: Sample,
}

impl StereoFrame {
    /// Create a new stereo frame
    #[inline]
    pub const fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Create a silent frame
    #[inline]
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Create a frame with the same value in both channels
    #[inline]
    pub const fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }
}

/// Accumulator frame used while channels are summed
///
/// Channel contributions are added here with saturating `i32` arithmetic and
/// only narrowed to [`StereoFrame`] once per block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MixFrame {
    pub left: i32,
    pub right: i32,
}

impl MixFrame {
    #[inline]
    pub const fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// Add a panned contribution
    #[inline]
    pub fn accumulate(&mut self, left: i32, right: i32) {
        self.left = self.left.saturating_add(left);
        self.right = self.right.saturating_add(right);
    }

    /// Narrow to 16-bit, saturating at the PCM range
    #[inline]
    pub fn to_frame(self) -> StereoFrame {
        StereoFrame {
            left: saturate_i16(self.left),
            right: saturate_i16(self.right),
        }
    }
}

/// Clamp an accumulated sample into the 16-bit PCM range
#[inline]
pub fn saturate_i16(value: i32) -> Sample {
    value.clamp(i16::MIN as i32, i16::MAX as i32) as Sample
}
