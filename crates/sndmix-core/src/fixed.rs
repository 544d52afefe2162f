//! Fixed-point value types used on the mixing path
//!
//! The mixer never touches floating point while rendering. Every quantity a
//! command carries is stored in one of these newtypes:
//!
//! | Type        | Format                  | Unity  |
//! |-------------|-------------------------|--------|
//! | [`Gain`]    | Q3.12 in `i16`          | 4096   |
//! | [`Pitch`]   | Q8.8 in `u16`           | 256    |
//! | [`Delay`]   | `u32` frames + Q0.15    | -      |
//!
//! The float constructors exist for the command-building side only and
//! saturate at the representable range.

use crate::types::StereoFrame;

/// Fractional bits of [`Gain`]
pub const GAIN_FRACTION_BITS: u32 = 12;

/// Fractional bits of [`Pitch`]
pub const PITCH_FRACTION_BITS: u32 = 8;

/// Fractional bits of the [`Delay`] error term
pub const DELAY_ERROR_BITS: u32 = 15;

/// One whole frame in [`Delay`] error units
pub const DELAY_ERROR_ONE: u32 = 1 << DELAY_ERROR_BITS;

/// Q3.12 gain coefficient (unity = 4096)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Gain(i16);

impl Gain {
    pub const ZERO: Gain = Gain(0);
    pub const UNITY: Gain = Gain(1 << GAIN_FRACTION_BITS);

    #[inline]
    pub const fn from_raw(raw: i16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> i16 {
        self.0
    }

    /// Convert a linear gain, saturating to roughly [-8.0, 8.0)
    pub fn from_f32(gain: f32) -> Self {
        let scaled = (gain * (1 << GAIN_FRACTION_BITS) as f32).round();
        Self(scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / (1 << GAIN_FRACTION_BITS) as f32
    }

    /// Scale a sample by this gain (arithmetic shift, rounds toward -inf)
    #[inline]
    pub fn scale(self, sample: i16) -> i32 {
        (sample as i32 * self.0 as i32) >> GAIN_FRACTION_BITS
    }
}

/// 2x2 pan matrix `[LL, RL, LR, RR]`
///
/// `XY` is the gain from source channel `Y` into output channel `X`:
///
/// ```text
/// out_l = l * LL + r * LR
/// out_r = l * RL + r * RR
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanMatrix(pub [Gain; 4]);

impl PanMatrix {
    pub const LL: usize = 0;
    pub const RL: usize = 1;
    pub const LR: usize = 2;
    pub const RR: usize = 3;

    /// Source left to output left, source right to output right, unity gain
    pub const IDENTITY: PanMatrix = PanMatrix([Gain::UNITY, Gain::ZERO, Gain::ZERO, Gain::UNITY]);

    /// Source channels crossed over
    pub const SWAPPED: PanMatrix = PanMatrix([Gain::ZERO, Gain::UNITY, Gain::UNITY, Gain::ZERO]);

    pub const SILENT: PanMatrix = PanMatrix([Gain::ZERO; 4]);

    pub const fn new(ll: Gain, rl: Gain, lr: Gain, rr: Gain) -> Self {
        Self([ll, rl, lr, rr])
    }

    /// Independent output gains, no cross-feed
    pub const fn stereo(left: Gain, right: Gain) -> Self {
        Self([left, Gain::ZERO, Gain::ZERO, right])
    }

    /// Linear balance at the given volume
    ///
    /// `pan` is -1.0 (hard left) to 1.0 (hard right); the near side stays at
    /// `volume` and the far side is attenuated.
    pub fn balance(volume: f32, pan: f32) -> Self {
        let pan = pan.clamp(-1.0, 1.0);
        let left = volume * (1.0 - pan).min(1.0);
        let right = volume * (1.0 + pan).min(1.0);
        Self::stereo(Gain::from_f32(left), Gain::from_f32(right))
    }

    #[inline]
    pub fn coefficient(&self, index: usize) -> Gain {
        self.0[index]
    }

    /// Apply the matrix to one source frame
    ///
    /// Each product is shifted down separately before the sums, so the result
    /// always fits in `i32`.
    #[inline]
    pub fn apply(&self, frame: StereoFrame) -> (i32, i32) {
        let [ll, rl, lr, rr] = self.0;
        let left = ll.scale(frame.left) + lr.scale(frame.right);
        let right = rl.scale(frame.left) + rr.scale(frame.right);
        (left, right)
    }
}

impl Default for PanMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Q8.8 playback rate multiplier (unity = 256)
///
/// Source frames consumed per output frame is
/// `pitch * source_rate / output_rate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pitch(u16);

impl Pitch {
    pub const ZERO: Pitch = Pitch(0);
    pub const UNITY: Pitch = Pitch(1 << PITCH_FRACTION_BITS);

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Convert a linear rate, saturating to [0.0, 256.0)
    pub fn from_f32(rate: f32) -> Self {
        let scaled = (rate * (1 << PITCH_FRACTION_BITS) as f32).round();
        Self(scaled.clamp(0.0, u16::MAX as f32) as u16)
    }

    /// Rate from a frequency ratio, e.g. a note at `target_hz` from a sample
    /// recorded at `base_hz`
    pub fn from_ratio(target: u32, base: u32) -> Self {
        if base == 0 {
            return Self(u16::MAX);
        }
        let scaled = ((target as u64) << PITCH_FRACTION_BITS) / base as u64;
        Self(scaled.min(u16::MAX as u64) as u16)
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / (1 << PITCH_FRACTION_BITS) as f32
    }
}

impl Default for Pitch {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Activation delay measured in output frames
///
/// `error` is a sub-frame remainder in 1/32768 frame units. The channel diffuses
/// it across consecutive commands so many short delays average out to the
/// requested value instead of truncating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Delay {
    frames: u32,
    error: u16,
}

impl Delay {
    pub const NONE: Delay = Delay { frames: 0, error: 0 };

    /// Whole-frame delay
    pub const fn frames(frames: u32) -> Self {
        Self { frames, error: 0 }
    }

    /// Whole frames plus a Q0.15 remainder (values >= 32768 carry into frames)
    pub const fn with_error(frames: u32, error: u32) -> Self {
        let carry = error >> DELAY_ERROR_BITS;
        Self {
            frames: frames.saturating_add(carry),
            error: (error & (DELAY_ERROR_ONE - 1)) as u16,
        }
    }

    /// Fractional frame count, rounded to the nearest 1/32768 frame
    pub fn from_frames_f64(frames: f64) -> Self {
        if !(frames > 0.0) {
            return Self::NONE;
        }
        let scaled = (frames * DELAY_ERROR_ONE as f64).round();
        let max = ((u32::MAX as u64) << DELAY_ERROR_BITS) as f64;
        let scaled = scaled.min(max) as u64;
        Self {
            frames: (scaled >> DELAY_ERROR_BITS) as u32,
            error: (scaled & (DELAY_ERROR_ONE as u64 - 1)) as u16,
        }
    }

    /// Delay in seconds at the given output rate
    pub fn from_seconds(seconds: f64, frame_rate: u32) -> Self {
        Self::from_frames_f64(seconds * frame_rate as f64)
    }

    #[inline]
    pub const fn whole_frames(self) -> u32 {
        self.frames
    }

    #[inline]
    pub const fn error(self) -> u16 {
        self.error
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.frames == 0 && self.error == 0
    }

    pub fn to_f64(self) -> f64 {
        self.frames as f64 + self.error as f64 / DELAY_ERROR_ONE as f64
    }
}
