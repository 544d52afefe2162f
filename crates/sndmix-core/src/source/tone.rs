//! Generated test tones
//!
//! Used by the render tool for scripted buffers and streams, and by tests that
//! need a source without touching the file system.

use super::{SoundBuffer, SoundStream, SourceResult};
use crate::types::{Sample, StereoFrame};

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Saw,
}

impl Waveform {
    /// Value at `phase` in [0, 1), in [-1, 1]
    fn value(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (phase * std::f64::consts::TAU).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * phase - 1.0,
        }
    }
}

fn to_sample(value: f64, amplitude: Sample) -> Sample {
    (value * amplitude as f64).round() as Sample
}

/// Render a mono tone into a buffer
pub fn tone_buffer(
    waveform: Waveform,
    frequency: f64,
    amplitude: Sample,
    sample_rate: u32,
    frames: usize,
) -> SourceResult<SoundBuffer> {
    let step = frequency / sample_rate.max(1) as f64;
    let samples = (0..frames)
        .map(|i| to_sample(waveform.value((i as f64 * step).fract()), amplitude))
        .collect();
    SoundBuffer::mono(sample_rate, samples)
}

/// Endless (or length-limited) oscillator stream
#[derive(Debug, Clone)]
pub struct ToneStream {
    waveform: Waveform,
    frame_rate: u32,
    step: f64,
    phase: f64,
    amplitude: Sample,
    remaining: Option<u64>,
}

impl ToneStream {
    pub fn new(waveform: Waveform, frequency: f64, amplitude: Sample, frame_rate: u32) -> Self {
        Self {
            waveform,
            frame_rate,
            step: frequency / frame_rate.max(1) as f64,
            phase: 0.0,
            amplitude,
            remaining: None,
        }
    }

    /// End the stream after `frames` frames
    pub fn with_length(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl SoundStream for ToneStream {
    fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    fn mix(&mut self, out: &mut [StereoFrame]) -> usize {
        let count = match self.remaining {
            Some(remaining) => out.len().min(remaining as usize),
            None => out.len(),
        };
        for frame in &mut out[..count] {
            *frame = StereoFrame::mono(to_sample(self.waveform.value(self.phase), self.amplitude));
            self.phase = (self.phase + self.step).fract();
        }
        if let Some(remaining) = &mut self.remaining {
            *remaining -= count as u64;
        }
        count
    }
}
