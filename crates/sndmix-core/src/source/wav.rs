//! WAV loading for sound buffers (thin `hound` wrapper)

use std::io::Read;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::{SoundBuffer, SourceError, SourceResult};
use crate::types::{Sample, StereoFrame};

impl SoundBuffer {
    /// Load a mono or stereo WAV file
    ///
    /// Integer PCM of any width is rescaled to 16 bits; float PCM is scaled
    /// and clamped.
    pub fn load_wav(path: &Path) -> SourceResult<Self> {
        log::info!("load_wav: Loading {:?}", path);
        let buffer = Self::from_wav_reader(WavReader::open(path)?)?;
        log::debug!(
            "load_wav: {} frames, {:?}, {} Hz",
            buffer.frames(),
            buffer.channels(),
            buffer.sample_rate()
        );
        Ok(buffer)
    }

    /// Decode from an already-open reader
    pub fn from_wav_reader<R: Read>(mut reader: WavReader<R>) -> SourceResult<Self> {
        let spec = reader.spec();

        let samples: Vec<Sample> = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, 16) => reader.samples::<i16>().collect::<Result<_, _>>()?,
            (SampleFormat::Int, bits @ 1..=32) => reader
                .samples::<i32>()
                .map(|s| s.map(|s| rescale_int(s, bits)))
                .collect::<Result<_, _>>()?,
            (SampleFormat::Float, 32) => reader
                .samples::<f32>()
                .map(|s| s.map(float_to_sample))
                .collect::<Result<_, _>>()?,
            (format, bits) => {
                return Err(SourceError::UnsupportedFormat(format!(
                    "{:?} with {} bits per sample",
                    format, bits
                )))
            }
        };

        match spec.channels {
            1 => SoundBuffer::mono(spec.sample_rate, samples),
            2 => SoundBuffer::stereo(spec.sample_rate, samples),
            n => Err(SourceError::UnsupportedFormat(format!("{} channels", n))),
        }
    }
}

/// Write mixer output as a 16-bit stereo WAV file
pub fn write_wav(path: &Path, sample_rate: u32, frames: &[StereoFrame]) -> SourceResult<()> {
    let spec = WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in bytemuck::cast_slice::<StereoFrame, Sample>(frames) {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    log::info!("write_wav: Wrote {} frames to {:?}", frames.len(), path);
    Ok(())
}

fn rescale_int(sample: i32, bits: u16) -> Sample {
    if bits >= 16 {
        (sample >> (bits - 16)) as Sample
    } else {
        (sample << (16 - bits)) as Sample
    }
}

fn float_to_sample(sample: f32) -> Sample {
    (sample * 32768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as Sample
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Channels;

    fn write_fixture(path: &Path, spec: WavSpec, write: impl FnOnce(&mut WavWriter<std::io::BufWriter<std::fs::File>>)) {
        let mut writer = WavWriter::create(path, spec).unwrap();
        write(&mut writer);
        writer.finalize().unwrap();
    }

    #[test]
    fn test_load_stereo_16bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        write_fixture(&path, spec, |w| {
            for s in [1i16, -1, 1000, -1000] {
                w.write_sample(s).unwrap();
            }
        });

        let buffer = SoundBuffer::load_wav(&path).unwrap();
        assert_eq!(buffer.channels(), Channels::Stereo);
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.samples(), &[1, -1, 1000, -1000]);
    }

    #[test]
    fn test_load_mono_float() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let spec = WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        write_fixture(&path, spec, |w| {
            for s in [0.5f32, -1.0, 2.0] {
                w.write_sample(s).unwrap();
            }
        });

        let buffer = SoundBuffer::load_wav(&path).unwrap();
        assert_eq!(buffer.channels(), Channels::Mono);
        assert_eq!(buffer.samples(), &[16384, -32768, 32767]);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.wav");
        let frames = [StereoFrame::new(100, -100), StereoFrame::new(i16::MAX, i16::MIN)];
        write_wav(&path, 22050, &frames).unwrap();

        let buffer = SoundBuffer::load_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate(), 22050);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.frame(1), frames[1]);
    }

    #[test]
    fn test_rescale_24bit() {
        assert_eq!(rescale_int(0x7FFFFF, 24), 0x7FFF);
        assert_eq!(rescale_int(-0x800000, 24), i16::MIN);
        assert_eq!(rescale_int(127, 8), 127 << 8);
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = SoundBuffer::load_wav(Path::new("/nonexistent/sound.wav"));
        assert!(matches!(result, Err(SourceError::Wav(_))));
    }
}
