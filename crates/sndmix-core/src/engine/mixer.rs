//! SoundMixer - sums every channel into the output block
//!
//! The mixer is the audio-thread half of the engine. It owns all channels and
//! a preallocated accumulator; [`SoundMixer::mix`] never allocates, locks or
//! logs, so it can run from a device callback.
//!
//! ```text
//! control threads                        audio thread
//! ┌──────────────┐   SPSC ring (per ch)   ┌─────────────────────────────┐
//! │ChannelSender ├───────────────────────►│ SoundChannel 0 ─┐           │
//! ├──────────────┤                        │ SoundChannel 1 ─┼─► accum ─►│ out
//! │     ...      ├───────────────────────►│ ...            ─┘ (i32)     │
//! └──────────────┘                        └─────────────────────────────┘
//!        ▲             ChannelAtomics (position, flags)            │
//!        └─────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use super::channel::{ChannelAtomics, SoundChannel};
use super::config::MixerConfig;
use super::error::ConfigError;
use super::sender::ChannelSender;
use crate::types::{MixFrame, Sample, StereoFrame};

/// Fixed set of channels mixed into one stereo output
pub struct SoundMixer {
    channels: Box<[SoundChannel]>,
    output_rate: u32,
    /// Preallocated accumulator, one block of `max_block_frames`
    accum: Vec<MixFrame>,
}

impl SoundMixer {
    /// Create a mixer and one sender per channel
    ///
    /// Senders are returned in channel order; `senders[i]` drives channel `i`.
    pub fn new(config: &MixerConfig) -> Result<(Self, Vec<ChannelSender>), ConfigError> {
        config.validate()?;

        let (channels, senders): (Vec<_>, Vec<_>) = (0..config.num_channels)
            .map(|index| SoundChannel::create(index, config.sample_rate, config.queue_capacity))
            .unzip();

        log::info!(
            "SoundMixer: {} channels at {} Hz, {} commands per queue, {} frame blocks",
            config.num_channels,
            config.sample_rate,
            config.queue_capacity - 1,
            config.max_block_frames
        );

        let mixer = Self {
            channels: channels.into_boxed_slice(),
            output_rate: config.sample_rate,
            accum: vec![MixFrame::default(); config.max_block_frames],
        };
        Ok((mixer, senders))
    }

    /// Output rate in frames per second
    pub fn frame_rate(&self) -> u32 {
        self.output_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Observer state of channel `index`
    pub fn channel_atomics(&self, index: usize) -> Option<&Arc<ChannelAtomics>> {
        self.channels.get(index).map(SoundChannel::atomics)
    }

    /// Number of channels with an active voice
    pub fn active_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.is_playing()).count()
    }

    /// Overwrite `out` with the next `out.len()` frames of the mix
    ///
    /// Channels are summed in index order into 32-bit accumulators and
    /// saturated to 16 bits. Blocks longer than the accumulator are mixed in
    /// consecutive chunks; command activation stays sample accurate across
    /// chunk boundaries.
    pub fn mix(&mut self, out: &mut [StereoFrame]) {
        let block = self.accum.len();
        for chunk in out.chunks_mut(block) {
            let accum = &mut self.accum[..chunk.len()];
            accum.fill(MixFrame::default());

            for channel in self.channels.iter_mut() {
                channel.mix_out(accum);
            }

            for (frame, mixed) in chunk.iter_mut().zip(accum.iter()) {
                *frame = mixed.to_frame();
            }
        }
    }

    /// Mix into an interleaved `[L, R, L, R, ...]` buffer
    ///
    /// A trailing odd sample is zeroed.
    pub fn mix_interleaved(&mut self, out: &mut [Sample]) {
        let whole = out.len() & !1;
        let (pairs, tail) = out.split_at_mut(whole);
        self.mix(bytemuck::cast_slice_mut::<Sample, StereoFrame>(pairs));
        tail.fill(0);
    }

    /// Mix into an interleaved `f32` buffer scaled to [-1.0, 1.0)
    ///
    /// A trailing odd sample is zeroed.
    pub fn mix_interleaved_f32(&mut self, out: &mut [f32]) {
        let block = self.accum.len();
        let whole = out.len() & !1;
        let (pairs, tail) = out.split_at_mut(whole);

        for chunk in pairs.chunks_mut(block * 2) {
            let frames = chunk.len() / 2;
            let accum = &mut self.accum[..frames];
            accum.fill(MixFrame::default());

            for channel in self.channels.iter_mut() {
                channel.mix_out(accum);
            }

            for (pair, mixed) in chunk.chunks_exact_mut(2).zip(accum.iter()) {
                let frame = mixed.to_frame();
                pair[0] = frame.left as f32 / 32768.0;
                pair[1] = frame.right as f32 / 32768.0;
            }
        }
        tail.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SoundCommand;
    use crate::fixed::{Delay, Gain, PanMatrix, Pitch};
    use crate::source::SoundBuffer;
    use basedrop::Shared;
    use std::time::{Duration, Instant};

    fn constant(value: i16, frames: usize) -> Shared<SoundBuffer> {
        SoundBuffer::mono(48000, vec![value; frames]).unwrap().into_shared()
    }

    fn mixer(channels: usize) -> (SoundMixer, Vec<ChannelSender>) {
        SoundMixer::new(&MixerConfig::default().with_channels(channels)).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = SoundMixer::new(&MixerConfig::default().with_channels(3));
        assert!(matches!(result, Err(ConfigError::ChannelCountNotPowerOfTwo(3))));
    }

    #[test]
    fn test_senders_match_channels() {
        let (mixer, senders) = mixer(4);
        assert_eq!(mixer.num_channels(), 4);
        assert_eq!(mixer.frame_rate(), 48000);
        assert_eq!(senders.len(), 4);
        for (i, sender) in senders.iter().enumerate() {
            assert_eq!(sender.index(), i);
            assert_eq!(sender.capacity(), 64);
            assert!(Arc::ptr_eq(sender.atomics(), mixer.channel_atomics(i).unwrap()));
        }
        assert!(mixer.channel_atomics(4).is_none());
    }

    #[test]
    fn test_idle_mixer_outputs_silence() {
        let (mut mixer, _senders) = mixer(2);
        let mut out = vec![StereoFrame::new(99, 99); 32];
        mixer.mix(&mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::silence()));
    }

    #[test]
    fn test_single_voice_then_silence() {
        let (mut mixer, mut senders) = mixer(1);
        senders[0].queue_command(SoundCommand::play(constant(1000, 10))).unwrap();

        let mut out = vec![StereoFrame::silence(); 16];
        mixer.mix(&mut out);
        assert!(out[..10].iter().all(|f| *f == StereoFrame::new(1000, 1000)));
        assert!(out[10..].iter().all(|f| *f == StereoFrame::silence()));
        assert_eq!(mixer.active_channels(), 0);
    }

    #[test]
    fn test_channels_are_additive() {
        let (mut mixer, mut senders) = mixer(2);
        senders[0]
            .queue_command(SoundCommand::play(constant(300, 8)).with_pan(PanMatrix::stereo(Gain::UNITY, Gain::ZERO)))
            .unwrap();
        senders[1].queue_command(SoundCommand::play(constant(-100, 8))).unwrap();

        let mut out = vec![StereoFrame::silence(); 4];
        mixer.mix(&mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::new(200, -100)));
        assert_eq!(mixer.active_channels(), 2);
    }

    #[test]
    fn test_sum_is_independent_of_channel_order() {
        // Two voices with different pans and rates so every sample differs
        fn left_tone() -> SoundCommand {
            SoundCommand::play(constant(300, 8)).with_pan(PanMatrix::stereo(Gain::UNITY, Gain::ZERO))
        }
        fn slow_ramp() -> SoundCommand {
            let samples = (0..8i16).map(|i| i * -50).collect();
            SoundCommand::play(SoundBuffer::mono(48000, samples).unwrap().into_shared())
                .with_pan(PanMatrix::stereo(Gain::from_f32(0.5), Gain::UNITY))
                .with_rate(Pitch::from_f32(0.5))
        }
        fn render(voices: Vec<(usize, SoundCommand)>) -> Vec<StereoFrame> {
            let (mut mixer, mut senders) = mixer(2);
            for (channel, cmd) in voices {
                senders[channel].queue_command(cmd).unwrap();
            }
            let mut out = vec![StereoFrame::silence(); 20];
            mixer.mix(&mut out);
            out
        }

        let tone_alone = render(vec![(0, left_tone())]);
        let ramp_alone = render(vec![(1, slow_ramp())]);
        let expected: Vec<StereoFrame> = tone_alone
            .iter()
            .zip(&ramp_alone)
            .map(|(a, b)| StereoFrame::new(a.left + b.left, a.right + b.right))
            .collect();
        assert!(ramp_alone.iter().any(|f| f.left != 0 && f.left != f.right));

        assert_eq!(render(vec![(0, left_tone()), (1, slow_ramp())]), expected);
        assert_eq!(render(vec![(0, slow_ramp()), (1, left_tone())]), expected);
    }

    #[test]
    fn test_sum_saturates() {
        let (mut mixer, mut senders) = mixer(2);
        for sender in senders.iter_mut() {
            sender.queue_command(SoundCommand::play(constant(30000, 4))).unwrap();
        }
        let mut out = vec![StereoFrame::silence(); 4];
        mixer.mix(&mut out);
        assert!(out.iter().all(|f| *f == StereoFrame::new(32767, 32767)));
    }

    #[test]
    fn test_long_blocks_are_chunked() {
        let config = MixerConfig::default().with_channels(1).with_max_block_frames(16);
        let (mut mixer, mut senders) = SoundMixer::new(&config).unwrap();
        senders[0].queue_command(SoundCommand::play(constant(5, 100))).unwrap();
        senders[0]
            .queue_command(SoundCommand::play(constant(9, 100)).with_delay(Delay::frames(37)))
            .unwrap();

        let mut out = vec![StereoFrame::silence(); 64];
        mixer.mix(&mut out);
        assert!(out[..37].iter().all(|f| f.left == 5));
        assert!(out[37..].iter().all(|f| f.left == 9));
    }

    #[test]
    fn test_interleaved_outputs() {
        let (mut mixer, mut senders) = mixer(1);
        senders[0].queue_command(SoundCommand::play(constant(16384, 100))).unwrap();

        let mut pcm = vec![7i16; 5];
        mixer.mix_interleaved(&mut pcm);
        assert_eq!(pcm, vec![16384, 16384, 16384, 16384, 0]);

        let mut float = vec![1.0f32; 3];
        mixer.mix_interleaved_f32(&mut float);
        assert_eq!(float, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_queue_while_mixing() {
        let (mut mixer, mut senders) = mixer(1);
        let mut sender = senders.remove(0);

        // Each voice is queued only after the mixer has raised the previous flag
        let producer = std::thread::spawn(move || {
            let wait_for = |sender: &ChannelSender, flag: usize| {
                let deadline = Instant::now() + Duration::from_secs(5);
                while !sender.poll_flag(flag) {
                    assert!(Instant::now() < deadline, "flag {} never raised", flag);
                    std::thread::yield_now();
                }
            };
            sender
                .queue_command(SoundCommand::play(constant(42, 16)).looping_forever().with_flag(0).unwrap())
                .unwrap();
            wait_for(&sender, 0);
            sender
                .queue_command(SoundCommand::play(constant(-7, 16)).looping_forever().with_flag(1).unwrap())
                .unwrap();
            wait_for(&sender, 1);
        });

        // Run lengths collapsed to the distinct values seen, in order
        let mut seen: Vec<i16> = Vec::new();
        let mut block = vec![StereoFrame::silence(); 64];
        let deadline = Instant::now() + Duration::from_secs(10);
        while !producer.is_finished() {
            assert!(Instant::now() < deadline, "producer never finished");
            mixer.mix(&mut block);
            for frame in &block {
                assert_eq!(frame.left, frame.right);
                if seen.last() != Some(&frame.left) {
                    seen.push(frame.left);
                }
            }
            std::thread::yield_now();
        }
        producer.join().unwrap();

        let voices: Vec<i16> = seen.into_iter().skip_while(|&s| s == 0).collect();
        assert_eq!(voices, vec![42, -7]);
        assert!(mixer.channel_atomics(0).unwrap().is_playing());
    }

    #[test]
    fn test_commands_from_another_thread() {
        let (mut mixer, mut senders) = mixer(1);
        let mut sender = senders.remove(0);

        let producer = std::thread::spawn(move || {
            sender
                .queue_command(SoundCommand::play(constant(42, 1000)).with_flag(1).unwrap())
                .unwrap();
            sender
        });
        let sender = producer.join().unwrap();

        let mut out = vec![StereoFrame::silence(); 8];
        mixer.mix(&mut out);
        assert_eq!(out[0], StereoFrame::new(42, 42));
        assert!(sender.poll_flag(1));
        assert!(sender.atomics().is_playing());
    }
}
