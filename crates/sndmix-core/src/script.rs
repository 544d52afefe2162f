//! Offline render scripts
//!
//! A render script describes a fixed set of buffers and, per channel, the
//! commands to queue before mixing starts. Everything is queued up front, so
//! the timeline is expressed entirely through command delays.
//!
//! ```yaml
//! frames: 96000
//! block: 256
//! buffers:
//!   beep: { type: tone, waveform: sine, frequency: 440, amplitude: 8000, frames: 4800 }
//!   kick: { type: wav, path: samples/kick.wav }
//! channels:
//!   - - { op: play, buffer: kick, repeats: 3, flags: [0] }
//!   - - { op: play, buffer: beep, pan: { volume: 0.7, pan: -0.5 }, delay: 24000 }
//!     - { op: nop, rate: 1.5, delay: 2400 }
//!     - { op: stop, delay: 2400 }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use basedrop::Shared;
use serde::{Deserialize, Serialize};

use crate::engine::{ChannelSender, MixerConfig, SoundCommand, SoundMixer};
use crate::fixed::{Delay, Gain, PanMatrix, Pitch};
use crate::source::{stream_handle, tone_buffer, SoundBuffer, ToneStream, Waveform};
use crate::types::{Sample, StereoFrame, NUM_FLAGS};

fn default_block() -> usize {
    512
}

fn default_amplitude() -> Sample {
    8192
}

fn default_volume() -> f32 {
    1.0
}

/// Complete render description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderScript {
    /// Total output length in frames
    pub frames: usize,
    /// Frames per `mix` call
    #[serde(default = "default_block")]
    pub block: usize,
    #[serde(default)]
    pub buffers: BTreeMap<String, BufferSource>,
    /// Command lists, one per channel in channel order
    #[serde(default)]
    pub channels: Vec<Vec<ScriptCommand>>,
}

/// Where a named buffer comes from, selected by its `type` key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BufferSource {
    /// WAV file, relative to the script's directory
    Wav { path: PathBuf },
    Tone(ToneSpec),
    /// Mono buffer holding one value
    Constant { value: Sample, frames: usize },
}

/// Generated tone; `sample_rate` defaults to the mixer's rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToneSpec {
    #[serde(default)]
    pub waveform: Waveform,
    pub frequency: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: Sample,
    /// Buffer length; for streams, `None` runs until stopped
    #[serde(default)]
    pub frames: Option<usize>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptOp {
    Play,
    Stream,
    Stop,
    Clear,
    Nop,
}

/// Pan as a raw `[ll, rl, lr, rr]` matrix or a volume/balance pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PanSpec {
    Matrix([f32; 4]),
    Balance {
        #[serde(default = "default_volume")]
        volume: f32,
        #[serde(default)]
        pan: f32,
    },
}

impl PanSpec {
    pub fn to_matrix(self) -> PanMatrix {
        match self {
            PanSpec::Matrix([ll, rl, lr, rr]) => PanMatrix::new(
                Gain::from_f32(ll),
                Gain::from_f32(rl),
                Gain::from_f32(lr),
                Gain::from_f32(rr),
            ),
            PanSpec::Balance { volume, pan } => PanMatrix::balance(volume, pan),
        }
    }
}

/// One scripted command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptCommand {
    pub op: ScriptOp,
    /// Buffer name for `play`
    #[serde(default)]
    pub buffer: Option<String>,
    /// Tone for `stream`
    #[serde(default)]
    pub tone: Option<ToneSpec>,
    #[serde(default)]
    pub pan: Option<PanSpec>,
    #[serde(default)]
    pub rate: Option<f32>,
    #[serde(default)]
    pub repeats: i32,
    #[serde(default, rename = "loop")]
    pub loop_window: Option<(u32, u32)>,
    /// Frames after the previous command on this channel (may be fractional)
    #[serde(default)]
    pub delay: f64,
    #[serde(default)]
    pub flags: Vec<usize>,
}

/// A trigger flag observed while rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagEvent {
    pub channel: usize,
    pub flag: usize,
    /// End of the block in which the flag was seen
    pub frame: usize,
}

/// Rendered audio plus the flags raised along the way
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub sample_rate: u32,
    pub frames: Vec<StereoFrame>,
    pub events: Vec<FlagEvent>,
}

impl RenderScript {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let script: RenderScript = serde_yaml::from_str(yaml).context("Failed to parse render script")?;
        if script.block == 0 {
            bail!("Render script block size must be non-zero");
        }
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self> {
        log::info!("RenderScript: Loading {:?}", path);
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read render script: {:?}", path))?;
        Self::from_yaml(&yaml).with_context(|| format!("Invalid render script: {:?}", path))
    }

    /// Load or generate every named buffer
    ///
    /// Relative WAV paths are resolved against `base_dir`.
    pub fn build_buffers(
        &self,
        base_dir: &Path,
        frame_rate: u32,
    ) -> Result<BTreeMap<String, Shared<SoundBuffer>>> {
        let mut buffers = BTreeMap::new();
        for (name, source) in &self.buffers {
            let buffer = match source {
                BufferSource::Wav { path } => {
                    let path = base_dir.join(path);
                    SoundBuffer::load_wav(&path)
                        .with_context(|| format!("Failed to load buffer '{}' from {:?}", name, path))?
                }
                BufferSource::Tone(tone) => {
                    let frames = tone
                        .frames
                        .ok_or_else(|| anyhow!("Tone buffer '{}' needs a frame count", name))?;
                    tone_buffer(
                        tone.waveform,
                        tone.frequency,
                        tone.amplitude,
                        tone.sample_rate.unwrap_or(frame_rate),
                        frames,
                    )?
                }
                BufferSource::Constant { value, frames } => {
                    SoundBuffer::mono(frame_rate, vec![*value; *frames])?
                }
            };
            buffers.insert(name.clone(), buffer.into_shared());
        }
        Ok(buffers)
    }

    /// Queue every scripted command; returns how many were queued
    pub fn queue(
        &self,
        senders: &mut [ChannelSender],
        buffers: &BTreeMap<String, Shared<SoundBuffer>>,
        frame_rate: u32,
    ) -> Result<usize> {
        if self.channels.len() > senders.len() {
            bail!(
                "Render script uses {} channels but the mixer has {}",
                self.channels.len(),
                senders.len()
            );
        }

        let mut queued = 0;
        for (channel, (commands, sender)) in self.channels.iter().zip(senders.iter_mut()).enumerate() {
            for (i, scripted) in commands.iter().enumerate() {
                let cmd = scripted
                    .to_command(buffers, frame_rate)
                    .with_context(|| format!("Channel {} command {}", channel, i))?;
                sender.queue_command(cmd).map_err(|e| {
                    anyhow!(
                        "Channel {} command {}: {} (holds {} commands)",
                        channel,
                        i,
                        e,
                        sender.capacity() - 1
                    )
                })?;
                queued += 1;
            }
        }
        log::info!("RenderScript: Queued {} commands", queued);
        Ok(queued)
    }

    /// Build a mixer for `config`, queue the script and mix it to the end
    pub fn render(&self, config: &MixerConfig, base_dir: &Path) -> Result<RenderOutput> {
        let (mut mixer, mut senders) = SoundMixer::new(config)?;
        let buffers = self.build_buffers(base_dir, mixer.frame_rate())?;
        self.queue(&mut senders, &buffers, mixer.frame_rate())?;
        // Buffers stay alive through the commands that reference them
        drop(buffers);

        let mut frames = vec![StereoFrame::silence(); self.frames];
        let mut events = Vec::new();
        let mut rendered = 0;
        for block in frames.chunks_mut(self.block) {
            mixer.mix(block);
            rendered += block.len();

            for sender in &senders {
                for flag in 0..NUM_FLAGS {
                    if sender.poll_flag(flag) {
                        log::debug!(
                            "RenderScript: channel {} raised flag {} by frame {}",
                            sender.index(),
                            flag,
                            rendered
                        );
                        events.push(FlagEvent {
                            channel: sender.index(),
                            flag,
                            frame: rendered,
                        });
                    }
                }
            }
        }

        log::info!(
            "RenderScript: Rendered {} frames, {} flag events",
            rendered,
            events.len()
        );
        Ok(RenderOutput {
            sample_rate: mixer.frame_rate(),
            frames,
            events,
        })
    }
}

impl ScriptCommand {
    fn to_command(
        &self,
        buffers: &BTreeMap<String, Shared<SoundBuffer>>,
        frame_rate: u32,
    ) -> Result<SoundCommand> {
        let mut cmd = match self.op {
            ScriptOp::Play => {
                let name = self
                    .buffer
                    .as_deref()
                    .ok_or_else(|| anyhow!("play needs a buffer"))?;
                let buffer = buffers
                    .get(name)
                    .ok_or_else(|| anyhow!("Unknown buffer '{}'", name))?;
                SoundCommand::play(Shared::clone(buffer))
            }
            ScriptOp::Stream => {
                let tone = self
                    .tone
                    .as_ref()
                    .ok_or_else(|| anyhow!("stream needs a tone"))?;
                let mut stream = ToneStream::new(
                    tone.waveform,
                    tone.frequency,
                    tone.amplitude,
                    tone.sample_rate.unwrap_or(frame_rate),
                );
                if let Some(frames) = tone.frames {
                    stream = stream.with_length(frames as u64);
                }
                SoundCommand::play_stream(stream_handle(stream))
            }
            ScriptOp::Stop => SoundCommand::stop(),
            ScriptOp::Clear => SoundCommand::clear_queue(),
            ScriptOp::Nop => SoundCommand::nop(),
        };

        if let Some(pan) = self.pan {
            cmd = cmd.with_pan(pan.to_matrix());
        }
        if let Some(rate) = self.rate {
            cmd = cmd.with_rate(Pitch::from_f32(rate));
        }
        if let Some((left, right)) = self.loop_window {
            cmd = cmd.with_loop(left, right);
        }
        cmd = cmd
            .with_repeats(self.repeats)
            .with_delay(Delay::from_frames_f64(self.delay));
        for &flag in &self.flags {
            cmd = cmd.with_flag(flag)?;
        }

        cmd.validate()?;
        Ok(cmd)
    }
}
