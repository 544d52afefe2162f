//! Sound engine - command queues, channels and the mixer
//!
//! - [`SoundCommand`]: a queued instruction (play, stop, retune, clear)
//! - [`ChannelSender`]: lock-free producer for one channel's queue
//! - [`SoundChannel`]: one voice with delay scheduling, resampling and panning
//! - [`SoundMixer`]: sums every channel into the output block

mod channel;
mod command;
mod config;
mod error;
mod gc;
mod mixer;
mod sender;

pub use channel::{ChannelAtomics, SoundChannel, NO_PENDING_DELAY};
pub use command::{SoundCommand, SoundOp};
pub use config::{MixerConfig, DEFAULT_MAX_BLOCK_FRAMES, DEFAULT_NUM_CHANNELS, DEFAULT_QUEUE_CAPACITY};
pub use error::{CommandError, ConfigError, QueueFull};
pub use gc::{gc_handle, start_collector, DEFAULT_COLLECT_INTERVAL};
pub use mixer::SoundMixer;
pub use sender::ChannelSender;
