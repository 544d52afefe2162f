//! sndmix core - realtime command-driven audio mixing
//!
//! Control threads describe playback as [`engine::SoundCommand`]s and push
//! them into per-channel lock-free queues; the audio thread calls
//! [`engine::SoundMixer::mix`] once per device block.

pub mod config;
pub mod engine;
pub mod fixed;
pub mod script;
pub mod source;
pub mod types;

pub use types::*;
