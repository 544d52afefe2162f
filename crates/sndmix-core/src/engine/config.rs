//! Mixer configuration
//!
//! Fixes everything that cannot change once the mixer exists: channel count,
//! per-channel queue capacity, output rate and the accumulator size.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::types::DEFAULT_SAMPLE_RATE;

/// Default number of channels
pub const DEFAULT_NUM_CHANNELS: usize = 16;

/// Default nominal queue capacity per channel (holds capacity - 1 commands)
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default accumulator size in frames
///
/// Covers common device buffer sizes (64 to 4096 frames); larger blocks are
/// mixed in several chunks.
pub const DEFAULT_MAX_BLOCK_FRAMES: usize = 8192;

/// Configuration for [`SoundMixer`](super::SoundMixer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Output rate in frames per second
    pub sample_rate: u32,
    /// Number of channels (power of two)
    pub num_channels: usize,
    /// Nominal ring capacity per channel (power of two, at least 2)
    pub queue_capacity: usize,
    /// Frames mixed per accumulator pass
    pub max_block_frames: usize,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            num_channels: DEFAULT_NUM_CHANNELS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_block_frames: DEFAULT_MAX_BLOCK_FRAMES,
        }
    }
}

impl MixerConfig {
    /// Set the output rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the channel count
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.num_channels = channels;
        self
    }

    /// Set the per-channel queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the accumulator size
    pub fn with_max_block_frames(mut self, frames: usize) -> Self {
        self.max_block_frames = frames;
        self
    }

    /// Check every constraint the mixer relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate);
        }
        if !self.num_channels.is_power_of_two() {
            return Err(ConfigError::ChannelCountNotPowerOfTwo(self.num_channels));
        }
        if self.queue_capacity < 2 {
            return Err(ConfigError::QueueCapacityTooSmall(self.queue_capacity));
        }
        if !self.queue_capacity.is_power_of_two() {
            return Err(ConfigError::QueueCapacityNotPowerOfTwo(self.queue_capacity));
        }
        if self.max_block_frames == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(MixerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = MixerConfig::default();
        assert_eq!(
            base.clone().with_channels(6).validate(),
            Err(ConfigError::ChannelCountNotPowerOfTwo(6))
        );
        assert_eq!(
            base.clone().with_channels(0).validate(),
            Err(ConfigError::ChannelCountNotPowerOfTwo(0))
        );
        assert_eq!(
            base.clone().with_queue_capacity(1).validate(),
            Err(ConfigError::QueueCapacityTooSmall(1))
        );
        assert_eq!(
            base.clone().with_queue_capacity(48).validate(),
            Err(ConfigError::QueueCapacityNotPowerOfTwo(48))
        );
        assert_eq!(base.clone().with_sample_rate(0).validate(), Err(ConfigError::ZeroSampleRate));
        assert_eq!(base.with_max_block_frames(0).validate(), Err(ConfigError::ZeroBlockSize));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: MixerConfig = serde_yaml::from_str("num_channels: 4\n").unwrap();
        assert_eq!(config.num_channels, 4);
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
    }
}
