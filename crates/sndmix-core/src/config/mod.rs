//! Configuration file utilities
//!
//! Generic YAML loading/saving plus the standard config location. The engine's
//! own settings live in [`MixerConfig`](crate::engine::MixerConfig).
//!
//! ```ignore
//! use sndmix_core::config::{default_config_path, load_config};
//! use sndmix_core::engine::MixerConfig;
//!
//! let config: MixerConfig = load_config(&default_config_path("mixer.yaml"));
//! ```

mod io;
mod paths;

pub use io::{load_config, save_config, try_load_config};
pub use paths::{default_config_dir, default_config_path};
