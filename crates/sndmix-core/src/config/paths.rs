//! Standard locations for sndmix configuration files

use std::path::PathBuf;

/// Get the default configuration directory
///
/// Returns: `<platform config dir>/sndmix` (e.g. `~/.config/sndmix` on Linux),
/// or `./sndmix` when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sndmix")
}

/// Get the default path for a config file
///
/// Returns: `<default_config_dir>/{filename}`
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}
