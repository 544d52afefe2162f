//! YAML configuration I/O for any serde type

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read and parse a YAML config file
///
/// Returns `Ok(None)` when the file does not exist. Read and parse failures
/// are errors; use this when a config was asked for explicitly.
pub fn try_load_config<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    let config = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;
    log::info!("load_config: Loaded config from {:?}", path);
    Ok(Some(config))
}

/// Load a YAML config file, falling back to defaults
///
/// A missing file silently yields `T::default()`; an unreadable or invalid
/// one logs a warning and yields `T::default()`.
///
/// ```ignore
/// let config: MixerConfig = load_config(Path::new("mixer.yaml"));
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match try_load_config(path) {
        Ok(Some(config)) => config,
        Ok(None) => {
            log::info!("load_config: {:?} doesn't exist, using defaults", path);
            T::default()
        }
        Err(e) => {
            log::warn!("load_config: {:#}, using defaults", e);
            T::default()
        }
    }
}

/// Save a config as YAML, creating parent directories as needed
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    log::info!("save_config: Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MixerConfig;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config: MixerConfig = load_config(Path::new("/nonexistent/sndmix/mixer.yaml"));
        assert_eq!(config, MixerConfig::default());

        let strict: Option<MixerConfig> =
            try_load_config(Path::new("/nonexistent/sndmix/mixer.yaml")).unwrap();
        assert!(strict.is_none());
    }

    #[test]
    fn test_mixer_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("mixer.yaml");

        let config = MixerConfig::default()
            .with_sample_rate(44100)
            .with_channels(8)
            .with_queue_capacity(256);
        save_config(&config, &path).unwrap();

        let loaded: MixerConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixer.yaml");
        std::fs::write(&path, "num_channels: [not, a, number]\n").unwrap();

        let config: MixerConfig = load_config(&path);
        assert_eq!(config, MixerConfig::default());
        assert!(try_load_config::<MixerConfig>(&path).is_err());
    }
}
