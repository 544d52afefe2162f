//! sndmix-render - mix a YAML render script into a WAV file
//!
//! ```text
//! sndmix-render <script.yaml> <out.wav> [--config mixer.yaml]
//! ```
//!
//! Without `--config` the mixer settings come from `mixer.yaml` in the
//! default config directory, or the built-in defaults.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};

use sndmix_core::config::{default_config_path, load_config, try_load_config};
use sndmix_core::engine::{start_collector, MixerConfig, DEFAULT_COLLECT_INTERVAL};
use sndmix_core::script::RenderScript;
use sndmix_core::source::write_wav;

const USAGE: &str = "usage: sndmix-render <script.yaml> <out.wav> [--config mixer.yaml]";

struct Args {
    script: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config = Some(PathBuf::from(path));
            }
            "-h" | "--help" => bail!("{}", USAGE),
            _ if arg.starts_with("--") => bail!("unknown option {}\n{}", arg, USAGE),
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    match <[PathBuf; 2]>::try_from(positional) {
        Ok([script, output]) => Ok(Args {
            script,
            output,
            config,
        }),
        Err(_) => bail!("{}", USAGE),
    }
}

fn mixer_config(path: Option<&Path>) -> Result<MixerConfig> {
    match path {
        Some(path) => try_load_config(path)?
            .with_context(|| format!("Config file not found: {:?}", path)),
        None => Ok(load_config(&default_config_path("mixer.yaml"))),
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;
    start_collector(DEFAULT_COLLECT_INTERVAL).context("Failed to start the sound source collector")?;
    let config = mixer_config(args.config.as_deref())?;

    let script = RenderScript::load(&args.script)?;
    let base_dir = args.script.parent().unwrap_or(Path::new("."));
    let output = script.render(&config, base_dir)?;

    write_wav(&args.output, output.sample_rate, &output.frames)
        .with_context(|| format!("Failed to write {:?}", args.output))?;

    for event in &output.events {
        log::info!(
            "flag {} on channel {} by frame {}",
            event.flag,
            event.channel,
            event.frame
        );
    }
    log::info!(
        "Rendered {:.2}s to {:?}",
        output.frames.len() as f64 / output.sample_rate as f64,
        args.output
    );
    Ok(())
}

fn main() -> ExitCode {
    // Set RUST_LOG=debug for per-command output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("sndmix-render starting up");
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
