//! Seamloop player (seamloop) - Main entry point
//!
//! Decodes an audio file, wraps it in a looping source and plays it on an
//! output device until Ctrl+C, the end of the file, or an optional duration.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use seamloop_common::config::{resolve_config_path, LoopConfig, TomlConfig, CONFIG_ENV_VAR};
use seamloop_common::timing::format_position;
use seamloop_player::audio::{decode_file, AudioOutput, LoopingSource};
use seamloop_player::playback::SourcePlayer;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Block size used when neither CLI nor config set a buffer size
const DEFAULT_BLOCK_SIZE: usize = 512;

/// How often the control loop reports the playback position
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

/// Command-line arguments for seamloop
#[derive(Parser, Debug)]
#[command(name = "seamloop")]
#[command(about = "Play an audio file, looping seamlessly between two times")]
#[command(version)]
struct Args {
    /// Audio file to play
    #[arg(required_unless_present = "list_devices")]
    file: Option<PathBuf>,

    /// Loop start in seconds
    #[arg(long, value_name = "SECONDS")]
    loop_start: Option<f64>,

    /// Loop end in seconds (exclusive)
    #[arg(long, value_name = "SECONDS")]
    loop_end: Option<f64>,

    /// Play straight through even if a loop is configured
    #[arg(long)]
    no_loop: bool,

    /// Output device name
    #[arg(short, long, env = "SEAMLOOP_DEVICE")]
    device: Option<String>,

    /// Audio buffer size in frames
    #[arg(short, long)]
    buffer_size: Option<u32>,

    /// Output volume, 0.0 to 1.0
    #[arg(long)]
    volume: Option<f32>,

    /// Stop after this many seconds
    #[arg(long, value_name = "SECONDS")]
    duration: Option<f64>,

    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG wins; otherwise the filter is replaced once the config is read
    let env_filter = EnvFilter::try_from_default_env().ok();
    let has_env_filter = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| default_filter("info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting seamloop (git {} built {} {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let config = TomlConfig::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    if !has_env_filter {
        filter_handle
            .reload(default_filter(&config.logging.level))
            .context("Failed to apply configured log level")?;
    }

    let loop_config = merge_loop_config(&args, &config.loop_window);
    let loop_bounds = loop_config.bounds().context("Invalid loop window")?;

    let volume = args.volume.unwrap_or(config.playback.volume);
    if !(0.0..=1.0).contains(&volume) {
        bail!("Volume {} is outside 0.0..=1.0", volume);
    }

    if let Some(duration) = args.duration {
        if !duration.is_finite() || duration <= 0.0 {
            bail!("Duration must be a positive number of seconds, got {}", duration);
        }
    }

    // Required unless --list-devices, which returned above
    let Some(file) = args.file.as_deref() else {
        bail!("No audio file given");
    };

    let decoded =
        decode_file(file).with_context(|| format!("Failed to decode {}", file.display()))?;
    let sample_rate = decoded.sample_rate;
    info!(
        "Loaded {} ({} Hz, {} channels, {:.2}s)",
        file.display(),
        sample_rate,
        decoded.channels,
        decoded.duration_seconds()
    );

    if let Some((start, end)) = loop_bounds {
        if end > decoded.duration_seconds() {
            warn!(
                "Loop end {:.3}s is past the end of the file ({:.3}s); the gap plays as silence",
                end,
                decoded.duration_seconds()
            );
        }
        info!("Loop window {:.3}s - {:.3}s", start, end);
    }

    let device = args.device.clone().or(config.playback.device.clone());
    let buffer_size = args.buffer_size.or(config.playback.buffer_size);

    let mut output = AudioOutput::open(device.as_deref(), sample_rate, buffer_size)
        .context("Failed to open audio output")?;
    output.set_volume(volume);

    if output.sample_rate() != sample_rate {
        warn!(
            "Device runs at {} Hz but the file is {} Hz; playback speed will differ",
            output.sample_rate(),
            sample_rate
        );
    }

    let looping = LoopingSource::owning(Box::new(decoded.into_source()));
    let loop_handle = looping.handle();

    let block_size = buffer_size.map_or(DEFAULT_BLOCK_SIZE, |size| size as usize);
    let player = SourcePlayer::new(Box::new(looping), block_size, f64::from(sample_rate));
    let status = player.status();

    if let Some((start, end)) = loop_bounds {
        loop_handle.set_loop_times(start, end);
    }
    loop_handle.set_loop_between_times(loop_config.enabled);

    output.start(player).context("Failed to start playback")?;
    info!(
        "Playing on {} ({} Hz, {} channels, buffer {}, volume {:.2})",
        output.device_name(),
        output.sample_rate(),
        output.channels(),
        output
            .buffer_size()
            .map_or_else(|| "default".to_string(), |size| format!("{} frames", size)),
        output.volume()
    );

    let started = Instant::now();
    let deadline = args.duration.map(Duration::from_secs_f64);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    let mut last_report = Instant::now();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                if status.take_source_error() {
                    error!("Source failed to produce audio; rendered silence");
                }

                if output.has_error() {
                    error!("Audio stream reported {} error(s)", output.error_count());
                    output.clear_error();
                }

                if last_report.elapsed() >= STATUS_INTERVAL {
                    last_report = Instant::now();
                    info!(
                        "Position {} / {}",
                        format_position(status.position(), f64::from(sample_rate)),
                        format_position(status.total_length(), f64::from(sample_rate))
                    );
                }

                if !loop_handle.loop_window().is_active() && status.is_past_end() {
                    info!("Reached end of file");
                    break;
                }

                if deadline.is_some_and(|limit| started.elapsed() >= limit) {
                    info!("Requested duration elapsed");
                    break;
                }
            }
        }
    }

    output.stop().context("Failed to stop playback")?;
    info!("Playback stopped");
    Ok(())
}

/// Filter for our own crates at `level`
fn default_filter(level: &str) -> EnvFilter {
    EnvFilter::new(format!(
        "seamloop={level},seamloop_player={level},seamloop_common={level}"
    ))
}

/// CLI bounds override the config file; giving bounds on the CLI enables looping.
fn merge_loop_config(args: &Args, config: &LoopConfig) -> LoopConfig {
    let cli_bounds = args.loop_start.is_some() || args.loop_end.is_some();

    LoopConfig {
        enabled: !args.no_loop && (cli_bounds || config.enabled),
        start_seconds: args.loop_start.or(config.start_seconds),
        end_seconds: args.loop_end.or(config.end_seconds),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping");
        },
    }
}
