//! LoopTrack Simulator
//!
//! Runs the timeline controller against a simulated engine and prints the
//! displayed readout and playhead as they change.
//!
//! Usage:
//!   lt-sim --duration-ms 6000 --seek 2300:30 --toggle-at 5000
//!   lt-sim --open drums.wav --loop 1.0:3.0 --paused
//!   lt-sim --open drums.wav --check
//!   RUST_LOG=debug lt-sim --config clock.toml

mod engine;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use lt_bridge::{
    ChannelTransport, EngineClient, Focus, InputEvent, LoopEdge, OpenFilePayload,
    TimelineController, TimelineView, UiEvent, event_bus, state_change_bus,
};
use lt_clock::ClockConfig;
use lt_core::{ClipId, FramePosition};

use crate::engine::SimEngine;

#[derive(Parser, Debug)]
#[command(name = "lt-sim", about = "LoopTrack timeline against a simulated engine")]
struct Cli {
    /// Clock configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to run, in milliseconds
    #[arg(short, long, default_value_t = 5_000)]
    duration_ms: u64,

    /// Engine sample rate
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,

    /// Click the timeline: AT_MS:SECONDS
    #[arg(long = "seek", value_parser = parse_pair)]
    seeks: Vec<(f64, f64)>,

    /// Press space at these times (ms)
    #[arg(long = "toggle-at")]
    toggles: Vec<u64>,

    /// Open these files before starting
    #[arg(long = "open")]
    files: Vec<String>,

    /// Focus the first opened clip and loop it: START_S:END_S
    #[arg(long = "loop", value_parser = parse_pair)]
    loop_region: Option<(f64, f64)>,

    /// Set the shared check flag through a state change at start
    #[arg(long)]
    check: bool,

    /// Seconds of audio per opened file
    #[arg(long, default_value_t = 8.0)]
    clip_seconds: f64,

    /// Start paused instead of pressing play at 0ms
    #[arg(long)]
    paused: bool,

    /// Render period in milliseconds
    #[arg(long, default_value_t = 100)]
    render_ms: u64,

    /// Override pixels_per_second
    #[arg(long)]
    pixels_per_second: Option<f64>,

    /// Override frame_rate_hz (0 disables frame alignment)
    #[arg(long)]
    frame_rate: Option<f64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    log::info!("Starting LoopTrack simulator: {:?}", config);

    run(cli, config).await
}

fn parse_pair(s: &str) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected A:B, got '{}'", s))?;
    let parse = |v: &str| {
        let value = v
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("'{}': {}", v, e))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(format!("'{}' is not a finite number", v))
        }
    };
    Ok((parse(a)?, parse(b)?))
}

fn load_config(cli: &Cli) -> Result<ClockConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            ClockConfig::from_toml(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ClockConfig::default(),
    };

    if let Some(pps) = cli.pixels_per_second {
        config.pixels_per_second = pps;
    }
    if let Some(rate) = cli.frame_rate {
        config.frame_rate_hz = rate;
    }
    config.validate()?;
    Ok(config)
}

/// Scripted input, ordered by time
fn input_script(cli: &Cli, pixels_per_second: f64) -> Vec<(Duration, InputEvent)> {
    let space = || InputEvent::KeyDown {
        code: "Space".into(),
        focus: Focus::Document,
    };

    let mut script = Vec::new();
    if !cli.paused {
        script.push((Duration::ZERO, InputEvent::PlayButton));
    }
    for &at in &cli.toggles {
        script.push((Duration::from_millis(at), space()));
    }
    for &(at_ms, seconds) in &cli.seeks {
        script.push((
            Duration::from_secs_f64(at_ms.max(0.0) / 1000.0),
            InputEvent::TimelineClick {
                client_x: seconds * pixels_per_second,
                timeline_left: 0.0,
            },
        ));
    }
    script.sort_by_key(|(at, _)| *at);
    script
}

/// Focus the first clip, pick both loop edges and create the loop
fn loop_script(start_frame: u32, end_frame: u32) -> Vec<(Duration, InputEvent)> {
    vec![
        (
            Duration::from_millis(10),
            InputEvent::ClipClick { id: ClipId(1) },
        ),
        (
            Duration::from_millis(50),
            InputEvent::BeatMenu {
                edge: LoopEdge::Start,
                frame: start_frame,
            },
        ),
        (
            Duration::from_millis(60),
            InputEvent::BeatMenu {
                edge: LoopEdge::End,
                frame: end_frame,
            },
        ),
        (Duration::from_millis(100), InputEvent::CreateLoopButton),
    ]
}

fn print_view(start: Instant, view: &TimelineView) {
    let clips: usize = view.tracks.iter().map(|t| t.clips.len()).sum();
    let focus = view
        .focus
        .as_ref()
        .map(|f| format!(" focus={}", f.clip().name))
        .unwrap_or_default();
    println!(
        "{:>8.3}s  {}  playhead {:>8.2}px{}  {:?}  tracks={} clips={}{}",
        start.elapsed().as_secs_f64(),
        view.readout,
        view.playhead.position_px,
        if view.playhead.animated { "" } else { " (snap)" },
        view.phase,
        view.tracks.len(),
        clips,
        focus,
    );
}

async fn run(cli: Cli, config: ClockConfig) -> Result<()> {
    if cli.sample_rate == 0 {
        bail!("sample rate must be positive");
    }

    let start = Instant::now();
    let deadline = start + Duration::from_millis(cli.duration_ms);

    let (transport, calls) = ChannelTransport::channel();
    let (events, event_rx) = event_bus();
    let (changes, change_rx) = state_change_bus();
    let (inputs, input_rx) = mpsc::channel(32);

    let mut engine = SimEngine::new(cli.sample_rate, cli.clip_seconds, events.clone());
    for path in &cli.files {
        engine.open_file(path).await;
        events
            .send(UiEvent::OpenFile(OpenFilePayload { path: path.clone() }))
            .await?;
    }
    let engine_task = tokio::spawn(engine.serve(calls, change_rx, deadline));

    let mut script = input_script(&cli, config.pixels_per_second);
    let loop_region = cli.loop_region.filter(|_| !cli.files.is_empty());
    if let Some((loop_start, loop_end)) = loop_region {
        let (start_frame, end_frame) = loop_frames(loop_start, loop_end, cli.sample_rate)?;
        script.extend(loop_script(start_frame, end_frame));
        script.sort_by_key(|(at, _)| *at);
    }
    let driver = tokio::spawn(async move {
        for (at, input) in script {
            sleep_until(start + at).await;
            if inputs.send(input).await.is_err() {
                break;
            }
        }
        sleep_until(deadline).await;
        drop(events);
    });

    let mut controller = TimelineController::new(config, EngineClient::new(transport));
    controller.on_open_file(|payload| log::info!("[Sim] opened {}", payload.path));
    controller.connect_state_changes(changes);

    for tick in controller.ruler_ticks(600.0, 44.0) {
        log::debug!("[Sim] ruler {} at {:.0}px", tick.label, tick.x_px);
    }

    if cli.check {
        controller.set_check(true).await?;
    }

    controller
        .run(
            event_rx,
            input_rx,
            Duration::from_millis(cli.render_ms),
            |view| print_view(start, view),
        )
        .await;

    driver.await.context("input driver panicked")?;
    engine_task.await.context("engine panicked")?;
    log::info!("Simulator finished after {:?}", start.elapsed());
    Ok(())
}

/// Loop bounds in frames, checked against the engine's 32-bit loop fields
fn loop_frames(start_s: f64, end_s: f64, sample_rate: u32) -> Result<(u32, u32)> {
    let to_frame = |seconds: f64| {
        let frames = FramePosition::from_seconds(seconds, sample_rate).0;
        u32::try_from(frames)
            .with_context(|| format!("loop bound {seconds}s is {frames} frames, past u32::MAX"))
    };
    Ok((to_frame(start_s)?, to_frame(end_s)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pair() {
        assert_eq!(parse_pair("2300:30").unwrap(), (2300.0, 30.0));
        assert_eq!(parse_pair("1.5: 3").unwrap(), (1.5, 3.0));
        assert!(parse_pair("30").is_err());
        assert!(parse_pair("a:1").is_err());
        assert!(parse_pair("inf:30").is_err());
    }

    #[test]
    fn test_script_order() {
        let cli = Cli::parse_from([
            "lt-sim",
            "--seek",
            "2000:30",
            "--toggle-at",
            "500",
        ]);
        let script = input_script(&cli, 10.0);
        assert_eq!(script.len(), 3);
        assert_eq!(script[0], (Duration::ZERO, InputEvent::PlayButton));
        assert_eq!(script[1].0, Duration::from_millis(500));
        assert_eq!(
            script[2].1,
            InputEvent::TimelineClick {
                client_x: 300.0,
                timeline_left: 0.0
            }
        );
    }

    #[test]
    fn test_config_overrides() {
        let cli = Cli::parse_from(["lt-sim", "--pixels-per-second", "20", "--frame-rate", "0"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.pixels_per_second, 20.0);
        assert!(config.frame_period().is_none());

        let bad = Cli::parse_from(["lt-sim", "--pixels-per-second", "0"]);
        assert!(load_config(&bad).is_err());
    }

    #[test]
    fn test_loop_script_edits_first_clip() {
        let script = loop_script(44100, 132_300);
        assert_eq!(script[0].1, InputEvent::ClipClick { id: ClipId(1) });
        assert_eq!(
            script[2].1,
            InputEvent::BeatMenu {
                edge: LoopEdge::End,
                frame: 132_300
            }
        );
        assert_eq!(script.last().unwrap().1, InputEvent::CreateLoopButton);
        assert!(script.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn test_loop_frames() {
        assert_eq!(loop_frames(1.0, 2.5, 44_100).unwrap(), (44_100, 110_250));

        // ~27 hours at 44.1kHz no longer fits the engine's frame fields
        assert!(loop_frames(0.0, 100_000.0, 44_100).is_err());
        assert!(loop_frames(100_000.0, 100_001.0, 44_100).is_err());
    }

    #[test]
    fn test_sub_hertz_frame_rate_rejected() {
        let cli = Cli::parse_from(["lt-sim", "--frame-rate", "1e-20"]);
        assert!(load_config(&cli).is_err());
    }
}
