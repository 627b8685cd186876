use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use form_coach::config::AppConfig;
use form_coach::engine::{CoachHandle, ManualClock};
use form_coach::feedback::{FeedbackTransport, HttpTransport, OfflineTransport};
use form_coach::pose::{catalog, classify, find_exercise, AngleSample};
use form_coach::replay::FrameRecording;
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "coach_cli",
    about = "Replay recorded pose frames through the form coaching pipeline"
)]
struct Cli {
    /// Configuration file (defaults to assets/coach_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a recording through a full session and print outcomes and the summary
    Replay {
        #[arg(long)]
        frames: PathBuf,
        #[arg(long)]
        exercise: String,
        /// Analysis service base URL, overriding the configuration
        #[arg(long, conflicts_with = "offline")]
        backend: Option<String>,
        /// Answer every request locally instead of calling the service
        #[arg(long)]
        offline: bool,
        /// Pace frames by their timestamps instead of as fast as possible
        #[arg(long)]
        realtime: bool,
        /// How long to wait for outstanding responses before finishing
        #[arg(long, default_value_t = 2000)]
        settle_ms: u64,
    },
    /// Print the joint angle for every frame without contacting the service
    Angle {
        #[arg(long)]
        frames: PathBuf,
        #[arg(long)]
        exercise: String,
    },
    /// List supported exercises
    Exercises,
}

#[derive(Serialize)]
struct AngleLine {
    timestamp_ms: u64,
    gate: form_coach::pose::GateStatus,
    degrees: Option<u16>,
    zone: form_coach::pose::AngleZone,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Replay {
            frames,
            exercise,
            backend,
            offline,
            realtime,
            settle_ms,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("building tokio runtime")?;
            runtime.block_on(run_replay(
                config, &frames, &exercise, backend, offline, realtime, settle_ms,
            ))
        }
        Commands::Angle { frames, exercise } => run_angle(&config, &frames, &exercise),
        Commands::Exercises => run_exercises(),
    }
}

async fn run_replay(
    mut config: AppConfig,
    frames: &PathBuf,
    exercise: &str,
    backend: Option<String>,
    offline: bool,
    realtime: bool,
    settle_ms: u64,
) -> Result<ExitCode> {
    let recording = FrameRecording::load(frames)?;
    let first_ms = recording
        .frames()
        .first()
        .map(|frame| frame.timestamp_ms)
        .ok_or_else(|| anyhow!("recording {:?} has no frames", frames))?;

    if let Some(url) = backend {
        config.feedback.base_url = url;
    }
    let transport: Arc<dyn FeedbackTransport> = if offline {
        Arc::new(OfflineTransport)
    } else {
        Arc::new(HttpTransport::new(&config.feedback))
    };

    let clock = Arc::new(ManualClock::new(first_ms));
    let mut coach = CoachHandle::new(config, transport, clock.clone());
    form_coach::http::spawn_if_enabled(coach.observer());
    let mut live = coach.subscribe_live();

    coach
        .start_session(exercise)
        .with_context(|| format!("starting session for {}", exercise))?;

    let mut previous_ms = first_ms;
    for recorded in recording.frames() {
        if realtime {
            let delta = recorded.timestamp_ms.saturating_sub(previous_ms);
            tokio::time::sleep(Duration::from_millis(delta)).await;
        }
        previous_ms = recorded.timestamp_ms;
        clock.set(recorded.timestamp_ms);

        let outcome = coach.process_frame(&recorded.landmarks);
        println!("{}", json!({ "frame": outcome }));
        while let Ok(update) = live.try_recv() {
            println!("{}", json!({ "live": update }));
        }
    }

    coach.settle(Duration::from_millis(settle_ms)).await;
    while let Ok(update) = live.try_recv() {
        println!("{}", json!({ "live": update }));
    }

    let summary = coach.finish_session()?;
    println!("{}", json!({ "summary": summary }));
    let coaching = coach.coaching_report().await;
    println!("{}", json!({ "coaching": coaching }));

    Ok(ExitCode::from(0))
}

fn run_angle(config: &AppConfig, frames: &PathBuf, exercise: &str) -> Result<ExitCode> {
    let spec =
        find_exercise(exercise).ok_or_else(|| anyhow!("unknown exercise {:?}", exercise))?;
    let recording = FrameRecording::load(frames)?;

    for recorded in recording.frames() {
        let gate = classify(&recorded.landmarks, spec, &config.gate);
        let sample = if gate.transmittable() {
            spec.sample_angle(&recorded.landmarks, &config.gate)
        } else {
            AngleSample::absent()
        };
        let line = AngleLine {
            timestamp_ms: recorded.timestamp_ms,
            gate,
            degrees: sample.degrees,
            zone: sample.zone,
        };
        println!("{}", serde_json::to_string(&line)?);
    }
    Ok(ExitCode::from(0))
}

fn run_exercises() -> Result<ExitCode> {
    for spec in catalog() {
        let (low, high) = spec.target_degrees;
        println!("{} ({}) target {}-{} deg", spec.id, spec.wire_key, low, high);
    }
    Ok(ExitCode::from(0))
}
