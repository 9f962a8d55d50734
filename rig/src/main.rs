//! rig-sim - headless gesture and retargeting simulator.
//!
//! Plays a scripted performer into a `Session` with one humanoid avatar
//! and logs what the session sees.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use mocap_rig::sim::{Performer, SCRIPT_LENGTH};
use mocap_rig::{AvatarRig, GestureKind, LogListener, SceneGraph, ScriptedSource, Session, SessionConfig};

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

#[derive(Parser, Debug)]
#[command(name = "rig-sim", about = "Headless gesture and avatar retargeting simulator")]
struct Cli {
    /// Session config file (s-expression plist)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u32,

    /// Simulated frame rate
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable the second player slot
    #[arg(long)]
    two_users: bool,

    /// Pace frames in real time
    #[arg(long)]
    realtime: bool,

    /// Log session status every N frames (0 disables)
    #[arg(long, default_value_t = 0)]
    status_every: u32,

    /// Print the effective config and exit
    #[arg(long)]
    print_config: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Config used when no file is given: psi to calibrate, then swipe and zoom.
fn demo_config() -> SessionConfig {
    let mut config = SessionConfig::default();
    config.players[0].calibration_pose = Some(GestureKind::Psi);
    config.players[0].gestures = vec![GestureKind::SwipeLeft, GestureKind::ZoomIn];
    config
}

fn load_config(cli: &Cli) -> anyhow::Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            SessionConfig::from_sexp(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => demo_config(),
    };
    if cli.two_users {
        config.two_users = true;
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("rig-sim {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mocap_rig=info,rig_sim=info".into()),
        )
        .init();

    let config = load_config(&cli)?;
    if cli.print_config {
        println!("{}", config.config_sexp());
        return Ok(());
    }

    if cli.fps == 0 {
        anyhow::bail!("--fps must be at least 1");
    }

    info!("rig-sim v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "{} frames at {} fps ({:.1}s of a {:.1}s script)",
        cli.frames,
        cli.fps,
        cli.frames as f64 / cli.fps as f64,
        SCRIPT_LENGTH
    );

    let (mut scene, humanoid) = SceneGraph::humanoid();
    let mut rig = AvatarRig::new(config.rig.clone())
        .with_root(humanoid.root)
        .with_offset_node(humanoid.offset);
    rig.bind(&humanoid.bones);
    rig.capture_rest_pose(&mut scene);

    let sensor_height = config.sensor_height;
    let mut session = Session::new(config)?;
    session.add_rig(0, rig)?;
    session.add_listener(Box::new(LogListener::new()));

    let mut source = ScriptedSource::new();
    let mut performer = Performer::new(1, sensor_height);
    session.start(&mut source);

    // Signal handling via libc
    install_signal_handlers();

    let frame_time = 1.0 / cli.fps as f64;
    let start_time = Instant::now();
    let mut frames_run = 0;

    for frame in 0..cli.frames {
        // Check global shutdown flag (set by signal handler)
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            info!("Shutdown signal received, exiting");
            break;
        }

        let t = frame as f64 * frame_time;
        performer.step(&mut source, t);
        session.tick(&mut source, &mut scene, t, frame_time as f32);
        frames_run += 1;

        // Periodic status logging
        if cli.status_every > 0 && frame % cli.status_every == 0 {
            info!("frame {} ({}): {}", frame, performer.act().as_str(), session.status_sexp());
        }

        if cli.realtime {
            let due = start_time + Duration::from_secs_f64(t + frame_time);
            let now = Instant::now();
            if due > now {
                std::thread::sleep(due - now);
            }
        }
    }

    info!(
        "rig-sim finished after {} frame(s): {}",
        frames_run,
        session.status_sexp()
    );
    Ok(())
}
