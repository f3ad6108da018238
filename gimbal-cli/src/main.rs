//! Gimbal camera command-line tool
//!
//! Talks to the camera's UDP control port for gimbal/lens/photo commands and
//! pulls snapshots from its RTSP stream.

mod routines;
mod settings;
#[cfg_attr(not(feature = "ffmpeg"), allow(dead_code))]
mod snapshot;

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gimbal_control::protocol::{FocusDirection, MotionMode, ZoomDirection};
use gimbal_control::GimbalController;
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::routines::{rotate_to, RotateTarget};
use crate::settings::Settings;

/// Gimbal camera control and video snapshot tool
#[derive(Parser, Debug)]
#[command(name = "gimbal")]
#[command(about = "Control a gimbal camera over UDP and grab frames from its RTSP stream")]
#[command(version)]
struct Args {
    /// JSON settings file with `control` and `stream` sections
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera address (applies to control and stream)
    #[arg(long)]
    host: Option<String>,

    /// UDP control port
    #[arg(long)]
    control_port: Option<u16>,

    /// Reply timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Dump every frame as hex
    #[arg(long)]
    debug: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Firmware, hardware id, attitude and gimbal state
    Info,
    /// Current attitude
    Attitude,
    /// Return the gimbal to center
    Center,
    /// Zoom in or out for a while, then stop
    Zoom {
        #[arg(value_enum)]
        direction: ZoomArg,
        /// How long to keep zooming
        #[arg(long, default_value = "1000")]
        duration_ms: u64,
    },
    /// Manual focus for a while, then stop
    Focus {
        #[arg(value_enum)]
        direction: FocusArg,
        #[arg(long, default_value = "500")]
        duration_ms: u64,
    },
    /// Trigger auto focus
    AutoFocus,
    /// Set yaw/pitch speed in percent (-100..100); 0 0 stops
    Speed {
        #[arg(allow_hyphen_values = true)]
        yaw: i32,
        #[arg(allow_hyphen_values = true)]
        pitch: i32,
    },
    /// Rotate to an absolute yaw/pitch in degrees
    Rotate {
        #[arg(allow_hyphen_values = true)]
        yaw: f32,
        #[arg(allow_hyphen_values = true)]
        pitch: f32,
        /// Acceptable error in degrees
        #[arg(long, default_value = "1.0")]
        threshold: f32,
        #[arg(long, default_value = "300")]
        max_iterations: u32,
    },
    /// Take one photo
    Photo,
    /// Toggle video recording
    Record,
    /// Select the gimbal motion mode
    Mode {
        #[arg(value_enum)]
        mode: Mode,
    },
    /// Save snapshots from the video stream
    Stream {
        /// Number of snapshots
        #[arg(long, default_value = "1")]
        count: u32,
        #[arg(long, default_value = "1000")]
        interval_ms: u64,
        #[arg(long, default_value = "10000")]
        wait_ms: u64,
        #[arg(long, default_value = "snapshots")]
        out_dir: PathBuf,
        /// Stream path on the RTSP server
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ZoomArg {
    In,
    Out,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FocusArg {
    Far,
    Near,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Lock,
    Follow,
    Fpv,
}

impl From<Mode> for MotionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Lock => MotionMode::Lock,
            Mode::Follow => MotionMode::Follow,
            Mode::Fpv => MotionMode::Fpv,
        }
    }
}

fn init_logging(log_level: &str) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
        return;
    }

    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(host) = &args.host {
        settings.set_host(host);
    }
    if let Some(port) = args.control_port {
        settings.control.port = port;
    }
    if let Some(timeout) = args.timeout_ms {
        settings.control.recv_timeout_ms = timeout;
    }
    if args.debug {
        settings.control.debug = true;
        settings.stream.debug = true;
    }
    Ok(settings)
}

fn print<T: Serialize + std::fmt::Debug>(json: bool, label: &str, value: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}: {:?}", label, value);
    }
    Ok(())
}

#[derive(Serialize, Debug)]
struct InfoReport {
    firmware: Option<String>,
    hardware_id: Option<String>,
    attitude: Option<gimbal_control::protocol::Attitude>,
    gimbal: Option<gimbal_control::protocol::GimbalInfo>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut settings = load_settings(&args)?;

    if let Command::Stream {
        count,
        interval_ms,
        wait_ms,
        out_dir,
        name,
    } = &args.command
    {
        if let Some(name) = name {
            settings.stream.name = name.clone();
        }
        let options = snapshot::CaptureOptions {
            count: *count,
            interval: Duration::from_millis(*interval_ms),
            first_frame_timeout: Duration::from_millis(*wait_ms),
            out_dir: out_dir.clone(),
        };
        return run_stream(settings, &options);
    }

    let mut camera = GimbalController::new(settings.control.clone());
    camera
        .connect()
        .with_context(|| format!("Failed to open control channel to {}", settings.control.host))?;

    let result = run_control(&mut camera, &args);
    if let Err(e) = camera.disconnect() {
        warn!("Disconnect failed: {}", e);
    }
    result
}

fn run_control(camera: &mut GimbalController, args: &Args) -> Result<()> {
    let json = args.json;
    match &args.command {
        Command::Info => {
            let report = InfoReport {
                firmware: camera.firmware_version().ok().map(|v| v.to_string()),
                hardware_id: camera.hardware_id().ok().map(|id| id.to_string()),
                attitude: camera.gimbal_attitude().ok(),
                gimbal: camera.gimbal_info().ok(),
            };
            print(json, "info", &report)?;
        }
        Command::Attitude => {
            let attitude = camera.gimbal_attitude()?;
            print(json, "attitude", &attitude)?;
        }
        Command::Center => {
            let ok = camera.center_gimbal()?;
            print(json, "centered", &ok)?;
        }
        Command::Zoom {
            direction,
            duration_ms,
        } => {
            let zoom = match direction {
                ZoomArg::In => ZoomDirection::In,
                ZoomArg::Out => ZoomDirection::Out,
            };
            camera.set_zoom(zoom)?;
            thread::sleep(Duration::from_millis(*duration_ms));
            let level = camera.set_zoom(ZoomDirection::Stop)?;
            print(json, "zoom", &level)?;
        }
        Command::Focus {
            direction,
            duration_ms,
        } => {
            let focus = match direction {
                FocusArg::Far => FocusDirection::Far,
                FocusArg::Near => FocusDirection::Near,
            };
            camera.set_focus(focus)?;
            thread::sleep(Duration::from_millis(*duration_ms));
            let ok = camera.set_focus(FocusDirection::Stop)?;
            print(json, "focus", &ok)?;
        }
        Command::AutoFocus => {
            let ok = camera.auto_focus()?;
            print(json, "auto_focus", &ok)?;
        }
        Command::Speed { yaw, pitch } => {
            let ok = camera.set_gimbal_speed(*yaw, *pitch)?;
            print(json, "speed", &ok)?;
        }
        Command::Rotate {
            yaw,
            pitch,
            threshold,
            max_iterations,
        } => {
            let target = RotateTarget {
                threshold: *threshold,
                max_iterations: *max_iterations,
                ..RotateTarget::new(*yaw, *pitch)
            };
            let outcome = rotate_to(camera, target)?;
            print(json, "rotate", &outcome)?;
        }
        Command::Photo => {
            let ok = camera.take_photo()?;
            print(json, "photo", &ok)?;
        }
        Command::Record => {
            let state = camera.toggle_recording()?;
            print(json, "record", &state)?;
        }
        Command::Mode { mode } => {
            let ok = camera.set_motion_mode((*mode).into())?;
            print(json, "mode", &ok)?;
        }
        Command::Stream { .. } => bail!("stream does not use the control channel"),
    }
    Ok(())
}

#[cfg(feature = "ffmpeg")]
fn run_stream(settings: Settings, options: &snapshot::CaptureOptions) -> Result<()> {
    let mut ingest = gimbal_stream::StreamIngest::ffmpeg(settings.stream);
    let written = snapshot::capture(&mut ingest, options)?;
    for path in &written {
        info!("Wrote {}", path.display());
    }
    println!("{} snapshot(s) in {}", written.len(), options.out_dir.display());
    Ok(())
}

#[cfg(not(feature = "ffmpeg"))]
fn run_stream(settings: Settings, _options: &snapshot::CaptureOptions) -> Result<()> {
    info!("Stream URL would be {}", settings.stream.url());
    bail!("Built without the `ffmpeg` feature; rebuild with `--features ffmpeg` to read the stream")
}
