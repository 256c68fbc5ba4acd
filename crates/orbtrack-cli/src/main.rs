//! orbtrack CLI — live ball tracking and offline pipeline tools.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use orbtrack::detect::contour::ContourConfig;
use orbtrack::detect::voting::VotingConfig;
use orbtrack::detect::BlobDetector;
use orbtrack::{
    CameraIntrinsics, ColorBand, DetectorConfig, RangePolicy, SelectionPolicy, TrackConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "orbtrack")]
#[command(about = "Detect a colored ball in a depth camera stream and send its 3D position over serial")]
#[command(version)]
struct Cli {
    /// Raise the default log level to debug.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the live tracking loop against the depth camera.
    Run(RunArgs),

    /// Detect candidates in a single image and print them as JSON.
    Detect(DetectArgs),

    /// Encode a point in meters and print the wire frame bytes.
    EncodeTest {
        /// X coordinate (meters).
        #[arg(long)]
        x: f64,
        /// Y coordinate (meters).
        #[arg(long)]
        y: f64,
        /// Z coordinate (meters).
        #[arg(long)]
        z: f64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Contour,
    Voting,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SelectionArg {
    HighestScore,
    LargestRadius,
}

impl SelectionArg {
    fn to_core(self) -> SelectionPolicy {
        match self {
            Self::HighestScore => SelectionPolicy::HighestScore,
            Self::LargestRadius => SelectionPolicy::LargestRadius,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RangePolicyArg {
    Saturate,
    Reject,
}

impl RangePolicyArg {
    fn to_core(self) -> RangePolicy {
        match self {
            Self::Saturate => RangePolicy::Saturate,
            Self::Reject => RangePolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Args)]
struct PipelineArgs {
    /// Lower HSV bound, comma separated (OpenCV 8-bit scale).
    #[arg(long, default_value = "5,100,100", value_parser = parse_triple)]
    color_lower: [u8; 3],

    /// Upper HSV bound, comma separated (OpenCV 8-bit scale).
    #[arg(long, default_value = "15,255,255", value_parser = parse_triple)]
    color_upper: [u8; 3],

    /// Detection strategy.
    #[arg(long, value_enum, default_value_t = StrategyArg::Contour)]
    strategy: StrategyArg,

    /// Contour strategy: minimum accepted region area (pixels²).
    #[arg(long, default_value = "1000.0")]
    min_area: f32,

    /// Contour strategy: maximum accepted region area (pixels²).
    #[arg(long, default_value = "10000.0")]
    max_area: f32,

    /// Voting strategy: minimum radius (pixels).
    #[arg(long, default_value = "8.0")]
    r_min: f32,

    /// Voting strategy: maximum radius (pixels).
    #[arg(long, default_value = "60.0")]
    r_max: f32,

    /// Candidate selection policy.
    #[arg(long, value_enum, default_value_t = SelectionArg::HighestScore)]
    selection: SelectionArg,
}

impl PipelineArgs {
    fn band(&self) -> ColorBand {
        ColorBand {
            lower: self.color_lower,
            upper: self.color_upper,
        }
    }

    fn detector(&self) -> DetectorConfig {
        match self.strategy {
            StrategyArg::Contour => DetectorConfig::Contour(ContourConfig {
                min_area: self.min_area,
                max_area: self.max_area,
            }),
            StrategyArg::Voting => DetectorConfig::Voting(VotingConfig {
                r_min: self.r_min,
                r_max: self.r_max,
                ..VotingConfig::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Stream width (pixels).
    #[arg(long, default_value = "640")]
    width: u32,

    /// Stream height (pixels).
    #[arg(long, default_value = "480")]
    height: u32,

    /// Stream frame rate. Low rates can starve the depth stream.
    #[arg(long, default_value = "15")]
    fps: u32,

    /// Serial port device.
    #[arg(long, default_value = "/dev/ttyUSB0")]
    port: String,

    /// Serial baud rate.
    #[arg(long, default_value = "115200")]
    baud: u32,

    /// Frame wait bound in milliseconds.
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,

    /// Sensor raw-depth-to-meters scale.
    #[arg(long, default_value = "0.001")]
    depth_scale: f64,

    /// Optional exponential smoothing factor in (0, 1].
    #[arg(long)]
    smoothing: Option<f64>,

    /// Encoder behavior for coordinates beyond ±32.767 m.
    #[arg(long, value_enum, default_value_t = RangePolicyArg::Saturate)]
    range_policy: RangePolicyArg,

    /// Camera focal length fx (pixels), from calibration.
    #[arg(long, default_value = "600.0")]
    cam_fx: f64,

    /// Camera focal length fy (pixels), from calibration.
    #[arg(long, default_value = "600.0")]
    cam_fy: f64,

    /// Camera principal point cx (pixels), from calibration.
    #[arg(long, default_value = "320.0")]
    cam_cx: f64,

    /// Camera principal point cy (pixels), from calibration.
    #[arg(long, default_value = "240.0")]
    cam_cy: f64,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write detected candidates (JSON); stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

fn parse_triple(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected three comma-separated values, got {:?}", s));
    }
    let mut out = [0u8; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|e| format!("invalid component {:?}: {}", part, e))?;
    }
    Ok(out)
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Run(args) => run_live(&args),
        Commands::Detect(args) => run_detect(&args),
        Commands::EncodeTest { x, y, z } => run_encode_test(x, y, z),
    }
}

// ── run ────────────────────────────────────────────────────────────────────

#[cfg(all(feature = "realsense", feature = "serial"))]
fn run_live(args: &RunArgs) -> CliResult<()> {
    use std::sync::atomic::Ordering;

    let intrinsics = CameraIntrinsics {
        fx: args.cam_fx,
        fy: args.cam_fy,
        cx: args.cam_cx,
        cy: args.cam_cy,
    }
    .validate()?;

    let config = TrackConfig {
        band: args.pipeline.band(),
        detector: args.pipeline.detector(),
        selection: args.pipeline.selection.to_core(),
        range_policy: args.range_policy.to_core(),
        smoothing: args.smoothing,
        frame_timeout_ms: args.timeout_ms,
    };
    config.validate()?;

    // No camera is fatal at startup; the transport is opened before the
    // sensor so a bad port name also fails before streaming begins.
    let transport = orbtrack::transport::SerialTransport::open(&args.port, args.baud)?;
    let source = orbtrack::sensor::RealSenseSource::open(
        args.width,
        args.height,
        args.fps,
        args.depth_scale,
    )?;

    let mut track = orbtrack::TrackLoop::new(source, transport, intrinsics, config)?;
    let stop = track.stop_handle();
    ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))?;

    let stats = track.run();
    tracing::info!(
        "done: {} frames sent over {} cycles",
        stats.sent,
        stats.cycles
    );
    Ok(())
}

#[cfg(not(all(feature = "realsense", feature = "serial")))]
fn run_live(_args: &RunArgs) -> CliResult<()> {
    Err("this build lacks the `realsense` and/or `serial` features required by `run`".into())
}

// ── detect ─────────────────────────────────────────────────────────────────

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());
    let img = image::open(&args.image)
        .map_err(|e| -> CliError {
            format!("failed to open image {}: {}", args.image.display(), e).into()
        })?
        .to_rgb8();

    // Same fail-fast validation the live loop performs at construction.
    let config = TrackConfig {
        band: args.pipeline.band(),
        detector: args.pipeline.detector(),
        ..TrackConfig::default()
    };
    config.validate()?;

    let mask = orbtrack::segment::hsv_mask(&img, &config.band)?;
    let gray = image::imageops::grayscale(&img);
    let candidates = config.detector.build().detect(&mask, &gray);
    tracing::info!("{} candidates", candidates.len());

    let json = serde_json::to_string_pretty(&candidates)?;
    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

// ── encode-test ────────────────────────────────────────────────────────────

fn run_encode_test(x: f64, y: f64, z: f64) -> CliResult<()> {
    let point = nalgebra::Point3::new(x, y, z);
    let frame = orbtrack::wire::encode(&point, RangePolicy::Saturate)?;
    let (mx, my, mz) = orbtrack::wire::decode(&frame).expect("own encoding decodes");

    print!("frame bytes:");
    for b in frame {
        print!(" {:02X}", b);
    }
    println!();
    println!("decoded mm:  ({}, {}, {})", mx, my, mz);
    Ok(())
}
