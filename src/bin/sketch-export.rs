use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sketch-export", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the demo sketch, exporting and/or recording per the query string.
    Run(RunArgs),
    /// Print the recorded series saved in storage.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Start-up query, e.g. `?export=true`, `?record=angle` or `?play=angle&export=true`.
    #[arg(long, default_value = "")]
    query: String,

    /// Number of frames to run.
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Frame at which export/recording is stopped (defaults to the last frame).
    #[arg(long)]
    stop_at: Option<u64>,

    /// Export settings as JSON (`format`, `verbose`, `fps`); flags below override it.
    #[arg(long)]
    settings: Option<String>,

    /// Frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Export container.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Output video path (or directory for `png`).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory holding recorded series.
    #[arg(long, default_value = ".sketch-storage")]
    storage: PathBuf,

    #[arg(long, default_value_t = 400)]
    width: u32,

    #[arg(long, default_value_t = 400)]
    height: u32,

    /// Only log warnings and errors.
    #[arg(long)]
    quiet: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Directory holding recorded series.
    #[arg(long, default_value = ".sketch-storage")]
    storage: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Webm,
    Mp4,
    Png,
}

impl From<FormatChoice> for sketch_export::CaptureFormat {
    fn from(c: FormatChoice) -> Self {
        match c {
            FormatChoice::Webm => Self::Webm,
            FormatChoice::Mp4 => Self::Mp4,
            FormatChoice::Png => Self::Png,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, true) => "debug",
        (false, false) => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut settings = match &args.settings {
        Some(json) => sketch_export::ExportSettings::from_json(json)?,
        None => sketch_export::ExportSettings::default(),
    };
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(format) = args.format {
        settings.format = format.into();
    }
    init_logging(settings.verbose, args.quiet);

    let canvas = sketch_export::Canvas {
        width: args.width,
        height: args.height,
    };
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| match settings.format {
            sketch_export::CaptureFormat::Png => PathBuf::from("sketch-frames"),
            f => PathBuf::from(format!("sketch.{}", f.extension())),
        });

    let query = sketch_export::QueryParams::parse(&args.query);
    let mut storage = sketch_export::FileStore::new(&args.storage);

    // Only spawn a real encoder when the query asks for export.
    let capturer: Box<dyn sketch_export::FrameCapturer> = if query.export() {
        sketch_export::create_capturer(&settings, canvas, &out)?
    } else {
        Box::new(sketch_export::InMemoryCapturer::new())
    };

    let hooks = sketch_export::PlaybackHooks::default()
        .on_playback_start(|| tracing::info!("playback started"))
        .on_playback_end(|| tracing::info!("playback ended"));

    let mut session =
        sketch_export::SketchSession::configure(settings, hooks, &query, &storage, capturer)
            .context("configure sketch session")?;

    let sketch = sketch_export::SpinningBar::new(canvas);
    let mut plan = sketch_export::RunPlan::new(args.frames);
    if let Some(stop_at) = args.stop_at {
        plan = plan.stop_at(sketch_export::FrameIndex(stop_at));
    }
    let report = sketch_export::run_spinning_bar(&sketch, &mut session, &mut storage, plan)
        .context("run sketch")?;

    if session.export_enabled() {
        eprintln!("wrote {}", out.display());
    }
    if session.record_enabled() {
        eprintln!(
            "recorded {} frames into {}",
            report.angles.len(),
            storage.root().display()
        );
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let storage = sketch_export::FileStore::new(&args.storage);
    let series = sketch_export::load_series(&storage)
        .with_context(|| format!("read storage '{}'", args.storage.display()))?
        .unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&series)?);
    Ok(())
}
