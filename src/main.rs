use clap::{Parser, Subcommand};
use hairsheet::capability::GeminiClient;
use hairsheet::capability::gemini::api_key_from_env;
use hairsheet::retry::RetryingGenerationClient;
use hairsheet::session::GenerationSession;
use hairsheet::types::{Angle, AngleSet, GenerationInputs, ImagePayload};
use hairsheet::video::VideoOperationPoller;
use hairsheet::{config, export, output};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

/// Extensions tried, in order, when looking for an angle image in a directory.
const ANGLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "hairsheet")]
#[command(about = "Four-view hairstyle try-on sheets from a single photo")]
#[command(long_about = "\
Four-view hairstyle try-on sheets from a single photo

One generation request produces a 2x2 sheet showing you with the new style
from four sides. The sheet is split into separate images, recomposed into a
printable sheet, and can optionally be turned into a turntable video.

Sheet layout:

  +------------+------------+
  |   Front    | Left Side  |
  +------------+------------+
  | Right Side |    Back    |
  +------------+------------+

The API key is read from GEMINI_API_KEY (or GOOGLE_API_KEY).

Run 'hairsheet gen-config' to generate a documented hairsheet.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Log more (-v info, -vv debug). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Photo of the person to restyle
    #[arg(long)]
    photo: PathBuf,

    /// Written description of the hairstyle
    #[arg(long)]
    style: Option<String>,

    /// Photo of a hairstyle to copy
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Tweak applied on top of the chosen style
    #[arg(long)]
    modification: Option<String>,

    /// Hair colour
    #[arg(long)]
    color: Option<String>,

    /// Also render a turntable video from the front view
    #[arg(long)]
    video: bool,

    /// Export directory
    #[arg(long, default_value = "hairsheet-out")]
    out: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Generate four views (and optionally a video) and export the session
    Generate(GenerateArgs),
    /// Split a 2x2 sheet into front/left/right/back images
    Split {
        /// The sheet image
        sheet: PathBuf,
        /// Directory for the four images
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Compose front/left/right/back images from a directory into one sheet
    Compose {
        /// Directory containing front.jpg, left.jpg, right.jpg and back.jpg
        dir: PathBuf,
        /// Output file (defaults to DIR/sheet.jpg)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print a stock hairsheet.toml with all options documented
    GenConfig,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        for line in output::format_error(&err.to_string()) {
            eprintln!("{}", line);
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Generate(args) => {
            let config = config::load_config(&cli.config)?;
            run_generate(&config, args)?;
        }
        Command::Split { sheet, out } => {
            let config = config::load_config(&cli.config)?;
            let codec = config.sheet_codec()?;
            let sheet = ImagePayload::sniffed(std::fs::read(&sheet)?);
            let images = codec.decompose(&sheet)?;
            std::fs::create_dir_all(&out)?;
            let files = AngleSet::try_from_fn(|angle| -> std::io::Result<PathBuf> {
                let path = out.join(format!("{}.jpg", angle.name()));
                std::fs::write(&path, &images[angle].bytes)?;
                Ok(path)
            })?;
            output::print_split_output(&files);
        }
        Command::Compose { dir, out } => {
            let config = config::load_config(&cli.config)?;
            let codec = config.sheet_codec()?;
            let images = AngleSet::try_from_fn(|angle| read_angle_image(&dir, angle))?;
            let sheet = codec.compose_labelled(&images)?;
            let out = out.unwrap_or_else(|| dir.join(export::SHEET_FILENAME));
            std::fs::write(&out, &sheet.bytes)?;
            println!("Sheet → {}", out.display());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_generate(config: &config::Config, args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let api_key = api_key_from_env().ok_or("set GEMINI_API_KEY (or GOOGLE_API_KEY) to generate")?;

    let mut inputs = GenerationInputs::new(ImagePayload::sniffed(std::fs::read(&args.photo)?));
    if let Some(style) = args.style {
        inputs = inputs.with_description(style);
    }
    if let Some(reference) = &args.reference {
        inputs = inputs.with_reference(ImagePayload::sniffed(std::fs::read(reference)?));
    }
    if let Some(modification) = args.modification {
        inputs = inputs.with_modification(modification);
    }
    if let Some(color) = args.color {
        inputs = inputs.with_hair_color(color);
    }

    let gemini = GeminiClient::new(config.gemini_settings(api_key))?;
    let client = RetryingGenerationClient::new(&gemini, config.retry_policy());
    let codec = config.sheet_codec()?;

    let mut session = GenerationSession::new();
    let events = session.subscribe();
    let printer = std::thread::spawn(move || {
        for event in events {
            output::print_session_event(&event);
        }
    });

    let started = session.start(inputs, &client, &codec);
    let video = match (&started, args.video) {
        (Ok(()), true) => {
            let poller = VideoOperationPoller::new(&gemini, &gemini, config.poll_schedule());
            session.generate_video(&poller)
        }
        _ => Ok(()),
    };
    let exported = match started {
        Ok(()) => Some(export::export_session(&session, &codec, &args.out)?),
        Err(_) => None,
    };

    let summary = output::format_session_summary(&session);
    // Dropping the session closes the event channel so the printer can finish.
    drop(session);
    let _ = printer.join();

    for line in summary {
        println!("{}", line);
    }
    if let Some(exported) = &exported {
        output::print_export_summary(exported, &args.out);
    }

    started?;
    video?;
    Ok(())
}

/// Find `<angle>.<ext>` in `dir`.
fn read_angle_image(dir: &Path, angle: Angle) -> std::io::Result<ImagePayload> {
    for ext in ANGLE_EXTENSIONS {
        let path = dir.join(format!("{}.{}", angle.name(), ext));
        if path.is_file() {
            return Ok(ImagePayload::sniffed(std::fs::read(&path)?));
        }
    }
    Err(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no {} image in {}", angle.name(), dir.display()),
    ))
}

/// Send `tracing` output to stderr, WARN by default.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
