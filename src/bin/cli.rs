use anyhow::{Context, Result};
use bitcrusher::crusher::ParamUpdate;
use bitcrusher::io::wav::OutputFormat;
use bitcrusher::render::{self, Automation};
use bitcrusher::settings::Settings;
use clap::Parser;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(debug_assertions)]
#[global_allocator]
static ALLOCATOR: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

#[derive(Parser, Debug)]
#[command(name = "bitcrusher")]
#[command(version)]
#[command(about = "Crush a WAV file: reduce bit depth and sample-and-hold decimate.")]
struct Args {
    #[arg(help = "Input WAV file")]
    input: PathBuf,

    #[arg(short, long, help = "Output WAV file [default: <output_dir>/crushed_<time>.wav]")]
    output: Option<PathBuf>,

    #[arg(short, long, env = "BITCRUSHER_BIT_DEPTH", help = "Bit depth, 1-16")]
    bit_depth: Option<f32>,

    #[arg(short, long, env = "BITCRUSHER_DOWNSAMPLE", help = "Downsample factor, 1-20")]
    downsample: Option<f32>,

    #[arg(long, help = "Frames per processing block")]
    block_size: Option<usize>,

    #[arg(long, value_enum, help = "Output sample format")]
    format: Option<OutputFormat>,

    #[arg(long, help = "JSON file of frame-stamped commands")]
    automation: Option<PathBuf>,

    #[arg(long, env = "BITCRUSHER_SETTINGS", help = "Settings file to use")]
    settings: Option<PathBuf>,

    #[arg(long, help = "Persist the effective settings before rendering")]
    save_settings: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    info!("Bitcrusher v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {:?}", args);

    let mut settings = match &args.settings {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load().context("failed to load settings")?,
    };

    settings.crusher = settings.crusher.apply(&ParamUpdate {
        bit_depth: args.bit_depth,
        downsample_factor: args.downsample,
    });
    if let Some(block_size) = args.block_size {
        if block_size == 0 {
            anyhow::bail!("--block-size must be at least 1");
        }
        settings.block_size = block_size;
    }
    if let Some(format) = args.format {
        settings.output_format = format;
    }
    info!("Settings:\n{settings}");

    if args.save_settings {
        match &args.settings {
            Some(path) => settings.save_to(path)?,
            None => settings.save()?,
        }
    }

    let automation = match &args.automation {
        Some(path) => Automation::load(path)?,
        None => Automation::default(),
    };

    let output = match args.output {
        Some(path) => path,
        None => default_output_path(&settings.output_dir)?,
    };

    let summary = render::render_file(&args.input, &output, &settings, automation)
        .with_context(|| format!("failed to render '{}'", args.input.display()))?;

    info!(
        "Done: {} frames x {} channels",
        summary.frames, summary.channels
    );
    Ok(())
}

fn default_output_path(output_dir: &str) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output directory '{output_dir}'"))?;

    Ok(Path::new(output_dir).join(format!(
        "crushed_{}.wav",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )))
}
