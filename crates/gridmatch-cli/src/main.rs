//! gridmatch CLI: match detected grid points and calibrate the camera.

use clap::{Args, Parser, Subcommand};
use gridmatch::{MatchGridConfig, MatchGridStage};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "gridmatch")]
#[command(about = "Match detected points to a regular planar grid and calibrate the camera")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the matchGrid stage on a model JSON and its image.
    Match(CliMatchArgs),

    /// Print the default stage configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CliMatchArgs {
    /// Path to the pipeline model JSON holding the candidate rects.
    #[arg(long)]
    model: PathBuf,

    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the stage report (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Stage configuration JSON. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the model stage whose rects are matched.
    #[arg(long)]
    stage: Option<String>,

    /// Object-space column spacing.
    #[arg(long)]
    sep_x: Option<f64>,

    /// Object-space row spacing.
    #[arg(long)]
    sep_y: Option<f64>,

    /// Relative gap tolerance around the median spacing.
    #[arg(long)]
    tolerance: Option<f64>,

    /// Object-space plane height.
    #[arg(long)]
    obj_z: Option<f64>,

    /// Path to write the rectified image.
    #[arg(long)]
    rectified: Option<PathBuf>,
}

impl CliMatchArgs {
    fn to_config(&self) -> CliResult<MatchGridConfig> {
        let mut config = match &self.config {
            Some(path) => MatchGridConfig::from_json_file(path)?,
            None => MatchGridConfig::default(),
        };
        if let Some(stage) = &self.stage {
            config.model = stage.clone();
        }
        if let Some(v) = self.sep_x {
            config.sep_x = v;
        }
        if let Some(v) = self.sep_y {
            config.sep_y = v;
        }
        if let Some(v) = self.tolerance {
            config.tolerance = v;
        }
        if let Some(v) = self.obj_z {
            config.obj_z = v;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Match(args) => run_match(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&MatchGridConfig::default())?);
    Ok(())
}

// ── match ──────────────────────────────────────────────────────────────

fn read_model(path: &Path) -> CliResult<serde_json::Value> {
    let text = std::fs::read_to_string(path).map_err(|e| -> CliError {
        format!("Failed to read model {}: {}", path.display(), e).into()
    })?;
    Ok(serde_json::from_str(&text)?)
}

fn run_match(args: &CliMatchArgs) -> CliResult<()> {
    let config = args.to_config()?;
    let model = read_model(&args.model)?;

    tracing::info!("Loading image: {}", args.image.display());
    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    let mut gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    tracing::info!("Image size: {}x{}", w, h);

    let stage = MatchGridStage::new(config);
    let report = stage.apply(&model, &mut gray);

    if let Some(calib) = &report.calibrate {
        tracing::info!(
            "Matched {} rects, {} views, rms={:.3}px",
            report.rects.len(),
            calib.images,
            calib.rms_error,
        );
    }

    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Report written to {}", args.out.display());

    if let Some(error) = report.error {
        return Err(error.into());
    }

    if let Some(path) = &args.rectified {
        gray.save(path)?;
        tracing::info!("Rectified image written to {}", path.display());
    }

    Ok(())
}
