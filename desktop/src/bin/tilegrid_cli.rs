use anyhow::Context;
use clap::error::ErrorKind;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tilegrid_desktop::batch::{combine_folder, split_folder, BatchConfig, BatchReport};

#[derive(Debug, Parser)]
#[command(name = "tilegrid-cli")]
#[command(about = "Tilegrid - split images into overlapping tiles and put them back together", long_about = None)]
struct TilegridCli {
    #[command(subcommand)]
    command: TilegridCommands,
}

#[derive(Debug, Subcommand)]
enum TilegridCommands {
    /// split every image below INPUT_DIR into tiles
    Split(BatchArgs),
    /// recombine the tile folders in OUTPUT_DIR into INPUT_DIR/combine
    Combine(BatchArgs),
    /// split and recombine in one go
    Roundtrip(BatchArgs),
}

#[derive(Debug, Args)]
#[command(flatten_help = true)]
struct BatchArgs {
    #[arg(value_name = "INPUT_DIR")]
    /// folder with the source images
    input_dir: PathBuf,
    #[arg(value_name = "OUTPUT_DIR")]
    /// folder for the tile folders, defaults to "<INPUT_DIR> split"
    output_dir: Option<PathBuf>,
    #[arg(long, default_value_t = 7)]
    /// number of tile rows
    rows: usize,
    #[arg(long, default_value_t = 10)]
    /// number of tile columns
    cols: usize,
    #[arg(long, default_value_t = 0.0)]
    /// overlap added to each interior tile side, in percent of the tile size
    overlap: f64,
    #[arg(long, default_value = "jpg")]
    /// extension of the source images, also used for tiles and combined images
    extension: String,
}

impl TilegridCommands {
    fn batch_args(&self) -> &BatchArgs {
        match self {
            TilegridCommands::Split(args)
            | TilegridCommands::Combine(args)
            | TilegridCommands::Roundtrip(args) => args,
        }
    }
}

impl BatchArgs {
    fn validate(&self) {
        let mut cmd = TilegridCli::command();
        if self.rows == 0 || self.cols == 0 {
            cmd.error(
                ErrorKind::ValueValidation,
                "--rows and --cols must be at least 1",
            )
            .exit();
        }
        if !self.overlap.is_finite() || self.overlap < 0.0 {
            cmd.error(
                ErrorKind::ValueValidation,
                "--overlap must be a non-negative percentage",
            )
            .exit();
        }
    }

    fn to_config(&self) -> BatchConfig {
        let mut config = BatchConfig::new(&self.input_dir);
        config.rows = self.rows;
        config.cols = self.cols;
        config.overlap_percent = self.overlap;
        config.file_extension = self.extension.clone();
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        config
    }
}

fn summarize(step: &str, report: &BatchReport) -> anyhow::Result<()> {
    println!(
        "{}: {} done, {} failed",
        step,
        report.processed.len(),
        report.failed.len()
    );
    for (input, err) in &report.failed {
        eprintln!("  {}: {}", input.display(), err);
    }
    if !report.is_success() {
        anyhow::bail!("{} failed for {} entries", step, report.failed.len());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = TilegridCli::parse();

    let batch_args = args.command.batch_args();
    batch_args.validate();
    let config = batch_args.to_config();
    log::debug!("Running with {:?}", config);

    if let TilegridCommands::Split(_) | TilegridCommands::Roundtrip(_) = &args.command {
        println!(
            "Splitting images in {} into {}...",
            config.input_dir.display(),
            config.output_dir.display()
        );
        let report = split_folder(&config)
            .with_context(|| format!("Could not split {}", config.input_dir.display()))?;
        summarize("Split", &report)?;
    }

    if let TilegridCommands::Combine(_) | TilegridCommands::Roundtrip(_) = &args.command {
        println!(
            "Combining tiles in {} into {}...",
            config.output_dir.display(),
            config.combine_dir().display()
        );
        let report = combine_folder(&config)
            .with_context(|| format!("Could not combine {}", config.output_dir.display()))?;
        summarize("Combine", &report)?;
    }

    Ok(())
}
