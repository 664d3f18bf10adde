use std::path::PathBuf;

use anyhow::Context;
use argh::FromArgs;
use tilegrid_desktop::batch::{split_image_file, BatchConfig};

#[derive(FromArgs, PartialEq, Debug)]
/// Split a single image into overlapping tiles
struct SplitImage {
    #[argh(positional)]
    image: PathBuf,
    #[argh(positional)]
    output_dir: PathBuf,
    /// number of tile rows
    #[argh(option, default = "7")]
    rows: usize,
    /// number of tile columns
    #[argh(option, default = "10")]
    cols: usize,
    /// overlap added to each interior tile side, in percent of the tile size
    #[argh(option, default = "0.0")]
    overlap: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args: SplitImage = argh::from_env();

    let input_dir = args
        .image
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let extension = args
        .image
        .extension()
        .and_then(|ext| ext.to_str())
        .context("Input image has no usable extension")?;

    let mut config = BatchConfig::new(input_dir);
    config.rows = args.rows;
    config.cols = args.cols;
    config.overlap_percent = args.overlap;
    config.output_dir = args.output_dir.clone();
    config.file_extension = extension.to_owned();

    let tile_dir = split_image_file(&config, &args.image)
        .with_context(|| format!("Could not split {}", args.image.display()))?;
    println!("Done: {} -> {}", args.image.display(), tile_dir.display());
    Ok(())
}
