use std::{
    collections::{HashMap, HashSet},
    ffi::OsStr,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tilegrid::{
    tile_grid::TileGridError,
    tile_naming::{normalize_extension, tile_file_name, TileFileName},
    GridShape, Tile, TileProcessor,
};
use walkdir::WalkDir;

use crate::image_utils::{image_dimensions, load_image, save_image};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Missing source file {0}")]
    MissingSourceFile(PathBuf),
    #[error("File name of {0} cannot be used as a tile base name")]
    InvalidFileName(PathBuf),
    #[error("Tile folder {0} was already written by another image of this batch")]
    TileFolderInUse(PathBuf),
    #[error("Image could not be read or written: {0}")]
    Image(#[from] image::ImageError),
    #[error("File system access failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory traversal failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid tile grid: {0}")]
    Grid(#[from] TileGridError),
}

/// Settings for splitting and recombining a whole folder of images.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfig {
    pub rows: usize,
    pub cols: usize,
    pub overlap_percent: f64,
    /// Folder with the source images, searched recursively
    pub input_dir: PathBuf,
    /// Tiles of `<input_dir>/<sub>/<stem>.<ext>` go to `<output_dir>/<sub>/<stem>/`
    pub output_dir: PathBuf,
    /// Extension of source images, tiles and combined images, with or without the dot
    pub file_extension: String,
}

impl BatchConfig {
    pub fn new<T: AsRef<Path>>(input_dir: T) -> Self {
        let input_dir = input_dir.as_ref().to_path_buf();
        Self {
            rows: 7,
            cols: 10,
            overlap_percent: 0.0,
            output_dir: Self::default_output_dir(&input_dir),
            input_dir,
            file_extension: "jpg".to_owned(),
        }
    }

    /// `<input_dir> split`, next to the input folder
    pub fn default_output_dir(input_dir: &Path) -> PathBuf {
        let mut name = input_dir.as_os_str().to_owned();
        name.push(" split");
        PathBuf::from(name)
    }

    pub fn processor(&self) -> TileProcessor {
        TileProcessor::new(self.rows, self.cols, self.overlap_percent)
    }

    pub fn grid(&self) -> GridShape {
        GridShape::new(self.rows, self.cols)
    }

    pub fn extension(&self) -> &str {
        normalize_extension(&self.file_extension)
    }

    /// Combined images are written to `<input_dir>/combine`, keeping their sub folder
    pub fn combine_dir(&self) -> PathBuf {
        self.input_dir.join("combine")
    }

    /// Folder receiving the tiles of the source image at `path`
    pub fn tile_dir_for(&self, path: &Path) -> Result<PathBuf, BatchError> {
        let stem = file_stem(path)?;
        let sub_dir = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.input_dir).ok())
            .unwrap_or_else(|| Path::new(""));
        Ok(self.output_dir.join(sub_dir).join(stem))
    }

    /// Sub folder of `tile_dir` relative to `output_dir`, without the tile folder itself
    fn sub_dir_of<'a>(&self, tile_dir: &'a Path) -> &'a Path {
        tile_dir
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.output_dir).ok())
            .unwrap_or_else(|| Path::new(""))
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .map(|ext| ext.eq_ignore_ascii_case(self.extension()))
            .unwrap_or(false)
    }
}

/// Outcome of a batch run. A failing image does not stop its siblings.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Pairs of input and the output it produced
    pub processed: Vec<(PathBuf, PathBuf)>,
    pub failed: Vec<(PathBuf, BatchError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, input: PathBuf, result: Result<PathBuf, BatchError>) {
        match result {
            Ok(output) => {
                log::info!("Done: {} -> {}", input.display(), output.display());
                self.processed.push((input, output));
            }
            Err(err) => {
                log::error!("Failed to process {}: {}", input.display(), err);
                self.failed.push((input, err));
            }
        }
    }
}

fn file_stem(path: &Path) -> Result<&str, BatchError> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(|| BatchError::InvalidFileName(path.to_path_buf()))
}

/// Split one image into `<output_dir>/<sub>/<stem>/<stem>_tile_<i>.<ext>`, where `<sub>`
/// is the folder of the image relative to `input_dir`.
/// Returns the folder holding the tiles.
pub fn split_image_file(config: &BatchConfig, path: &Path) -> Result<PathBuf, BatchError> {
    if !path.is_file() {
        return Err(BatchError::MissingSourceFile(path.to_path_buf()));
    }
    let stem = file_stem(path)?;
    let tile_dir = config.tile_dir_for(path)?;
    let image = load_image(path)?;
    let tiles = config.processor().split(&image)?;

    std::fs::create_dir_all(&tile_dir)?;

    let grid = config.grid();
    for tile in &tiles {
        let name = tile_file_name(stem, grid.index_of(tile.row, tile.col), config.extension());
        save_image(&tile.image, tile_dir.join(name))?;
    }
    log::debug!("Wrote {} tiles to {}", tiles.len(), tile_dir.display());

    Ok(tile_dir)
}

/// Split every image with the configured extension below `input_dir`.
pub fn split_folder(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    // Fail on bad parameters once instead of for every image
    config.processor().check_parameters()?;
    std::fs::create_dir_all(&config.output_dir)?;

    let output_dir = config.output_dir.clone();
    let combine_dir = config.combine_dir();
    let mut report = BatchReport::default();
    let mut written = HashSet::new();

    for entry in WalkDir::new(&config.input_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(&output_dir) && !e.path().starts_with(&combine_dir))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| config.input_dir.clone());
                report.record(path, Err(err.into()));
                continue;
            }
        };
        if !entry.file_type().is_file() || !config.has_extension(entry.path()) {
            continue;
        }

        let path = entry.into_path();
        // Names differing only in extension case share a tile folder
        let result = match config.tile_dir_for(&path) {
            Ok(tile_dir) => {
                if written.insert(tile_dir.clone()) {
                    log::info!("Splitting {}", path.display());
                    split_image_file(config, &path)
                } else {
                    Err(BatchError::TileFolderInUse(tile_dir))
                }
            }
            Err(err) => Err(err),
        };
        report.record(path, result);
    }

    Ok(report)
}

/// Rebuild the image whose tiles are stored in `tile_dir` and write it to the combine folder.
/// The folder name is the stem of the source image, which provides the size. Its sub folder
/// below `output_dir` is looked up below `input_dir` and kept below the combine folder.
pub fn combine_image_dir(config: &BatchConfig, tile_dir: &Path) -> Result<PathBuf, BatchError> {
    let stem = tile_dir
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| BatchError::InvalidFileName(tile_dir.to_path_buf()))?;
    let extension = config.extension();
    let sub_dir = config.sub_dir_of(tile_dir);

    let source = config
        .input_dir
        .join(sub_dir)
        .join(format!("{}.{}", stem, extension));
    if !source.is_file() {
        return Err(BatchError::MissingSourceFile(source));
    }
    let (width, height) = image_dimensions(&source)?;

    let processor = config.processor();
    let grid = config.grid();
    // Checks the parameters before any tile is decoded
    processor.grid_for(width, height)?;

    let mut tile_paths = HashMap::new();
    for entry in std::fs::read_dir(tile_dir)? {
        let path = entry?.path();
        let parsed = path
            .file_name()
            .and_then(OsStr::to_str)
            .and_then(TileFileName::parse);
        match parsed {
            Some(name) if name.base == stem && name.extension.eq_ignore_ascii_case(extension) => {
                if name.index < grid.tile_count() {
                    tile_paths.insert(name.index, path);
                } else {
                    log::warn!("Ignoring {}, it lies outside of the grid", path.display());
                }
            }
            _ => log::debug!("Skipping {}", path.display()),
        }
    }

    let tiles = (0..grid.tile_count())
        .map(|index| {
            let path = tile_paths
                .remove(&index)
                .ok_or_else(|| BatchError::MissingSourceFile(tile_dir.join(tile_file_name(stem, index, extension))))?;
            let (row, col) = grid.position_of(index);
            Ok(Tile {
                row,
                col,
                image: load_image(path)?,
            })
        })
        .collect::<Result<Vec<_>, BatchError>>()?;

    let combined = processor.combine(&tiles, width, height)?;

    let combine_dir = config.combine_dir().join(sub_dir);
    std::fs::create_dir_all(&combine_dir)?;
    let output = combine_dir.join(format!("{}.{}", stem, extension));
    save_image(&combined, &output)?;

    Ok(output)
}

/// Whether `dir` contains at least one tile named after the folder itself
fn holds_tiles(dir: &Path, extension: &str) -> Result<bool, BatchError> {
    let Some(stem) = dir.file_name().and_then(OsStr::to_str) else {
        return Ok(false);
    };
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let is_tile = entry
            .file_name()
            .to_str()
            .and_then(TileFileName::parse)
            .map(|name| name.base == stem && name.extension.eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if is_tile && entry.file_type()?.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Recombine every tile folder below `output_dir`, at any depth.
pub fn combine_folder(config: &BatchConfig) -> Result<BatchReport, BatchError> {
    config.processor().check_parameters()?;
    if !config.output_dir.is_dir() {
        return Err(BatchError::MissingSourceFile(config.output_dir.clone()));
    }

    let mut report = BatchReport::default();
    for entry in WalkDir::new(&config.output_dir)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| config.output_dir.clone());
                report.record(path, Err(err.into()));
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let tile_dir = entry.into_path();
        match holds_tiles(&tile_dir, config.extension()) {
            Ok(false) => continue,
            Ok(true) => {
                log::info!("Combining {}", tile_dir.display());
                let result = combine_image_dir(config, &tile_dir);
                report.record(tile_dir, result);
            }
            Err(err) => report.record(tile_dir, Err(err)),
        }
    }

    Ok(report)
}
