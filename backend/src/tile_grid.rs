use std::{cmp::min, marker::PhantomData};

use thiserror::Error;

use crate::geometry::{CellSize, GridShape, Rect};

pub struct Finalized;

/// Split geometry of one image. Build it with [`TileGridBuilder`] and call
/// [`TileGridBuilder::finalize`] to validate the parameters.
pub struct TileGrid<M> {
    grid: GridShape,
    overlap_percent: f64,
    image_width: usize,
    image_height: usize,
    cell: CellSize,
    overlap: CellSize,
    _marker: PhantomData<M>,
}

pub type TileGridBuilder = TileGrid<()>;
pub type FinalizedTileGrid = TileGrid<Finalized>;

pub struct TileRegionIterator<'a> {
    data: &'a FinalizedTileGrid,
    current_coords: (usize, usize),
}

/// Geometry of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRegion {
    pub row: usize,
    pub col: usize,
    /// Crop box in the source image, overlap included and clipped to the image
    pub source: Rect,
    /// Overlap-free area this cell covers in the combined image
    pub destination: Rect,
}

impl<'a> Iterator for TileRegionIterator<'a> {
    type Item = TileRegion;

    fn next(&mut self) -> Option<Self::Item> {
        let (row, col) = self.current_coords;
        if row < self.data.grid.rows {
            let region = self.data.region(row, col);

            self.current_coords.1 += 1;
            if self.current_coords.1 >= self.data.grid.cols {
                self.current_coords.1 = 0;
                self.current_coords.0 += 1;
            }

            Some(region)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TileGridError {
    #[error("Grid must have at least one row and one column, got {rows}x{cols}")]
    InvalidGrid { rows: usize, cols: usize },
    #[error("Overlap percentage {0} must be a finite, non-negative number")]
    InvalidOverlap(f64),
    #[error("Image of {width}x{height} pixels is too small for a grid of {rows} rows and {cols} columns")]
    ImageTooSmall {
        width: usize,
        height: usize,
        rows: usize,
        cols: usize,
    },
    #[error("Overlap of {overlap} pixels leaves no interior in a tile of {size} pixels")]
    DegenerateOverlap { overlap: usize, size: usize },
    #[error("Expected {expected} tiles but got {actual}")]
    TileCountMismatch { expected: usize, actual: usize },
    #[error("Tile at row {row}, column {col} lies outside of the grid")]
    TileOutOfGrid { row: usize, col: usize },
    #[error("More than one tile for row {row}, column {col}")]
    DuplicateTile { row: usize, col: usize },
    #[error("Tile at row {row}, column {col} has an interior of {actual:?} pixels, expected {expected:?}")]
    TileSizeMismatch {
        row: usize,
        col: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
}

impl TileGridBuilder {
    pub fn new(image_width: usize, image_height: usize) -> Self {
        Self {
            grid: GridShape::new(7, 10),
            overlap_percent: 0.0,
            image_width,
            image_height,
            // Both are derived when finalizing
            cell: CellSize {
                width: 0,
                height: 0,
            },
            overlap: CellSize {
                width: 0,
                height: 0,
            },
            _marker: PhantomData,
        }
    }

    pub fn set_grid(&mut self, rows: usize, cols: usize) {
        self.grid = GridShape::new(rows, cols);
    }

    pub fn with_grid(mut self, rows: usize, cols: usize) -> Self {
        self.set_grid(rows, cols);
        self
    }

    pub fn set_overlap(&mut self, overlap_percent: f64) {
        self.overlap_percent = overlap_percent;
    }

    pub fn with_overlap(mut self, overlap_percent: f64) -> Self {
        self.set_overlap(overlap_percent);
        self
    }

    fn check_axis(tiles: usize, overlap: usize, size: usize) -> Result<(), TileGridError> {
        // A single tile along an axis has no interior-facing side to crop
        if tiles > 1 && overlap.saturating_mul(2) >= size {
            return Err(TileGridError::DegenerateOverlap { overlap, size });
        }
        Ok(())
    }

    /// Checks grid and overlap on their own, independent of the image size.
    pub fn check_parameters(&self) -> Result<(), TileGridError> {
        let GridShape { rows, cols } = self.grid;
        if rows == 0 || cols == 0 {
            return Err(TileGridError::InvalidGrid { rows, cols });
        }

        if !self.overlap_percent.is_finite() || self.overlap_percent < 0.0 {
            return Err(TileGridError::InvalidOverlap(self.overlap_percent));
        }
        Ok(())
    }

    pub fn finalize(self) -> Result<FinalizedTileGrid, TileGridError> {
        self.check_parameters()?;
        let GridShape { rows, cols } = self.grid;

        let cell = CellSize::for_image(self.image_width, self.image_height, &self.grid);
        if cell.is_empty() {
            return Err(TileGridError::ImageTooSmall {
                width: self.image_width,
                height: self.image_height,
                rows,
                cols,
            });
        }

        let overlap = cell.overlap_margin(self.overlap_percent);
        Self::check_axis(cols, overlap.width, cell.width)?;
        Self::check_axis(rows, overlap.height, cell.height)?;

        log::debug!(
            "Grid {}x{} on {}x{} image: cell {:?}, overlap {:?}",
            rows,
            cols,
            self.image_width,
            self.image_height,
            cell,
            overlap
        );

        Ok(FinalizedTileGrid {
            grid: self.grid,
            overlap_percent: self.overlap_percent,
            image_width: self.image_width,
            image_height: self.image_height,
            cell,
            overlap,
            _marker: PhantomData,
        })
    }
}

impl FinalizedTileGrid {
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    pub fn overlap_percent(&self) -> f64 {
        self.overlap_percent
    }

    pub fn image_size(&self) -> (usize, usize) {
        (self.image_width, self.image_height)
    }

    pub fn cell_size(&self) -> CellSize {
        self.cell
    }

    pub fn overlap(&self) -> CellSize {
        self.overlap
    }

    pub fn tile_count(&self) -> usize {
        self.grid.tile_count()
    }

    pub fn iter(&self) -> TileRegionIterator<'_> {
        TileRegionIterator {
            data: self,
            current_coords: (0, 0),
        }
    }

    /// Geometry of the cell at `(row, col)`. The position must lie inside the grid.
    pub fn region(&self, row: usize, col: usize) -> TileRegion {
        let last_col = self.grid.is_last_col(col);
        let last_row = self.grid.is_last_row(row);

        let cell_left = col * self.cell.width;
        let cell_upper = row * self.cell.height;
        // The last row and column also take the division remainder
        let cell_right = if last_col {
            self.image_width
        } else {
            cell_left + self.cell.width
        };
        let cell_lower = if last_row {
            self.image_height
        } else {
            cell_upper + self.cell.height
        };

        let source = Rect::new(
            cell_left.saturating_sub(self.overlap.width),
            cell_upper.saturating_sub(self.overlap.height),
            min(cell_right.saturating_add(self.overlap.width), self.image_width),
            min(cell_lower.saturating_add(self.overlap.height), self.image_height),
        );

        TileRegion {
            row,
            col,
            source,
            destination: Rect::new(cell_left, cell_upper, cell_right, cell_lower),
        }
    }

    /// Crop box that strips the overlap margins from a tile of the given size.
    ///
    /// Only interior-facing sides are cropped, so edge tiles keep their outer border.
    /// The resulting box must exactly fill the destination cell of `region`.
    pub fn interior_crop(
        &self,
        region: &TileRegion,
        tile_width: usize,
        tile_height: usize,
    ) -> Result<Rect, TileGridError> {
        let crop_left = if region.col != 0 { self.overlap.width } else { 0 };
        let crop_upper = if region.row != 0 { self.overlap.height } else { 0 };
        let crop_right = if !self.grid.is_last_col(region.col) {
            tile_width.saturating_sub(self.overlap.width)
        } else {
            tile_width
        };
        let crop_lower = if !self.grid.is_last_row(region.row) {
            tile_height.saturating_sub(self.overlap.height)
        } else {
            tile_height
        };

        let interior = Rect::new(crop_left, crop_upper, crop_right, crop_lower);
        if crop_right <= crop_left {
            return Err(TileGridError::DegenerateOverlap {
                overlap: self.overlap.width,
                size: tile_width,
            });
        }
        if crop_lower <= crop_upper {
            return Err(TileGridError::DegenerateOverlap {
                overlap: self.overlap.height,
                size: tile_height,
            });
        }

        let expected = (region.destination.width(), region.destination.height());
        let actual = (interior.width(), interior.height());
        if expected != actual {
            return Err(TileGridError::TileSizeMismatch {
                row: region.row,
                col: region.col,
                expected,
                actual,
            });
        }

        Ok(interior)
    }
}
