#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coords {
    pub x: usize,
    pub y: usize,
}

/// A crop box in `left, upper, right, lower` form.
/// `left` and `upper` are inclusive, `right` and `lower` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: usize,
    pub upper: usize,
    pub right: usize,
    pub lower: usize,
}

impl Rect {
    pub fn new(left: usize, upper: usize, right: usize, lower: usize) -> Self {
        Self {
            left,
            upper,
            right,
            lower,
        }
    }

    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> usize {
        self.lower.saturating_sub(self.upper)
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.lower <= self.upper
    }

    pub fn origin(&self) -> Coords {
        Coords {
            x: self.left,
            y: self.upper,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn as_pair(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn tile_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Row-major index of the tile at `(row, col)`
    pub fn index_of(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Inverse of [`GridShape::index_of`], returns `(row, col)`
    pub fn position_of(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    pub fn is_last_row(&self, row: usize) -> bool {
        row + 1 == self.rows
    }

    pub fn is_last_col(&self, col: usize) -> bool {
        col + 1 == self.cols
    }
}

/// Base size of a grid cell before any overlap margin is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSize {
    pub width: usize,
    pub height: usize,
}

impl CellSize {
    /// Remainder pixels of a non-divisible image are not part of the base cell,
    /// they end up in the last row and column.
    pub fn for_image(image_width: usize, image_height: usize, grid: &GridShape) -> Self {
        Self {
            width: image_width / grid.cols,
            height: image_height / grid.rows,
        }
    }

    /// Pixel margins added on the interior-facing sides of a tile.
    /// Both are truncated towards zero.
    pub fn overlap_margin(&self, overlap_percent: f64) -> Self {
        let factor = overlap_percent / 100.0;
        Self {
            width: (self.width as f64 * factor).floor() as usize,
            height: (self.height as f64 * factor).floor() as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
