use std::{fmt, sync::OnceLock};

use regex::Regex;

use crate::geometry::GridShape;

/// Name of a tile file: `<base>_tile_<index>.<extension>`, with `index` in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileFileName {
    pub base: String,
    pub index: usize,
    pub extension: String,
}

fn tile_name_regex() -> &'static Regex {
    static TILE_NAME: OnceLock<Regex> = OnceLock::new();
    TILE_NAME.get_or_init(|| {
        Regex::new(r"^(?P<base>.+)_tile_(?P<index>\d+)\.(?P<extension>[^.]+)$")
            .expect("tile name pattern is valid")
    })
}

/// Strip the leading dot of an extension given as `.jpg`
pub fn normalize_extension(extension: &str) -> &str {
    extension.strip_prefix('.').unwrap_or(extension)
}

impl TileFileName {
    pub fn new(base: &str, index: usize, extension: &str) -> Self {
        Self {
            base: base.to_owned(),
            index,
            extension: normalize_extension(extension).to_owned(),
        }
    }

    pub fn parse(file_name: &str) -> Option<Self> {
        let captures = tile_name_regex().captures(file_name)?;
        Some(Self {
            base: captures["base"].to_owned(),
            index: captures["index"].parse().ok()?,
            extension: captures["extension"].to_owned(),
        })
    }

    /// `(row, col)` of this tile in `grid`
    pub fn position(&self, grid: &GridShape) -> (usize, usize) {
        grid.position_of(self.index)
    }
}

impl fmt::Display for TileFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_tile_{}.{}", self.base, self.index, self.extension)
    }
}

pub fn tile_file_name(base: &str, index: usize, extension: &str) -> String {
    TileFileName::new(base, index, extension).to_string()
}
