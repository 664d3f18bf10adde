pub mod pixel_buffer;
pub mod tile_grid;
pub mod tile_naming;
pub mod tile_processor;

mod geometry;
pub use geometry::{CellSize, Coords, GridShape, Rect};
pub use tile_processor::{combine, split, Tile, TileProcessor};
