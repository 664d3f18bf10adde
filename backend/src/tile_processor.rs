use crate::pixel_buffer::PixelBuffer;
use crate::tile_grid::{FinalizedTileGrid, TileGridBuilder, TileGridError};

/// A sub-image together with its place in the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile<B> {
    pub row: usize,
    pub col: usize,
    pub image: B,
}

impl<B> Tile<B> {
    pub fn position(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Splits images into overlapping tiles and puts tiles back together.
///
/// Recombination only reproduces the source image when it uses the same
/// grid, overlap and image size as the split did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileProcessor {
    rows: usize,
    cols: usize,
    overlap_percent: f64,
}

impl TileProcessor {
    pub fn new(rows: usize, cols: usize, overlap_percent: f64) -> Self {
        Self {
            rows,
            cols,
            overlap_percent,
        }
    }

    pub fn grid_for(&self, width: usize, height: usize) -> Result<FinalizedTileGrid, TileGridError> {
        TileGridBuilder::new(width, height)
            .with_grid(self.rows, self.cols)
            .with_overlap(self.overlap_percent)
            .finalize()
    }

    /// Fails for an empty grid or an unusable overlap percentage.
    pub fn check_parameters(&self) -> Result<(), TileGridError> {
        TileGridBuilder::new(0, 0)
            .with_grid(self.rows, self.cols)
            .with_overlap(self.overlap_percent)
            .check_parameters()
    }

    /// Cut `image` into `rows * cols` tiles in row-major order.
    pub fn split<B: PixelBuffer>(&self, image: &B) -> Result<Vec<Tile<B>>, TileGridError> {
        let (width, height) = image.size();
        let grid = self.grid_for(width, height)?;

        Ok(grid
            .iter()
            .map(|region| {
                log::debug!(
                    "Cutting tile ({}, {}) from {:?}",
                    region.row,
                    region.col,
                    region.source
                );
                Tile {
                    row: region.row,
                    col: region.col,
                    image: image.crop(&region.source),
                }
            })
            .collect())
    }

    /// Recombine tiles placed by their own grid position. The order of `tiles` is irrelevant.
    pub fn combine<B: PixelBuffer>(
        &self,
        tiles: &[Tile<B>],
        width: usize,
        height: usize,
    ) -> Result<B, TileGridError> {
        let grid = self.grid_for(width, height)?;
        let shape = grid.grid();
        Self::check_count(&grid, tiles.len())?;

        let mut slots: Vec<Option<&B>> = vec![None; shape.tile_count()];
        for tile in tiles {
            if !shape.contains(tile.row, tile.col) {
                return Err(TileGridError::TileOutOfGrid {
                    row: tile.row,
                    col: tile.col,
                });
            }
            let slot = &mut slots[shape.index_of(tile.row, tile.col)];
            if slot.is_some() {
                return Err(TileGridError::DuplicateTile {
                    row: tile.row,
                    col: tile.col,
                });
            }
            *slot = Some(&tile.image);
        }

        // Every slot is taken: the count matches and there are no duplicates
        let ordered: Vec<&B> = slots.into_iter().flatten().collect();
        Self::combine_grid(&grid, &ordered)
    }

    /// Recombine tiles given in the row-major order [`TileProcessor::split`] produces.
    pub fn combine_ordered<B: PixelBuffer>(
        &self,
        tiles: &[B],
        width: usize,
        height: usize,
    ) -> Result<B, TileGridError> {
        let grid = self.grid_for(width, height)?;
        Self::check_count(&grid, tiles.len())?;

        let ordered: Vec<&B> = tiles.iter().collect();
        Self::combine_grid(&grid, &ordered)
    }

    fn check_count(grid: &FinalizedTileGrid, actual: usize) -> Result<(), TileGridError> {
        let expected = grid.tile_count();
        if actual != expected {
            return Err(TileGridError::TileCountMismatch { expected, actual });
        }
        Ok(())
    }

    fn combine_grid<B: PixelBuffer>(
        grid: &FinalizedTileGrid,
        tiles: &[&B],
    ) -> Result<B, TileGridError> {
        // All crops are checked before the output is touched
        let placements = grid
            .iter()
            .zip(tiles.iter())
            .map(|(region, tile)| {
                let (tile_width, tile_height) = tile.size();
                grid.interior_crop(&region, tile_width, tile_height)
                    .map(|interior| (region, interior, *tile))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let (width, height) = grid.image_size();
        let mut output = tiles[0].allocate_like(width, height);

        for (region, interior, tile) in placements {
            log::debug!(
                "Pasting interior {:?} of tile ({}, {}) at {:?}",
                interior,
                region.row,
                region.col,
                region.destination.origin()
            );
            output.paste(&tile.crop(&interior), region.destination.origin());
        }

        Ok(output)
    }
}

/// Cut `image` into `rows * cols` overlapping tiles, see [`TileProcessor::split`].
pub fn split<B: PixelBuffer>(
    image: &B,
    rows: usize,
    cols: usize,
    overlap_percent: f64,
) -> Result<Vec<Tile<B>>, TileGridError> {
    TileProcessor::new(rows, cols, overlap_percent).split(image)
}

/// Rebuild an image of `width`x`height` from tiles, see [`TileProcessor::combine`].
pub fn combine<B: PixelBuffer>(
    tiles: &[Tile<B>],
    rows: usize,
    cols: usize,
    overlap_percent: f64,
    width: usize,
    height: usize,
) -> Result<B, TileGridError> {
    TileProcessor::new(rows, cols, overlap_percent).combine(tiles, width, height)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pixel_buffer::ImageTensor;
    use image::{Rgb, RgbImage};
    use ndarray::Array3;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([x as u8, y as u8, ((x * 7 + y * 13) % 251) as u8])
        })
    }

    fn roundtrip(image: &RgbImage, rows: usize, cols: usize, overlap: f64) -> RgbImage {
        let tiles = split(image, rows, cols, overlap).unwrap();
        assert_eq!(tiles.len(), rows * cols);
        combine(
            &tiles,
            rows,
            cols,
            overlap,
            image.width() as usize,
            image.height() as usize,
        )
        .unwrap()
    }

    #[test]
    fn test_roundtrip_without_overlap() {
        let image = gradient(100, 70);
        assert_eq!(roundtrip(&image, 7, 10, 0.0), image);
        assert_eq!(roundtrip(&image, 1, 1, 0.0), image);
        assert_eq!(roundtrip(&image, 2, 5, 0.0), image);
    }

    #[test]
    fn test_roundtrip_with_overlap() {
        let image = gradient(100, 70);
        for overlap in [10.0, 20.0, 33.0, 45.0] {
            assert_eq!(roundtrip(&image, 7, 10, overlap), image);
        }
    }

    #[test]
    fn test_roundtrip_single_tile_huge_overlap() {
        let image = gradient(10, 10);
        assert_eq!(roundtrip(&image, 1, 1, 1e30), image);
    }

    #[test]
    fn test_roundtrip_non_divisible() {
        let image = gradient(103, 71);
        assert_eq!(roundtrip(&image, 7, 10, 0.0), image);
        assert_eq!(roundtrip(&image, 3, 4, 25.0), image);
    }

    #[test]
    fn test_tiles_without_overlap() {
        let image = gradient(100, 70);
        let tiles = split(&image, 7, 10, 0.0).unwrap();
        assert_eq!(tiles.len(), 70);
        assert!(tiles
            .iter()
            .all(|t| PixelBuffer::size(&t.image) == (10, 10)));
        assert_eq!(tiles[0].image, image.crop(&crate::geometry::Rect::new(0, 0, 10, 10)));
        assert_eq!(tiles[23].position(), (2, 3));
        assert_eq!(*tiles[23].image.get_pixel(0, 0), *image.get_pixel(30, 20));
    }

    #[test]
    fn test_tiles_with_overlap() {
        let image = gradient(100, 70);
        let tiles = split(&image, 7, 10, 20.0).unwrap();
        assert_eq!(tiles.len(), 70);

        assert_eq!(PixelBuffer::size(&tiles[0].image), (12, 12));
        assert_eq!(PixelBuffer::size(&tiles[9].image), (12, 12));
        assert_eq!(*tiles[9].image.get_pixel(11, 0), *image.get_pixel(99, 0));
        assert_eq!(PixelBuffer::size(&tiles[14].image), (14, 14));
        assert_eq!(*tiles[14].image.get_pixel(0, 0), *image.get_pixel(38, 8));
    }

    #[test]
    fn test_degenerate_overlap_is_rejected() {
        let image = gradient(10, 10);
        assert!(matches!(
            split(&image, 2, 2, 60.0),
            Err(TileGridError::DegenerateOverlap { .. })
        ));

        let tiles = split(&image, 2, 2, 0.0).unwrap();
        assert!(matches!(
            combine(&tiles, 2, 2, 60.0, 10, 10),
            Err(TileGridError::DegenerateOverlap { .. })
        ));
    }

    #[test]
    fn test_invalid_grid_is_rejected() {
        let image = gradient(10, 10);
        assert_eq!(
            split(&image, 0, 2, 0.0).err(),
            Some(TileGridError::InvalidGrid { rows: 0, cols: 2 })
        );
        assert_eq!(
            combine::<RgbImage>(&[], 2, 0, 0.0, 10, 10).err(),
            Some(TileGridError::InvalidGrid { rows: 2, cols: 0 })
        );
    }

    #[test]
    fn test_tile_count_mismatch() {
        let image = gradient(20, 20);
        let mut tiles = split(&image, 2, 2, 10.0).unwrap();
        tiles.pop();
        assert_eq!(
            combine(&tiles, 2, 2, 10.0, 20, 20).err(),
            Some(TileGridError::TileCountMismatch {
                expected: 4,
                actual: 3
            })
        );

        let ordered: Vec<RgbImage> = tiles.into_iter().map(|t| t.image).collect();
        let processor = TileProcessor::new(2, 2, 10.0);
        assert!(matches!(
            processor.combine_ordered(&ordered, 20, 20),
            Err(TileGridError::TileCountMismatch { .. })
        ));
    }

    #[test]
    fn test_combine_uses_tile_positions() {
        let image = gradient(40, 30);
        let mut tiles = split(&image, 3, 4, 20.0).unwrap();
        tiles.reverse();
        tiles.swap(2, 7);
        assert_eq!(combine(&tiles, 3, 4, 20.0, 40, 30).unwrap(), image);
    }

    #[test]
    fn test_combine_ordered_roundtrip() {
        let image = gradient(40, 30);
        let processor = TileProcessor::new(3, 4, 20.0);
        let ordered: Vec<RgbImage> = processor
            .split(&image)
            .unwrap()
            .into_iter()
            .map(|t| t.image)
            .collect();
        assert_eq!(processor.combine_ordered(&ordered, 40, 30).unwrap(), image);
    }

    #[test]
    fn test_duplicate_and_foreign_tiles() {
        let image = gradient(20, 20);
        let mut tiles = split(&image, 2, 2, 0.0).unwrap();
        tiles[3].row = 0;
        tiles[3].col = 0;
        assert_eq!(
            combine(&tiles, 2, 2, 0.0, 20, 20).err(),
            Some(TileGridError::DuplicateTile { row: 0, col: 0 })
        );

        tiles[3].row = 2;
        tiles[3].col = 1;
        assert_eq!(
            combine(&tiles, 2, 2, 0.0, 20, 20).err(),
            Some(TileGridError::TileOutOfGrid { row: 2, col: 1 })
        );
    }

    #[test]
    fn test_tiles_from_other_parameters() {
        let image = gradient(40, 40);
        let tiles = split(&image, 2, 2, 0.0).unwrap();
        assert!(matches!(
            combine(&tiles, 2, 2, 20.0, 40, 40),
            Err(TileGridError::TileSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_tensor_roundtrip() {
        let tensor: ImageTensor =
            Array3::from_shape_fn((3, 23, 31), |(c, y, x)| (c * 1000 + y * 50 + x) as f32);
        let tiles = split(&tensor, 3, 4, 30.0).unwrap();
        assert_eq!(tiles.len(), 12);
        assert_eq!(tiles[0].image.shape()[0], 3);
        assert_eq!(combine(&tiles, 3, 4, 30.0, 31, 23).unwrap(), tensor);
    }
}
