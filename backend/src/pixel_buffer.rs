use image::{imageops, ImageBuffer, Pixel};
use ndarray::{s, Array3};

use crate::geometry::{Coords, Rect};

/// Image data in CxHxW order, as consumed by tensor based per-tile processing.
pub type ImageTensor = Array3<f32>;

/// The pixel operations splitting and recombining are built on.
///
/// Implementations never modify `self` except in [`PixelBuffer::paste`].
pub trait PixelBuffer: Sized {
    /// `(width, height)` in pixels
    fn size(&self) -> (usize, usize);

    /// Copy the area of `rect` into a new buffer. `rect` must lie inside the buffer.
    fn crop(&self, rect: &Rect) -> Self;

    /// A blank buffer of the given size with the same pixel layout as `self`
    fn allocate_like(&self, width: usize, height: usize) -> Self;

    /// Overwrite the area starting at `at` with the content of `src`.
    /// `src` must fit into `self` at that position.
    fn paste(&mut self, src: &Self, at: Coords);
}

impl<P> PixelBuffer for ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    fn size(&self) -> (usize, usize) {
        (self.width() as usize, self.height() as usize)
    }

    fn crop(&self, rect: &Rect) -> Self {
        imageops::crop_imm(
            self,
            rect.left as u32,
            rect.upper as u32,
            rect.width() as u32,
            rect.height() as u32,
        )
        .to_image()
    }

    fn allocate_like(&self, width: usize, height: usize) -> Self {
        ImageBuffer::new(width as u32, height as u32)
    }

    fn paste(&mut self, src: &Self, at: Coords) {
        imageops::replace(self, src, at.x as i64, at.y as i64);
    }
}

impl<T> PixelBuffer for Array3<T>
where
    T: Clone + Default,
{
    fn size(&self) -> (usize, usize) {
        (self.shape()[2], self.shape()[1])
    }

    fn crop(&self, rect: &Rect) -> Self {
        self.slice(s![.., rect.upper..rect.lower, rect.left..rect.right])
            .to_owned()
    }

    fn allocate_like(&self, width: usize, height: usize) -> Self {
        Array3::from_elem((self.shape()[0], height, width), T::default())
    }

    fn paste(&mut self, src: &Self, at: Coords) {
        let (width, height) = src.size();
        self.slice_mut(s![.., at.y..at.y + height, at.x..at.x + width])
            .assign(src);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_image_crop_and_paste() {
        let image = RgbImage::from_fn(8, 6, |x, y| Rgb([x as u8, y as u8, 7]));
        let cropped = image.crop(&Rect::new(2, 1, 5, 4));
        assert_eq!(PixelBuffer::size(&cropped), (3, 3));
        assert_eq!(*cropped.get_pixel(0, 0), Rgb([2, 1, 7]));
        assert_eq!(*cropped.get_pixel(2, 2), Rgb([4, 3, 7]));

        let mut canvas = image.allocate_like(10, 10);
        assert_eq!(PixelBuffer::size(&canvas), (10, 10));
        canvas.paste(&cropped, Coords { x: 6, y: 5 });
        assert_eq!(*canvas.get_pixel(6, 5), Rgb([2, 1, 7]));
        assert_eq!(*canvas.get_pixel(8, 7), Rgb([4, 3, 7]));
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_tensor_crop_and_paste() {
        let tensor: ImageTensor =
            Array3::from_shape_fn((3, 4, 5), |(c, y, x)| (c * 100 + y * 10 + x) as f32);
        assert_eq!(tensor.size(), (5, 4));

        let cropped = tensor.crop(&Rect::new(1, 2, 4, 4));
        assert_eq!(cropped.shape(), &[3, 2, 3]);
        assert_eq!(cropped[[0, 0, 0]], 21.0);
        assert_eq!(cropped[[2, 1, 2]], 233.0);

        let mut canvas = tensor.allocate_like(6, 6);
        assert_eq!(canvas.shape(), &[3, 6, 6]);
        canvas.paste(&cropped, Coords { x: 3, y: 4 });
        assert_eq!(canvas[[1, 4, 3]], 121.0);
        assert_eq!(canvas[[1, 3, 3]], 0.0);
    }
}
