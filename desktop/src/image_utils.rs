use std::path::Path;

use image::{buffer::ConvertBuffer, ImageError};

/// Tiles are kept in 16 bit so 16 bit sources survive the round trip.
pub type GridImage = image::ImageBuffer<image::Rgb<u16>, Vec<u16>>;

pub fn load_image<T: AsRef<Path>>(p: T) -> Result<GridImage, ImageError> {
    Ok(image::open(&p)?.to_rgb16())
}

pub fn save_image(image: &GridImage, path: impl AsRef<Path>) -> Result<(), ImageError> {
    match image.save(&path) {
        Err(ImageError::Unsupported(_)) => {
            // If we cannot write the image in the 16 bit representation, we try scaling to 8 bit RGB instead.
            log::debug!(
                "Writing {} as 8 bit RGB",
                path.as_ref().to_string_lossy()
            );
            ConvertBuffer::<image::ImageBuffer<image::Rgb<u8>, Vec<u8>>>::convert(image).save(&path)
        }
        result => result,
    }
}

/// `(width, height)` of an image file, read from its header only
pub fn image_dimensions<T: AsRef<Path>>(p: T) -> Result<(usize, usize), ImageError> {
    let (width, height) = image::image_dimensions(p)?;
    Ok((width as usize, height as usize))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_save_falls_back_to_8_bit() {
        let dir = tempfile::tempdir().unwrap();
        let image = GridImage::from_pixel(4, 3, image::Rgb([257 * 200, 0, 257 * 10]));

        let jpg = dir.path().join("a.jpg");
        save_image(&image, &jpg).unwrap();
        assert_eq!(image_dimensions(&jpg).unwrap(), (4, 3));

        let png = dir.path().join("a.png");
        save_image(&image, &png).unwrap();
        assert_eq!(load_image(&png).unwrap(), image);
    }
}
