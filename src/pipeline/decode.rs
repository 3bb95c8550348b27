//! Image decoding: turn a source file into a `DynamicImage`.

use image::DynamicImage;
use std::path::Path;

/// Loads a source image from disk.
///
/// The error is a human-readable cause; the driver wraps it in
/// [`crate::error::ImageError::Unreadable`] and skips the image.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<DynamicImage, String>;
}

/// [`ImageDecoder`] backed by the `image` crate.
///
/// The format is guessed from the file contents rather than the extension,
/// so a PNG saved as `.jpg` still loads.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileImageDecoder;

impl ImageDecoder for FileImageDecoder {
    fn decode(&self, path: &Path) -> Result<DynamicImage, String> {
        image::ImageReader::open(path)
            .map_err(|e| e.to_string())?
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .decode()
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    #[test]
    fn decodes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.jpg");
        RgbImage::from_pixel(16, 8, Rgb([200, 10, 10]))
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        let img = FileImageDecoder.decode(&path).unwrap();
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn decodes_png_with_jpg_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actually-png.jpg");
        RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        assert!(FileImageDecoder.decode(&path).is_ok());
    }

    #[test]
    fn garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();

        assert!(FileImageDecoder.decode(&path).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileImageDecoder.decode(&dir.path().join("gone.jpg")).is_err());
    }
}
