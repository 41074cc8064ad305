use image::{imageops::FilterType, DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;

use crate::core::errors::{CleaningError, DetectionError};

/// Decode image bytes, surfacing failures as the detector's read error.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DetectionError> {
    image::load_from_memory(bytes).map_err(DetectionError::ImageRead)
}

/// Asynchronously load an image from bytes using spawn_blocking.
///
/// Image decoding is CPU-intensive, especially for large pages.
pub async fn load_image_from_memory_async(bytes: &[u8]) -> Result<DynamicImage, DetectionError> {
    let bytes = bytes.to_vec(); // Clone to move into blocking task
    tokio::task::spawn_blocking(move || decode_image(&bytes))
        .await
        .map_err(|e| DetectionError::Join(e.to_string()))?
}

/// Upscale by a uniform factor with bicubic (Catmull-Rom) interpolation.
///
/// Target dimensions are rounded and never drop below one pixel.
pub fn upscale(img: &DynamicImage, factor: f32) -> DynamicImage {
    let (new_width, new_height) = scaled_dimensions(img.width(), img.height(), factor);
    if (new_width, new_height) == (img.width(), img.height()) {
        return img.clone();
    }
    img.resize_exact(new_width, new_height, FilterType::CatmullRom)
}

pub fn scaled_dimensions(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let scale = |v: u32| ((v as f32 * factor).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Encode an RGB buffer as PNG bytes.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, CleaningError> {
    let mut png_bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)?;
    Ok(png_bytes)
}

/// Asynchronously encode an image to PNG bytes using spawn_blocking.
///
/// PNG encoding is CPU-intensive and can block the async runtime if done synchronously.
pub async fn encode_png_async(img: RgbImage) -> Result<Vec<u8>, CleaningError> {
    tokio::task::spawn_blocking(move || encode_png(&img))
        .await
        .map_err(|e| CleaningError::Join(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[tokio::test]
    async fn test_encode_then_load_async() {
        let img = RgbImage::from_pixel(3, 2, Rgb([255, 0, 0]));

        let png_bytes = encode_png_async(img).await.unwrap();
        assert!(!png_bytes.is_empty());

        let loaded = load_image_from_memory_async(&png_bytes).await.unwrap();
        assert_eq!((loaded.width(), loaded.height()), (3, 2));
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_an_image_read_error() {
        let result = load_image_from_memory_async(b"definitely not a png").await;
        assert!(matches!(result, Err(DetectionError::ImageRead(_))));
    }

    #[test]
    fn test_upscale_doubles_dimensions() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(13, 7));
        let up = upscale(&img, 2.0);
        assert_eq!((up.width(), up.height()), (26, 14));
    }

    #[test]
    fn test_scaled_dimensions_never_zero() {
        assert_eq!(scaled_dimensions(1, 1, 0.1), (1, 1));
        assert_eq!(scaled_dimensions(10, 4, 1.5), (15, 6));
    }
}
