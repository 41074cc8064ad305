// OCR preprocessing: upscale, grayscale, median blur, adaptive threshold

use image::{DynamicImage, GrayImage};
use opencv::core::Mat;
use opencv::imgproc;

use crate::core::config::DetectionConfig;
use crate::core::errors::{DetectionError, DetectionResult};
use crate::utils::cv::{gray_to_mat, mat_to_gray};
use crate::utils::image_ops::upscale;

/// Produce the binarized working image handed to the OCR backend.
///
/// The result is `scale_factor` times the input size. Text ends up dark on white.
pub fn binarize_for_ocr(image: &DynamicImage, config: &DetectionConfig) -> DetectionResult<GrayImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(DetectionError::InvalidImageSize {
            width: image.width(),
            height: image.height(),
        });
    }

    let gray = upscale(image, config.scale_factor).to_luma8();
    let src = gray_to_mat(&gray)?;

    // Halftone and paper grain
    let mut blurred = Mat::default();
    imgproc::median_blur(&src, &mut blurred, config.median_kernel)?;

    let mut binary = Mat::default();
    imgproc::adaptive_threshold(
        &blurred,
        &mut binary,
        255.0,
        imgproc::ADAPTIVE_THRESH_GAUSSIAN_C,
        imgproc::THRESH_BINARY,
        config.threshold_block_size,
        config.threshold_c,
    )?;

    Ok(mat_to_gray(&binary)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn page_with_dark_bar() -> DynamicImage {
        let mut img = RgbImage::from_pixel(60, 40, Rgb([235, 235, 235]));
        for y in 15..25 {
            for x in 10..50 {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_output_is_upscaled_and_binary() {
        let config = DetectionConfig::default();
        let out = binarize_for_ocr(&page_with_dark_bar(), &config).unwrap();

        assert_eq!(out.dimensions(), (120, 80));
        assert!(out.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_dark_strokes_stay_dark_on_light_background() {
        let config = DetectionConfig::default();
        let out = binarize_for_ocr(&page_with_dark_bar(), &config).unwrap();

        // Edge of the bar sits next to bright paper, so it falls under the local mean
        assert_eq!(out.get_pixel(2 * 10 + 1, 2 * 20)[0], 0);
        // Flat paper far from the bar stays white
        assert_eq!(out.get_pixel(2, 2)[0], 255);
    }

    #[test]
    fn test_scale_factor_is_respected() {
        let config = DetectionConfig {
            scale_factor: 3.0,
            ..DetectionConfig::default()
        };
        let out = binarize_for_ocr(&page_with_dark_bar(), &config).unwrap();
        assert_eq!(out.dimensions(), (180, 120));
    }

    #[test]
    fn test_empty_image_is_rejected() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        let err = binarize_for_ocr(&img, &DetectionConfig::default()).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidImageSize { .. }));
    }
}
