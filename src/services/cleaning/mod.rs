// Mask Builder & Inpainter: erase detected text and fill the holes from surrounding art

pub mod mask;

use image::{DynamicImage, GrayImage, RgbImage};
use opencv::core::Mat;
use opencv::photo;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::core::config::CleaningConfig;
use crate::core::errors::{CleaningError, CleaningResult};
use crate::core::types::{Cleaning, TextBlock};
use crate::utils::cv::{gray_to_mat, mat_to_rgb, rgb_to_mat};
use crate::utils::Metrics;

pub use mask::{build_mask, dilate_mask, lit_pixels};

#[derive(Clone)]
pub struct TextRemover {
    config: CleaningConfig,
    metrics: Option<Metrics>,
}

impl TextRemover {
    pub fn new(config: CleaningConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Dilated removal mask for `blocks` on an image of the given size.
    pub fn removal_mask(&self, width: u32, height: u32, blocks: &[TextBlock]) -> CleaningResult<GrayImage> {
        let mask = build_mask(width, height, blocks);
        dilate_mask(
            &mask,
            self.config.dilation_kernel,
            self.config.dilation_iterations,
        )
    }

    /// Erase every block from `image`.
    ///
    /// Returns `Cleaning::NoText` without touching the image when `blocks` is empty.
    #[instrument(skip(self, image, blocks), fields(
        width = image.width(),
        height = image.height(),
        blocks = blocks.len()
    ))]
    pub fn remove_text_blocking(&self, image: &DynamicImage, blocks: &[TextBlock]) -> CleaningResult<Cleaning> {
        if blocks.is_empty() {
            warn!("{}", Cleaning::NO_TEXT_WARNING);
            return Ok(Cleaning::NoText);
        }

        let start = Instant::now();
        let rgb = image.to_rgb8();
        let mask = self.removal_mask(rgb.width(), rgb.height(), blocks)?;
        debug!(
            "Mask covers {} of {} pixels",
            lit_pixels(&mask),
            rgb.width() * rgb.height()
        );

        let cleaned = inpaint(&rgb, &mask, self.config.inpaint_radius)?;

        if let Some(ref m) = self.metrics {
            m.record_cleaning(blocks.len(), start.elapsed());
        }

        Ok(Cleaning::Cleaned {
            image: cleaned,
            blocks_removed: blocks.len(),
        })
    }

    pub async fn remove_text(&self, image: &DynamicImage, blocks: &[TextBlock]) -> CleaningResult<Cleaning> {
        let this = self.clone();
        let image = image.clone();
        let blocks = blocks.to_vec();
        tokio::task::spawn_blocking(move || this.remove_text_blocking(&image, &blocks))
            .await
            .map_err(|e| CleaningError::Join(e.to_string()))?
    }

    /// Decode then clean. Undecodable input is an `ImageRead` error.
    pub async fn remove_text_bytes(&self, bytes: &[u8], blocks: &[TextBlock]) -> CleaningResult<Cleaning> {
        let bytes = bytes.to_vec();
        let image = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| CleaningError::Join(e.to_string()))??;

        let result = self.remove_text(&image, blocks).await?;
        info!("Removed {} text blocks", result.blocks_removed());
        Ok(result)
    }
}

/// Telea inpainting of every lit mask pixel.
pub fn inpaint(image: &RgbImage, mask: &GrayImage, radius: f64) -> CleaningResult<RgbImage> {
    if image.dimensions() != mask.dimensions() {
        return Err(CleaningError::InvalidMask {
            mask_width: mask.width(),
            mask_height: mask.height(),
            image_width: image.width(),
            image_height: image.height(),
        });
    }

    let src = rgb_to_mat(image)?;
    let mask_mat = gray_to_mat(mask)?;

    let mut dst = Mat::default();
    photo::inpaint(&src, &mask_mat, &mut dst, radius, photo::INPAINT_TELEA)?;

    Ok(mat_to_rgb(&dst)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BoundingBox;
    use crate::utils::image_ops::encode_png;
    use image::Rgb;

    const PAPER: Rgb<u8> = Rgb([245, 240, 230]);

    fn block(x: u32, y: u32, w: u32, h: u32) -> TextBlock {
        TextBlock {
            text: "BLAM".into(),
            confidence: 90.0,
            bbox: BoundingBox::new(x, y, w, h),
        }
    }

    /// Flat paper with a dark "word" in the middle
    fn page_with_word() -> RgbImage {
        let mut img = RgbImage::from_pixel(120, 120, PAPER);
        for y in 55..65 {
            for x in 45..75 {
                img.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }
        img
    }

    #[test]
    fn test_no_blocks_is_a_warning_not_an_error() {
        let remover = TextRemover::new(CleaningConfig::default());
        let img = DynamicImage::ImageRgb8(page_with_word());
        let result = remover.remove_text_blocking(&img, &[]).unwrap();
        assert!(matches!(result, Cleaning::NoText));
        assert!(result.cleaned_image().is_none());
        assert_eq!(result.blocks_removed(), 0);
    }

    #[test]
    fn test_text_is_filled_from_surroundings() {
        let remover = TextRemover::new(CleaningConfig::default());
        let original = page_with_word();
        let img = DynamicImage::ImageRgb8(original.clone());

        let result = remover
            .remove_text_blocking(&img, &[block(45, 55, 30, 10)])
            .unwrap();
        assert_eq!(result.blocks_removed(), 1);
        let cleaned = result.cleaned_image().unwrap();

        assert_eq!(cleaned.dimensions(), original.dimensions());
        // The word is gone, replaced by something paper-like
        let center = cleaned.get_pixel(60, 60);
        assert!(center[0] > 200, "center still dark: {center:?}");
        // Pixels beyond the dilated mask are untouched
        assert_eq!(cleaned.get_pixel(2, 2), &PAPER);
        assert_eq!(cleaned.get_pixel(117, 117), &PAPER);
    }

    #[test]
    fn test_caller_boxes_past_the_edge_are_clipped() {
        let remover = TextRemover::new(CleaningConfig::default());
        let img = DynamicImage::ImageRgb8(page_with_word());

        let result = remover
            .remove_text_blocking(&img, &[block(45, 55, u32::MAX, u32::MAX)])
            .unwrap();
        assert_eq!(result.blocks_removed(), 1);
        assert_eq!(result.cleaned_image().unwrap().dimensions(), (120, 120));
    }

    #[test]
    fn test_mask_size_mismatch_is_rejected() {
        let img = RgbImage::new(10, 10);
        let mask = GrayImage::new(12, 10);
        let err = inpaint(&img, &mask, 5.0).unwrap_err();
        assert!(matches!(err, CleaningError::InvalidMask { .. }));
    }

    #[test]
    fn test_removal_mask_uses_configured_dilation() {
        let remover = TextRemover::new(CleaningConfig {
            dilation_kernel: 3,
            dilation_iterations: 1,
            inpaint_radius: 5.0,
        });
        let mask = remover.removal_mask(20, 20, &[block(10, 10, 0, 0)]).unwrap();
        assert_eq!(lit_pixels(&mask), 9);
    }

    #[tokio::test]
    async fn test_remove_text_bytes() {
        let remover = TextRemover::new(CleaningConfig::default());
        let png = encode_png(&page_with_word()).unwrap();

        let result = remover
            .remove_text_bytes(&png, &[block(45, 55, 30, 10)])
            .await
            .unwrap();
        assert_eq!(result.blocks_removed(), 1);

        let err = remover
            .remove_text_bytes(b"not an image", &[block(0, 0, 1, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CleaningError::ImageRead(_)));
    }
}
