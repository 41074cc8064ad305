// Token acceptance and coordinate rescaling

use crate::core::config::DetectionConfig;
use crate::core::types::{BoundingBox, TextBlock};
use crate::services::ocr::RawToken;

/// Per-axis ratio between the working image and the original page.
///
/// Upscaled dimensions are rounded independently, so with a non-integer factor the
/// two ratios can differ slightly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub x: f32,
    pub y: f32,
}

impl Scale {
    pub fn uniform(factor: f32) -> Self {
        Self { x: factor, y: factor }
    }

    /// Actual ratios of `working` over `original` dimensions
    pub fn between(working: (u32, u32), original: (u32, u32)) -> Self {
        Self {
            x: working.0 as f32 / original.0.max(1) as f32,
            y: working.1 as f32 / original.1.max(1) as f32,
        }
    }
}

/// Thresholds a raw token must strictly exceed to become a `TextBlock`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceFilter {
    pub min_confidence: f32,
    /// Area in original-image pixels
    pub min_area: f32,
    pub min_text_len: usize,
}

impl AcceptanceFilter {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            min_area: config.min_area,
            min_text_len: config.min_text_len,
        }
    }

    /// All three conditions must hold. `scale` is how much the token's image was
    /// upscaled by; the area test is done in original pixels.
    pub fn accepts(&self, token: &RawToken, scale: Scale) -> bool {
        let area = (token.width / scale.x) * (token.height / scale.y);
        token.confidence > self.min_confidence
            && area > self.min_area
            && token.text.trim().chars().count() > self.min_text_len
    }

    /// Accept and map a token back into original-image space.
    ///
    /// Coordinates are divided by the matching axis of `scale` and truncated, then clipped to the original
    /// image. Tokens whose box collapses to zero width or height are dropped.
    pub fn to_block(
        &self,
        token: &RawToken,
        scale: Scale,
        image_width: u32,
        image_height: u32,
    ) -> Option<TextBlock> {
        if !self.accepts(token, scale) {
            return None;
        }
        let bbox = rescale_box(token, scale, image_width, image_height)?;
        Some(TextBlock {
            text: token.text.trim().to_string(),
            confidence: token.confidence,
            bbox,
        })
    }
}

impl Default for AcceptanceFilter {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}

fn rescale_box(token: &RawToken, scale: Scale, image_width: u32, image_height: u32) -> Option<BoundingBox> {
    let to_original = |v: f32, s: f32| (v / s).max(0.0).floor() as u32;

    let x = to_original(token.left, scale.x);
    let y = to_original(token.top, scale.y);
    if x >= image_width || y >= image_height {
        return None;
    }

    let w = to_original(token.width, scale.x).min(image_width - x);
    let h = to_original(token.height, scale.y).min(image_height - y);
    if w == 0 || h == 0 {
        return None;
    }

    Some(BoundingBox::new(x, y, w, h))
}
