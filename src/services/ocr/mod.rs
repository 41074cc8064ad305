// OCR backend seam
//
// The detector only ever sees `RawToken`s. Each backend owns the translation from its
// engine-specific output into that shape, so backend drift stops here.

pub mod command;
pub mod normalize;
pub mod tesseract;

use image::GrayImage;
use std::sync::Arc;

use crate::core::config::{DetectionConfig, OcrBackendKind};
use crate::core::errors::DetectionResult;
use crate::core::types::LayoutMode;

pub use command::CommandBackend;
pub use tesseract::TesseractBackend;

/// One token as reported by a backend, in the coordinates of the image it was given.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub text: String,
    /// 0-100 scale; negative means the engine reported no confidence
    pub confidence: f32,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// A text recognizer. Implementations must be safe to call from several pages at once.
pub trait OcrBackend: Send + Sync {
    fn name(&self) -> &str;

    fn recognize(&self, image: &GrayImage, layout: LayoutMode) -> DetectionResult<Vec<RawToken>>;
}

/// Build the backend selected in configuration. Called once at startup; the handle is
/// then passed to the detector explicitly.
pub fn backend_from_config(config: &DetectionConfig) -> Arc<dyn OcrBackend> {
    match config.ocr_backend {
        OcrBackendKind::Tesseract => Arc::new(TesseractBackend::new(
            config.ocr_language.clone(),
            config.ocr_engine_mode,
        )),
        OcrBackendKind::Command => Arc::new(
            CommandBackend::new(config.ocr_command.clone())
                .with_confidence_scale(config.ocr_confidence_scale),
        ),
    }
}

/// Write the image to a scratch PNG that lives as long as the returned handle.
pub(crate) fn write_scratch_png(image: &GrayImage) -> anyhow::Result<tempfile::NamedTempFile> {
    use anyhow::Context;

    let tmp = tempfile::Builder::new()
        .prefix("comic-ocr-")
        .suffix(".png")
        .tempfile()
        .context("failed to create temp file for OCR")?;
    image
        .save_with_format(tmp.path(), image::ImageFormat::Png)
        .context("failed to write temp image for OCR")?;
    Ok(tmp)
}
