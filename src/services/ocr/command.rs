// External command backend
//
// Runs a user-supplied program (for example a PaddleOCR wrapper script) with the image
// path appended as the last argument and reads a JSON document from its stdout.

use anyhow::{anyhow, Context};
use image::GrayImage;
use std::process::Command;
use tracing::{debug, instrument};

use super::normalize::tokens_from_value;
use super::{write_scratch_png, OcrBackend, RawToken};
use crate::core::errors::{DetectionError, DetectionResult};
use crate::core::types::{ConfidenceScale, LayoutMode};

pub struct CommandBackend {
    argv: Vec<String>,
    confidence_scale: ConfidenceScale,
}

impl CommandBackend {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            confidence_scale: ConfidenceScale::Auto,
        }
    }

    /// Fix the scale the program's scores are on instead of guessing per score
    pub fn with_confidence_scale(mut self, scale: ConfidenceScale) -> Self {
        self.confidence_scale = scale;
        self
    }

    fn run(&self, image: &GrayImage) -> anyhow::Result<serde_json::Value> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| anyhow!("no OCR command configured"))?;

        let tmp = write_scratch_png(image)?;

        let output = Command::new(program)
            .args(args)
            .arg(tmp.path())
            .output()
            .with_context(|| format!("failed to run OCR command '{program}'"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("OCR command failed: {}", stderr.trim()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(trimmed).context("OCR command did not print valid JSON")
    }
}

impl OcrBackend for CommandBackend {
    fn name(&self) -> &str {
        "command"
    }

    // The external engine decides its own layout analysis.
    #[instrument(skip(self, image, _layout), fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &GrayImage, _layout: LayoutMode) -> DetectionResult<Vec<RawToken>> {
        let raw = self
            .run(image)
            .map_err(|e| DetectionError::OcrBackend(format!("{e:#}")))?;
        let tokens = tokens_from_value(&raw, self.confidence_scale);
        debug!("OCR command returned {} tokens", tokens.len());
        Ok(tokens)
    }
}
