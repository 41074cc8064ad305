// Text Detector: preprocess, recognize, filter and map tokens back to page coordinates

pub mod filter;
pub mod preprocess;

use image::{DynamicImage, GenericImageView};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::core::config::DetectionConfig;
use crate::core::errors::{DetectionError, DetectionResult};
use crate::core::types::Detection;
use crate::services::ocr::OcrBackend;
use crate::utils::image_ops::load_image_from_memory_async;
use crate::utils::Metrics;

pub use filter::{AcceptanceFilter, Scale};
pub use preprocess::binarize_for_ocr;

/// Detects text blocks on a page. Cheap to clone; clones share the OCR backend.
#[derive(Clone)]
pub struct TextDetector {
    config: Arc<DetectionConfig>,
    backend: Arc<dyn OcrBackend>,
    filter: AcceptanceFilter,
    metrics: Option<Metrics>,
}

impl TextDetector {
    pub fn new(config: DetectionConfig, backend: Arc<dyn OcrBackend>) -> Self {
        let filter = AcceptanceFilter::from_config(&config);
        Self {
            config: Arc::new(config),
            backend,
            filter,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run detection on the calling thread.
    ///
    /// Zero detections is not an error: the result simply has `total_blocks == 0`.
    #[instrument(skip(self, image), fields(
        width = image.width(),
        height = image.height(),
        backend = self.backend.name()
    ))]
    pub fn detect_blocking(&self, image: &DynamicImage) -> DetectionResult<Detection> {
        let start = Instant::now();

        let working = binarize_for_ocr(image, &self.config)?;
        // Actual ratios after rounding, so boxes map back onto the original grid
        let scale = Scale::between(working.dimensions(), image.dimensions());

        let tokens = self.backend.recognize(&working, self.config.layout_mode)?;
        let raw_count = tokens.len();

        let blocks: Vec<_> = tokens
            .iter()
            .filter_map(|t| self.filter.to_block(t, scale, image.width(), image.height()))
            .collect();

        debug!(
            "Accepted {}/{} tokens (conf>{}, area>{}, len>{})",
            blocks.len(),
            raw_count,
            self.filter.min_confidence,
            self.filter.min_area,
            self.filter.min_text_len
        );

        if let Some(ref m) = self.metrics {
            m.record_detection(blocks.len(), start.elapsed());
        }

        Ok(Detection::new(blocks))
    }

    /// Run detection on the blocking pool.
    pub async fn detect(&self, image: &DynamicImage) -> DetectionResult<Detection> {
        let this = self.clone();
        let image = image.clone();
        tokio::task::spawn_blocking(move || this.detect_blocking(&image))
            .await
            .map_err(|e| DetectionError::Join(e.to_string()))?
    }

    /// Decode then detect. Undecodable input is an `ImageRead` error.
    pub async fn detect_bytes(&self, bytes: &[u8]) -> DetectionResult<Detection> {
        let image = load_image_from_memory_async(bytes).await?;
        let detection = self.detect(&image).await?;
        info!(
            "Detected {} text blocks on {}x{} page",
            detection.total_blocks,
            image.width(),
            image.height()
        );
        Ok(detection)
    }
}
