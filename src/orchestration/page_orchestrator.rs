// Page Orchestrator: detect -> translate -> merge, plus a combined detect/clean/translate path

use image::DynamicImage;
use tracing::{info, instrument, warn};

use crate::core::config::Config;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::types::{Cleaning, Detection, MergedBlock, Page, PageResult, TextBlock, Translation};
use crate::services::cleaning::TextRemover;
use crate::services::detection::TextDetector;
use crate::services::ocr::backend_from_config;
use crate::services::translation::Translator;
use crate::utils::image_ops::load_image_from_memory_async;
use crate::utils::Metrics;

/// Pair each detected block with its translation by position.
///
/// Always returns one entry per block. Blocks past the end of `translations`, or whose
/// translation is blank, echo their original text.
pub fn merge_blocks(blocks: &[TextBlock], translations: &[String]) -> Vec<MergedBlock> {
    blocks
        .iter()
        .enumerate()
        .map(|(i, block)| MergedBlock {
            id: i,
            bbox: block.bbox,
            original: block.text.clone(),
            translated: translations
                .get(i)
                .filter(|t| !t.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| block.text.clone()),
        })
        .collect()
}

pub struct PageOrchestrator {
    detector: TextDetector,
    remover: TextRemover,
    translator: Translator,
    target_language: String,
    metrics: Metrics,
}

impl PageOrchestrator {
    pub fn new(
        detector: TextDetector,
        remover: TextRemover,
        translator: Translator,
        target_language: impl Into<String>,
        metrics: Metrics,
    ) -> Self {
        Self {
            detector: detector.with_metrics(metrics.clone()),
            remover: remover.with_metrics(metrics.clone()),
            translator: translator.with_metrics(metrics.clone()),
            target_language: target_language.into(),
            metrics,
        }
    }

    /// Build every stage from configuration. The OCR backend and translation client are
    /// created here, once.
    pub fn from_config(config: &Config) -> Self {
        let backend = backend_from_config(&config.detection);
        info!(
            "Page orchestrator ready (ocr: {}, translation: {})",
            backend.name(),
            if config.translation_enabled() { "live" } else { "mock" }
        );

        Self::new(
            TextDetector::new(config.detection.clone(), backend),
            TextRemover::new(config.cleaning.clone()),
            Translator::from_config(&config.translation),
            config.translation.target_language.clone(),
            Metrics::new(),
        )
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn detector(&self) -> &TextDetector {
        &self.detector
    }

    pub fn remover(&self) -> &TextRemover {
        &self.remover
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    pub async fn process_page(&self, image: &DynamicImage) -> PipelineResult<PageResult> {
        self.process_page_with_lang(image, &self.target_language).await
    }

    /// Detect, translate and merge. Detection errors abort the page; translation
    /// problems only degrade the `translated` strings.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub async fn process_page_with_lang(&self, image: &DynamicImage, target_lang: &str) -> PipelineResult<PageResult> {
        let detection = match self.detector.detect(image).await {
            Ok(d) => d,
            Err(e) => {
                self.metrics.record_page(false);
                return Err(e.into());
            }
        };

        let translation = self.translate_detection(&detection, target_lang).await;
        let blocks = merge_blocks(&detection.blocks, &translation.texts);

        info!(
            "Page done: {} blocks ({:?})",
            blocks.len(),
            translation.status
        );
        self.metrics.record_page(true);

        Ok(PageResult {
            status: "success",
            translation_status: translation.status,
            blocks,
        })
    }

    pub async fn process_page_bytes(&self, bytes: &[u8], target_lang: Option<&str>) -> PipelineResult<PageResult> {
        let image = match load_image_from_memory_async(bytes).await {
            Ok(img) => img,
            Err(e) => {
                self.metrics.record_page(false);
                return Err(e.into());
            }
        };
        let lang = target_lang.unwrap_or(&self.target_language);
        self.process_page_with_lang(&image, lang).await
    }

    /// Full page: detect once, then clean and translate concurrently.
    ///
    /// Fails only if detection or inpainting fails. A page without text comes back
    /// with no blocks and no cleaned image.
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub async fn translate_and_clean(&self, image: DynamicImage, target_lang: Option<&str>) -> PipelineResult<Page> {
        let lang = target_lang.unwrap_or(&self.target_language);

        let detection = self.detector.detect(&image).await.inspect_err(|_| {
            self.metrics.record_page(false);
        })?;

        let (cleaning, translation) = tokio::join!(
            self.remover.remove_text(&image, &detection.blocks),
            self.translate_detection(&detection, lang)
        );

        let cleaned_image = match cleaning {
            Ok(Cleaning::Cleaned { image, .. }) => Some(image),
            Ok(Cleaning::NoText) => None,
            Err(e) => {
                self.metrics.record_page(false);
                return Err(PipelineError::from(e));
            }
        };

        let merged = merge_blocks(&detection.blocks, &translation.texts);
        self.metrics.record_page(true);

        Ok(Page {
            image,
            blocks: detection.blocks,
            merged,
            cleaned_image,
        })
    }

    async fn translate_detection(&self, detection: &Detection, target_lang: &str) -> Translation {
        if detection.is_empty() {
            return Translation::translated(Vec::new());
        }
        let translation = self.translator.translate(&detection.text_content, target_lang).await;
        if translation.is_degraded() {
            warn!(
                "Translation degraded ({:?}) for {} blocks",
                translation.status,
                detection.total_blocks
            );
        }
        translation
    }
}
