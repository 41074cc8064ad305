// Data model shared by the detector, the cleaner, the translator and the orchestrator

use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Page layout assumption handed to the OCR backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Find as much text as possible in no particular order (speech bubbles)
    SparseText,
    /// One uniform block of text
    UniformBlock,
    /// Let the engine segment the page itself
    Auto,
}

impl FromStr for LayoutMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sparse" | "sparse_text" => Ok(Self::SparseText),
            "block" | "uniform_block" => Ok(Self::UniformBlock),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown layout mode '{other}'")),
        }
    }
}

/// Scale an OCR engine reports confidence on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceScale {
    /// Scores in [0, 1] are probabilities, larger ones are percentages. A 0-100
    /// engine reporting exactly 0 or 1 is misread as 0% or 100%.
    Auto,
    /// Always 0-1
    Unit,
    /// Always 0-100
    Percent,
}

impl ConfidenceScale {
    /// Convert a raw score to the 0-100 scale the acceptance filter uses
    pub fn to_percent(self, score: f64) -> f64 {
        match self {
            Self::Unit => score * 100.0,
            Self::Percent => score,
            Self::Auto if (0.0..=1.0).contains(&score) => score * 100.0,
            Self::Auto => score,
        }
    }
}

impl FromStr for ConfidenceScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "unit" | "probability" => Ok(Self::Unit),
            "percent" => Ok(Self::Percent),
            other => Err(format!("unknown confidence scale '{other}'")),
        }
    }
}

/// Axis-aligned rectangle in original image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// `x + w`, saturating at `u32::MAX`
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
}

/// One accepted text token. Existence implies it passed the acceptance filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    /// Recognizer confidence on a 0-100 scale
    pub confidence: f32,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

/// Detector output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Detection {
    pub total_blocks: usize,
    pub text_content: Vec<String>,
    #[serde(rename = "detailed_blocks")]
    pub blocks: Vec<TextBlock>,
}

impl Detection {
    pub fn new(blocks: Vec<TextBlock>) -> Self {
        Self {
            total_blocks: blocks.len(),
            text_content: blocks.iter().map(|b| b.text.clone()).collect(),
            blocks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Result of the text removal stage. `NoText` is a warning, not an error.
#[derive(Debug, Clone)]
pub enum Cleaning {
    Cleaned {
        image: RgbImage,
        blocks_removed: usize,
    },
    NoText,
}

impl Cleaning {
    pub const NO_TEXT_WARNING: &'static str = "No text detected to remove.";

    pub fn cleaned_image(&self) -> Option<&RgbImage> {
        match self {
            Cleaning::Cleaned { image, .. } => Some(image),
            Cleaning::NoText => None,
        }
    }

    pub fn blocks_removed(&self) -> usize {
        match self {
            Cleaning::Cleaned { blocks_removed, .. } => *blocks_removed,
            Cleaning::NoText => 0,
        }
    }
}

/// How the translator produced its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// Parsed from the translation service
    Translated,
    /// No service configured, strings prefixed with `[MOCK] `
    Mock,
    /// Service failed or answered garbage, strings prefixed with `[ERR] `
    Failed,
}

/// Translator output. `texts` has the input's length unless `status` is `Translated`,
/// in which case it is whatever the service returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub status: TranslationStatus,
    pub texts: Vec<String>,
}

impl Translation {
    pub const MOCK_PREFIX: &'static str = "[MOCK] ";
    pub const ERROR_PREFIX: &'static str = "[ERR] ";

    pub fn translated(texts: Vec<String>) -> Self {
        Self {
            status: TranslationStatus::Translated,
            texts,
        }
    }

    pub fn mock(strings: &[String]) -> Self {
        Self {
            status: TranslationStatus::Mock,
            texts: prefixed(Self::MOCK_PREFIX, strings),
        }
    }

    pub fn failed(strings: &[String]) -> Self {
        Self {
            status: TranslationStatus::Failed,
            texts: prefixed(Self::ERROR_PREFIX, strings),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.status != TranslationStatus::Translated
    }
}

fn prefixed(prefix: &str, strings: &[String]) -> Vec<String> {
    strings.iter().map(|s| format!("{prefix}{s}")).collect()
}

/// Final per-region record: position, original text and its translation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedBlock {
    pub id: usize,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub original: String,
    pub translated: String,
}

/// Orchestrator output for one page
#[derive(Debug, Clone, Serialize)]
pub struct PageResult {
    pub status: &'static str,
    pub translation_status: TranslationStatus,
    pub blocks: Vec<MergedBlock>,
}

/// A page carried through detection, cleaning and translation
pub struct Page {
    pub image: DynamicImage,
    pub blocks: Vec<TextBlock>,
    pub merged: Vec<MergedBlock>,
    pub cleaned_image: Option<RgbImage>,
}

impl Page {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_mode_names() {
        assert_eq!("sparse".parse::<LayoutMode>(), Ok(LayoutMode::SparseText));
        assert_eq!("Block".parse::<LayoutMode>(), Ok(LayoutMode::UniformBlock));
        assert!("columns".parse::<LayoutMode>().is_err());
    }

    #[test]
    fn test_confidence_scales() {
        assert_eq!(ConfidenceScale::Auto.to_percent(0.93), 93.0);
        assert_eq!(ConfidenceScale::Auto.to_percent(87.0), 87.0);
        assert_eq!(ConfidenceScale::Auto.to_percent(1.0), 100.0);
        assert_eq!(ConfidenceScale::Percent.to_percent(1.0), 1.0);
        assert_eq!(ConfidenceScale::Unit.to_percent(0.5), 50.0);
        assert_eq!("percent".parse::<ConfidenceScale>(), Ok(ConfidenceScale::Percent));
        assert!("basis-points".parse::<ConfidenceScale>().is_err());
    }

    #[test]
    fn test_box_edges_saturate() {
        let huge = BoundingBox::new(5, 5, u32::MAX, 1);
        assert_eq!(huge.right(), u32::MAX);
        assert_eq!(huge.bottom(), 6);
        assert_eq!(BoundingBox::new(u32::MAX, u32::MAX, 3, 3).bottom(), u32::MAX);
    }

    #[test]
    fn test_fallback_prefixes() {
        let strings = vec!["Hi".to_string(), "Bye".to_string()];
        assert_eq!(Translation::mock(&strings).texts, vec!["[MOCK] Hi", "[MOCK] Bye"]);
        assert_eq!(Translation::failed(&strings[..1]).texts, vec!["[ERR] Hi"]);
        assert!(Translation::failed(&strings).is_degraded());
    }

    #[test]
    fn test_detection_summary_fields() {
        let detection = Detection::new(vec![TextBlock {
            text: "HELLO".into(),
            confidence: 91.0,
            bbox: BoundingBox::new(10, 10, 50, 20),
        }]);
        assert_eq!(detection.total_blocks, 1);
        assert_eq!(detection.text_content, vec!["HELLO"]);

        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["detailed_blocks"][0]["box"]["w"], 50);
    }

    #[test]
    fn test_merged_block_serializes_box_key() {
        let block = MergedBlock {
            id: 0,
            bbox: BoundingBox::new(1, 2, 3, 4),
            original: "HELLO".into(),
            translated: "HOLA".into(),
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["box"]["x"], 1);
        assert_eq!(json["translated"], "HOLA");
    }
}
