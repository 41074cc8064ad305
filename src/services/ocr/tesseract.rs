// Tesseract CLI backend
//
// Runs `tesseract <png> stdout ... tsv` and keeps word-level rows.

use anyhow::{anyhow, Context};
use image::GrayImage;
use std::process::Command;
use tracing::{debug, instrument};

use super::{write_scratch_png, OcrBackend, RawToken};
use crate::core::errors::{DetectionError, DetectionResult};
use crate::core::types::LayoutMode;

/// TSV row level for individual words
const WORD_LEVEL: i32 = 5;

pub struct TesseractBackend {
    program: String,
    language: String,
    engine_mode: u32,
}

impl TesseractBackend {
    pub fn new(language: String, engine_mode: u32) -> Self {
        Self {
            program: "tesseract".to_string(),
            language,
            engine_mode,
        }
    }

    /// Use a specific tesseract executable instead of the one on PATH
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn page_seg_mode(layout: LayoutMode) -> u32 {
        match layout {
            LayoutMode::SparseText => 11,
            LayoutMode::UniformBlock => 6,
            LayoutMode::Auto => 3,
        }
    }

    fn run(&self, image: &GrayImage, layout: LayoutMode) -> anyhow::Result<String> {
        let tmp = write_scratch_png(image)?;

        let output = Command::new(&self.program)
            .arg(tmp.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--oem")
            .arg(self.engine_mode.to_string())
            .arg("--psm")
            .arg(Self::page_seg_mode(layout).to_string())
            .arg("tsv")
            .output()
            .with_context(|| format!("failed to run {} (is it installed?)", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("tesseract failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    fn recognize(&self, image: &GrayImage, layout: LayoutMode) -> DetectionResult<Vec<RawToken>> {
        let tsv = self
            .run(image, layout)
            .map_err(|e| DetectionError::OcrBackend(format!("{e:#}")))?;
        let tokens = parse_tsv(&tsv);
        debug!("tesseract returned {} word rows", tokens.len());
        Ok(tokens)
    }
}

/// Parse tesseract TSV output into word tokens, in emission order.
///
/// Columns: level page block par line word left top width height conf text.
/// The header row and rows that are not words or have unparsable numbers are skipped.
pub fn parse_tsv(tsv: &str) -> Vec<RawToken> {
    let mut tokens = Vec::new();

    for row in tsv.lines() {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 11 {
            continue;
        }
        let Ok(level) = cols[0].trim().parse::<i32>() else {
            continue; // header
        };
        if level != WORD_LEVEL {
            continue;
        }

        let numbers: Option<Vec<f32>> = cols[6..=10]
            .iter()
            .map(|c| c.trim().parse::<f32>().ok())
            .collect();
        let Some(numbers) = numbers else {
            continue;
        };

        tokens.push(RawToken {
            text: cols.get(11).map(|t| t.to_string()).unwrap_or_default(),
            confidence: numbers[4],
            left: numbers[0],
            top: numbers[1],
            width: numbers[2],
            height: numbers[3],
        });
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t
2\t1\t1\t0\t0\t0\t40\t40\t300\t60\t-1\t
5\t1\t1\t1\t1\t1\t40\t40\t120\t50\t96.5\tHELLO
5\t1\t1\t1\t1\t2\t180\t42\t130\t48\t31.2\tTHERE
5\t1\t2\t1\t1\t1\tx\t0\t10\t10\t90\tBROKEN
5\t1\t2\t1\t1\t2\t500\t300\t14\t12\t12\t
";

    #[test]
    fn test_parse_tsv_keeps_word_rows_in_order() {
        let tokens = parse_tsv(SAMPLE);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "HELLO");
        assert_eq!(tokens[0].confidence, 96.5);
        assert_eq!((tokens[0].left, tokens[0].top), (40.0, 40.0));
        assert_eq!((tokens[0].width, tokens[0].height), (120.0, 50.0));
        assert_eq!(tokens[1].text, "THERE");
        assert_eq!(tokens[2].text, "");
    }

    #[test]
    fn test_parse_tsv_handles_missing_text_column() {
        let tokens = parse_tsv("5\t1\t1\t1\t1\t1\t1\t2\t3\t4\t55");
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].text.is_empty());
    }

    #[test]
    fn test_parse_tsv_empty_output() {
        assert!(parse_tsv("").is_empty());
    }

    #[test]
    fn test_layout_modes_map_to_psm() {
        assert_eq!(TesseractBackend::page_seg_mode(LayoutMode::SparseText), 11);
        assert_eq!(TesseractBackend::page_seg_mode(LayoutMode::UniformBlock), 6);
        assert_eq!(TesseractBackend::page_seg_mode(LayoutMode::Auto), 3);
    }

    #[test]
    fn test_missing_binary_is_backend_error() {
        let backend = TesseractBackend::new("eng".into(), 3)
            .with_program("/nonexistent/tesseract-binary");
        let img = GrayImage::new(4, 4);
        let err = backend.recognize(&img, LayoutMode::SparseText).unwrap_err();
        assert!(matches!(err, DetectionError::OcrBackend(_)));
    }
}
