// Custom error types for the page pipeline
//
// Using thiserror for ergonomic error definitions with:
// - Type-safe error matching
// - Source error chaining
//
// Translation failures never reach callers; TranslationError only lives between the
// chat client and the Translator, which turns it into a degraded result.

use thiserror::Error;

/// Text detection errors
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Could not read image: {0}")]
    ImageRead(#[from] image::ImageError),

    #[error("OCR backend failed: {0}")]
    OcrBackend(String),

    #[error("Image preprocessing failed: {0}")]
    Preprocessing(#[from] opencv::Error),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },

    #[error("Task join failed: {0}")]
    Join(String),
}

/// Mask building and inpainting errors
#[derive(Debug, Error)]
pub enum CleaningError {
    #[error("Could not read image: {0}")]
    ImageRead(#[from] image::ImageError),

    #[error("Inpainting failed: {0}")]
    Processing(#[from] opencv::Error),

    #[error("Mask is {mask_width}x{mask_height} but image is {image_width}x{image_height}")]
    InvalidMask {
        mask_width: u32,
        mask_height: u32,
        image_width: u32,
        image_height: u32,
    },

    #[error("Task join failed: {0}")]
    Join(String),
}

/// Translation service errors
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("API call timed out after {0}s")]
    Timeout(u64),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Response contained no message content")]
    EmptyResponse,
}

/// Page orchestration errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Detection failed: {source}")]
    Detection {
        #[source]
        source: DetectionError,
    },

    #[error("Text removal failed: {source}")]
    Cleaning {
        #[source]
        source: CleaningError,
    },
}

impl From<DetectionError> for PipelineError {
    fn from(source: DetectionError) -> Self {
        PipelineError::Detection { source }
    }
}

impl From<CleaningError> for PipelineError {
    fn from(source: CleaningError) -> Self {
        PipelineError::Cleaning { source }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Scale factor must be in (0.0, 8.0], got {0}")]
    InvalidScaleFactor(f32),

    #[error("Invalid detection config: {0}")]
    InvalidDetectionConfig(String),

    #[error("Invalid cleaning config: {0}")]
    InvalidCleaningConfig(String),

    #[error("Invalid translation config: {0}")]
    InvalidTranslationConfig(String),

    #[error("Unknown OCR backend '{0}' (expected 'tesseract' or 'command')")]
    UnknownOcrBackend(String),

    #[error("Environment variable parsing failed: {0}")]
    EnvVarError(String),
}

// Convenience type aliases for Results
pub type DetectionResult<T> = Result<T, DetectionError>;
pub type CleaningResult<T> = Result<T, CleaningError>;
pub type TranslationResult<T> = Result<T, TranslationError>;
pub type PipelineResult<T> = Result<T, PipelineError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
