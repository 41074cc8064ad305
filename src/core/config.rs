use crate::core::errors::{ConfigError, ConfigResult};
use crate::core::types::{ConfidenceScale, LayoutMode};
use std::env;
use std::str::FromStr;
use tracing::Level;

/// Which OCR backend the detector talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrBackendKind {
    /// `tesseract` CLI with TSV output
    Tesseract,
    /// External program printing JSON results on stdout
    Command,
}

impl FromStr for OcrBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "command" => Ok(Self::Command),
            other => Err(ConfigError::UnknownOcrBackend(other.to_string())),
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Upscale applied before recognition; boxes are divided by it afterwards
    pub scale_factor: f32,
    /// Tokens need confidence strictly above this (0-100 scale)
    pub min_confidence: f32,
    /// Tokens need an original-pixel area strictly above this
    pub min_area: f32,
    /// Tokens need a trimmed length strictly above this
    pub min_text_len: usize,
    pub median_kernel: i32,
    pub threshold_block_size: i32,
    pub threshold_c: f64,
    pub ocr_backend: OcrBackendKind,
    pub ocr_language: String,
    pub ocr_command: Vec<String>,
    /// How the command backend's scores are read
    pub ocr_confidence_scale: ConfidenceScale,
    pub ocr_engine_mode: u32,
    pub layout_mode: LayoutMode,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            scale_factor: 2.0,
            min_confidence: 40.0,
            min_area: 200.0,
            min_text_len: 2,
            median_kernel: 3,
            threshold_block_size: 31,
            threshold_c: 2.0,
            ocr_backend: OcrBackendKind::Tesseract,
            ocr_language: "eng".to_string(),
            ocr_command: Vec::new(),
            ocr_confidence_scale: ConfidenceScale::Auto,
            ocr_engine_mode: 3,
            layout_mode: LayoutMode::SparseText,
        }
    }
}

/// Mask dilation and inpainting configuration
#[derive(Debug, Clone)]
pub struct CleaningConfig {
    pub dilation_kernel: i32,
    pub dilation_iterations: i32,
    pub inpaint_radius: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            dilation_kernel: 15,
            dilation_iterations: 4,
            inpaint_radius: 5.0,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    /// No key means the translator runs in mock mode
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub target_language: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            target_language: "Spanish".to_string(),
            temperature: 0.3,
            timeout_seconds: 10,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: Level,
    pub detection: DetectionConfig,
    pub cleaning: CleaningConfig,
    pub translation: TranslationConfig,
}

impl Config {
    pub fn new() -> ConfigResult<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_with(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from an arbitrary key lookup (environment in production)
    pub fn load_with<F>(get: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let detection_defaults = DetectionConfig::default();
        let cleaning_defaults = CleaningConfig::default();
        let translation_defaults = TranslationConfig::default();

        let log_level = get("LOG_LEVEL")
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        let ocr_backend = match get("OCR_BACKEND") {
            Some(name) if !name.trim().is_empty() => name.parse()?,
            _ => detection_defaults.ocr_backend.clone(),
        };

        let ocr_command = get("OCR_COMMAND")
            .map(|cmd| cmd.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let api_key = get("OPENAI_API_KEY")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            log_level,
            detection: DetectionConfig {
                scale_factor: parse_or(&get, "SCALE_FACTOR", detection_defaults.scale_factor)?,
                min_confidence: parse_or(&get, "MIN_CONFIDENCE", detection_defaults.min_confidence)?,
                min_area: parse_or(&get, "MIN_AREA", detection_defaults.min_area)?,
                min_text_len: parse_or(&get, "MIN_TEXT_LEN", detection_defaults.min_text_len)?,
                median_kernel: parse_or(&get, "MEDIAN_KERNEL", detection_defaults.median_kernel)?,
                threshold_block_size: parse_or(
                    &get,
                    "THRESHOLD_BLOCK_SIZE",
                    detection_defaults.threshold_block_size,
                )?,
                threshold_c: parse_or(&get, "THRESHOLD_C", detection_defaults.threshold_c)?,
                ocr_backend,
                ocr_language: get("OCR_LANGUAGE").unwrap_or(detection_defaults.ocr_language),
                ocr_command,
                ocr_confidence_scale: parse_or(
                    &get,
                    "OCR_CONFIDENCE_SCALE",
                    detection_defaults.ocr_confidence_scale,
                )?,
                ocr_engine_mode: parse_or(&get, "OCR_ENGINE_MODE", detection_defaults.ocr_engine_mode)?,
                layout_mode: parse_or(&get, "OCR_LAYOUT_MODE", detection_defaults.layout_mode)?,
            },
            cleaning: CleaningConfig {
                dilation_kernel: parse_or(&get, "DILATION_KERNEL", cleaning_defaults.dilation_kernel)?,
                dilation_iterations: parse_or(
                    &get,
                    "DILATION_ITERATIONS",
                    cleaning_defaults.dilation_iterations,
                )?,
                inpaint_radius: parse_or(&get, "INPAINT_RADIUS", cleaning_defaults.inpaint_radius)?,
            },
            translation: TranslationConfig {
                api_key,
                base_url: get("TRANSLATION_BASE_URL")
                    .map(|s| s.trim_end_matches('/').to_string())
                    .unwrap_or(translation_defaults.base_url),
                model: get("TRANSLATION_MODEL").unwrap_or(translation_defaults.model),
                target_language: get("TARGET_LANGUAGE")
                    .unwrap_or(translation_defaults.target_language),
                temperature: parse_or(
                    &get,
                    "TRANSLATION_TEMPERATURE",
                    translation_defaults.temperature,
                )?,
                timeout_seconds: parse_or(
                    &get,
                    "TRANSLATION_TIMEOUT_SECONDS",
                    translation_defaults.timeout_seconds,
                )?,
            },
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let d = &self.detection;

        if !(d.scale_factor > 0.0 && d.scale_factor <= 8.0) {
            return Err(ConfigError::InvalidScaleFactor(d.scale_factor));
        }

        if d.min_confidence < 0.0 || d.min_area < 0.0 {
            return Err(ConfigError::InvalidDetectionConfig(format!(
                "thresholds must be non-negative (confidence={}, area={})",
                d.min_confidence, d.min_area
            )));
        }

        // OpenCV requires odd apertures
        if d.median_kernel < 1 || d.median_kernel % 2 == 0 {
            return Err(ConfigError::InvalidDetectionConfig(format!(
                "median_kernel must be odd and >= 1, got {}",
                d.median_kernel
            )));
        }

        if d.threshold_block_size < 3 || d.threshold_block_size % 2 == 0 {
            return Err(ConfigError::InvalidDetectionConfig(format!(
                "threshold_block_size must be odd and >= 3, got {}",
                d.threshold_block_size
            )));
        }

        if d.ocr_backend == OcrBackendKind::Command && d.ocr_command.is_empty() {
            return Err(ConfigError::InvalidDetectionConfig(
                "OCR_COMMAND must be set when OCR_BACKEND=command".to_string(),
            ));
        }

        let c = &self.cleaning;
        if c.dilation_kernel < 1 {
            return Err(ConfigError::InvalidCleaningConfig(format!(
                "dilation_kernel must be >= 1, got {}",
                c.dilation_kernel
            )));
        }
        if c.dilation_iterations < 0 {
            return Err(ConfigError::InvalidCleaningConfig(format!(
                "dilation_iterations must be >= 0, got {}",
                c.dilation_iterations
            )));
        }
        if c.inpaint_radius <= 0.0 {
            return Err(ConfigError::InvalidCleaningConfig(format!(
                "inpaint_radius must be > 0, got {}",
                c.inpaint_radius
            )));
        }

        if self.translation.timeout_seconds == 0 {
            return Err(ConfigError::InvalidTranslationConfig(
                "timeout_seconds must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn log_level(&self) -> Level {
        self.log_level
    }

    pub fn translation_enabled(&self) -> bool {
        self.translation.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            detection: DetectionConfig::default(),
            cleaning: CleaningConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> ConfigResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarError(format!("{key}={raw}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_tuned_constants() {
        let config = Config::load_with(lookup(&[])).unwrap();
        config.validate().unwrap();

        assert_eq!(config.detection.scale_factor, 2.0);
        assert_eq!(config.detection.min_confidence, 40.0);
        assert_eq!(config.detection.min_area, 200.0);
        assert_eq!(config.detection.min_text_len, 2);
        assert_eq!(config.detection.layout_mode, LayoutMode::SparseText);
        assert_eq!(config.cleaning.dilation_kernel, 15);
        assert_eq!(config.cleaning.dilation_iterations, 4);
        assert_eq!(config.cleaning.inpaint_radius, 5.0);
        assert!(!config.translation_enabled());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = Config::load_with(lookup(&[
            ("SCALE_FACTOR", "3"),
            ("MIN_CONFIDENCE", "55.5"),
            ("DILATION_ITERATIONS", "2"),
            ("OPENAI_API_KEY", "sk-test"),
            ("TRANSLATION_BASE_URL", "http://localhost:8080/v1/"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.detection.scale_factor, 3.0);
        assert_eq!(config.detection.min_confidence, 55.5);
        assert_eq!(config.cleaning.dilation_iterations, 2);
        assert_eq!(config.translation.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.translation.base_url, "http://localhost:8080/v1");
        assert_eq!(config.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_blank_api_key_means_mock_mode() {
        let config = Config::load_with(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap();
        assert!(config.translation.api_key.is_none());
    }

    #[test]
    fn test_confidence_scale_override() {
        let config = Config::load_with(lookup(&[])).unwrap();
        assert_eq!(config.detection.ocr_confidence_scale, ConfidenceScale::Auto);

        let config = Config::load_with(lookup(&[("OCR_CONFIDENCE_SCALE", "percent")])).unwrap();
        assert_eq!(config.detection.ocr_confidence_scale, ConfidenceScale::Percent);

        assert!(Config::load_with(lookup(&[("OCR_CONFIDENCE_SCALE", "odds")])).is_err());
    }

    #[test]
    fn test_layout_mode_override() {
        let config = Config::load_with(lookup(&[("OCR_LAYOUT_MODE", "block")])).unwrap();
        assert_eq!(config.detection.layout_mode, LayoutMode::UniformBlock);
    }

    #[test]
    fn test_unparsable_value_is_rejected() {
        let err = Config::load_with(lookup(&[("MIN_AREA", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarError(_)));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = Config::load_with(lookup(&[("OCR_BACKEND", "paddle")])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOcrBackend(_)));
    }

    #[test]
    fn test_validation_rejects_even_block_size() {
        let mut config = Config::default();
        config.detection.threshold_block_size = 30;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDetectionConfig(_))
        ));
    }

    #[test]
    fn test_validation_rejects_zero_scale() {
        let mut config = Config::default();
        config.detection.scale_factor = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScaleFactor(_))
        ));
    }

    #[test]
    fn test_command_backend_needs_command() {
        let config = Config::load_with(lookup(&[("OCR_BACKEND", "command")])).unwrap();
        assert!(config.validate().is_err());

        let config = Config::load_with(lookup(&[
            ("OCR_BACKEND", "command"),
            ("OCR_COMMAND", "python3 paddle_ocr.py --json"),
        ]))
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.detection.ocr_command, vec!["python3", "paddle_ocr.py", "--json"]);
    }
}
