pub mod cleaning;
pub mod detection;
pub mod ocr;
pub mod translation;

// Re-export commonly used services
pub use cleaning::TextRemover;
pub use detection::TextDetector;
pub use ocr::{backend_from_config, OcrBackend};
pub use translation::{ChatCompletion, Translator};
