pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{
    CleaningError, ConfigError, DetectionError, PipelineError, TranslationError,
};
pub use types::{
    BoundingBox, Cleaning, ConfidenceScale, Detection, LayoutMode, MergedBlock, Page, PageResult, TextBlock, Translation,
    TranslationStatus,
};
