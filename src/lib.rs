// Library exports for the comic page workflow
//
// detect text -> erase it -> translate it -> merge, one page at a time

// Core modules
pub mod core;
pub mod orchestration;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use core::{
    config::Config,
    errors::{CleaningError, ConfigError, DetectionError, PipelineError},
    types::{BoundingBox, Cleaning, Detection, MergedBlock, Page, PageResult, TextBlock, Translation},
};

pub use orchestration::{merge_blocks, PageOrchestrator};

pub use services::{TextDetector, TextRemover, Translator};

pub use utils::{load_image_from_memory_async, Metrics};
