pub mod cv;
pub mod image_ops;
pub mod metrics;

// Re-export commonly used items
pub use image_ops::{
    decode_image, encode_png, encode_png_async, load_image_from_memory_async, upscale,
};
pub use metrics::{Metrics, MetricsSnapshot};
