pub mod page_orchestrator;

pub use page_orchestrator::{merge_blocks, PageOrchestrator};
