pub mod event;
pub mod pipeline;

pub use event::{Event, is_empty_event};
pub use pipeline::{IngestionPipeline, write_batch};
