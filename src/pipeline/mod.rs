//! The content-generation workflow: four phases run in order against the
//! remote services, with progress persisted on the content request.

mod batch;
mod input;
mod orchestrator;
mod phase;
mod progress;

pub use batch::{BatchOptions, BatchReport};
pub use input::parse_batch_csv;
pub use orchestrator::{GenerationInput, GenerationOutcome, GenerationSettings, Orchestrator};
pub use progress::ProgressEvent;
