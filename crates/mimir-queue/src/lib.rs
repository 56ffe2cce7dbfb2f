mod error;
mod queue;

pub use error::{QueueError, Result};
pub use queue::{Queue, DEFAULT_RECORD_TTL};
