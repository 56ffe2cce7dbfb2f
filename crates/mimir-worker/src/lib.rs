mod error;
mod handler;
pub mod scaling;
mod worker;

pub use error::{Result, WorkerError};
pub use handler::{TaskHandler, UnimplementedHandler};
pub use worker::{PipelineSource, Worker, MAX_POLL_BACKOFF, MIN_POLL_BACKOFF};
