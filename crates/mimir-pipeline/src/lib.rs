//! Declarative pipeline parsing and the step-execution engine (§4.C).

mod cancel;
mod definition;
mod engine;
mod error;

pub use cancel::CancellationToken;
pub use definition::{from_file, from_toml};
pub use engine::{EngineConfig, PipelineEngine};
pub use error::{PipelineError, Result};
