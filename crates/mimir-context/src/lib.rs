//! Bounded, namespaced execution context (§4.B) and its template resolver.
//!
//! One `PipelineContext` per pipeline run: created at run start, dropped at
//! run end, never shared between runs. Steps write through
//! `set_step_data`/`set_parameter`; everything else — including other
//! steps' later config — reads through the `ContextResolver`.

mod error;
mod resolver;
mod store;

pub use error::{ContextError, Result};
pub use resolver::{ContextResolver, Strictness};
pub use store::{PipelineContext, DEFAULT_MAX_CONTEXT_BYTES, PARAMETERS_NAMESPACE};
