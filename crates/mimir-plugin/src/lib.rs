//! The plugin contract, the composite-key registry, and the built-in
//! `default`/`builtin` control-flow executor (§4.A, §4.C).

mod builtin;
mod error;
mod registry;
mod trait_def;

pub use builtin::{DefaultPlugin, GLOBAL_NAMESPACE};
pub use error::{PluginError, Result};
pub use registry::{composite_key, Registry};
pub use trait_def::Plugin;
