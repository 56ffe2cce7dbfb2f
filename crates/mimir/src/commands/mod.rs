//! CLI command handlers.

pub mod run;
pub mod schedule;
pub mod serve;
pub mod worker;

use crate::config::Settings;

/// Shared context for all commands.
#[derive(Clone)]
pub struct Context {
    pub settings: Settings,
    pub json_output: bool,
}
