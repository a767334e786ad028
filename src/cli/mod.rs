//! Command-line interface for coursegen
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, error reporting and dispatch
//! - `commands`: command implementations

pub mod args;
mod commands;
mod run;


pub use args::{Cli, Commands, build_cli};
pub use run::run;
