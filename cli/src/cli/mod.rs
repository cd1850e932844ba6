//! CLI module for graphteams.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, TargetArgs};
