//! Husk CLI - command implementations behind the `husk` binary.

pub mod commands;

pub use commands::{CatFileMode, CliError, Result, Workspace};
