//! Lockbox operator CLI.
//!
//! Configuration comes from environment variables (optionally via a `.env`
//! file); command-line flags override them.

pub mod commands;
pub mod handler;
pub mod output;

pub use commands::{Cli, Commands, OutputFormat};
