//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the media-cache binary.

mod commands;
mod handlers;

pub use commands::{Cli, Commands};
pub use handlers::{handle_clear, handle_invalidate, handle_list, handle_lookup, handle_status};
