//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod completions;
mod derive_schema;
mod invert;
mod map_data;
mod utils;

pub use completions::handle_completions;
pub use derive_schema::handle_derive_schema;
pub use invert::handle_invert;
pub use map_data::handle_map_data;
