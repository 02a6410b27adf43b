//! Subcommand implementations.

pub mod common;
pub mod config;
pub mod list;
pub mod plan;
pub mod properties;
pub mod tile;
