//! CLI commands

pub mod flags;
pub mod hash;
pub mod render;
