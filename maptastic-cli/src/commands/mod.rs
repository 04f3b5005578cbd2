//! CLI command implementations.

pub mod common;
pub mod download;
pub mod progress;
pub mod verify;
