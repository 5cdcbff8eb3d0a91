//! Shared utilities for gamedata.
//!
//! This crate provides common utilities used across the gamedata workspace:
//! - Logging setup with tracing
//! - Platform data directory discovery and lexical path checks

pub mod log;
pub mod path;

pub use log::{LogConfig, LogLevel};
