//! Configuration module for the nYNAB client
//!
//! This module provides:
//! - XDG-compliant path resolution
//! - User settings persistence

pub mod paths;
pub mod settings;

pub use paths::NynabPaths;
pub use settings::Settings;
