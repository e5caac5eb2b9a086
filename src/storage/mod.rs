//! Storage layer for the nYNAB client
//!
//! JSON file storage with atomic writes, used to keep a snapshot of the
//! local mirror between runs.

pub mod file_io;
pub mod mirror;

pub use file_io::{read_json, write_json_atomic};
pub use mirror::MirrorStore;
