//! Durable record of sync rounds
//!
//! Every completed round of a client with a journal appends one
//! [`JournalEntry`] to a line-delimited JSON file.

mod entry;
mod logger;

pub use entry::{JournalEntry, SyncScope};
pub use logger::SyncJournal;
