//! Snapshot persistence of the local mirror

use std::path::{Path, PathBuf};

use log::debug;

use crate::config::NynabPaths;
use crate::error::NynabResult;
use crate::session::Session;

use super::file_io::{read_json, write_json_atomic};

/// Saves and restores a `Session` as one JSON document
///
/// Staged changes and knowledge cursors are part of the snapshot, so a
/// restored session picks up where the saved one stopped.
#[derive(Debug, Clone)]
pub struct MirrorStore {
    path: PathBuf,
}

impl MirrorStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_paths(paths: &NynabPaths) -> Self {
        Self::new(paths.mirror_file())
    }

    /// Load the snapshot, or an empty session if none was saved
    pub fn load(&self) -> NynabResult<Session> {
        let mut session: Session = read_json(&self.path)?;
        session.reindex();
        debug!(
            "Loaded mirror from {} ({} pending change(s))",
            self.path.display(),
            session.pending_count()
        );
        Ok(session)
    }

    pub fn save(&self, session: &Session) -> NynabResult<()> {
        write_json_atomic(&self.path, session)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
