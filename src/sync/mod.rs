//! Sync rounds between the local mirror and the server
//!
//! Each scope (the catalog, or one budget version) syncs independently: push
//! what is staged, pull what changed since the scope's cursor, then advance
//! the cursor.

pub mod budget;
pub mod catalog;
pub mod delta;

pub use budget::{Budget, BudgetView};
pub use catalog::{Catalog, CatalogView};
pub use delta::{BudgetChanges, CatalogChanges, ChangeSet, PullStats, SyncRequest, SyncResponse};

use serde::{Deserialize, Serialize};

/// Outcome of one sync round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Local changes sent
    pub pushed: usize,
    pub pulled: PullStats,
    /// Server knowledge after the round
    pub server_knowledge: u64,
}

impl SyncSummary {
    /// Whether the round neither sent nor received changes
    pub fn is_noop(&self) -> bool {
        self.pushed == 0 && self.pulled.changed() == 0
    }
}
