//! Sync journal entry data structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::BudgetVersionId;
use crate::sync::SyncSummary;

/// Which scope a sync round covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncScope {
    Catalog,
    Budget(BudgetVersionId),
}

impl fmt::Display for SyncScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => write!(f, "catalog"),
            Self::Budget(version) => write!(f, "budget {}", version),
        }
    }
}

/// One completed sync round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When the round completed (UTC)
    pub timestamp: DateTime<Utc>,

    pub scope: SyncScope,

    pub pushed: usize,
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,

    /// Server knowledge after the round
    pub server_knowledge: u64,
}

impl JournalEntry {
    pub fn from_summary(scope: SyncScope, summary: &SyncSummary) -> Self {
        Self {
            timestamp: Utc::now(),
            scope,
            pushed: summary.pushed,
            inserted: summary.pulled.inserted,
            updated: summary.pulled.updated,
            removed: summary.pulled.removed,
            server_knowledge: summary.server_knowledge,
        }
    }

    /// Whether the round changed nothing on either side
    pub fn is_noop(&self) -> bool {
        self.pushed == 0 && self.inserted == 0 && self.updated == 0 && self.removed == 0
    }

    /// Format as a one-line summary
    pub fn format_human_readable(&self) -> String {
        format!(
            "{} {}: pushed {}, pulled +{} ~{} -{} (knowledge {})",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.scope,
            self.pushed,
            self.inserted,
            self.updated,
            self.removed,
            self.server_knowledge
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::PullStats;

    fn summary() -> SyncSummary {
        SyncSummary {
            pushed: 3,
            pulled: PullStats {
                inserted: 2,
                updated: 1,
                removed: 0,
                ignored: 0,
            },
            server_knowledge: 17,
        }
    }

    #[test]
    fn test_from_summary() {
        let entry = JournalEntry::from_summary(SyncScope::Catalog, &summary());
        assert_eq!(entry.pushed, 3);
        assert_eq!(entry.inserted, 2);
        assert_eq!(entry.server_knowledge, 17);
        assert!(!entry.is_noop());
        assert!(JournalEntry::from_summary(SyncScope::Catalog, &SyncSummary::default()).is_noop());
    }

    #[test]
    fn test_scope_serialization() {
        let version = BudgetVersionId::new();
        let entry = JournalEntry::from_summary(SyncScope::Budget(version), &summary());
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["scope"]["budget"], serde_json::json!(version));

        let parsed: JournalEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.scope, SyncScope::Budget(version));

        let catalog = serde_json::to_value(JournalEntry::from_summary(
            SyncScope::Catalog,
            &summary(),
        ))
        .unwrap();
        assert_eq!(catalog["scope"], "catalog");
    }

    #[test]
    fn test_human_readable() {
        let entry = JournalEntry::from_summary(SyncScope::Catalog, &summary());
        let line = entry.format_human_readable();
        assert!(line.contains("catalog: pushed 3, pulled +2 ~1 -0 (knowledge 17)"));
    }
}
