//! Wire shapes of the sync protocol
//!
//! A sync round sends the locally staged entities of one scope together with
//! the knowledge cursors, and receives every entity the server changed since
//! the client's cursor.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::{
    Account, BudgetVersion, BudgetVersionId, CatalogBudget, Entity, MasterCategory, Payee,
    SubCategory, SubTransaction, Transaction,
};
use crate::session::{Applied, BudgetTables, CatalogTables, Knowledge, Table};

/// A set of changed entities, grouped by collection
pub trait ChangeSet: Default + Serialize + DeserializeOwned {
    /// Number of entities carried
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Changed catalog entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogChanges {
    #[serde(default)]
    pub ce_budgets: Vec<CatalogBudget>,
    #[serde(default)]
    pub ce_budget_versions: Vec<BudgetVersion>,
}

impl ChangeSet for CatalogChanges {
    fn len(&self) -> usize {
        self.ce_budgets.len() + self.ce_budget_versions.len()
    }
}

impl CatalogChanges {
    /// Gather the staged changes of the catalog tables
    pub(crate) fn collect(tables: &CatalogTables) -> Self {
        Self {
            ce_budgets: tables.budgets.pending(),
            ce_budget_versions: tables.budget_versions.pending(),
        }
    }

    /// Merge pulled entities into the catalog tables
    pub(crate) fn apply_to(self, tables: &mut CatalogTables) -> PullStats {
        let mut stats = PullStats::default();
        apply_all(&mut tables.budgets, self.ce_budgets, &mut stats);
        apply_all(&mut tables.budget_versions, self.ce_budget_versions, &mut stats);
        stats
    }
}

/// Changed budget entities
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetChanges {
    #[serde(default)]
    pub be_accounts: Vec<Account>,
    #[serde(default)]
    pub be_payees: Vec<Payee>,
    #[serde(default)]
    pub be_master_categories: Vec<MasterCategory>,
    #[serde(default)]
    pub be_subcategories: Vec<SubCategory>,
    #[serde(default)]
    pub be_transactions: Vec<Transaction>,
    #[serde(default)]
    pub be_subtransactions: Vec<SubTransaction>,
}

impl ChangeSet for BudgetChanges {
    fn len(&self) -> usize {
        self.be_accounts.len()
            + self.be_payees.len()
            + self.be_master_categories.len()
            + self.be_subcategories.len()
            + self.be_transactions.len()
            + self.be_subtransactions.len()
    }
}

impl BudgetChanges {
    /// Gather the staged changes of one budget's tables
    pub(crate) fn collect(tables: &BudgetTables) -> Self {
        Self {
            be_accounts: tables.accounts.pending(),
            be_payees: tables.payees.pending(),
            be_master_categories: tables.master_categories.pending(),
            be_subcategories: tables.subcategories.pending(),
            be_transactions: tables.transactions.pending(),
            be_subtransactions: tables.subtransactions.pending(),
        }
    }

    /// Merge pulled entities, referenced collections first
    pub(crate) fn apply_to(self, tables: &mut BudgetTables) -> PullStats {
        let mut stats = PullStats::default();
        apply_all(&mut tables.accounts, self.be_accounts, &mut stats);
        apply_all(&mut tables.master_categories, self.be_master_categories, &mut stats);
        apply_all(&mut tables.subcategories, self.be_subcategories, &mut stats);
        apply_all(&mut tables.payees, self.be_payees, &mut stats);
        apply_all(&mut tables.transactions, self.be_transactions, &mut stats);
        apply_all(&mut tables.subtransactions, self.be_subtransactions, &mut stats);
        stats
    }
}

fn apply_all<T: Entity>(table: &mut Table<T>, entities: Vec<T>, stats: &mut PullStats) {
    for entity in entities {
        stats.record(table.apply_remote(entity));
    }
}

/// What a pull did to the mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullStats {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
    pub ignored: usize,
}

impl PullStats {
    fn record(&mut self, applied: Applied) {
        match applied {
            Applied::Inserted => self.inserted += 1,
            Applied::Updated => self.updated += 1,
            Applied::Removed => self.removed += 1,
            Applied::Ignored => self.ignored += 1,
        }
    }

    /// Entities that changed the mirror
    pub fn changed(&self) -> usize {
        self.inserted + self.updated + self.removed
    }
}

/// Request body of a sync round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest<C> {
    pub starting_device_knowledge: u64,
    pub ending_device_knowledge: u64,
    pub device_knowledge_of_server: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_version_id: Option<BudgetVersionId>,
    pub changed_entities: C,
}

impl<C: ChangeSet> SyncRequest<C> {
    pub fn new(
        knowledge: &Knowledge,
        budget_version_id: Option<BudgetVersionId>,
        changes: C,
    ) -> Self {
        let pushed = changes.len() as u64;
        Self {
            starting_device_knowledge: knowledge.device,
            ending_device_knowledge: knowledge.device + pushed,
            device_knowledge_of_server: knowledge.server,
            budget_version_id,
            changed_entities: changes,
        }
    }
}

/// Response body of a sync round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse<C> {
    #[serde(default)]
    pub changed_entities: C,
    pub server_knowledge_of_device: u64,
    pub current_server_knowledge: u64,
}
