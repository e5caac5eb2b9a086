//! The local mirror of server data
//!
//! A `Session` holds one set of catalog tables plus one set of budget tables
//! per budget version the client has synced. Each scope carries its own
//! knowledge cursor.

pub mod query;
pub mod table;

pub use query::Query;
pub use table::{Applied, Change, Table};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NynabError, NynabResult};
use crate::models::{
    Account, BudgetVersion, BudgetVersionId, CatalogBudget, Entity, EntityKind, MasterCategory,
    Payee, SubCategory, SubTransaction, Transaction,
};

/// Sync cursor of one scope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knowledge {
    /// Count of local changes this device has pushed
    pub device: u64,
    /// Server knowledge as of the last successful pull
    pub server: u64,
}

impl Knowledge {
    pub const fn new() -> Self {
        Self {
            device: 0,
            server: 0,
        }
    }

    /// Record the cursors returned by a completed round
    pub fn advance(&mut self, device: u64, server: u64) {
        self.device = self.device.max(device);
        self.server = server;
    }
}

/// Catalog-scope tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogTables {
    #[serde(default)]
    pub budgets: Table<CatalogBudget>,
    #[serde(default)]
    pub budget_versions: Table<BudgetVersion>,
    #[serde(default)]
    pub knowledge: Knowledge,
}

impl CatalogTables {
    pub const fn new() -> Self {
        Self {
            budgets: Table::new(),
            budget_versions: Table::new(),
            knowledge: Knowledge::new(),
        }
    }

    pub fn pending_count(&self) -> usize {
        self.budgets.pending_count() + self.budget_versions.pending_count()
    }

    pub(crate) fn mark_pushed(&mut self) {
        self.budgets.mark_pushed();
        self.budget_versions.mark_pushed();
    }

    fn reindex(&mut self) {
        self.budgets.reindex();
        self.budget_versions.reindex();
    }
}

/// Budget-scope tables of one budget version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetTables {
    #[serde(default)]
    pub accounts: Table<Account>,
    #[serde(default)]
    pub payees: Table<Payee>,
    #[serde(default)]
    pub master_categories: Table<MasterCategory>,
    #[serde(default)]
    pub subcategories: Table<SubCategory>,
    #[serde(default)]
    pub transactions: Table<Transaction>,
    #[serde(default)]
    pub subtransactions: Table<SubTransaction>,
    #[serde(default)]
    pub knowledge: Knowledge,
}

static EMPTY_BUDGET: BudgetTables = BudgetTables::new();

impl BudgetTables {
    pub const fn new() -> Self {
        Self {
            accounts: Table::new(),
            payees: Table::new(),
            master_categories: Table::new(),
            subcategories: Table::new(),
            transactions: Table::new(),
            subtransactions: Table::new(),
            knowledge: Knowledge::new(),
        }
    }

    /// Whether a live entity of `kind` with this id is mirrored
    pub fn contains(&self, kind: EntityKind, target: Uuid) -> bool {
        match kind {
            EntityKind::Account => self.accounts.contains_uuid(target),
            EntityKind::Payee => self.payees.contains_uuid(target),
            EntityKind::MasterCategory => self.master_categories.contains_uuid(target),
            EntityKind::SubCategory => self.subcategories.contains_uuid(target),
            EntityKind::Transaction => self.transactions.contains_uuid(target),
            EntityKind::SubTransaction => self.subtransactions.contains_uuid(target),
            EntityKind::CatalogBudget | EntityKind::BudgetVersion => false,
        }
    }

    /// Fail if any staged entity points at something not in this budget
    pub fn check_references(&self) -> NynabResult<()> {
        check_staged(&self.payees, self)?;
        check_staged(&self.subcategories, self)?;
        check_staged(&self.transactions, self)?;
        check_staged(&self.subtransactions, self)?;
        Ok(())
    }

    pub fn pending_count(&self) -> usize {
        self.accounts.pending_count()
            + self.payees.pending_count()
            + self.master_categories.pending_count()
            + self.subcategories.pending_count()
            + self.transactions.pending_count()
            + self.subtransactions.pending_count()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    pub(crate) fn mark_pushed(&mut self) {
        self.accounts.mark_pushed();
        self.payees.mark_pushed();
        self.master_categories.mark_pushed();
        self.subcategories.mark_pushed();
        self.transactions.mark_pushed();
        self.subtransactions.mark_pushed();
    }

    fn reindex(&mut self) {
        self.accounts.reindex();
        self.payees.reindex();
        self.master_categories.reindex();
        self.subcategories.reindex();
        self.transactions.reindex();
        self.subtransactions.reindex();
    }
}

fn check_staged<T: Entity>(table: &Table<T>, tables: &BudgetTables) -> NynabResult<()> {
    for entity in table.staged() {
        for reference in entity.references() {
            if !tables.contains(reference.kind, reference.target) {
                return Err(NynabError::DanglingReference {
                    entity_type: T::KIND.name(),
                    field: reference.field,
                    target: reference.target.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// The whole local mirror
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    catalog: CatalogTables,
    #[serde(default)]
    budgets: BTreeMap<BudgetVersionId, BudgetTables>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &CatalogTables {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CatalogTables {
        &mut self.catalog
    }

    /// Tables of a budget version; empty if it was never synced
    pub fn budget(&self, version: BudgetVersionId) -> &BudgetTables {
        self.budgets.get(&version).unwrap_or(&EMPTY_BUDGET)
    }

    pub fn budget_mut(&mut self, version: BudgetVersionId) -> &mut BudgetTables {
        self.budgets.entry(version).or_default()
    }

    pub fn has_budget(&self, version: BudgetVersionId) -> bool {
        self.budgets.contains_key(&version)
    }

    /// Budget versions with mirrored tables
    pub fn budget_versions(&self) -> impl Iterator<Item = BudgetVersionId> + '_ {
        self.budgets.keys().copied()
    }

    /// Drop the mirrored tables of a budget version
    pub fn forget_budget(&mut self, version: BudgetVersionId) -> Option<BudgetTables> {
        self.budgets.remove(&version)
    }

    /// Total staged changes across all scopes
    pub fn pending_count(&self) -> usize {
        self.catalog.pending_count()
            + self
                .budgets
                .values()
                .map(BudgetTables::pending_count)
                .sum::<usize>()
    }

    /// Rebuild secondary indexes after loading from disk
    pub(crate) fn reindex(&mut self) {
        self.catalog.reindex();
        for tables in self.budgets.values_mut() {
            tables.reindex();
        }
    }
}
