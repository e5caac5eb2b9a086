//! An in-process budget server
//!
//! `MemoryServer` speaks the same three operations as the hosted service and
//! keeps every entity it has seen, tombstones included, stamped with the
//! server knowledge at which it last changed. It is what the test suite syncs
//! against, and it can impersonate a second device through
//! [`MemoryServer::push_budget_changes`].

use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{NynabError, NynabResult};
use crate::models::{
    BudgetId, BudgetVersion, BudgetVersionId, CatalogBudget, Entity, EntityId, EntityKind,
    MasterCategory, Payee, SubCategory, DEFERRED_INCOME, IMMEDIATE_INCOME,
    INTERNAL_MASTER_CATEGORY, RECONCILIATION_ADJUSTMENT_PAYEE, STARTING_BALANCE_PAYEE,
};
use crate::sync::{BudgetChanges, CatalogChanges, ChangeSet, SyncRequest, SyncResponse};

use super::opname::{CREATE_NEW_BUDGET, SYNC_BUDGET_DATA, SYNC_CATALOG_DATA};
use super::{Connection, CreateBudgetRequest};

#[derive(Debug, Clone)]
struct Versioned<T> {
    entity: T,
    knowledge: u64,
}

#[derive(Debug)]
struct Records<T: Entity> {
    rows: BTreeMap<T::Id, Versioned<T>>,
}

impl<T: Entity> Default for Records<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Records<T> {
    /// Store a server-originated entity, minting an id if needed
    fn stamp(&mut self, mut entity: T, clock: &mut u64) -> T::Id {
        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = T::Id::generate();
                entity.set_id(id);
                id
            }
        };
        *clock += 1;
        self.rows.insert(
            id,
            Versioned {
                entity,
                knowledge: *clock,
            },
        );
        id
    }

    /// Store pushed entities; callers have checked that all carry ids
    fn accept(&mut self, entities: Vec<T>, clock: &mut u64, pushed: &mut BTreeSet<Uuid>) {
        for entity in entities {
            pushed.insert(self.stamp(entity, clock).uuid());
        }
    }

    /// Entities changed after `cursor`, minus the ones in `skip`
    fn since(&self, cursor: u64, skip: &BTreeSet<Uuid>) -> Vec<T> {
        self.rows
            .iter()
            .filter(|(id, row)| row.knowledge > cursor && !skip.contains(&id.uuid()))
            .map(|(_, row)| row.entity.clone())
            .collect()
    }

    fn live(&self) -> impl Iterator<Item = &T> {
        self.rows
            .values()
            .map(|row| &row.entity)
            .filter(|entity| !entity.is_tombstone())
    }

    fn get(&self, id: T::Id) -> Option<&T> {
        self.rows
            .get(&id)
            .map(|row| &row.entity)
            .filter(|entity| !entity.is_tombstone())
    }
}

fn missing_id<T: Entity>(entities: &[T]) -> Option<EntityKind> {
    entities
        .iter()
        .any(|entity| entity.id().is_none())
        .then_some(T::KIND)
}

#[derive(Debug, Default)]
struct BudgetRecords {
    accounts: Records<crate::models::Account>,
    payees: Records<Payee>,
    master_categories: Records<MasterCategory>,
    subcategories: Records<SubCategory>,
    transactions: Records<crate::models::Transaction>,
    subtransactions: Records<crate::models::SubTransaction>,
}

impl BudgetRecords {
    /// Create the system entities every new budget starts with
    fn seed(&mut self, clock: &mut u64) {
        let internal = self.master_categories.stamp(
            MasterCategory::reserved("Internal Master Category", INTERNAL_MASTER_CATEGORY),
            clock,
        );
        self.subcategories.stamp(
            SubCategory::reserved("Immediate Income", IMMEDIATE_INCOME, internal),
            clock,
        );
        self.subcategories.stamp(
            SubCategory::reserved("Deferred Income", DEFERRED_INCOME, internal),
            clock,
        );

        let bills = self
            .master_categories
            .stamp(MasterCategory::new("Monthly Bills"), clock);
        self.subcategories
            .stamp(SubCategory::new("Rent/Mortgage", bills), clock);
        self.subcategories
            .stamp(SubCategory::new("Electricity", bills), clock);

        self.payees.stamp(
            Payee::reserved("Starting Balance", STARTING_BALANCE_PAYEE),
            clock,
        );
        self.payees.stamp(
            Payee::reserved(
                "Reconciliation Balance Adjustment",
                RECONCILIATION_ADJUSTMENT_PAYEE,
            ),
            clock,
        );
    }

    fn missing_id(changes: &BudgetChanges) -> Option<EntityKind> {
        missing_id(&changes.be_accounts)
            .or_else(|| missing_id(&changes.be_payees))
            .or_else(|| missing_id(&changes.be_master_categories))
            .or_else(|| missing_id(&changes.be_subcategories))
            .or_else(|| missing_id(&changes.be_transactions))
            .or_else(|| missing_id(&changes.be_subtransactions))
    }

    fn accept(&mut self, changes: BudgetChanges, clock: &mut u64, pushed: &mut BTreeSet<Uuid>) {
        self.accounts.accept(changes.be_accounts, clock, pushed);
        self.payees.accept(changes.be_payees, clock, pushed);
        self.master_categories
            .accept(changes.be_master_categories, clock, pushed);
        self.subcategories.accept(changes.be_subcategories, clock, pushed);
        self.transactions.accept(changes.be_transactions, clock, pushed);
        self.subtransactions
            .accept(changes.be_subtransactions, clock, pushed);
    }

    fn since(&self, cursor: u64, skip: &BTreeSet<Uuid>) -> BudgetChanges {
        BudgetChanges {
            be_accounts: self.accounts.since(cursor, skip),
            be_payees: self.payees.since(cursor, skip),
            be_master_categories: self.master_categories.since(cursor, skip),
            be_subcategories: self.subcategories.since(cursor, skip),
            be_transactions: self.transactions.since(cursor, skip),
            be_subtransactions: self.subtransactions.since(cursor, skip),
        }
    }

    fn snapshot(&self) -> BudgetChanges {
        BudgetChanges {
            be_accounts: self.accounts.live().cloned().collect(),
            be_payees: self.payees.live().cloned().collect(),
            be_master_categories: self.master_categories.live().cloned().collect(),
            be_subcategories: self.subcategories.live().cloned().collect(),
            be_transactions: self.transactions.live().cloned().collect(),
            be_subtransactions: self.subtransactions.live().cloned().collect(),
        }
    }
}

/// One request the server has served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub opname: String,
    /// Entities the request pushed
    pub pushed: usize,
}

impl RequestRecord {
    /// Whether the request changed server state
    pub fn is_mutating(&self) -> bool {
        self.pushed > 0 || self.opname == CREATE_NEW_BUDGET
    }
}

/// In-memory implementation of the budget server
#[derive(Debug, Default)]
pub struct MemoryServer {
    clock: u64,
    budgets: Records<CatalogBudget>,
    versions: Records<BudgetVersion>,
    data: BTreeMap<BudgetVersionId, BudgetRecords>,
    requests: Vec<RequestRecord>,
    fail_after: Option<usize>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A server that already hosts the named budgets
    pub fn with_budgets(names: &[&str]) -> Self {
        let mut server = Self::new();
        for name in names {
            server.create_budget(name);
        }
        server
    }

    /// Create a budget with default formats and return its version id
    pub fn create_budget(&mut self, budget_name: &str) -> BudgetVersionId {
        self.seed_budget(budget_name, None, None).1
    }

    fn seed_budget(
        &mut self,
        budget_name: &str,
        currency_format: Option<String>,
        date_format: Option<String>,
    ) -> (BudgetId, BudgetVersionId) {
        let budget_id = self
            .budgets
            .stamp(CatalogBudget::new(budget_name), &mut self.clock);

        let mut version = BudgetVersion::new(budget_id);
        version.currency_format = currency_format;
        version.date_format = date_format;
        let version_id = self.versions.stamp(version, &mut self.clock);

        self.data
            .entry(version_id)
            .or_default()
            .seed(&mut self.clock);
        debug!("Created budget {} ({})", budget_name, version_id);
        (budget_id, version_id)
    }

    /// Current server knowledge
    pub fn knowledge(&self) -> u64 {
        self.clock
    }

    /// Version id of the first live version of a live budget named `budget_name`
    pub fn version_of(&self, budget_name: &str) -> Option<BudgetVersionId> {
        let budget_id = self
            .budgets
            .live()
            .find(|budget| budget.budget_name == budget_name)
            .and_then(|budget| budget.id)?;
        self.versions
            .live()
            .find(|version| version.budget_id == budget_id)
            .and_then(|version| version.id)
    }

    /// Live catalog entities
    pub fn catalog_snapshot(&self) -> CatalogChanges {
        CatalogChanges {
            ce_budgets: self.budgets.live().cloned().collect(),
            ce_budget_versions: self.versions.live().cloned().collect(),
        }
    }

    /// Live entities of one budget version
    pub fn budget_snapshot(&self, version: BudgetVersionId) -> Option<BudgetChanges> {
        self.data.get(&version).map(BudgetRecords::snapshot)
    }

    /// Apply catalog changes as if another device had pushed them
    pub fn push_catalog_changes(&mut self, changes: CatalogChanges) -> NynabResult<()> {
        let request = SyncRequest {
            starting_device_knowledge: 0,
            ending_device_knowledge: changes.len() as u64,
            device_knowledge_of_server: self.clock,
            budget_version_id: None,
            changed_entities: changes,
        };
        self.sync_catalog(request).map(|_| ())
    }

    /// Apply budget changes as if another device had pushed them
    pub fn push_budget_changes(
        &mut self,
        version: BudgetVersionId,
        changes: BudgetChanges,
    ) -> NynabResult<()> {
        let request = SyncRequest {
            starting_device_knowledge: 0,
            ending_device_knowledge: changes.len() as u64,
            device_knowledge_of_server: self.clock,
            budget_version_id: Some(version),
            changed_entities: changes,
        };
        self.sync_budget(request).map(|_| ())
    }

    /// Requests served so far, oldest first
    pub fn requests(&self) -> &[RequestRecord] {
        &self.requests
    }

    pub fn request_count(&self, opname: &str) -> usize {
        self.requests.iter().filter(|r| r.opname == opname).count()
    }

    /// Requests that changed server state
    pub fn mutating_request_count(&self) -> usize {
        self.requests.iter().filter(|r| r.is_mutating()).count()
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    /// Serve `requests` more requests, then fail every one until `recover`
    pub fn fail_after(&mut self, requests: usize) {
        self.fail_after = Some(requests);
    }

    pub fn recover(&mut self) {
        self.fail_after = None;
    }

    fn sync_catalog(
        &mut self,
        request: SyncRequest<CatalogChanges>,
    ) -> NynabResult<SyncResponse<CatalogChanges>> {
        let changes = request.changed_entities;
        if let Some(kind) =
            missing_id(&changes.ce_budgets).or_else(|| missing_id(&changes.ce_budget_versions))
        {
            return Err(NynabError::remote(
                SYNC_CATALOG_DATA,
                format!("pushed {} without an id", kind),
            ));
        }

        let retired: Vec<BudgetId> = changes
            .ce_budgets
            .iter()
            .filter(|budget| budget.is_tombstone)
            .filter_map(|budget| budget.id)
            .collect();

        let mut pushed = BTreeSet::new();
        self.budgets
            .accept(changes.ce_budgets, &mut self.clock, &mut pushed);
        self.versions
            .accept(changes.ce_budget_versions, &mut self.clock, &mut pushed);
        for budget_id in retired {
            self.retire_versions(budget_id);
        }

        let cursor = request.device_knowledge_of_server;
        Ok(SyncResponse {
            changed_entities: CatalogChanges {
                ce_budgets: self.budgets.since(cursor, &pushed),
                ce_budget_versions: self.versions.since(cursor, &pushed),
            },
            server_knowledge_of_device: request.ending_device_knowledge,
            current_server_knowledge: self.clock,
        })
    }

    /// Tombstone the versions of a removed budget
    fn retire_versions(&mut self, budget_id: BudgetId) {
        let versions: Vec<BudgetVersion> = self
            .versions
            .live()
            .filter(|version| version.budget_id == budget_id)
            .cloned()
            .collect();
        for mut version in versions {
            version.is_tombstone = true;
            self.versions.stamp(version, &mut self.clock);
        }
    }

    fn sync_budget(
        &mut self,
        request: SyncRequest<BudgetChanges>,
    ) -> NynabResult<SyncResponse<BudgetChanges>> {
        let version = request
            .budget_version_id
            .ok_or_else(|| NynabError::remote(SYNC_BUDGET_DATA, "missing budget_version_id"))?;
        if self.versions.get(version).is_none() {
            return Err(NynabError::remote(
                SYNC_BUDGET_DATA,
                format!("unknown budget version {}", version),
            ));
        }

        let changes = request.changed_entities;
        if let Some(kind) = BudgetRecords::missing_id(&changes) {
            return Err(NynabError::remote(
                SYNC_BUDGET_DATA,
                format!("pushed {} without an id", kind),
            ));
        }

        let mut pushed = BTreeSet::new();
        let records = self.data.entry(version).or_default();
        records.accept(changes, &mut self.clock, &mut pushed);

        Ok(SyncResponse {
            changed_entities: records.since(request.device_knowledge_of_server, &pushed),
            server_knowledge_of_device: request.ending_device_knowledge,
            current_server_knowledge: self.clock,
        })
    }

    fn create_new_budget(&mut self, request: CreateBudgetRequest) -> Value {
        let (budget_id, version_id) = self.seed_budget(
            &request.budget_name,
            Some(request.currency_format),
            Some(request.date_format),
        );
        json!({
            "budget_id": budget_id,
            "budget_version_id": version_id,
        })
    }
}

fn decode<T: DeserializeOwned>(opname: &str, request: Value) -> NynabResult<T> {
    serde_json::from_value(request)
        .map_err(|e| NynabError::remote(opname, format!("malformed request: {}", e)))
}

impl Connection for MemoryServer {
    fn dorequest(&mut self, opname: &str, request: Value) -> NynabResult<Value> {
        if let Some(remaining) = self.fail_after {
            if remaining == 0 {
                return Err(NynabError::remote(opname, "service unavailable"));
            }
            self.fail_after = Some(remaining - 1);
        }

        let (response, pushed) = match opname {
            SYNC_CATALOG_DATA => {
                let request: SyncRequest<CatalogChanges> = decode(opname, request)?;
                let pushed = request.changed_entities.len();
                (serde_json::to_value(self.sync_catalog(request)?)?, pushed)
            }
            SYNC_BUDGET_DATA => {
                let request: SyncRequest<BudgetChanges> = decode(opname, request)?;
                let pushed = request.changed_entities.len();
                (serde_json::to_value(self.sync_budget(request)?)?, pushed)
            }
            CREATE_NEW_BUDGET => {
                let request: CreateBudgetRequest = decode(opname, request)?;
                (self.create_new_budget(request), 0)
            }
            other => {
                return Err(NynabError::remote(other, "unknown operation"));
            }
        };

        debug!("Served {} ({} pushed)", opname, pushed);
        self.requests.push(RequestRecord {
            opname: opname.to_string(),
            pushed,
        });
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, AccountType};
    use crate::remote::call;
    use crate::session::Knowledge;

    fn catalog_round(server: &mut MemoryServer, cursor: u64) -> SyncResponse<CatalogChanges> {
        let request = SyncRequest::new(
            &Knowledge {
                device: 0,
                server: cursor,
            },
            None,
            CatalogChanges::default(),
        );
        call(server, SYNC_CATALOG_DATA, &request).unwrap()
    }

    #[test]
    fn test_new_budget_is_seeded() {
        let mut server = MemoryServer::new();
        let version = server.create_budget("Household");

        assert_eq!(server.version_of("Household"), Some(version));
        let snapshot = server.budget_snapshot(version).unwrap();
        assert!(snapshot
            .be_payees
            .iter()
            .any(|p| p.internal_name.as_deref() == Some(STARTING_BALANCE_PAYEE)));
        assert!(snapshot
            .be_subcategories
            .iter()
            .any(|c| c.internal_name.as_deref() == Some(IMMEDIATE_INCOME)));
        assert!(snapshot
            .be_master_categories
            .iter()
            .any(|m| !m.deletable));
    }

    #[test]
    fn test_catalog_pull_is_incremental() {
        let mut server = MemoryServer::with_budgets(&["A"]);
        let first = catalog_round(&mut server, 0);
        assert_eq!(first.changed_entities.ce_budgets.len(), 1);
        assert_eq!(first.changed_entities.ce_budget_versions.len(), 1);

        let second = catalog_round(&mut server, first.current_server_knowledge);
        assert!(second.changed_entities.is_empty());
        assert_eq!(second.current_server_knowledge, first.current_server_knowledge);
    }

    #[test]
    fn test_pushed_entities_are_not_echoed() {
        let mut server = MemoryServer::with_budgets(&["A"]);
        let version = server.version_of("A").unwrap();
        let cursor = server.knowledge();

        let mut account = Account::new("Checking", AccountType::Checking);
        account.set_id(crate::models::AccountId::new());
        let request = SyncRequest::new(
            &Knowledge {
                device: 0,
                server: cursor,
            },
            Some(version),
            BudgetChanges {
                be_accounts: vec![account],
                ..Default::default()
            },
        );
        let response: SyncResponse<BudgetChanges> =
            call(&mut server, SYNC_BUDGET_DATA, &request).unwrap();

        assert!(response.changed_entities.is_empty());
        assert_eq!(response.server_knowledge_of_device, 1);
        assert_eq!(response.current_server_knowledge, cursor + 1);
        assert_eq!(server.budget_snapshot(version).unwrap().be_accounts.len(), 1);
        assert_eq!(server.mutating_request_count(), 1);
    }

    #[test]
    fn test_push_without_id_is_rejected() {
        let mut server = MemoryServer::with_budgets(&["A"]);
        let version = server.version_of("A").unwrap();
        let err = server
            .push_budget_changes(
                version,
                BudgetChanges {
                    be_accounts: vec![Account::new("Checking", AccountType::Checking)],
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_remote());
        assert!(server.budget_snapshot(version).unwrap().be_accounts.is_empty());
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let mut server = MemoryServer::new();
        let err = server
            .push_budget_changes(BudgetVersionId::new(), BudgetChanges::default())
            .unwrap_err();
        assert!(err.is_remote());
    }

    #[test]
    fn test_removing_budget_retires_versions() {
        let mut server = MemoryServer::with_budgets(&["A", "B"]);
        let cursor = server.knowledge();
        let mut budget = server
            .catalog_snapshot()
            .ce_budgets
            .into_iter()
            .find(|b| b.budget_name == "A")
            .unwrap();
        budget.is_tombstone = true;

        server
            .push_catalog_changes(CatalogChanges {
                ce_budgets: vec![budget],
                ..Default::default()
            })
            .unwrap();

        assert!(server.version_of("A").is_none());
        assert!(server.version_of("B").is_some());
        let delta = catalog_round(&mut server, cursor);
        assert_eq!(delta.changed_entities.ce_budgets.len(), 1);
        assert!(delta.changed_entities.ce_budget_versions[0].is_tombstone);
    }

    #[test]
    fn test_create_new_budget_operation() {
        let mut server = MemoryServer::new();
        let request = CreateBudgetRequest::new("Travel").unwrap();
        let response: Value = call(&mut server, CREATE_NEW_BUDGET, &request).unwrap();

        let version = server.version_of("Travel").unwrap();
        assert_eq!(response["budget_version_id"], json!(version));
        let catalog = server.catalog_snapshot();
        assert_eq!(
            catalog.ce_budget_versions[0].currency_format.as_deref(),
            Some(request.currency_format.as_str())
        );
        assert_eq!(server.mutating_request_count(), 1);
    }

    #[test]
    fn test_fail_after() {
        let mut server = MemoryServer::with_budgets(&["A"]);
        server.fail_after(1);
        assert!(server.dorequest(SYNC_CATALOG_DATA, json!({
            "starting_device_knowledge": 0,
            "ending_device_knowledge": 0,
            "device_knowledge_of_server": 0,
            "changed_entities": {}
        })).is_ok());
        assert!(server
            .dorequest(SYNC_CATALOG_DATA, json!({}))
            .unwrap_err()
            .is_remote());
        assert_eq!(server.requests().len(), 1);

        server.recover();
        assert!(server.dorequest("deleteEverything", json!({})).is_err());
    }
}
