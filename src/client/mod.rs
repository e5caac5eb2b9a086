//! The client: one session attached to one budget
//!
//! A `Client` owns its connection and its local mirror. Construction syncs
//! the catalog, attaches to the first version of the named budget and runs a
//! full sync. Every mutation afterwards goes through [`Client::operation`],
//! which stages the change locally and then syncs.

mod operations;

pub use operations::TRANSACTION_BATCH_SIZE;

use log::{error, info, warn};

use crate::config::{NynabPaths, Settings};
use crate::error::{NynabError, NynabResult};
use crate::journal::{JournalEntry, SyncJournal, SyncScope};
use crate::models::BudgetVersionId;
use crate::remote::{self, opname, Connection, CreateBudgetRequest};
use crate::session::Session;
use crate::storage::MirrorStore;
use crate::sync::{Budget, BudgetView, Catalog, CatalogView, SyncSummary};

/// A client attached to one budget version
pub struct Client<C: Connection> {
    connection: C,
    session: Session,
    catalog: Catalog,
    budget: Budget,
    budget_name: String,
    journal: Option<SyncJournal>,
    store: Option<MirrorStore>,
}

impl<C: Connection> Client<C> {
    /// Connect to the budget named `budget_name` with an empty mirror
    pub fn new(connection: C, budget_name: Option<&str>) -> NynabResult<Self> {
        Self::with_session(connection, budget_name, Session::new())
    }

    /// Connect using a previously saved mirror
    pub fn with_session(
        connection: C,
        budget_name: Option<&str>,
        session: Session,
    ) -> NynabResult<Self> {
        Self::open(connection, budget_name, session, None, None)
    }

    /// Connect as configured: budget from settings, snapshot and journal on disk
    pub fn from_settings(
        connection: C,
        settings: &Settings,
        paths: &NynabPaths,
    ) -> NynabResult<Self> {
        if settings.persist_mirror || settings.journal_enabled {
            paths.ensure_directories()?;
        }

        let store = settings.persist_mirror.then(|| MirrorStore::from_paths(paths));
        let session = match &store {
            Some(store) => store.load()?,
            None => Session::new(),
        };
        let journal = settings
            .journal_enabled
            .then(|| SyncJournal::new(paths.journal_file()));

        Self::open(
            connection,
            settings.budget_name.as_deref(),
            session,
            journal,
            store,
        )
    }

    fn open(
        mut connection: C,
        budget_name: Option<&str>,
        mut session: Session,
        journal: Option<SyncJournal>,
        store: Option<MirrorStore>,
    ) -> NynabResult<Self> {
        let budget_name = match budget_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                error!("No budget name was provided");
                return Err(NynabError::Config("No budget name was provided".into()));
            }
        };

        let catalog = Catalog;
        let summary = catalog.sync(&mut session, &mut connection)?;

        let found = catalog
            .view(&session)
            .version_named(&budget_name)
            .and_then(|version| version.id);
        let Some(version_id) = found else {
            error!("Budget {} not found in the catalog", budget_name);
            return Err(NynabError::BudgetNotFound(budget_name));
        };

        let mut client = Self {
            connection,
            session,
            catalog,
            budget: Budget::new(version_id),
            budget_name,
            journal,
            store,
        };
        client.journal_round(SyncScope::Catalog, &summary);
        client.sync()?;
        Ok(client)
    }

    /// Run a full sync: catalog first, then the attached budget
    ///
    /// A `Storage` error means the server accepted the round but the mirror
    /// snapshot could not be written. The in-memory mirror is up to date.
    pub fn sync(&mut self) -> NynabResult<()> {
        info!("Syncing with the server");
        self.sync_catalog()?;

        let version_id = self.budget.budget_version_id;
        if !self.session.catalog().budget_versions.contains(version_id) {
            error!("Budget {} is no longer in the catalog", self.budget_name);
            return Err(NynabError::BudgetNotFound(self.budget_name.clone()));
        }

        let summary = self.budget.sync(&mut self.session, &mut self.connection)?;
        self.journal_round(SyncScope::Budget(version_id), &summary);

        if let Some(store) = &self.store {
            store.save(&self.session)?;
        }
        Ok(())
    }

    fn sync_catalog(&mut self) -> NynabResult<()> {
        let summary = self.catalog.sync(&mut self.session, &mut self.connection)?;
        self.journal_round(SyncScope::Catalog, &summary);
        Ok(())
    }

    /// Record a round that pushed or pulled something
    ///
    /// The round has already been accepted by the server, so a failed write
    /// is only logged.
    fn journal_round(&self, scope: SyncScope, summary: &SyncSummary) {
        let Some(journal) = &self.journal else {
            return;
        };
        if summary.is_noop() {
            return;
        }
        if let Err(e) = journal.log(&JournalEntry::from_summary(scope, summary)) {
            warn!("Could not record {} sync round: {}", scope, e);
        }
    }

    /// Apply a local mutation, then sync
    ///
    /// If the mutation fails, whatever it staged is rolled back and nothing
    /// is sent. Changes staged before the call are left alone.
    pub(crate) fn operation<R, F>(&mut self, mutate: F) -> NynabResult<R>
    where
        F: FnOnce(&mut Session, &Budget) -> NynabResult<R>,
    {
        let version_id = self.budget.budget_version_id;
        let catalog = self.session.catalog().clone();
        let tables = self.session.budget(version_id).clone();

        let result = match mutate(&mut self.session, &self.budget) {
            Ok(result) => result,
            Err(e) => {
                warn!("Operation failed, discarding its staged changes: {}", e);
                *self.session.catalog_mut() = catalog;
                *self.session.budget_mut(version_id) = tables;
                return Err(e);
            }
        };
        self.sync()?;
        Ok(result)
    }

    /// Attach to another budget by name
    ///
    /// Returns `false` and leaves the client untouched when no version of a
    /// budget with that name is in the catalog.
    pub fn select_budget(&mut self, budget_name: &str) -> NynabResult<bool> {
        self.sync_catalog()?;

        let catalog = self.catalog.view(&self.session);
        let found = catalog
            .ce_budget_versions()
            .iter()
            .find(|version| {
                catalog
                    .ce_budgets()
                    .get(version.budget_id)
                    .is_some_and(|budget| budget.budget_name == budget_name)
            })
            .and_then(|version| version.id);

        let Some(version_id) = found else {
            warn!("No budget named {} to select", budget_name);
            return Ok(false);
        };

        info!("Selecting budget {} ({})", budget_name, version_id);
        self.budget = Budget::new(version_id);
        self.budget_name = budget_name.to_string();
        // Pull the whole budget on the next round
        self.session.budget_mut(version_id).knowledge.server = 0;
        self.sync()?;
        Ok(true)
    }

    /// Ask the server to create a budget with the default formats
    ///
    /// The local mirror is not touched; the new budget shows up in the
    /// catalog on the next sync.
    pub fn create_budget(&mut self, budget_name: &str) -> NynabResult<()> {
        let request = CreateBudgetRequest::new(budget_name)?;
        let _: serde_json::Value =
            remote::call(&mut self.connection, opname::CREATE_NEW_BUDGET, &request)?;
        info!("Created budget {}", budget_name);
        Ok(())
    }

    pub fn budget(&self) -> BudgetView<'_> {
        self.budget.view(&self.session)
    }

    pub fn catalog(&self) -> CatalogView<'_> {
        self.catalog.view(&self.session)
    }

    pub fn budget_version_id(&self) -> BudgetVersionId {
        self.budget.budget_version_id
    }

    pub fn budget_name(&self) -> &str {
        &self.budget_name
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn journal(&self) -> Option<&SyncJournal> {
        self.journal.as_ref()
    }

    /// Give up the client and keep its mirror
    pub fn into_session(self) -> Session {
        self.session
    }
}
