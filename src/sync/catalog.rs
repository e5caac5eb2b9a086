//! Catalog sync: the list of budgets and their versions

use log::{debug, info};

use crate::error::NynabResult;
use crate::models::{BudgetId, BudgetVersion, CatalogBudget};
use crate::remote::{self, opname, Connection};
use crate::session::{CatalogTables, Query, Session};

use super::delta::{CatalogChanges, ChangeSet, SyncRequest, SyncResponse};
use super::SyncSummary;

/// The catalog scope of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Catalog;

impl Catalog {
    /// Push staged catalog changes and pull the server's
    pub fn sync<C: Connection + ?Sized>(
        &self,
        session: &mut Session,
        connection: &mut C,
    ) -> NynabResult<SyncSummary> {
        let tables = session.catalog_mut();
        let changes = CatalogChanges::collect(tables);
        let pushed = changes.len();
        let request = SyncRequest::new(&tables.knowledge, None, changes);
        debug!(
            "Catalog sync: pushing {} change(s) from knowledge {}",
            pushed, request.device_knowledge_of_server
        );

        let response: SyncResponse<CatalogChanges> =
            remote::call(connection, opname::SYNC_CATALOG_DATA, &request)?;

        tables.mark_pushed();
        let pulled = response.changed_entities.apply_to(tables);
        tables.knowledge.advance(
            response.server_knowledge_of_device,
            response.current_server_knowledge,
        );

        info!(
            "Catalog synced: {} pushed, {} pulled, server knowledge {}",
            pushed,
            pulled.changed(),
            response.current_server_knowledge
        );
        Ok(SyncSummary {
            pushed,
            pulled,
            server_knowledge: response.current_server_knowledge,
        })
    }

    pub fn view<'s>(&self, session: &'s Session) -> CatalogView<'s> {
        CatalogView {
            tables: session.catalog(),
        }
    }
}

/// Read access to the mirrored catalog
#[derive(Clone, Copy)]
pub struct CatalogView<'s> {
    tables: &'s CatalogTables,
}

impl<'s> CatalogView<'s> {
    pub fn ce_budgets(&self) -> Query<'s, CatalogBudget> {
        self.tables.budgets.query()
    }

    pub fn ce_budget_versions(&self) -> Query<'s, BudgetVersion> {
        self.tables.budget_versions.query()
    }

    /// The first mirrored budget with this name
    pub fn budget_named(&self, budget_name: &str) -> Option<&'s CatalogBudget> {
        self.tables
            .budgets
            .rows()
            .find(|budget| budget.budget_name == budget_name)
    }

    /// Versions belonging to a budget
    pub fn versions_of(&self, budget_id: BudgetId) -> Query<'s, BudgetVersion> {
        self.ce_budget_versions().filter_eq("budget_id", budget_id)
    }

    /// The first version of the budget named `budget_name`
    pub fn version_named(&self, budget_name: &str) -> Option<&'s BudgetVersion> {
        let budget_id = self.budget_named(budget_name)?.id?;
        self.versions_of(budget_id).first()
    }
}
