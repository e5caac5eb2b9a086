//! Budget sync: the entities of one budget version

use log::{debug, info};

use crate::error::NynabResult;
use crate::models::{
    Account, AccountId, BudgetVersionId, MasterCategory, Money, Payee, SubCategory,
    SubTransaction, Transaction,
};
use crate::remote::{self, opname, Connection};
use crate::session::{BudgetTables, Query, Session};

use super::delta::{BudgetChanges, ChangeSet, SyncRequest, SyncResponse};
use super::SyncSummary;

/// The budget scope a client is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub budget_version_id: BudgetVersionId,
}

impl Budget {
    pub fn new(budget_version_id: BudgetVersionId) -> Self {
        Self { budget_version_id }
    }

    /// Push staged budget changes and pull the server's
    ///
    /// Staged entities are checked for dangling references before anything
    /// is sent.
    pub fn sync<C: Connection + ?Sized>(
        &self,
        session: &mut Session,
        connection: &mut C,
    ) -> NynabResult<SyncSummary> {
        let tables = self.tables_mut(session);
        tables.check_references()?;

        let changes = BudgetChanges::collect(tables);
        let pushed = changes.len();
        let request = SyncRequest::new(&tables.knowledge, Some(self.budget_version_id), changes);
        debug!(
            "Budget {} sync: pushing {} change(s) from knowledge {}",
            self.budget_version_id, pushed, request.device_knowledge_of_server
        );

        let response: SyncResponse<BudgetChanges> =
            remote::call(connection, opname::SYNC_BUDGET_DATA, &request)?;

        tables.mark_pushed();
        let pulled = response.changed_entities.apply_to(tables);
        tables.knowledge.advance(
            response.server_knowledge_of_device,
            response.current_server_knowledge,
        );

        info!(
            "Budget {} synced: {} pushed, {} pulled, server knowledge {}",
            self.budget_version_id,
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

    pub fn tables_mut<'s>(&self, session: &'s mut Session) -> &'s mut BudgetTables {
        session.budget_mut(self.budget_version_id)
    }

    pub fn view<'s>(&self, session: &'s Session) -> BudgetView<'s> {
        BudgetView {
            budget_version_id: self.budget_version_id,
            tables: session.budget(self.budget_version_id),
        }
    }
}

/// Read access to one mirrored budget
#[derive(Clone, Copy)]
pub struct BudgetView<'s> {
    budget_version_id: BudgetVersionId,
    tables: &'s BudgetTables,
}

impl<'s> BudgetView<'s> {
    pub fn budget_version_id(&self) -> BudgetVersionId {
        self.budget_version_id
    }

    pub fn tables(&self) -> &'s BudgetTables {
        self.tables
    }

    pub fn be_accounts(&self) -> Query<'s, Account> {
        self.tables.accounts.query()
    }

    pub fn be_payees(&self) -> Query<'s, Payee> {
        self.tables.payees.query()
    }

    pub fn be_master_categories(&self) -> Query<'s, MasterCategory> {
        self.tables.master_categories.query()
    }

    pub fn be_subcategories(&self) -> Query<'s, SubCategory> {
        self.tables.subcategories.query()
    }

    pub fn be_transactions(&self) -> Query<'s, Transaction> {
        self.tables.transactions.query()
    }

    pub fn be_subtransactions(&self) -> Query<'s, SubTransaction> {
        self.tables.subtransactions.query()
    }

    /// The transfer payee of an account
    pub fn transfer_payee(&self, account_id: AccountId) -> Option<&'s Payee> {
        self.tables
            .payees
            .referencing("entities_account_id", *account_id.as_uuid())
            .into_iter()
            .next()
    }

    /// Transactions recorded against an account
    pub fn transactions_of(&self, account_id: AccountId) -> Vec<&'s Transaction> {
        self.tables
            .transactions
            .referencing("entities_account_id", *account_id.as_uuid())
    }

    /// Sum of the mirrored transactions of an account
    pub fn account_balance(&self, account_id: AccountId) -> Money {
        self.transactions_of(account_id)
            .into_iter()
            .map(|txn| txn.amount)
            .sum()
    }
}
