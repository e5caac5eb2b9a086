//! Mutations of the attached budget
//!
//! Each public method here is one operation: it stages its changes in the
//! mirror and then runs a full sync.

use chrono::NaiveDate;
use log::{debug, info};

use crate::error::{NynabError, NynabResult};
use crate::models::{
    Account, AccountId, Entity, MasterCategory, Money, Payee, Transaction, TransactionId,
    IMMEDIATE_INCOME, STARTING_BALANCE_PAYEE,
};
use crate::remote::Connection;
use crate::session::{BudgetTables, Table};

use super::Client;

/// Transactions pushed per sync round by `add_transactions`
pub const TRANSACTION_BATCH_SIZE: usize = 50;

impl<C: Connection> Client<C> {
    /// Add an account with its transfer payee and starting balance
    ///
    /// Fails with `ReservedEntityMissing`, staging nothing, if the budget
    /// lacks the immediate-income category or the starting-balance payee.
    pub fn add_account(
        &mut self,
        account: Account,
        balance: Money,
        balance_date: NaiveDate,
    ) -> NynabResult<AccountId> {
        self.operation(|session, budget| {
            let tables = budget.tables_mut(session);

            // Resolve reserved entities before staging anything
            let income = reserved_id(&tables.subcategories, IMMEDIATE_INCOME)?;
            let starting_balance = reserved_id(&tables.payees, STARTING_BALANCE_PAYEE)?;

            let account_name = account.account_name.clone();
            let account_id = tables.accounts.add(account)?;
            tables
                .payees
                .add(Payee::transfer(account_id, &account_name))?;
            tables.transactions.add(Transaction::starting_balance(
                account_id,
                balance_date,
                balance,
                starting_balance,
                income,
            ))?;

            info!("Added account {} ({})", account_name, account_id);
            Ok(account_id)
        })
    }

    /// Push a modified account
    pub fn update_account(&mut self, account: Account) -> NynabResult<()> {
        self.operation(|session, budget| budget.tables_mut(session).accounts.update(account))
    }

    pub fn delete_account(&mut self, account_id: AccountId) -> NynabResult<()> {
        self.operation(|session, budget| {
            budget
                .tables_mut(session)
                .accounts
                .remove(account_id)
                .map(|_| ())
        })
    }

    pub fn add_transaction(&mut self, transaction: Transaction) -> NynabResult<TransactionId> {
        self.operation(|session, budget| budget.tables_mut(session).transactions.add(transaction))
    }

    /// Add transactions in batches of `TRANSACTION_BATCH_SIZE`, one sync each
    ///
    /// Batches go out in order. If one fails, the batches before it stay
    /// pushed and the rest are not attempted.
    pub fn add_transactions(
        &mut self,
        transactions: Vec<Transaction>,
    ) -> NynabResult<Vec<TransactionId>> {
        let mut ids = Vec::with_capacity(transactions.len());
        for (index, batch) in transactions.chunks(TRANSACTION_BATCH_SIZE).enumerate() {
            debug!("Adding transaction batch {} ({} rows)", index + 1, batch.len());
            ids.extend(self.add_transaction_batch(batch.to_vec())?);
        }
        Ok(ids)
    }

    fn add_transaction_batch(
        &mut self,
        batch: Vec<Transaction>,
    ) -> NynabResult<Vec<TransactionId>> {
        for transaction in &batch {
            transaction
                .validate()
                .map_err(|e| NynabError::Validation(e.to_string()))?;
        }

        self.operation(|session, budget| {
            let table = &mut budget.tables_mut(session).transactions;
            batch.into_iter().map(|txn| table.add(txn)).collect()
        })
    }

    /// Remove a transaction and its split lines
    pub fn delete_transaction(&mut self, transaction_id: TransactionId) -> NynabResult<()> {
        self.operation(|session, budget| {
            let tables = budget.tables_mut(session);
            tables.transactions.remove(transaction_id)?;
            tables
                .subtransactions
                .remove_where(|sub| sub.entities_transaction_id == transaction_id);
            Ok(())
        })
    }

    /// Remove every catalog budget with this name
    ///
    /// Returns how many were removed. Removing the attached budget makes the
    /// closing sync fail with `BudgetNotFound` once the removal is pushed.
    pub fn delete_budget(&mut self, budget_name: &str) -> NynabResult<usize> {
        self.operation(|session, _| {
            let removed = session
                .catalog_mut()
                .budgets
                .remove_where(|budget| budget.budget_name == budget_name);
            info!("Deleting {} budget(s) named {}", removed.len(), budget_name);
            Ok(removed.len())
        })
    }

    /// Remove every transaction and split line of the budget
    pub fn clean_transactions(&mut self) -> NynabResult<()> {
        self.operation(|session, budget| {
            let removed = purge_transactions(budget.tables_mut(session));
            debug!("Staged removal of {} transaction row(s)", removed);
            Ok(())
        })
    }

    /// Strip the budget down to its reserved entities
    ///
    /// Reserved categories and payees survive, as do master categories the
    /// server does not allow deleting.
    pub fn clean_budget(&mut self) -> NynabResult<()> {
        info!("Cleaning budget {}", self.budget_name);
        self.clean_transactions()?;

        // Transactions may have arrived for the removed categories
        self.operation(|session, budget| {
            let tables = budget.tables_mut(session);
            let subcategories = tables
                .subcategories
                .remove_where(|category| !category.is_reserved());
            let master_categories = tables
                .master_categories
                .remove_where(MasterCategory::is_removable);
            let transactions = purge_transactions(tables);
            debug!(
                "Staged {} subcategory, {} master category and {} transaction removals",
                subcategories.len(),
                master_categories.len(),
                transactions
            );
            Ok(())
        })?;

        self.operation(|session, budget| {
            let tables = budget.tables_mut(session);
            let payees = tables.payees.remove_where(|payee| !payee.is_reserved());
            let accounts = tables.accounts.remove_where(|_| true);
            debug!(
                "Staged removal of {} payees and {} accounts",
                payees.len(),
                accounts.len()
            );
            Ok(())
        })
    }
}

fn reserved_id<T: Entity>(table: &Table<T>, internal_name: &str) -> NynabResult<T::Id> {
    table
        .by_internal_name(internal_name)
        .and_then(|entity| entity.id())
        .ok_or_else(|| NynabError::ReservedEntityMissing {
            entity_type: T::KIND.name(),
            internal_name: internal_name.to_string(),
        })
}

fn purge_transactions(tables: &mut BudgetTables) -> usize {
    tables.subtransactions.remove_where(|_| true).len()
        + tables.transactions.remove_where(|_| true).len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, ClearedStatus};
    use crate::remote::MemoryServer;

    fn client() -> Client<MemoryServer> {
        Client::new(MemoryServer::with_budgets(&["Household"]), Some("Household")).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn test_add_account_stages_payee_and_starting_balance() {
        let mut client = client();
        let account_id = client
            .add_account(
                Account::new("Checking", AccountType::Checking),
                Money::from_decimal(250.0),
                date(),
            )
            .unwrap();

        let budget = client.budget();
        let payee = budget.transfer_payee(account_id).unwrap();
        assert_eq!(payee.name, "Transfer : Checking");

        let txns = budget.transactions_of(account_id);
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].cleared, ClearedStatus::Cleared);
        assert!(txns[0].accepted);
        assert_eq!(txns[0].amount, Money::from_decimal(250.0));
        assert!(!client.session().budget(client.budget_version_id()).has_pending());
    }

    #[test]
    fn test_add_account_without_reserved_payee() {
        let mut client = client();
        let version = client.budget_version_id();
        let mut payee = client
            .budget()
            .be_payees()
            .filter_eq("internal_name", STARTING_BALANCE_PAYEE)
            .first()
            .cloned()
            .unwrap();
        payee.is_tombstone = true;
        client
            .connection_mut()
            .push_budget_changes(
                version,
                crate::sync::BudgetChanges {
                    be_payees: vec![payee],
                    ..Default::default()
                },
            )
            .unwrap();
        client.sync().unwrap();
        client.connection_mut().clear_requests();

        let err = client
            .add_account(Account::new("Checking", AccountType::Checking), Money::zero(), date())
            .unwrap_err();
        assert!(matches!(err, NynabError::ReservedEntityMissing { .. }));
        assert!(client.budget().be_accounts().is_empty());
        assert!(client.connection().requests().is_empty());
    }

    #[test]
    fn test_delete_transaction_removes_split_lines() {
        let mut client = client();
        let account = client
            .add_account(Account::new("Cash", AccountType::Cash), Money::zero(), date())
            .unwrap();
        let txn = client
            .add_transaction(Transaction::new(account, date(), Money::from_decimal(-20.0)))
            .unwrap();
        client
            .operation(|session, budget| {
                budget
                    .tables_mut(session)
                    .subtransactions
                    .add(crate::models::SubTransaction::new(txn, Money::from_decimal(-20.0)))
            })
            .unwrap();

        client.delete_transaction(txn).unwrap();
        assert!(client.budget().be_subtransactions().is_empty());
        let snapshot = client
            .connection()
            .budget_snapshot(client.budget_version_id())
            .unwrap();
        assert!(snapshot.be_subtransactions.is_empty());
        assert_eq!(snapshot.be_transactions.len(), 1);
    }

    #[test]
    fn test_invalid_batch_sends_nothing() {
        let mut client = client();
        client.connection_mut().clear_requests();
        let bad =
            Transaction::new(AccountId::new(), date(), Money::zero()).with_memo("x".repeat(600));

        let err = client.add_transactions(vec![bad]).unwrap_err();
        assert!(err.is_validation());
        assert!(client.connection().requests().is_empty());
    }

    #[test]
    fn test_failed_batch_stages_nothing() {
        let mut client = client();
        let account = client
            .add_account(Account::new("Cash", AccountType::Cash), Money::zero(), date())
            .unwrap();
        let existing = client.budget().transactions_of(account)[0].clone();
        let fresh = Transaction::new(account, date(), Money::from_decimal(-8.0));
        client.connection_mut().clear_requests();

        let err = client.add_transactions(vec![fresh, existing]).unwrap_err();
        assert!(matches!(err, NynabError::Duplicate { .. }));
        assert!(!client.budget().tables().has_pending());
        assert_eq!(client.budget().be_transactions().count(), 1);
        assert!(client.connection().requests().is_empty());

        client.sync().unwrap();
        let snapshot = client
            .connection()
            .budget_snapshot(client.budget_version_id())
            .unwrap();
        assert_eq!(snapshot.be_transactions.len(), 1);
    }

    #[test]
    fn test_failed_operation_keeps_earlier_staging() {
        let mut client = client();
        let version = client.budget_version_id();
        let shop = client
            .session
            .budget_mut(version)
            .payees
            .add(Payee::new("Corner Shop"))
            .unwrap();

        assert!(client.delete_account(AccountId::new()).is_err());
        assert_eq!(client.budget().tables().payees.pending_count(), 1);

        client.sync().unwrap();
        let snapshot = client.connection().budget_snapshot(version).unwrap();
        assert!(snapshot.be_payees.iter().any(|p| p.id == Some(shop)));
    }

    #[test]
    fn test_delete_missing_account_is_not_found() {
        let mut client = client();
        assert!(client.delete_account(AccountId::new()).unwrap_err().is_not_found());
    }
}
