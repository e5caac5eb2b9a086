//! Transaction model
//!
//! Represents financial transactions and their split lines
//! (`SubTransaction`), as the budget server stores them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{impl_entity, EntityKind, Reference, ValidationError};
use super::ids::{AccountId, PayeeId, SubCategoryId, SubTransactionId, TransactionId};
use super::money::Money;

/// Cleared state of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ClearedStatus {
    /// Transaction has not yet cleared the bank
    #[default]
    Uncleared,
    /// Transaction has cleared the bank
    Cleared,
    /// Transaction has been reconciled and is locked
    Reconciled,
}

impl ClearedStatus {
    /// Check if this transaction is locked (cannot be edited without unlocking)
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Reconciled)
    }
}

impl fmt::Display for ClearedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uncleared => write!(f, "Uncleared"),
            Self::Cleared => write!(f, "Cleared"),
            Self::Reconciled => write!(f, "Reconciled"),
        }
    }
}

/// A financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier (None until staged)
    pub id: Option<TransactionId>,

    /// Amount (positive for inflow, negative for outflow)
    pub amount: Money,

    pub date: NaiveDate,

    /// The account this transaction belongs to
    pub entities_account_id: AccountId,

    #[serde(default)]
    pub entities_payee_id: Option<PayeeId>,

    /// Category (None for split transactions and transfers)
    #[serde(default)]
    pub entities_subcategory_id: Option<SubCategoryId>,

    #[serde(default)]
    pub cleared: ClearedStatus,

    #[serde(default = "default_accepted")]
    pub accepted: bool,

    #[serde(default)]
    pub memo: Option<String>,

    /// Payee name as the bank reported it
    #[serde(default)]
    pub imported_payee: Option<String>,

    #[serde(default)]
    pub imported_date: Option<NaiveDate>,

    /// Where the transaction came from (e.g. "Imported")
    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub check_number: Option<String>,

    /// Soft-delete marker
    #[serde(default)]
    pub is_tombstone: bool,
}

fn default_accepted() -> bool {
    true
}

impl Transaction {
    /// Create a new, unsynced transaction
    pub fn new(account_id: AccountId, date: NaiveDate, amount: Money) -> Self {
        Self {
            id: None,
            amount,
            date,
            entities_account_id: account_id,
            entities_payee_id: None,
            entities_subcategory_id: None,
            cleared: ClearedStatus::Uncleared,
            accepted: true,
            memo: None,
            imported_payee: None,
            imported_date: None,
            source: None,
            check_number: None,
            is_tombstone: false,
        }
    }

    /// Create the opening transaction of a new account
    pub fn starting_balance(
        account_id: AccountId,
        date: NaiveDate,
        amount: Money,
        payee_id: PayeeId,
        subcategory_id: SubCategoryId,
    ) -> Self {
        let mut txn = Self::new(account_id, date, amount);
        txn.entities_payee_id = Some(payee_id);
        txn.entities_subcategory_id = Some(subcategory_id);
        txn.cleared = ClearedStatus::Cleared;
        txn
    }

    /// Set the payee
    pub fn with_payee(mut self, payee_id: PayeeId) -> Self {
        self.entities_payee_id = Some(payee_id);
        self
    }

    /// Set the category
    pub fn with_subcategory(mut self, subcategory_id: SubCategoryId) -> Self {
        self.entities_subcategory_id = Some(subcategory_id);
        self
    }

    /// Set the memo
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Check if this is an inflow (positive amount)
    pub fn is_inflow(&self) -> bool {
        self.amount.is_positive()
    }

    /// Check if this is an outflow (negative amount)
    pub fn is_outflow(&self) -> bool {
        self.amount.is_negative()
    }

    /// Check if this transaction is locked
    pub fn is_locked(&self) -> bool {
        self.cleared.is_locked()
    }

    /// Whether the memo mentions an external transaction id
    pub fn memo_mentions(&self, external_id: &str) -> bool {
        !external_id.is_empty()
            && self
                .memo
                .as_deref()
                .is_some_and(|memo| memo.contains(external_id))
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date.format("%Y-%m-%d"), self.amount)?;
        if let Some(memo) = &self.memo {
            write!(f, " ({})", memo)?;
        }
        Ok(())
    }
}

impl_entity!(Transaction, TransactionId, EntityKind::Transaction;
    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new(
            "entities_account_id",
            EntityKind::Account,
            self.entities_account_id,
        )];
        if let Some(payee_id) = self.entities_payee_id {
            refs.push(Reference::new("entities_payee_id", EntityKind::Payee, payee_id));
        }
        if let Some(subcategory_id) = self.entities_subcategory_id {
            refs.push(Reference::new(
                "entities_subcategory_id",
                EntityKind::SubCategory,
                subcategory_id,
            ));
        }
        refs
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(memo) = &self.memo {
            if memo.chars().count() > 500 {
                return Err(ValidationError::InvalidField {
                    kind: EntityKind::Transaction,
                    field: "memo",
                    reason: "longer than 500 characters".into(),
                });
            }
        }
        Ok(())
    }
);

/// A split line of a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTransaction {
    /// Unique identifier (None until staged)
    pub id: Option<SubTransactionId>,

    /// The parent transaction
    pub entities_transaction_id: TransactionId,

    pub amount: Money,

    #[serde(default)]
    pub entities_payee_id: Option<PayeeId>,

    #[serde(default)]
    pub entities_subcategory_id: Option<SubCategoryId>,

    #[serde(default)]
    pub memo: Option<String>,

    #[serde(default)]
    pub is_tombstone: bool,
}

impl SubTransaction {
    /// Create a new, unsynced split line
    pub fn new(transaction_id: TransactionId, amount: Money) -> Self {
        Self {
            id: None,
            entities_transaction_id: transaction_id,
            amount,
            entities_payee_id: None,
            entities_subcategory_id: None,
            memo: None,
            is_tombstone: false,
        }
    }
}

impl_entity!(SubTransaction, SubTransactionId, EntityKind::SubTransaction;
    fn references(&self) -> Vec<Reference> {
        let mut refs = vec![Reference::new(
            "entities_transaction_id",
            EntityKind::Transaction,
            self.entities_transaction_id,
        )];
        if let Some(payee_id) = self.entities_payee_id {
            refs.push(Reference::new("entities_payee_id", EntityKind::Payee, payee_id));
        }
        if let Some(subcategory_id) = self.entities_subcategory_id {
            refs.push(Reference::new(
                "entities_subcategory_id",
                EntityKind::SubCategory,
                subcategory_id,
            ));
        }
        refs
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::Entity;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_new_transaction() {
        let account_id = AccountId::new();
        let txn = Transaction::new(account_id, test_date(), Money::from_decimal(-50.0));

        assert_eq!(txn.entities_account_id, account_id);
        assert_eq!(txn.cleared, ClearedStatus::Uncleared);
        assert!(txn.accepted);
        assert!(txn.is_outflow());
        assert!(txn.id().is_none());
    }

    #[test]
    fn test_starting_balance() {
        let payee = PayeeId::new();
        let income = SubCategoryId::new();
        let txn = Transaction::starting_balance(
            AccountId::new(),
            test_date(),
            Money::from_decimal(100.0),
            payee,
            income,
        );

        assert_eq!(txn.cleared, ClearedStatus::Cleared);
        assert_eq!(txn.entities_payee_id, Some(payee));
        assert_eq!(txn.entities_subcategory_id, Some(income));
        assert!(txn.is_inflow());
    }

    #[test]
    fn test_references_skip_missing_keys() {
        let txn = Transaction::new(AccountId::new(), test_date(), Money::zero());
        assert_eq!(txn.references().len(), 1);

        let txn = txn.with_payee(PayeeId::new()).with_subcategory(SubCategoryId::new());
        let fields: Vec<_> = txn.references().iter().map(|r| r.field).collect();
        assert_eq!(
            fields,
            vec!["entities_account_id", "entities_payee_id", "entities_subcategory_id"]
        );
    }

    #[test]
    fn test_memo_mentions() {
        let txn = Transaction::new(AccountId::new(), test_date(), Money::zero())
            .with_memo("COFFEE SHOP    FITID-0042");
        assert!(txn.memo_mentions("FITID-0042"));
        assert!(!txn.memo_mentions("FITID-0043"));
        assert!(!txn.memo_mentions(""));
    }

    #[test]
    fn test_cleared_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ClearedStatus::Cleared).unwrap(),
            "\"Cleared\""
        );
        let parsed: ClearedStatus = serde_json::from_str("\"Reconciled\"").unwrap();
        assert!(parsed.is_locked());
        assert!(serde_json::from_str::<ClearedStatus>("\"Pending\"").is_err());
    }

    #[test]
    fn test_memo_length_validation() {
        let txn = Transaction::new(AccountId::new(), test_date(), Money::zero())
            .with_memo("x".repeat(501));
        assert!(matches!(
            txn.validate(),
            Err(ValidationError::InvalidField { field: "memo", .. })
        ));
    }

    #[test]
    fn test_display() {
        let txn = Transaction::new(AccountId::new(), test_date(), Money::from_decimal(12.5))
            .with_memo("Lunch");
        assert_eq!(txn.to_string(), "2024-01-01 12.50 (Lunch)");
    }
}
