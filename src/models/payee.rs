//! Payee model
//!
//! Payees are who money goes to or comes from. A payee with an
//! `entities_account_id` is the transfer payee of that account, and a payee
//! with an `internal_name` is reserved by the server.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{impl_entity, validate_name, EntityKind, Reference, ValidationError};
use super::ids::{AccountId, PayeeId, SubCategoryId};

/// Internal name of the payee used for starting-balance transactions
pub const STARTING_BALANCE_PAYEE: &str = "StartingBalancePayee";

/// Internal name of the payee used for reconciliation adjustments
pub const RECONCILIATION_ADJUSTMENT_PAYEE: &str = "ReconciliationBalanceAdjustmentPayee";

/// A payee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payee {
    /// Unique identifier (None until staged)
    pub id: Option<PayeeId>,

    /// Account this payee transfers to, for transfer payees
    #[serde(default)]
    pub entities_account_id: Option<AccountId>,

    /// Non-null for system-reserved payees
    #[serde(default)]
    pub internal_name: Option<String>,

    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub auto_fill_subcategory_id: Option<SubCategoryId>,

    #[serde(default)]
    pub auto_fill_subcategory_enabled: bool,

    #[serde(default)]
    pub auto_fill_memo_enabled: bool,

    #[serde(default)]
    pub auto_fill_amount_enabled: bool,

    #[serde(default)]
    pub rename_on_import_enabled: bool,

    #[serde(default)]
    pub is_tombstone: bool,
}

fn default_true() -> bool {
    true
}

impl Payee {
    /// Create a new, unsynced payee
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            entities_account_id: None,
            internal_name: None,
            name: name.into(),
            enabled: true,
            auto_fill_subcategory_id: None,
            auto_fill_subcategory_enabled: true,
            auto_fill_memo_enabled: false,
            auto_fill_amount_enabled: false,
            rename_on_import_enabled: false,
            is_tombstone: false,
        }
    }

    /// Create the hidden transfer payee of an account
    pub fn transfer(account_id: AccountId, account_name: &str) -> Self {
        let mut payee = Self::new(format!("Transfer : {}", account_name));
        payee.entities_account_id = Some(account_id);
        payee
    }

    /// Create a system-reserved payee
    pub fn reserved(name: impl Into<String>, internal_name: impl Into<String>) -> Self {
        let mut payee = Self::new(name);
        payee.internal_name = Some(internal_name.into());
        payee
    }

    /// Whether the server reserves this payee
    pub fn is_reserved(&self) -> bool {
        self.internal_name.is_some()
    }

    /// Whether this is the transfer payee of some account
    pub fn is_transfer(&self) -> bool {
        self.entities_account_id.is_some()
    }

    /// Normalize a payee name for matching
    pub fn normalize_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Check if this payee matches a name (case-insensitive)
    pub fn matches_name(&self, name: &str) -> bool {
        Self::normalize_name(&self.name) == Self::normalize_name(name)
    }
}

impl fmt::Display for Payee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl_entity!(Payee, PayeeId, EntityKind::Payee;
    fn internal_name(&self) -> Option<&str> {
        self.internal_name.as_deref()
    }

    fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::new();
        if let Some(account_id) = self.entities_account_id {
            refs.push(Reference::new("entities_account_id", EntityKind::Account, account_id));
        }
        if let Some(subcategory_id) = self.auto_fill_subcategory_id {
            refs.push(Reference::new(
                "auto_fill_subcategory_id",
                EntityKind::SubCategory,
                subcategory_id,
            ));
        }
        refs
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(EntityKind::Payee, &self.name, 200)
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::Entity;

    #[test]
    fn test_transfer_payee() {
        let account_id = AccountId::new();
        let payee = Payee::transfer(account_id, "Checking");
        assert_eq!(payee.name, "Transfer : Checking");
        assert_eq!(payee.entities_account_id, Some(account_id));
        assert!(payee.is_transfer());
        assert!(!payee.is_reserved());
        assert!(payee.enabled);
        assert!(payee.auto_fill_subcategory_enabled);
        assert!(!payee.auto_fill_memo_enabled);
    }

    #[test]
    fn test_reserved_payee() {
        let payee = Payee::reserved("Starting Balance", STARTING_BALANCE_PAYEE);
        assert!(payee.is_reserved());
        assert_eq!(Entity::internal_name(&payee), Some(STARTING_BALANCE_PAYEE));
    }

    #[test]
    fn test_references() {
        let payee = Payee::new("Grocer");
        assert!(payee.references().is_empty());

        let transfer = Payee::transfer(AccountId::new(), "Savings");
        let refs = transfer.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].field, "entities_account_id");
        assert_eq!(refs[0].kind, EntityKind::Account);
    }

    #[test]
    fn test_name_matching() {
        let payee = Payee::new("Test Store");
        assert!(payee.matches_name("TEST STORE"));
        assert!(payee.matches_name("  test store "));
        assert!(!payee.matches_name("Other Store"));
    }

    #[test]
    fn test_validation() {
        let mut payee = Payee::new("Valid Name");
        assert!(payee.validate().is_ok());

        payee.name = "a".repeat(201);
        assert!(matches!(
            payee.validate(),
            Err(ValidationError::NameTooLong { .. })
        ));
    }
}
