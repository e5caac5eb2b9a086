//! Account model
//!
//! Represents financial accounts (checking, savings, credit cards, etc.)
//! as the budget server stores them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{impl_entity, validate_name, EntityKind, ValidationError};
use super::ids::AccountId;
use super::money::Money;

/// Type of financial account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    CreditCard,
    Cash,
    LineOfCredit,
    Paypal,
    MerchantAccount,
    InvestmentAccount,
    Mortgage,
    OtherAsset,
    OtherLiability,
}

impl AccountType {
    /// Returns true if this account type normally carries a negative balance
    pub fn is_liability(&self) -> bool {
        matches!(
            self,
            Self::CreditCard | Self::LineOfCredit | Self::Mortgage | Self::OtherLiability
        )
    }

    /// Parse account type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace([' ', '_'], "").as_str() {
            "checking" => Some(Self::Checking),
            "savings" => Some(Self::Savings),
            "creditcard" | "credit" => Some(Self::CreditCard),
            "cash" => Some(Self::Cash),
            "lineofcredit" | "loc" => Some(Self::LineOfCredit),
            "paypal" => Some(Self::Paypal),
            "merchantaccount" | "merchant" => Some(Self::MerchantAccount),
            "investmentaccount" | "investment" => Some(Self::InvestmentAccount),
            "mortgage" => Some(Self::Mortgage),
            "otherasset" => Some(Self::OtherAsset),
            "otherliability" => Some(Self::OtherLiability),
            _ => None,
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checking => write!(f, "Checking"),
            Self::Savings => write!(f, "Savings"),
            Self::CreditCard => write!(f, "Credit Card"),
            Self::Cash => write!(f, "Cash"),
            Self::LineOfCredit => write!(f, "Line of Credit"),
            Self::Paypal => write!(f, "PayPal"),
            Self::MerchantAccount => write!(f, "Merchant Account"),
            Self::InvestmentAccount => write!(f, "Investment Account"),
            Self::Mortgage => write!(f, "Mortgage"),
            Self::OtherAsset => write!(f, "Other Asset"),
            Self::OtherLiability => write!(f, "Other Liability"),
        }
    }
}

/// A financial account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier (None until staged)
    pub id: Option<AccountId>,

    /// Account name (e.g., "Chase Checking")
    pub account_name: String,

    #[serde(default)]
    pub account_type: AccountType,

    /// Whether this account's balance counts toward the budget
    #[serde(default = "default_on_budget")]
    pub on_budget: bool,

    #[serde(default)]
    pub hidden: bool,

    #[serde(default)]
    pub sortable_index: i64,

    /// Free-text note; external bank keys are bound here
    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    pub last_reconciled_date: Option<NaiveDate>,

    #[serde(default)]
    pub last_reconciled_balance: Money,

    #[serde(default)]
    pub last_entered_check_number: Option<i64>,

    #[serde(default)]
    pub is_tombstone: bool,
}

fn default_on_budget() -> bool {
    true
}

impl Account {
    /// Create a new, unsynced account
    pub fn new(account_name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: None,
            account_name: account_name.into(),
            account_type,
            on_budget: true,
            hidden: false,
            sortable_index: 0,
            note: None,
            last_reconciled_date: None,
            last_reconciled_balance: Money::zero(),
            last_entered_check_number: None,
            is_tombstone: false,
        }
    }

    /// Create an off-budget (tracking) account
    pub fn tracking(account_name: impl Into<String>, account_type: AccountType) -> Self {
        let mut account = Self::new(account_name, account_type);
        account.on_budget = false;
        account
    }

    /// Format an external bank key the way it is stored in the note
    pub fn key_tag(key: &str) -> String {
        format!("key[{}]key", key)
    }

    /// Bind an external bank key (e.g. "bankid branchid acctid") to this account
    pub fn bind_external_key(&mut self, key: &str) {
        if self.is_bound_to(key) {
            return;
        }
        let tag = Self::key_tag(key);
        match &mut self.note {
            Some(note) => note.push_str(&tag),
            None => self.note = Some(tag),
        }
    }

    /// Check whether the note carries the given external key
    pub fn is_bound_to(&self, key: &str) -> bool {
        self.note
            .as_deref()
            .is_some_and(|note| note.contains(&Self::key_tag(key)))
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.account_name)?;
        if !self.on_budget {
            write!(f, " (off-budget)")?;
        }
        Ok(())
    }
}

impl_entity!(Account, AccountId, EntityKind::Account;
    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(EntityKind::Account, &self.account_name, 100)
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::Entity;

    #[test]
    fn test_new_account() {
        let account = Account::new("Checking", AccountType::Checking);
        assert_eq!(account.account_name, "Checking");
        assert!(account.on_budget);
        assert!(account.id().is_none());
        assert!(account.last_reconciled_balance.is_zero());
    }

    #[test]
    fn test_tracking_account() {
        let account = Account::tracking("Brokerage", AccountType::InvestmentAccount);
        assert!(!account.on_budget);
        assert_eq!(account.to_string(), "Brokerage (off-budget)");
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!(AccountType::parse("credit card"), Some(AccountType::CreditCard));
        assert_eq!(AccountType::parse("LINE_OF_CREDIT"), Some(AccountType::LineOfCredit));
        assert_eq!(AccountType::parse("boat"), None);
        assert!(AccountType::Mortgage.is_liability());
        assert!(!AccountType::Savings.is_liability());
    }

    #[test]
    fn test_bind_external_key() {
        let mut account = Account::new("Checking", AccountType::Checking);
        assert!(!account.is_bound_to("001 002 12345"));

        account.bind_external_key("001 002 12345");
        assert_eq!(account.note.as_deref(), Some("key[001 002 12345]key"));
        assert!(account.is_bound_to("001 002 12345"));

        account.bind_external_key("001 002 99999");
        account.bind_external_key("001 002 12345");
        assert_eq!(
            account.note.as_deref(),
            Some("key[001 002 12345]keykey[001 002 99999]key")
        );
    }

    #[test]
    fn test_validation() {
        let mut account = Account::new("Valid", AccountType::Checking);
        assert!(account.validate().is_ok());

        account.account_name = String::new();
        assert_eq!(
            account.validate(),
            Err(ValidationError::EmptyName(EntityKind::Account))
        );
    }
}
