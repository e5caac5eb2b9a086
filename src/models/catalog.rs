//! Catalog-level models
//!
//! The catalog lists the budgets visible to the signed-in user and the
//! versions (revision lines) each one has. A budget session attaches to one
//! `BudgetVersion`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{impl_entity, validate_name, EntityKind, Reference, ValidationError};
use super::ids::{BudgetId, BudgetVersionId};

/// A budget as listed in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogBudget {
    /// Unique identifier (None until staged)
    pub id: Option<BudgetId>,

    /// Display name of the budget
    pub budget_name: String,

    /// When the budget was created
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_tombstone: bool,
}

impl CatalogBudget {
    /// Create a new, unsynced catalog budget
    pub fn new(budget_name: impl Into<String>) -> Self {
        Self {
            id: None,
            budget_name: budget_name.into(),
            created_at: Some(Utc::now()),
            is_tombstone: false,
        }
    }
}

impl fmt::Display for CatalogBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.budget_name)
    }
}

impl_entity!(CatalogBudget, BudgetId, EntityKind::CatalogBudget;
    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(EntityKind::CatalogBudget, &self.budget_name, 100)
    }
);

/// One revision line of a budget's data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetVersion {
    /// Unique identifier (None until staged)
    pub id: Option<BudgetVersionId>,

    /// The catalog budget owning this version
    pub budget_id: BudgetId,

    #[serde(default)]
    pub version_name: Option<String>,

    /// JSON-encoded `DateFormat`
    #[serde(default)]
    pub date_format: Option<String>,

    /// JSON-encoded `CurrencyFormat`
    #[serde(default)]
    pub currency_format: Option<String>,

    #[serde(default)]
    pub last_accessed_on: Option<NaiveDate>,

    #[serde(default)]
    pub is_tombstone: bool,
}

impl BudgetVersion {
    /// Create a new, unsynced version of a budget
    pub fn new(budget_id: BudgetId) -> Self {
        Self {
            id: None,
            budget_id,
            version_name: None,
            date_format: None,
            currency_format: None,
            last_accessed_on: None,
            is_tombstone: false,
        }
    }
}

impl_entity!(BudgetVersion, BudgetVersionId, EntityKind::BudgetVersion;
    fn references(&self) -> Vec<Reference> {
        vec![Reference::new("budget_id", EntityKind::CatalogBudget, self.budget_id)]
    }
);

/// Currency presentation sent with `CreateNewBudget`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyFormat {
    pub iso_code: String,
    pub example_format: String,
    pub decimal_digits: u8,
    pub decimal_separator: String,
    pub symbol_first: bool,
    pub group_separator: String,
    pub currency_symbol: String,
    pub display_symbol: bool,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            iso_code: "USD".to_string(),
            example_format: "123,456.78".to_string(),
            decimal_digits: 2,
            decimal_separator: ".".to_string(),
            symbol_first: true,
            group_separator: ",".to_string(),
            currency_symbol: "$".to_string(),
            display_symbol: true,
        }
    }
}

/// Date presentation sent with `CreateNewBudget`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateFormat {
    pub format: String,
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            format: "MM/DD/YYYY".to_string(),
        }
    }
}
