//! Entity schema mirrored from the budget server
//!
//! Catalog-level entities (budgets and their versions) and budget-level
//! entities (accounts, payees, categories, transactions).

pub mod account;
pub mod catalog;
pub mod category;
pub mod entity;
pub mod ids;
pub mod money;
pub mod payee;
pub mod transaction;

pub use account::{Account, AccountType};
pub use catalog::{BudgetVersion, CatalogBudget, CurrencyFormat, DateFormat};
pub use category::{
    MasterCategory, SubCategory, DEFERRED_INCOME, IMMEDIATE_INCOME, INTERNAL_MASTER_CATEGORY,
};
pub use entity::{Entity, EntityKind, Reference, ValidationError};
pub use ids::{
    AccountId, BudgetId, BudgetVersionId, EntityId, MasterCategoryId, PayeeId, SubCategoryId,
    SubTransactionId, TransactionId,
};
pub use money::Money;
pub use payee::{Payee, RECONCILIATION_ADJUSTMENT_PAYEE, STARTING_BALANCE_PAYEE};
pub use transaction::{ClearedStatus, SubTransaction, Transaction};
