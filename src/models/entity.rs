//! The `Entity` trait the local mirror is generic over
//!
//! Every record the server knows about has an optional id (absent until the
//! record is staged), a tombstone flag used to carry removals over the wire,
//! and a handful of hooks the mirror uses for indexing and validation.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ids::EntityId;

/// Every entity type the mirror stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    CatalogBudget,
    BudgetVersion,
    Account,
    Payee,
    MasterCategory,
    SubCategory,
    Transaction,
    SubTransaction,
}

impl EntityKind {
    /// Name of the wire collection holding this kind
    pub fn collection(&self) -> &'static str {
        match self {
            Self::CatalogBudget => "ce_budgets",
            Self::BudgetVersion => "ce_budget_versions",
            Self::Account => "be_accounts",
            Self::Payee => "be_payees",
            Self::MasterCategory => "be_master_categories",
            Self::SubCategory => "be_subcategories",
            Self::Transaction => "be_transactions",
            Self::SubTransaction => "be_subtransactions",
        }
    }

    /// Human-readable type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::CatalogBudget => "CatalogBudget",
            Self::BudgetVersion => "BudgetVersion",
            Self::Account => "Account",
            Self::Payee => "Payee",
            Self::MasterCategory => "MasterCategory",
            Self::SubCategory => "SubCategory",
            Self::Transaction => "Transaction",
            Self::SubTransaction => "SubTransaction",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A foreign key held by an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Field holding the key
    pub field: &'static str,
    /// Kind of entity the key points at
    pub kind: EntityKind,
    /// The referenced id
    pub target: Uuid,
}

impl Reference {
    pub fn new(field: &'static str, kind: EntityKind, target: impl EntityId) -> Self {
        Self {
            field,
            kind,
            target: target.uuid(),
        }
    }
}

/// Field validation failures shared by all entity types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyName(EntityKind),
    NameTooLong { kind: EntityKind, len: usize, max: usize },
    InvalidField { kind: EntityKind, field: &'static str, reason: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName(kind) => write!(f, "{} name cannot be empty", kind),
            Self::NameTooLong { kind, len, max } => {
                write!(f, "{} name too long ({} chars, max {})", kind, len, max)
            }
            Self::InvalidField {
                kind,
                field,
                reason,
            } => write!(f, "{}.{}: {}", kind, field, reason),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a display name: non-blank and at most `max` characters
pub(crate) fn validate_name(
    kind: EntityKind,
    name: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName(kind));
    }
    let len = name.chars().count();
    if len > max {
        return Err(ValidationError::NameTooLong { kind, len, max });
    }
    Ok(())
}

/// A record the mirror can store and the sync protocol can carry
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned {
    type Id: EntityId;

    const KIND: EntityKind;

    fn id(&self) -> Option<Self::Id>;

    fn set_id(&mut self, id: Self::Id);

    fn is_tombstone(&self) -> bool;

    fn set_tombstone(&mut self, tombstone: bool);

    /// Marker of system-reserved entities
    fn internal_name(&self) -> Option<&str> {
        None
    }

    /// Foreign keys this entity holds
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Implement the id and tombstone plumbing of `Entity`
///
/// The type must have `id: Option<$id>` and `is_tombstone: bool` fields.
/// Anything after the `;` is pasted into the impl block as overrides.
macro_rules! impl_entity {
    ($ty:ty, $id:ty, $kind:expr; $($body:tt)*) => {
        impl $crate::models::entity::Entity for $ty {
            type Id = $id;

            const KIND: $crate::models::entity::EntityKind = $kind;

            fn id(&self) -> Option<$id> {
                self.id
            }

            fn set_id(&mut self, id: $id) {
                self.id = Some(id);
            }

            fn is_tombstone(&self) -> bool {
                self.is_tombstone
            }

            fn set_tombstone(&mut self, tombstone: bool) {
                self.is_tombstone = tombstone;
            }

            $($body)*
        }
    };
}

pub(crate) use impl_entity;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(EntityKind::CatalogBudget.collection(), "ce_budgets");
        assert_eq!(EntityKind::SubTransaction.collection(), "be_subtransactions");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name(EntityKind::Payee, "Grocer", 10).is_ok());
        assert_eq!(
            validate_name(EntityKind::Payee, "   ", 10),
            Err(ValidationError::EmptyName(EntityKind::Payee))
        );
        assert!(matches!(
            validate_name(EntityKind::Account, &"a".repeat(11), 10),
            Err(ValidationError::NameTooLong { len: 11, .. })
        ));
    }

    #[test]
    fn test_validation_display() {
        let err = ValidationError::EmptyName(EntityKind::Account);
        assert_eq!(err.to_string(), "Account name cannot be empty");
    }
}
