//! MasterCategory and SubCategory models
//!
//! Sub-categories are organized into master categories. The server creates a
//! few reserved ones in every budget, marked with an `internal_name`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entity::{impl_entity, validate_name, EntityKind, Reference, ValidationError};
use super::ids::{MasterCategoryId, SubCategoryId};

/// Internal name of the sub-category income is credited to this month
pub const IMMEDIATE_INCOME: &str = "Category/__ImmediateIncome__";

/// Internal name of the sub-category income is credited to next month
pub const DEFERRED_INCOME: &str = "Category/__DeferredIncome__";

/// Internal name of the master category holding the reserved sub-categories
pub const INTERNAL_MASTER_CATEGORY: &str = "MasterCategory/__Internal__";

/// A group of sub-categories (e.g., "Monthly Bills")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasterCategory {
    /// Unique identifier (None until staged)
    pub id: Option<MasterCategoryId>,

    pub name: String,

    #[serde(default)]
    pub internal_name: Option<String>,

    /// Whether the server allows deleting this group
    #[serde(default = "default_true")]
    pub deletable: bool,

    #[serde(default)]
    pub is_hidden: bool,

    #[serde(default)]
    pub sortable_index: i64,

    #[serde(default)]
    pub is_tombstone: bool,
}

fn default_true() -> bool {
    true
}

impl MasterCategory {
    /// Create a new, unsynced, deletable master category
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            internal_name: None,
            deletable: true,
            is_hidden: false,
            sortable_index: 0,
            is_tombstone: false,
        }
    }

    /// Create a system-reserved master category
    pub fn reserved(name: impl Into<String>, internal_name: impl Into<String>) -> Self {
        let mut category = Self::new(name);
        category.internal_name = Some(internal_name.into());
        category.deletable = false;
        category
    }

    /// Whether bulk cleanup may remove this group
    pub fn is_removable(&self) -> bool {
        self.deletable && self.internal_name.is_none()
    }
}

impl fmt::Display for MasterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl_entity!(MasterCategory, MasterCategoryId, EntityKind::MasterCategory;
    fn internal_name(&self) -> Option<&str> {
        self.internal_name.as_deref()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(EntityKind::MasterCategory, &self.name, 100)
    }
);

/// A budget category within a master category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategory {
    /// Unique identifier (None until staged)
    pub id: Option<SubCategoryId>,

    pub name: String,

    /// Non-null for system-reserved categories
    #[serde(default)]
    pub internal_name: Option<String>,

    /// The master category this belongs to
    pub entities_master_category_id: MasterCategoryId,

    #[serde(default)]
    pub is_hidden: bool,

    #[serde(default)]
    pub sortable_index: i64,

    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    pub is_tombstone: bool,
}

impl SubCategory {
    /// Create a new, unsynced sub-category
    pub fn new(name: impl Into<String>, master_category_id: MasterCategoryId) -> Self {
        Self {
            id: None,
            name: name.into(),
            internal_name: None,
            entities_master_category_id: master_category_id,
            is_hidden: false,
            sortable_index: 0,
            note: None,
            is_tombstone: false,
        }
    }

    /// Create a system-reserved sub-category
    pub fn reserved(
        name: impl Into<String>,
        internal_name: impl Into<String>,
        master_category_id: MasterCategoryId,
    ) -> Self {
        let mut category = Self::new(name, master_category_id);
        category.internal_name = Some(internal_name.into());
        category
    }

    /// Whether the server reserves this category
    pub fn is_reserved(&self) -> bool {
        self.internal_name.is_some()
    }
}

impl fmt::Display for SubCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl_entity!(SubCategory, SubCategoryId, EntityKind::SubCategory;
    fn internal_name(&self) -> Option<&str> {
        self.internal_name.as_deref()
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference::new(
            "entities_master_category_id",
            EntityKind::MasterCategory,
            self.entities_master_category_id,
        )]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        validate_name(EntityKind::SubCategory, &self.name, 100)
    }
);
