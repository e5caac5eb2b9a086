//! Strongly-typed ID wrappers for all entity types
//!
//! Every entity on the server is keyed by a UUID. Newtype wrappers keep an
//! account id from being passed where a payee id is expected.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Behaviour shared by every typed id
pub trait EntityId:
    Copy + Eq + Ord + fmt::Debug + fmt::Display + Serialize + DeserializeOwned
{
    /// Mint a fresh random id
    fn generate() -> Self;

    /// Wrap an existing UUID
    fn from_uuid(uuid: Uuid) -> Self;

    /// The underlying UUID
    fn uuid(&self) -> Uuid;
}

/// Macro to generate ID newtype wrappers
macro_rules! define_id {
    ($name:ident, $display_prefix:literal) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Get the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse an ID from a string
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl EntityId for $name {
            fn generate() -> Self {
                Self::new()
            }

            fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, &self.0.to_string()[..8])
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if let Ok(uuid) = Uuid::parse_str(s) {
                    return Ok(Self(uuid));
                }
                let s = s.strip_prefix($display_prefix).unwrap_or(s);
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

define_id!(BudgetId, "bud-");
define_id!(BudgetVersionId, "ver-");
define_id!(AccountId, "acc-");
define_id!(PayeeId, "pay-");
define_id!(MasterCategoryId, "mcat-");
define_id!(SubCategoryId, "cat-");
define_id!(TransactionId, "txn-");
define_id!(SubTransactionId, "stxn-");
