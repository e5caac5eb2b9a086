//! Custom error types for the nYNAB client
//!
//! This module defines the error hierarchy for the library using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for client operations
#[derive(Error, Debug)]
pub enum NynabError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Validation errors for data models
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Duplicate entity errors
    #[error("{entity_type} already exists: {identifier}")]
    Duplicate {
        entity_type: &'static str,
        identifier: String,
    },

    /// The named budget is not present in the catalog
    #[error("Budget not found: {0}")]
    BudgetNotFound(String),

    /// A system-reserved entity every budget must carry is missing
    #[error("Reserved {entity_type} missing: {internal_name}")]
    ReservedEntityMissing {
        entity_type: &'static str,
        internal_name: String,
    },

    /// A staged entity points at something the mirror does not hold
    #[error("{entity_type}.{field} references unknown entity {target}")]
    DanglingReference {
        entity_type: &'static str,
        field: &'static str,
        target: String,
    },

    /// The remote service rejected or failed a request
    #[error("Remote error in {opname}: {message}")]
    Remote { opname: String, message: String },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

impl NynabError {
    /// Create a "not found" error for accounts
    pub fn account_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Account",
            identifier: identifier.into(),
        }
    }

    /// Create a "not found" error for transactions
    pub fn transaction_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Transaction",
            identifier: identifier.into(),
        }
    }

    /// Create a remote error for the given operation
    pub fn remote(opname: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            opname: opname.into(),
            message: message.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error came from the remote service
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Check if this is a local snapshot read or write failure
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

impl From<std::io::Error> for NynabError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for NynabError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for client operations
pub type NynabResult<T> = Result<T, NynabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NynabError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_not_found_error() {
        let err = NynabError::account_not_found("Checking");
        assert_eq!(err.to_string(), "Account not found: Checking");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_reserved_entity_error() {
        let err = NynabError::ReservedEntityMissing {
            entity_type: "Payee",
            internal_name: "StartingBalancePayee".into(),
        };
        assert_eq!(
            err.to_string(),
            "Reserved Payee missing: StartingBalancePayee"
        );
    }

    #[test]
    fn test_remote_error() {
        let err = NynabError::remote("syncBudgetData", "connection reset");
        assert_eq!(
            err.to_string(),
            "Remote error in syncBudgetData: connection reset"
        );
        assert!(err.is_remote());
    }

    #[test]
    fn test_storage_error_is_not_remote() {
        let err = NynabError::Storage("disk full".into());
        assert!(err.is_storage());
        assert!(!err.is_remote());
        assert!(!NynabError::remote("syncBudgetData", "timeout").is_storage());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: NynabError = io_err.into();
        assert!(matches!(err, NynabError::Io(_)));
    }
}
