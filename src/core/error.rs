//! Error types for the data-mapper
//!
//! This module defines all error types that can occur while building,
//! persisting or loading entities.

/// Result type alias for mapper operations
pub type Result<T> = std::result::Result<T, MapperError>;

/// Error types for mapper and database operations
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// Entity construction failed (missing field, bad timestamp, invalid relation)
    #[error("Validation error for {entity}: {message}")]
    Validation {
        entity: String,
        field: Option<String>,
        message: String,
    },

    /// A value does not have the expected kind
    #[error("Type mismatch for '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// Statement preparation or execution failed in the backing store
    #[error("[DB Error {}] - {message}", code_label(.code))]
    Persistence {
        code: Option<i32>,
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Statement could not be built or returned an unexpected shape
    #[error("Query error: {0}")]
    QueryError(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Transaction error
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Column missing from a result row
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Credential verification failed
    #[error("{0}")]
    AuthenticationFailed(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

fn code_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

impl MapperError {
    /// Create a validation error
    pub fn validation(entity: &str, message: impl Into<String>) -> Self {
        MapperError::Validation {
            entity: entity.to_string(),
            field: None,
            message: message.into(),
        }
    }

    /// Create a validation error attached to a field
    pub fn invalid_field(entity: &str, field: &str, message: impl Into<String>) -> Self {
        MapperError::Validation {
            entity: entity.to_string(),
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Create a missing required field error
    pub fn missing_field(entity: &str, field: &str) -> Self {
        Self::invalid_field(
            entity,
            field,
            format!("Missing required argument '{}' for {}", field, entity),
        )
    }

    /// Create a new type mismatch error
    pub fn type_mismatch(field: &str, expected: &str, actual: &str) -> Self {
        MapperError::TypeMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a persistence error without an underlying driver error
    pub fn persistence(code: Option<i32>, message: impl Into<String>) -> Self {
        MapperError::Persistence {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new query error
    pub fn query<S: Into<String>>(msg: S) -> Self {
        MapperError::QueryError(msg.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        MapperError::ConnectionError(msg.into())
    }

    /// Create a new transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        MapperError::TransactionError(msg.into())
    }

    /// Create an authentication failure for the given identity
    ///
    /// The message never says whether the identity or the credential was wrong.
    pub fn authentication_failed(identity: &str) -> Self {
        MapperError::AuthenticationFailed(format!("Authentication failed for user '{}'", identity))
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MapperError::Config(msg.into())
    }

    /// Native error code reported by the store, if any
    pub fn code(&self) -> Option<i32> {
        match self {
            MapperError::Persistence { code, .. } => *code,
            _ => None,
        }
    }

    /// Name of the offending field for validation and type errors
    pub fn field(&self) -> Option<&str> {
        match self {
            MapperError::Validation { field, .. } => field.as_deref(),
            MapperError::TypeMismatch { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Whether this error originates from the backing store
    ///
    /// Collection reads turn these into an empty result.
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            MapperError::Persistence { .. }
                | MapperError::QueryError(_)
                | MapperError::ConnectionError(_)
                | MapperError::TransactionError(_)
        )
    }
}

impl From<rusqlite::Error> for MapperError {
    fn from(err: rusqlite::Error) -> Self {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => Some(failure.extended_code),
            _ => None,
        };
        MapperError::Persistence {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        MapperError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MapperError::missing_field("User", "email");
        assert!(matches!(err, MapperError::Validation { .. }));
        assert_eq!(err.field(), Some("email"));

        let err = MapperError::query("Invalid SQL");
        assert!(matches!(err, MapperError::QueryError(_)));

        let err = MapperError::type_mismatch("id", "long", "string");
        assert!(matches!(err, MapperError::TypeMismatch { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = MapperError::missing_field("User", "email");
        assert_eq!(
            err.to_string(),
            "Validation error for User: Missing required argument 'email' for User"
        );

        let err = MapperError::persistence(Some(2067), "UNIQUE constraint failed: users.email");
        assert_eq!(
            err.to_string(),
            "[DB Error 2067] - UNIQUE constraint failed: users.email"
        );

        let err = MapperError::authentication_failed("someone@example.com");
        assert_eq!(
            err.to_string(),
            "Authentication failed for user 'someone@example.com'"
        );
    }

    #[test]
    fn test_store_failure_classification() {
        assert!(MapperError::persistence(None, "boom").is_store_failure());
        assert!(MapperError::transaction("boom").is_store_failure());
        assert!(!MapperError::missing_field("User", "email").is_store_failure());
        assert!(!MapperError::authentication_failed("x").is_store_failure());
    }

    #[test]
    fn test_from_rusqlite_keeps_code() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err: MapperError = conn
            .execute("INSERT INTO missing_table VALUES (1)", [])
            .unwrap_err()
            .into();
        assert!(matches!(err, MapperError::Persistence { .. }));
        assert_eq!(err.code(), Some(1));
    }
}
