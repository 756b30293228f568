//! Error types for sqlrepo operations.

use std::fmt;

use crate::value::Value;

/// Result alias used across all sqlrepo crates.
pub type Result<T> = std::result::Result<T, Error>;

/// The primary error type for all sqlrepo operations.
///
/// Absence is not an error: lookups that may legitimately find nothing
/// return `Option` instead. Every variant here is terminal for the call
/// that produced it; callers own any retry policy.
#[derive(Debug)]
pub enum Error {
    /// A value could not be coerced to a column's declared type.
    Conversion {
        /// Logical property name on the entity
        property: &'static str,
        /// Rendering of the offending value
        value: String,
        /// Type name the column expected
        expected: &'static str,
    },

    /// An accessor or comparator was asked to operate on a missing entity.
    NullEntity {
        /// The operation that required an entity instance
        operation: &'static str,
    },

    /// A predicate used a method or operator the translator does not know.
    UnsupportedOperation {
        /// Name of the unrecognized call
        call: String,
    },

    /// A builder was mutated after a repository call materialized results.
    AlreadyExecuted,

    /// An insert affected zero rows.
    InsertFailed {
        /// Target table name
        table: &'static str,
    },

    /// A key-bound operation was attempted on an entity with no primary key.
    NoPrimaryKey {
        /// Target table name
        table: &'static str,
    },

    /// A lookup supplied the wrong number of key values for the entity's
    /// primary key.
    KeyMismatch {
        /// Target table name
        table: &'static str,
        /// Number of primary-key columns declared
        expected: usize,
        /// Number of key values supplied
        actual: usize,
    },

    /// A delta exclusion named a property that is not mapped.
    UnknownProperty {
        /// The unknown property name
        property: String,
        /// Target table name
        table: &'static str,
    },

    /// A failure surfaced by the connection capability, enriched with the
    /// attempted SQL text and the operation that issued it.
    Execution {
        /// The SQL text that was being executed
        sql: String,
        /// The repository or extension operation that issued it
        operation: &'static str,
        /// The underlying driver failure
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Custom error with message, for driver implementations.
    Custom(String),
}

impl Error {
    /// Build a [`Error::Conversion`] for the given property and value.
    pub fn conversion(property: &'static str, value: &Value, expected: &'static str) -> Self {
        Error::Conversion {
            property,
            value: format!("{value:?}"),
            expected,
        }
    }

    /// Wrap a connection failure with the SQL text and call site.
    pub fn execution(
        sql: impl Into<String>,
        operation: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Execution {
            sql: sql.into(),
            operation,
            source: source.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Conversion {
                property,
                value,
                expected,
            } => write!(
                f,
                "cannot convert value {value} to {expected} for property '{property}'"
            ),
            Error::NullEntity { operation } => {
                write!(f, "{operation} requires an entity instance, got none")
            }
            Error::UnsupportedOperation { call } => {
                write!(f, "'{call}' is not supported in predicates")
            }
            Error::AlreadyExecuted => {
                write!(f, "builder cannot be modified after it has been executed")
            }
            Error::InsertFailed { table } => write!(f, "insert into '{table}' affected no rows"),
            Error::NoPrimaryKey { table } => {
                write!(f, "table '{table}' does not declare a primary key")
            }
            Error::KeyMismatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "table '{table}' has {expected} key column(s) but {actual} key value(s) were given"
            ),
            Error::UnknownProperty { property, table } => {
                write!(f, "property '{property}' is not a member of '{table}'")
            }
            Error::Execution {
                sql,
                operation,
                source,
            } => write!(f, "{operation} failed executing '{sql}': {source}"),
            Error::Custom(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Execution { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
