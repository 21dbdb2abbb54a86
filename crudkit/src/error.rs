//! Error types for filter compilation, sorting, and CRUD execution
//!
//! Every fatal condition maps to one [`Error`] variant and propagates to the
//! caller unchanged; nothing is retried at this layer. Unknown filter
//! operators are deliberately *not* errors: they are collected as
//! [`UnsupportedOperator`](crate::filter::UnsupportedOperator) diagnostics
//! and logged, and the offending key contributes no predicate.

use thiserror::Error;

/// Result type for all crudkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while compiling filters and sorts or executing CRUD
/// operations.
///
/// # Example
///
/// ```rust
/// use crudkit::error::Error;
/// use crudkit::filter::{compile_filters, Filter};
/// use crudkit::schema::{ColumnRef, ColumnSource};
///
/// struct Users;
///
/// impl ColumnSource for Users {
///     fn entity_name(&self) -> &str {
///         "users"
///     }
///
///     fn table(&self) -> &str {
///         "users"
///     }
///
///     fn lookup(&self, _name: &str) -> Option<ColumnRef> {
///         None
///     }
/// }
///
/// let filter = Filter::new().field("nope", 1);
/// let err = compile_filters(&Users, &filter).unwrap_err();
/// assert!(matches!(err, Error::ColumnNotFound { .. }));
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// A filter or sort key referenced a column the entity does not declare
    #[error("column `{column}` not found on `{entity}`")]
    ColumnNotFound { entity: String, column: String },

    /// An operator was given a value of the wrong shape
    #[error("the value for <{operator}> {message}")]
    InvalidOperatorValue {
        operator: &'static str,
        message: &'static str,
    },

    /// An arithmetic operator appeared inside a `condition` group
    #[error("nested arithmetic operations are not allowed: {0}")]
    NestedArithmetic(&'static str),

    /// Sort directions were supplied without any sort columns
    #[error("sort orders provided without corresponding sort columns")]
    SortWithoutColumns,

    /// Sort column and direction counts do not match
    #[error("the length of sort columns ({columns}) and sort orders ({orders}) must match")]
    ColumnSort { columns: usize, orders: usize },

    /// A filter-based mutation matched more than one row without
    /// `allow_multiple`
    #[error("only one record was expected to be {operation}, found {found} records")]
    MultipleResults {
        operation: &'static str,
        found: u64,
    },

    /// The entity declares no primary-key column
    #[error("no primary key declared for `{0}`")]
    NoPrimaryKey(&'static str),

    /// A create/update payload did not produce usable column values
    #[error("invalid payload: {0}")]
    Payload(String),

    /// A row could not be hydrated into the requested entity
    #[error("row decode failed: {0}")]
    Decode(String),

    /// A storage failure reported by a custom [`Session`](crate::session::Session)
    #[error("storage error: {0}")]
    Storage(String),

    /// An underlying database failure
    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_column_not_found() {
        let err = Error::ColumnNotFound {
            entity: "users".to_string(),
            column: "agee".to_string(),
        };
        assert_eq!(err.to_string(), "column `agee` not found on `users`");
    }

    #[test]
    fn test_display_multiple_results() {
        let err = Error::MultipleResults {
            operation: "deleted",
            found: 3,
        };
        assert_eq!(
            err.to_string(),
            "only one record was expected to be deleted, found 3 records"
        );
    }

    #[test]
    fn test_display_invalid_operator_value() {
        let err = Error::InvalidOperatorValue {
            operator: "in",
            message: "must be a sequence of values",
        };
        assert_eq!(err.to_string(), "the value for <in> must be a sequence of values");
    }

    #[test]
    fn test_error_is_error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(Error::SortWithoutColumns);
        assert!(err.to_string().contains("without corresponding"));
    }
}
