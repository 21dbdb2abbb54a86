//! The storage session capability and row hydration
//!
//! [`Session`] is the seam to the storage collaborator: execute a rendered
//! statement, get rows or an affected-row count back, commit on request.
//! The facade never talks to a database driver directly; it only sees this
//! trait, which keeps it testable against scripted in-memory sessions and
//! portable across backends. A transaction-backed Postgres implementation
//! ships behind the `database` feature
//! ([`PgSession`](crate::postgres::PgSession)).
//!
//! Dropping a session without committing leaves durability to the caller's
//! outer transaction; the bundled Postgres session rolls back.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::statement::SqlStatement;
use crate::value::Value;

/// One decoded result row: column name/value pairs in select order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column, consuming and returning the row (test/builder style)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a column in place
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.columns.push((name.into(), value.into()));
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True when the row has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The first column's value, if any (scalar results)
    pub fn first(&self) -> Option<&Value> {
        self.columns.first().map(|(_, value)| value)
    }

    /// Look up a column by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, value)| value)
    }

    /// Look up a column by name, failing when absent
    pub fn try_get(&self, name: &str) -> Result<&Value> {
        self.get(name)
            .ok_or_else(|| Error::Decode(format!("missing column `{name}`")))
    }

    /// Decode a column as an integer
    pub fn decode_i64(&self, name: &str) -> Result<i64> {
        self.try_get(name)?
            .as_i64()
            .ok_or_else(|| Error::Decode(format!("column `{name}` is not an integer")))
    }

    /// Decode a column as a boolean
    pub fn decode_bool(&self, name: &str) -> Result<bool> {
        self.try_get(name)?
            .as_bool()
            .ok_or_else(|| Error::Decode(format!("column `{name}` is not a boolean")))
    }

    /// Decode a column as an owned string
    pub fn decode_string(&self, name: &str) -> Result<String> {
        self.try_get(name)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Decode(format!("column `{name}` is not a string")))
    }

    /// Iterate columns in select order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Hydrate an entity from a decoded row
///
/// # Example
///
/// ```rust
/// use crudkit::session::{FromRow, Row};
/// use crudkit::error::Result;
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &Row) -> Result<Self> {
///         Ok(Self {
///             id: row.decode_i64("id")?,
///             name: row.decode_string("name")?,
///         })
///     }
/// }
///
/// let row = Row::new().with("id", 7_i64).with("name", "alice");
/// let user = User::from_row(&row).unwrap();
/// assert_eq!(user.id, 7);
/// assert_eq!(user.name, "alice");
/// ```
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> Result<Self>;
}

/// The storage collaborator: statement execution bound to one
/// session/transaction
///
/// Implementations decide what a statement's `$n` parameters bind to and
/// how result rows decode. All methods take `&mut self`: a session is a
/// single logical flow, never shared across concurrent callers.
#[async_trait]
pub trait Session: Send {
    /// Execute a row-returning statement
    async fn fetch_all(&mut self, statement: &SqlStatement) -> Result<Vec<Row>>;

    /// Execute a mutating statement, returning the affected-row count
    async fn execute(&mut self, statement: &SqlStatement) -> Result<u64>;

    /// Commit the session's transaction
    async fn commit(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_lookup_and_first() {
        let row = Row::new().with("count", 3_i64).with("label", "x");
        assert_eq!(row.first(), Some(&Value::Int(3)));
        assert_eq!(row.get("label"), Some(&Value::Text("x".into())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_row_decode_helpers() {
        let row = Row::new()
            .with("id", 9_i64)
            .with("active", true)
            .with("name", "zoe");
        assert_eq!(row.decode_i64("id").unwrap(), 9);
        assert!(row.decode_bool("active").unwrap());
        assert_eq!(row.decode_string("name").unwrap(), "zoe");
    }

    #[test]
    fn test_row_decode_type_mismatch() {
        let row = Row::new().with("id", "not-a-number");
        let err = row.decode_i64("id").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_row_missing_column() {
        let row = Row::new();
        let err = row.try_get("anything").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
