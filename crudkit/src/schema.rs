//! Entity schema descriptors and column resolution
//!
//! This module provides the seam between caller-declared schemas and the
//! filter/sort compilers. Schemas are declared by implementing [`Entity`];
//! the compilers never touch an entity type directly; they go through the
//! [`ColumnSource`] capability, which is implemented both by the plain
//! [`Table`] view of an entity and by an [`Aliased`] view of it, so filters
//! compile identically against joined/aliased tables.
//!
//! # Example
//!
//! ```rust
//! use crudkit::schema::{resolve, Aliased, ColumnRef, Entity, Table};
//!
//! struct User;
//!
//! impl Entity for User {
//!     fn table() -> &'static str {
//!         "users"
//!     }
//!
//!     fn columns() -> &'static [&'static str] {
//!         &["id", "name", "email"]
//!     }
//!
//!     fn primary_keys() -> &'static [&'static str] {
//!         &["id"]
//!     }
//! }
//!
//! let table = Table::<User>::new();
//! assert_eq!(resolve(&table, "name").unwrap(), ColumnRef::new("name"));
//!
//! let aliased = Aliased::<User>::new("u");
//! assert_eq!(
//!     resolve(&aliased, "name").unwrap(),
//!     ColumnRef::qualified("u", "name")
//! );
//!
//! assert!(resolve(&table, "nickname").is_err());
//! ```

use std::marker::PhantomData;

use crate::error::{Error, Result};

/// Schema descriptor for one mapped entity
///
/// Implemented by the caller for each table-backed type. The descriptor is
/// static metadata only; row hydration lives on
/// [`FromRow`](crate::session::FromRow) and instantiation stays with the
/// caller.
pub trait Entity {
    /// Table name the entity maps to
    fn table() -> &'static str;

    /// All declared column names
    fn columns() -> &'static [&'static str];

    /// Declared primary-key column names
    ///
    /// Composite keys are not supported by the facade: it uses the first
    /// declared column and emits a diagnostic (see
    /// [`Crud::new`](crate::crud::Crud::new)).
    fn primary_keys() -> &'static [&'static str];
}

/// A resolved reference to a column, optionally qualified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Table name or alias the column is addressed through
    pub qualifier: Option<String>,
    /// Column name
    pub name: String,
}

impl ColumnRef {
    /// Create an unqualified column reference
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
        }
    }

    /// Create a qualified column reference (`qualifier.name`)
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: Some(qualifier.into()),
            name: name.into(),
        }
    }
}

/// Capability to look up columns by name
///
/// The filter compiler and sort normalizer are polymorphic over this trait
/// rather than over [`Entity`] itself, so they work against raw tables and
/// aliased views alike. Lookup is by name only, never by evaluating
/// strings against live objects.
pub trait ColumnSource {
    /// Entity name used in diagnostics and errors
    fn entity_name(&self) -> &str;

    /// Table name or alias used when rendering statements
    fn table(&self) -> &str;

    /// Look up a declared column, returning its reference if present
    fn lookup(&self, name: &str) -> Option<ColumnRef>;
}

/// The plain, unaliased view of an entity's table
#[derive(Debug, Clone, Copy)]
pub struct Table<T: Entity> {
    _entity: PhantomData<T>,
}

impl<T: Entity> Table<T> {
    /// Create the source for `T`'s table
    pub fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> ColumnSource for Table<T> {
    fn entity_name(&self) -> &str {
        T::table()
    }

    fn table(&self) -> &str {
        T::table()
    }

    fn lookup(&self, name: &str) -> Option<ColumnRef> {
        T::columns()
            .iter()
            .find(|column| **column == name)
            .map(|column| ColumnRef::new(*column))
    }
}

/// An aliased view of an entity's table, as used in joins
///
/// Columns resolved through this source carry the alias as their qualifier;
/// nothing else about resolution changes.
#[derive(Debug, Clone)]
pub struct Aliased<T: Entity> {
    alias: String,
    _entity: PhantomData<T>,
}

impl<T: Entity> Aliased<T> {
    /// Create an aliased source for `T`'s table
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            _entity: PhantomData,
        }
    }

    /// The alias columns are qualified with
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl<T: Entity> ColumnSource for Aliased<T> {
    fn entity_name(&self) -> &str {
        T::table()
    }

    fn table(&self) -> &str {
        &self.alias
    }

    fn lookup(&self, name: &str) -> Option<ColumnRef> {
        T::columns()
            .iter()
            .find(|column| **column == name)
            .map(|column| ColumnRef::qualified(self.alias.clone(), *column))
    }
}

/// Resolve a field name against a column source.
///
/// # Errors
///
/// [`Error::ColumnNotFound`] when the source does not declare the field.
pub fn resolve<S>(source: &S, field: &str) -> Result<ColumnRef>
where
    S: ColumnSource + ?Sized,
{
    source.lookup(field).ok_or_else(|| Error::ColumnNotFound {
        entity: source.entity_name().to_string(),
        column: field.to_string(),
    })
}
