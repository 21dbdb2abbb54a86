//! # crudkit
//!
//! Generic async CRUD toolkit: a typed filter DSL compiled to SQL
//! predicates, a sort normalizer, and a facade for create/read/update/
//! delete operations over any entity type.
//!
//! ## Features
//!
//! - **Filter DSL**: `field__operator` keys (`age__gt`, `name__like`,
//!   `score__between`, …) with `or` groups and conditional-value groups,
//!   compiled into an expression tree. Unknown operators are dropped with
//!   a diagnostic instead of failing the whole filter.
//! - **Typed schemas**: entities declare their columns once; every filter
//!   and sort key is resolved against them, including aliased views.
//! - **Sort normalizer**: single names or lists, validated direction
//!   counts, ascending by default.
//! - **Mutation safety**: filter-based updates and deletes count matching
//!   rows first and refuse multi-row mutations unless explicitly allowed.
//! - **Logical deletion**: flag-column updates instead of row removal.
//! - **Pluggable storage**: everything executes through the
//!   [`Session`](session::Session) trait; a transaction-backed PostgreSQL
//!   session ships behind the `database` feature.
//!
//! ## Example
//!
//! ```rust,ignore
//! use crudkit::prelude::*;
//!
//! let crud = Crud::<User>::new();
//! let mut session = PgSession::begin(&pool).await?;
//!
//! let adults = crud
//!     .find_all_sorted(
//!         &mut session,
//!         &filters! {
//!             "age__ge" => 18,
//!             "status__in" => ["active", "pending"],
//!             "score__or" => { "gt" => 90, "lt" => 10 },
//!         },
//!         &Sort::by("name"),
//!     )
//!     .await?;
//!
//! let removed = crud
//!     .delete_by_filter(
//!         &mut session,
//!         &filters! { "status" => "expired" },
//!         &DeleteOptions {
//!             allow_multiple: true,
//!             logical: true,
//!             ..DeleteOptions::default()
//!         },
//!         true,
//!     )
//!     .await?;
//! ```

pub mod crud;
pub mod error;
pub mod expr;
pub mod filter;
pub mod operator;
pub mod schema;
pub mod session;
pub mod sort;
pub mod statement;
pub mod value;

#[cfg(feature = "database")]
pub mod postgres;

/// Commonly used types, re-exported for glob import
pub mod prelude {
    pub use crate::crud::{Crud, DeleteOptions};
    pub use crate::error::{Error, Result};
    pub use crate::filter::{compile_filters, CompiledFilters, Filter, FilterValue};
    pub use crate::filters;
    pub use crate::operator::FilterOperator;
    pub use crate::schema::{resolve, Aliased, ColumnRef, ColumnSource, Entity, Table};
    pub use crate::session::{FromRow, Row, Session};
    pub use crate::sort::{apply_sorting, OrderDirection, Sort};
    pub use crate::statement::{Select, SqlStatement};
    pub use crate::value::Value;

    #[cfg(feature = "database")]
    pub use crate::postgres::PgSession;
}
