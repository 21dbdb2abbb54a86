//! Sort specifications and the sorting normalizer
//!
//! A [`Sort`] pairs column names with optional directions. Single names and
//! directions are promoted to one-element lists, every column defaults to
//! ascending, and the two lists must line up; mismatches and
//! direction-only specifications are errors, not guesses.
//!
//! # Example
//!
//! ```rust
//! use crudkit::sort::{OrderDirection, Sort};
//!
//! let sort = Sort::by(["created_at", "name"]).order(OrderDirection::Descending);
//! // one direction for two columns: rejected by the normalizer
//! assert_eq!(sort.columns().len(), 2);
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::schema::{resolve, ColumnRef, ColumnSource};
use crate::statement::Select;

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    /// Sort in ascending order (A-Z, 0-9)
    #[default]
    Ascending,
    /// Sort in descending order (Z-A, 9-0)
    Descending,
}

impl OrderDirection {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// A sort specification: column names plus optional directions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sort {
    columns: Vec<String>,
    orders: Option<Vec<OrderDirection>>,
}

impl Sort {
    /// Specification with no ordering at all
    pub fn none() -> Self {
        Self::default()
    }

    /// Sort by one column or a list of columns, ascending by default
    pub fn by(columns: impl Into<SortColumns>) -> Self {
        Self {
            columns: columns.into().0,
            orders: None,
        }
    }

    /// Attach one direction or a list of directions
    #[must_use]
    pub fn order(mut self, orders: impl Into<SortOrders>) -> Self {
        self.orders = Some(orders.into().0);
        self
    }

    /// The declared sort columns
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// True when the specification orders nothing
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.orders.as_ref().map_or(true, Vec::is_empty)
    }
}

/// Conversion carrier promoting single column names to lists
pub struct SortColumns(Vec<String>);

impl From<&str> for SortColumns {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for SortColumns {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for SortColumns {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for SortColumns {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SortColumns {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

/// Conversion carrier promoting a single direction to a list
pub struct SortOrders(Vec<OrderDirection>);

impl From<OrderDirection> for SortOrders {
    fn from(order: OrderDirection) -> Self {
        Self(vec![order])
    }
}

impl From<Vec<OrderDirection>> for SortOrders {
    fn from(orders: Vec<OrderDirection>) -> Self {
        Self(orders)
    }
}

impl<const N: usize> From<[OrderDirection; N]> for SortOrders {
    fn from(orders: [OrderDirection; N]) -> Self {
        Self(orders.to_vec())
    }
}

/// Validate a sort specification and resolve its columns.
///
/// Directions default to ascending; an empty direction list counts as
/// absent. Resolution order is specification order: the first column is
/// the primary sort key.
///
/// # Errors
///
/// - [`Error::SortWithoutColumns`] when directions are given with no
///   columns.
/// - [`Error::ColumnSort`] when column and direction counts differ.
/// - [`Error::ColumnNotFound`] for undeclared columns.
pub fn normalize<S>(source: &S, sort: &Sort) -> Result<Vec<(ColumnRef, OrderDirection)>>
where
    S: ColumnSource + ?Sized,
{
    if sort.columns.is_empty() {
        if sort.orders.as_ref().is_some_and(|orders| !orders.is_empty()) {
            return Err(Error::SortWithoutColumns);
        }
        return Ok(Vec::new());
    }

    let orders = match &sort.orders {
        Some(orders) if !orders.is_empty() => {
            if orders.len() != sort.columns.len() {
                return Err(Error::ColumnSort {
                    columns: sort.columns.len(),
                    orders: orders.len(),
                });
            }
            orders.clone()
        }
        _ => vec![OrderDirection::Ascending; sort.columns.len()],
    };

    sort.columns
        .iter()
        .zip(orders)
        .map(|(name, order)| resolve(source, name).map(|column| (column, order)))
        .collect()
}

/// Append the normalized ordering clauses of `sort` to a select statement.
pub fn apply_sorting<S>(source: &S, mut stmt: Select, sort: &Sort) -> Result<Select>
where
    S: ColumnSource + ?Sized,
{
    for (column, order) in normalize(source, sort)? {
        stmt = stmt.order_by(column, order);
    }
    Ok(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Entity, Table};

    struct Track;

    impl Entity for Track {
        fn table() -> &'static str {
            "tracks"
        }

        fn columns() -> &'static [&'static str] {
            &["id", "title", "plays"]
        }

        fn primary_keys() -> &'static [&'static str] {
            &["id"]
        }
    }

    fn source() -> Table<Track> {
        Table::new()
    }

    #[test]
    fn test_single_column_promoted_and_defaults_ascending() {
        let normalized = normalize(&source(), &Sort::by("title")).unwrap();
        assert_eq!(
            normalized,
            vec![(ColumnRef::new("title"), OrderDirection::Ascending)]
        );
    }

    #[test]
    fn test_orders_applied_in_column_order() {
        let sort = Sort::by(["title", "plays"])
            .order(vec![OrderDirection::Ascending, OrderDirection::Descending]);
        let normalized = normalize(&source(), &sort).unwrap();
        assert_eq!(normalized[0], (ColumnRef::new("title"), OrderDirection::Ascending));
        assert_eq!(normalized[1], (ColumnRef::new("plays"), OrderDirection::Descending));
    }

    #[test]
    fn test_length_mismatch_is_fatal() {
        let sort = Sort::by(["title", "plays"]).order(OrderDirection::Ascending);
        let err = normalize(&source(), &sort).unwrap_err();
        assert!(matches!(
            err,
            Error::ColumnSort {
                columns: 2,
                orders: 1
            }
        ));
    }

    #[test]
    fn test_orders_without_columns_is_fatal() {
        let sort = Sort::none().order(OrderDirection::Ascending);
        let err = normalize(&source(), &sort).unwrap_err();
        assert!(matches!(err, Error::SortWithoutColumns));
    }

    #[test]
    fn test_empty_order_list_counts_as_absent() {
        let sort = Sort::by(["title", "plays"]).order(Vec::<OrderDirection>::new());
        let normalized = normalize(&source(), &sort).unwrap();
        assert!(normalized
            .iter()
            .all(|(_, order)| *order == OrderDirection::Ascending));

        let empty = Sort::none().order(Vec::<OrderDirection>::new());
        assert!(normalize(&source(), &empty).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_sort_column_is_fatal() {
        let err = normalize(&source(), &Sort::by("tempo")).unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[test]
    fn test_empty_sort_normalizes_to_nothing() {
        assert!(normalize(&source(), &Sort::none()).unwrap().is_empty());
    }

    #[test]
    fn test_order_direction_display() {
        assert_eq!(format!("{}", OrderDirection::Ascending), "asc");
        assert_eq!(format!("{}", OrderDirection::Descending), "desc");
    }
}
