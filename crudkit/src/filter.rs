//! Filter specifications and the filter compiler
//!
//! A [`Filter`] is an ordered mapping from keys to [`FilterValue`]s. A key
//! is either a bare column name (implying equality) or `field__operator`,
//! split at the **last** `__` occurrence, so `a__b__gt` filters column
//! `a__b` with `gt`. Values are scalars, sequences (for `in` / `not_in` /
//! `between`), or nested mappings: an `or` group combining operator/value
//! pairs disjunctively, or a conditional-value group carrying `value` and
//! `condition` entries ("apply the key's arithmetic operator to the column
//! and `value`, then compare the result with each `condition` entry").
//!
//! [`compile_filters`] turns a specification into predicates. Unknown
//! operators never abort a compilation: each one is logged, recorded in
//! [`CompiledFilters::dropped`], and contributes no predicate. Malformed
//! value shapes are hard errors.
//!
//! # Example
//!
//! ```rust
//! use crudkit::filters;
//!
//! let filter = filters! {
//!     "name" => "alice",
//!     "age__between" => [18, 65],
//!     "score__or" => { "gt" => 90, "lt" => 10 },
//! };
//! assert_eq!(filter.len(), 3);
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::operator::{self, FilterOperator};
use crate::schema::{resolve, ColumnSource};
use crate::value::Value;

/// A value on the right-hand side of a filter entry
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A single bind value
    Scalar(Value),
    /// A sequence of bind values, for `in`, `not_in` and `between`
    List(Vec<Value>),
    /// A nested, insertion-ordered mapping (`or` groups and
    /// conditional-value groups)
    Map(Vec<(String, FilterValue)>),
}

impl FilterValue {
    /// Build a nested mapping value from key/value pairs
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Look up an entry of a [`FilterValue::Map`] by key
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<Value> for FilterValue {
    fn from(v: Value) -> Self {
        Self::Scalar(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<i16> for FilterValue {
    fn from(v: i16) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<f32> for FilterValue {
    fn from(v: f32) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<Uuid> for FilterValue {
    fn from(v: Uuid) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(v: NaiveDate) -> Self {
        Self::Scalar(v.into())
    }
}

impl From<Vec<Value>> for FilterValue {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

impl From<Vec<i64>> for FilterValue {
    fn from(items: Vec<i64>) -> Self {
        Self::List(items.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<i32>> for FilterValue {
    fn from(items: Vec<i32>) -> Self {
        Self::List(items.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(items: Vec<&str>) -> Self {
        Self::List(items.into_iter().map(Value::from).collect())
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items.into_iter().map(Value::from).collect())
    }
}

/// An ordered filter specification
///
/// Entry order is preserved; it determines predicate order but has no
/// semantic effect since all predicates are conjoined.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    entries: Vec<(String, FilterValue)>,
}

impl Filter {
    /// Empty specification (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, consuming and returning the filter
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.push(key, value);
        self
    }

    /// Append an entry in place
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<FilterValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the specification has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FilterValue)> for Filter {
    fn from_iter<I: IntoIterator<Item = (String, FilterValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Diagnostic for a filter key dropped because its operator is unknown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedOperator {
    /// The full filter key the operator appeared under
    pub key: String,
    /// The unrecognized operator name
    pub operator: String,
}

/// The output of [`compile_filters`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFilters {
    /// Predicates in specification order, to be conjoined by the consumer
    pub predicates: Vec<Expr>,
    /// Keys that were dropped, in the order they were encountered
    pub dropped: Vec<UnsupportedOperator>,
}

/// Compile a filter specification into predicates.
///
/// Each entry yields at most one predicate; `or` groups and
/// conditional-value groups are pre-composed into a single expression
/// before being appended. Unknown operators are dropped with a diagnostic
/// (see [`CompiledFilters::dropped`]); unresolvable columns and malformed
/// value shapes abort with an error.
pub fn compile_filters<S>(source: &S, filter: &Filter) -> Result<CompiledFilters>
where
    S: ColumnSource + ?Sized,
{
    let mut compiled = CompiledFilters::default();

    for (key, value) in filter.iter() {
        // Bare key: plain equality.
        let Some((field, op_name)) = key.rsplit_once("__") else {
            let column = resolve(source, key)?;
            let predicate = FilterOperator::Eq.build(Expr::Column(column), value)?;
            compiled.predicates.push(predicate);
            continue;
        };

        let column = resolve(source, field)?;

        if op_name == "or" {
            let FilterValue::Map(entries) = value else {
                return Err(Error::InvalidOperatorValue {
                    operator: "or",
                    message: "must be a mapping of operator to value",
                });
            };
            let mut arms = Vec::new();
            for (or_op, or_value) in entries {
                match operator::lookup(or_op, or_value, true)? {
                    Some(op) => arms.push(op.build(Expr::Column(column.clone()), or_value)?),
                    None => drop_unsupported(&mut compiled, key, or_op),
                }
            }
            if let Some(disjunction) = Expr::or_all(arms) {
                compiled.predicates.push(disjunction);
            }
            continue;
        }

        let Some(op) = operator::lookup(op_name, value, true)? else {
            drop_unsupported(&mut compiled, key, op_name);
            continue;
        };

        if let Some((operand, condition)) = conditional_group(value) {
            let FilterValue::Map(condition_entries) = condition else {
                return Err(Error::InvalidOperatorValue {
                    operator: op.name(),
                    message: "requires `condition` to be a mapping of operator to value",
                });
            };
            let base = op.build(Expr::Column(column), operand)?;
            let mut comparisons = Vec::new();
            for (cond_name, cond_value) in condition_entries {
                // Arithmetic is blocked at this level to stop unbounded nesting.
                match operator::lookup(cond_name, cond_value, false)? {
                    Some(cond_op) => comparisons.push(cond_op.build(base.clone(), cond_value)?),
                    None => drop_unsupported(&mut compiled, key, cond_name),
                }
            }
            if let Some(conjunction) = Expr::and_all(comparisons) {
                compiled.predicates.push(conjunction);
            }
            continue;
        }

        compiled.predicates.push(op.build(Expr::Column(column), value)?);
    }

    Ok(compiled)
}

/// A map value with both `value` and `condition` entries is a two-stage
/// conditional group; anything else is handed to the operator as-is.
fn conditional_group(value: &FilterValue) -> Option<(&FilterValue, &FilterValue)> {
    let operand = value.get("value")?;
    let condition = value.get("condition")?;
    Some((operand, condition))
}

fn drop_unsupported(compiled: &mut CompiledFilters, key: &str, operator_name: &str) {
    tracing::warn!(
        key,
        operator = operator_name,
        "unsupported filter operator dropped; supported operators: {}",
        operator::supported_names()
    );
    compiled.dropped.push(UnsupportedOperator {
        key: key.to_string(),
        operator: operator_name.to_string(),
    });
}

/// Build a [`Filter`] from `key => value` pairs.
///
/// Values may be plain expressions, `[a, b, c]` sequences, or nested
/// `{ "op" => value, ... }` mappings. Compound value expressions must be
/// parenthesized.
///
/// # Example
///
/// ```rust
/// use crudkit::filters;
///
/// let filter = filters! {
///     "age__gt" => 30,
///     "status__in" => ["active", "pending"],
///     "price__mul" => { "value" => 2, "condition" => { "gt" => 100 } },
/// };
/// assert_eq!(filter.len(), 3);
/// ```
#[macro_export]
macro_rules! filters {
    () => {
        $crate::filter::Filter::new()
    };
    ($($key:expr => $value:tt),+ $(,)?) => {{
        let mut filter = $crate::filter::Filter::new();
        $(
            filter.push($key, $crate::filter_value!($value));
        )+
        filter
    }};
}

/// Build a single [`FilterValue`]; used by [`filters!`] for nested values.
#[macro_export]
macro_rules! filter_value {
    ({ $($key:expr => $value:tt),* $(,)? }) => {
        $crate::filter::FilterValue::Map(vec![
            $( ($key.into(), $crate::filter_value!($value)) ),*
        ])
    };
    ([ $($item:expr),* $(,)? ]) => {
        $crate::filter::FilterValue::List(vec![
            $( $crate::value::Value::from($item) ),*
        ])
    };
    ($value:expr) => {
        $crate::filter::FilterValue::from($value)
    };
}
