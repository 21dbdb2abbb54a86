//! The fixed operator registry behind `field__operator` filter keys
//!
//! Operators are a closed enum dispatched through `match`, not a map of
//! closures: the set is static, shared, and validated at compile time.
//! [`lookup`] performs the shape checks (sequence-requiring operators,
//! arithmetic nesting), and [`FilterOperator::build`] turns an operator plus
//! operand into an [`Expr`].
//!
//! # Example
//!
//! ```rust
//! use crudkit::operator::FilterOperator;
//!
//! assert_eq!(FilterOperator::parse("gt"), Some(FilterOperator::Gt));
//! assert_eq!(FilterOperator::parse("frobnicate"), None);
//! assert!(FilterOperator::Between.requires_sequence());
//! assert!(FilterOperator::Mul.is_arithmetic());
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::expr::{BinaryOperator, Expr};
use crate::filter::FilterValue;
use crate::value::Value;

/// All operators recognized as a `field__operator` key suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to (`=`)
    Eq,
    /// Not equal to (`<>`)
    Ne,
    /// Greater than (`>`)
    Gt,
    /// Less than (`<`)
    Lt,
    /// Greater than or equal to (`>=`)
    Ge,
    /// Less than or equal to (`<=`)
    Le,
    /// Range test with two bounds (`BETWEEN`)
    Between,
    /// Membership test (`IN`)
    In,
    /// Negated membership test (`NOT IN`)
    NotIn,
    /// Identity test (`IS`), for NULL and booleans
    Is,
    /// Negated identity test (`IS NOT`)
    IsNot,
    /// Null-safe inequality (`IS DISTINCT FROM`)
    IsDistinctFrom,
    /// Null-safe equality (`IS NOT DISTINCT FROM`)
    IsNotDistinctFrom,
    /// Pattern match (`LIKE`)
    Like,
    /// Negated pattern match (`NOT LIKE`)
    NotLike,
    /// Case-insensitive pattern match (`ILIKE`)
    ILike,
    /// Negated case-insensitive pattern match (`NOT ILIKE`)
    NotILike,
    /// Prefix match, compiled to `LIKE 'value%'`
    StartsWith,
    /// Suffix match, compiled to `LIKE '%value'`
    EndsWith,
    /// Substring match, compiled to `LIKE '%value%'`
    Contains,
    /// Full-text match (`@@`)
    Match,
    /// String concatenation (`||`), non-boolean
    Concat,
    /// Addition (`+`), non-boolean
    Add,
    /// Reflected addition (operand on the left)
    RAdd,
    /// Subtraction (`-`), non-boolean
    Sub,
    /// Reflected subtraction
    RSub,
    /// Multiplication (`*`), non-boolean
    Mul,
    /// Reflected multiplication
    RMul,
    /// Division (`/`), non-boolean
    TrueDiv,
    /// Reflected division
    RTrueDiv,
    /// Floor division, compiled to `FLOOR(a / b)`
    FloorDiv,
    /// Reflected floor division
    RFloorDiv,
    /// Modulo (`%`), non-boolean
    Mod,
    /// Reflected modulo
    RMod,
}

/// Every supported operator, in registry order
pub const SUPPORTED: &[FilterOperator] = &[
    FilterOperator::Eq,
    FilterOperator::Ne,
    FilterOperator::Gt,
    FilterOperator::Lt,
    FilterOperator::Ge,
    FilterOperator::Le,
    FilterOperator::Between,
    FilterOperator::In,
    FilterOperator::NotIn,
    FilterOperator::Is,
    FilterOperator::IsNot,
    FilterOperator::IsDistinctFrom,
    FilterOperator::IsNotDistinctFrom,
    FilterOperator::Like,
    FilterOperator::NotLike,
    FilterOperator::ILike,
    FilterOperator::NotILike,
    FilterOperator::StartsWith,
    FilterOperator::EndsWith,
    FilterOperator::Contains,
    FilterOperator::Match,
    FilterOperator::Concat,
    FilterOperator::Add,
    FilterOperator::RAdd,
    FilterOperator::Sub,
    FilterOperator::RSub,
    FilterOperator::Mul,
    FilterOperator::RMul,
    FilterOperator::TrueDiv,
    FilterOperator::RTrueDiv,
    FilterOperator::FloorDiv,
    FilterOperator::RFloorDiv,
    FilterOperator::Mod,
    FilterOperator::RMod,
];

impl FilterOperator {
    /// Parse an operator from its key-suffix spelling
    pub fn parse(name: &str) -> Option<Self> {
        let op = match name {
            "eq" => Self::Eq,
            "ne" => Self::Ne,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "ge" => Self::Ge,
            "le" => Self::Le,
            "between" => Self::Between,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "is" => Self::Is,
            "is_not" => Self::IsNot,
            "is_distinct_from" => Self::IsDistinctFrom,
            "is_not_distinct_from" => Self::IsNotDistinctFrom,
            "like" => Self::Like,
            "not_like" => Self::NotLike,
            "ilike" => Self::ILike,
            "not_ilike" => Self::NotILike,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "contains" => Self::Contains,
            "match" => Self::Match,
            "concat" => Self::Concat,
            "add" => Self::Add,
            "radd" => Self::RAdd,
            "sub" => Self::Sub,
            "rsub" => Self::RSub,
            "mul" => Self::Mul,
            "rmul" => Self::RMul,
            "truediv" => Self::TrueDiv,
            "rtruediv" => Self::RTrueDiv,
            "floordiv" => Self::FloorDiv,
            "rfloordiv" => Self::RFloorDiv,
            "mod" => Self::Mod,
            "rmod" => Self::RMod,
            _ => return None,
        };
        Some(op)
    }

    /// The key-suffix spelling of this operator
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Ge => "ge",
            Self::Le => "le",
            Self::Between => "between",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Is => "is",
            Self::IsNot => "is_not",
            Self::IsDistinctFrom => "is_distinct_from",
            Self::IsNotDistinctFrom => "is_not_distinct_from",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::ILike => "ilike",
            Self::NotILike => "not_ilike",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Contains => "contains",
            Self::Match => "match",
            Self::Concat => "concat",
            Self::Add => "add",
            Self::RAdd => "radd",
            Self::Sub => "sub",
            Self::RSub => "rsub",
            Self::Mul => "mul",
            Self::RMul => "rmul",
            Self::TrueDiv => "truediv",
            Self::RTrueDiv => "rtruediv",
            Self::FloorDiv => "floordiv",
            Self::RFloorDiv => "rfloordiv",
            Self::Mod => "mod",
            Self::RMod => "rmod",
        }
    }

    /// True for operators whose value must be a sequence
    pub fn requires_sequence(self) -> bool {
        matches!(self, Self::Between | Self::In | Self::NotIn)
    }

    /// True for operators producing a non-boolean (numeric) expression
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add
                | Self::RAdd
                | Self::Sub
                | Self::RSub
                | Self::Mul
                | Self::RMul
                | Self::TrueDiv
                | Self::RTrueDiv
                | Self::FloorDiv
                | Self::RFloorDiv
                | Self::Mod
                | Self::RMod
        )
    }

    fn is_reflected(self) -> bool {
        matches!(
            self,
            Self::RAdd | Self::RSub | Self::RMul | Self::RTrueDiv | Self::RFloorDiv | Self::RMod
        )
    }

    /// Build the expression for this operator applied to `target`.
    ///
    /// `target` is usually a column reference, but conditional-value groups
    /// pass an arithmetic sub-expression instead.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidOperatorValue`] when the operand shape does not fit
    /// the operator (scalar where a sequence is needed and vice versa,
    /// non-string pattern operands, `between` without exactly two bounds).
    pub fn build(self, target: Expr, value: &FilterValue) -> Result<Expr> {
        use BinaryOperator as B;

        match self {
            Self::Eq => self.comparison(target, value, B::Eq),
            Self::Ne => self.comparison(target, value, B::NotEq),
            Self::Gt => self.comparison(target, value, B::Gt),
            Self::Lt => self.comparison(target, value, B::Lt),
            Self::Ge => self.comparison(target, value, B::GtEq),
            Self::Le => self.comparison(target, value, B::LtEq),
            Self::Is => self.comparison(target, value, B::Is),
            Self::IsNot => self.comparison(target, value, B::IsNot),
            Self::IsDistinctFrom => self.comparison(target, value, B::IsDistinctFrom),
            Self::IsNotDistinctFrom => self.comparison(target, value, B::IsNotDistinctFrom),
            Self::Like => self.comparison(target, value, B::Like),
            Self::NotLike => self.comparison(target, value, B::NotLike),
            Self::ILike => self.comparison(target, value, B::ILike),
            Self::NotILike => self.comparison(target, value, B::NotILike),
            Self::Match => self.comparison(target, value, B::Match),
            Self::Concat => self.comparison(target, value, B::Concat),
            Self::StartsWith => self.pattern(target, value, |s| format!("{s}%")),
            Self::EndsWith => self.pattern(target, value, |s| format!("%{s}")),
            Self::Contains => self.pattern(target, value, |s| format!("%{s}%")),
            Self::Between => {
                let (low, high) = self.bounds(value)?;
                Ok(Expr::Between {
                    expr: Box::new(target),
                    low: Box::new(Expr::Value(low)),
                    high: Box::new(Expr::Value(high)),
                })
            }
            Self::In | Self::NotIn => {
                let items = self.sequence(value)?;
                Ok(Expr::InList {
                    expr: Box::new(target),
                    list: items.iter().cloned().map(Expr::Value).collect(),
                    negated: self == Self::NotIn,
                })
            }
            Self::Add | Self::RAdd => self.arithmetic(target, value, B::Add),
            Self::Sub | Self::RSub => self.arithmetic(target, value, B::Sub),
            Self::Mul | Self::RMul => self.arithmetic(target, value, B::Mul),
            Self::TrueDiv | Self::RTrueDiv => self.arithmetic(target, value, B::Div),
            Self::Mod | Self::RMod => self.arithmetic(target, value, B::Mod),
            Self::FloorDiv | Self::RFloorDiv => {
                let quotient = self.arithmetic(target, value, B::Div)?;
                Ok(Expr::Func {
                    name: "FLOOR",
                    args: vec![quotient],
                })
            }
        }
    }

    fn comparison(self, target: Expr, value: &FilterValue, op: BinaryOperator) -> Result<Expr> {
        let operand = self.scalar(value)?;
        Ok(Expr::binary(target, op, Expr::Value(operand)))
    }

    fn pattern(
        self,
        target: Expr,
        value: &FilterValue,
        shape: impl FnOnce(&str) -> String,
    ) -> Result<Expr> {
        match self.scalar(value)? {
            Value::Text(s) => Ok(Expr::binary(
                target,
                BinaryOperator::Like,
                Expr::Value(Value::Text(shape(&s))),
            )),
            _ => Err(Error::InvalidOperatorValue {
                operator: self.name(),
                message: "expects a string value",
            }),
        }
    }

    fn arithmetic(self, target: Expr, value: &FilterValue, op: BinaryOperator) -> Result<Expr> {
        let operand = Expr::Value(self.scalar(value)?);
        let (left, right) = if self.is_reflected() {
            (operand, target)
        } else {
            (target, operand)
        };
        Ok(Expr::binary(left, op, right))
    }

    fn scalar(self, value: &FilterValue) -> Result<Value> {
        match value {
            FilterValue::Scalar(v) => Ok(v.clone()),
            _ => Err(Error::InvalidOperatorValue {
                operator: self.name(),
                message: "expects a scalar value",
            }),
        }
    }

    fn sequence(self, value: &FilterValue) -> Result<&[Value]> {
        match value {
            FilterValue::List(items) => Ok(items),
            _ => Err(Error::InvalidOperatorValue {
                operator: self.name(),
                message: "must be a sequence of values",
            }),
        }
    }

    fn bounds(self, value: &FilterValue) -> Result<(Value, Value)> {
        let items = self.sequence(value)?;
        match items {
            [low, high] => Ok((low.clone(), high.clone())),
            _ => Err(Error::InvalidOperatorValue {
                operator: self.name(),
                message: "must contain exactly two bounds",
            }),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Look up an operator by name, validating the operand shape.
///
/// Unknown names return `Ok(None)`; the caller records a diagnostic and
/// drops the key, it does not abort. Known names fail hard on shape
/// violations:
///
/// # Errors
///
/// - [`Error::InvalidOperatorValue`] for `in` / `not_in` / `between` with a
///   non-sequence value.
/// - [`Error::NestedArithmetic`] for arithmetic operators when
///   `allow_arithmetic` is false (inside a `condition` group).
pub fn lookup(
    name: &str,
    value: &FilterValue,
    allow_arithmetic: bool,
) -> Result<Option<FilterOperator>> {
    let Some(op) = FilterOperator::parse(name) else {
        return Ok(None);
    };
    if op.requires_sequence() && !matches!(value, FilterValue::List(_)) {
        return Err(Error::InvalidOperatorValue {
            operator: op.name(),
            message: "must be a sequence of values",
        });
    }
    if op.is_arithmetic() && !allow_arithmetic {
        return Err(Error::NestedArithmetic(op.name()));
    }
    Ok(Some(op))
}

/// Comma-separated list of every supported operator name, for diagnostics
pub(crate) fn supported_names() -> String {
    SUPPORTED
        .iter()
        .map(|op| op.name())
        .collect::<Vec<_>>()
        .join(", ")
}
