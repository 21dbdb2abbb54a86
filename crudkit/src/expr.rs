//! SQL expression representation and rendering
//!
//! Compiled filters are trees of [`Expr`] values. Rendering walks the tree
//! once, appending SQL text and collecting bind parameters in placeholder
//! order (`$1`, `$2`, and so on). `NULL` never becomes a placeholder; it is
//! rendered inline so `IS NULL` / `IS NOT NULL` comparisons stay valid SQL.

use crate::schema::ColumnRef;
use crate::statement::SqlStatement;
use crate::value::Value;

/// A SQL expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A column reference, e.g. `"users"."age"`
    Column(ColumnRef),

    /// A bind value (or inline `NULL`)
    Value(Value),

    /// A binary operation, e.g. `("age" > $1)` or `("price" * $1)`
    Binary {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// A range test, e.g. `("age" BETWEEN $1 AND $2)`
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },

    /// A membership test, e.g. `("id" IN ($1, $2, $3))`
    ///
    /// An empty list renders as `FALSE` (`TRUE` when negated) instead of
    /// invalid SQL.
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },

    /// A function call, e.g. `FLOOR("total" / $1)`
    Func { name: &'static str, args: Vec<Expr> },
}

/// Operators usable in [`Expr::Binary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Like,
    NotLike,
    ILike,
    NotILike,
    Is,
    IsNot,
    IsDistinctFrom,
    IsNotDistinctFrom,
    Match,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    fn sql(self) -> &'static str {
        match self {
            Self::Eq => " = ",
            Self::NotEq => " <> ",
            Self::Lt => " < ",
            Self::LtEq => " <= ",
            Self::Gt => " > ",
            Self::GtEq => " >= ",
            Self::And => " AND ",
            Self::Or => " OR ",
            Self::Like => " LIKE ",
            Self::NotLike => " NOT LIKE ",
            Self::ILike => " ILIKE ",
            Self::NotILike => " NOT ILIKE ",
            Self::Is => " IS ",
            Self::IsNot => " IS NOT ",
            Self::IsDistinctFrom => " IS DISTINCT FROM ",
            Self::IsNotDistinctFrom => " IS NOT DISTINCT FROM ",
            Self::Match => " @@ ",
            Self::Concat => " || ",
            Self::Add => " + ",
            Self::Sub => " - ",
            Self::Mul => " * ",
            Self::Div => " / ",
            Self::Mod => " % ",
        }
    }
}

impl Expr {
    /// Column expression
    pub fn column(column: ColumnRef) -> Self {
        Self::Column(column)
    }

    /// Value expression
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Binary expression
    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Self::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Conjoin expressions left to right; `None` when the iterator is empty
    pub fn and_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs
            .into_iter()
            .reduce(|acc, expr| Self::binary(acc, BinaryOperator::And, expr))
    }

    /// Disjoin expressions left to right; `None` when the iterator is empty
    pub fn or_all(exprs: impl IntoIterator<Item = Expr>) -> Option<Expr> {
        exprs
            .into_iter()
            .reduce(|acc, expr| Self::binary(acc, BinaryOperator::Or, expr))
    }

    /// Render this expression into the given renderer
    pub fn render(&self, r: &mut Renderer) {
        match self {
            Self::Column(column) => r.column(column),
            Self::Value(value) => r.value(value),
            Self::Binary { left, op, right } => {
                r.push("(");
                left.render(r);
                r.push(op.sql());
                right.render(r);
                r.push(")");
            }
            Self::Between { expr, low, high } => {
                r.push("(");
                expr.render(r);
                r.push(" BETWEEN ");
                low.render(r);
                r.push(" AND ");
                high.render(r);
                r.push(")");
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                if list.is_empty() {
                    r.push(if *negated { "TRUE" } else { "FALSE" });
                    return;
                }
                r.push("(");
                expr.render(r);
                r.push(if *negated { " NOT IN (" } else { " IN (" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        r.push(", ");
                    }
                    item.render(r);
                }
                r.push("))");
            }
            Self::Func { name, args } => {
                r.push(name);
                r.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        r.push(", ");
                    }
                    arg.render(r);
                }
                r.push(")");
            }
        }
    }
}

impl From<ColumnRef> for Expr {
    fn from(column: ColumnRef) -> Self {
        Self::Column(column)
    }
}

/// Accumulates SQL text and positional bind parameters during rendering
#[derive(Debug, Default)]
pub struct Renderer {
    sql: String,
    params: Vec<Value>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw SQL text
    pub fn push(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    /// Append a quoted identifier, doubling any embedded quotes
    pub fn ident(&mut self, name: &str) {
        self.sql.push('"');
        for ch in name.chars() {
            if ch == '"' {
                self.sql.push('"');
            }
            self.sql.push(ch);
        }
        self.sql.push('"');
    }

    /// Append a (possibly qualified) column reference
    pub fn column(&mut self, column: &ColumnRef) {
        if let Some(qualifier) = &column.qualifier {
            self.ident(qualifier);
            self.sql.push('.');
        }
        self.ident(&column.name);
    }

    /// Append a bind value as the next `$n` placeholder; `NULL` is inlined
    pub fn value(&mut self, value: &Value) {
        if value.is_null() {
            self.sql.push_str("NULL");
            return;
        }
        self.params.push(value.clone());
        self.sql.push('$');
        self.sql.push_str(&self.params.len().to_string());
    }

    /// Finish rendering, producing the executable statement
    pub fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}
