//! Statement builders and the rendered statement form
//!
//! Builders assemble the four statement shapes the facade needs and render
//! them to a [`SqlStatement`] (SQL text plus positional bind parameters),
//! which is what [`Session`](crate::session::Session) implementations
//! execute. Predicates attached with [`Select::filter`] (and friends) are
//! conjoined with `AND`.

use crate::error::{Error, Result};
use crate::expr::{Expr, Renderer};
use crate::schema::ColumnRef;
use crate::sort::OrderDirection;
use crate::value::Value;

/// A rendered statement: SQL text plus parameters in `$n` order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// What a [`Select`] projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Projection {
    Star,
    Count,
}

/// Builder for `SELECT` statements
#[derive(Debug, Clone)]
pub struct Select {
    table: String,
    projection: Projection,
    predicates: Vec<Expr>,
    order_by: Vec<(ColumnRef, OrderDirection)>,
    limit: Option<u64>,
}

impl Select {
    /// `SELECT * FROM table`
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::Star,
            predicates: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// `SELECT COUNT(*) FROM table`
    pub fn count_from(table: impl Into<String>) -> Self {
        Self {
            projection: Projection::Count,
            ..Self::from(table)
        }
    }

    /// Add one predicate to the `WHERE` conjunction
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add every predicate to the `WHERE` conjunction
    #[must_use]
    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Expr>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Append an `ORDER BY` clause; earlier calls take precedence
    #[must_use]
    pub fn order_by(mut self, column: ColumnRef, order: OrderDirection) -> Self {
        self.order_by.push((column, order));
        self
    }

    /// Cap the number of returned rows
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render to executable form
    pub fn render(&self) -> SqlStatement {
        let mut r = Renderer::new();
        match self.projection {
            Projection::Star => r.push("SELECT * FROM "),
            Projection::Count => r.push("SELECT COUNT(*) FROM "),
        }
        r.ident(&self.table);
        render_where(&mut r, &self.predicates);
        if !self.order_by.is_empty() {
            r.push(" ORDER BY ");
            for (i, (column, order)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    r.push(", ");
                }
                r.column(column);
                r.push(" ");
                r.push(order.sql());
            }
        }
        if let Some(limit) = self.limit {
            r.push(" LIMIT ");
            r.push(&limit.to_string());
        }
        r.finish()
    }
}

/// Builder for `INSERT` statements
#[derive(Debug, Clone)]
pub struct Insert {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    returning: bool,
}

impl Insert {
    /// `INSERT INTO table`
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            returning: false,
        }
    }

    /// Set the column list
    #[must_use]
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    /// Append one row of values; length must match the column list
    #[must_use]
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Append `RETURNING *`
    #[must_use]
    pub fn returning_all(mut self) -> Self {
        self.returning = true;
        self
    }

    /// Render to executable form.
    ///
    /// # Errors
    ///
    /// [`Error::Payload`] when there are no columns, no rows, or a row whose
    /// length differs from the column list.
    pub fn render(&self) -> Result<SqlStatement> {
        if self.columns.is_empty() {
            return Err(Error::Payload("no columns to insert".to_string()));
        }
        if self.rows.is_empty() {
            return Err(Error::Payload("no rows to insert".to_string()));
        }
        for row in &self.rows {
            if row.len() != self.columns.len() {
                return Err(Error::Payload(format!(
                    "row has {} values but {} columns were declared",
                    row.len(),
                    self.columns.len()
                )));
            }
        }

        let mut r = Renderer::new();
        r.push("INSERT INTO ");
        r.ident(&self.table);
        r.push(" (");
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                r.push(", ");
            }
            r.ident(column);
        }
        r.push(") VALUES ");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                r.push(", ");
            }
            r.push("(");
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    r.push(", ");
                }
                r.value(value);
            }
            r.push(")");
        }
        if self.returning {
            r.push(" RETURNING *");
        }
        Ok(r.finish())
    }
}

/// Builder for `UPDATE` statements
#[derive(Debug, Clone)]
pub struct Update {
    table: String,
    assignments: Vec<(String, Value)>,
    predicates: Vec<Expr>,
}

impl Update {
    /// `UPDATE table`
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            assignments: Vec::new(),
            predicates: Vec::new(),
        }
    }

    /// Add one `SET` assignment
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.assignments.push((column.into(), value.into()));
        self
    }

    /// Add every `SET` assignment
    #[must_use]
    pub fn set_all(mut self, assignments: impl IntoIterator<Item = (String, Value)>) -> Self {
        self.assignments.extend(assignments);
        self
    }

    /// Add every predicate to the `WHERE` conjunction
    #[must_use]
    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Expr>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Render to executable form.
    ///
    /// # Errors
    ///
    /// [`Error::Payload`] when there are no assignments.
    pub fn render(&self) -> Result<SqlStatement> {
        if self.assignments.is_empty() {
            return Err(Error::Payload("no columns to update".to_string()));
        }
        let mut r = Renderer::new();
        r.push("UPDATE ");
        r.ident(&self.table);
        r.push(" SET ");
        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                r.push(", ");
            }
            r.ident(column);
            r.push(" = ");
            r.value(value);
        }
        render_where(&mut r, &self.predicates);
        Ok(r.finish())
    }
}

/// Builder for `DELETE` statements
#[derive(Debug, Clone)]
pub struct Delete {
    table: String,
    predicates: Vec<Expr>,
}

impl Delete {
    /// `DELETE FROM table`
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
        }
    }

    /// Add every predicate to the `WHERE` conjunction
    #[must_use]
    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Expr>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    /// Render to executable form
    pub fn render(&self) -> SqlStatement {
        let mut r = Renderer::new();
        r.push("DELETE FROM ");
        r.ident(&self.table);
        render_where(&mut r, &self.predicates);
        r.finish()
    }
}

fn render_where(r: &mut Renderer, predicates: &[Expr]) {
    if predicates.is_empty() {
        return;
    }
    r.push(" WHERE ");
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            r.push(" AND ");
        }
        predicate.render(r);
    }
}
