//! Transaction-backed [`Session`] implementation over PostgreSQL
//!
//! Available behind the `database` feature. A [`PgSession`] wraps one sqlx
//! transaction started from a pool: statements run inside it, `commit` is
//! explicit, and dropping the session uncommitted rolls the transaction
//! back.
//!
//! Result columns decode by Postgres type name into [`Value`]s; columns of
//! types this layer does not model decode as `NULL`.
//!
//! # Example
//!
//! ```rust,ignore
//! use crudkit::postgres::PgSession;
//!
//! let pool = sqlx::PgPool::connect(&url).await?;
//! let mut session = PgSession::begin(&pool).await?;
//! let user = crud.find_by_id(&mut session, 42_i64).await?;
//! session.commit().await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::{Column, Postgres, Row as _, Transaction, TypeInfo};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::session::{Row, Session};
use crate::statement::SqlStatement;
use crate::value::Value;

/// A [`Session`] bound to one PostgreSQL transaction
pub struct PgSession {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    /// Begin a transaction on the pool and wrap it as a session
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self { tx: Some(tx) })
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| Error::Storage("session already committed".to_string()))
    }
}

#[async_trait]
impl Session for PgSession {
    async fn fetch_all(&mut self, statement: &SqlStatement) -> Result<Vec<Row>> {
        tracing::trace!(
            sql = %statement.sql,
            bind_count = statement.params.len(),
            "fetching rows"
        );
        let tx = self.tx()?;
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.params {
            query = bind_value(query, value);
        }
        let rows = query.fetch_all(&mut **tx).await?;
        tracing::trace!(row_count = rows.len(), "rows fetched");
        Ok(rows.iter().map(decode_row).collect())
    }

    async fn execute(&mut self, statement: &SqlStatement) -> Result<u64> {
        tracing::trace!(
            sql = %statement.sql,
            bind_count = statement.params.len(),
            "executing statement"
        );
        let tx = self.tx()?;
        let mut query = sqlx::query(&statement.sql);
        for value in &statement.params {
            query = bind_value(query, value);
        }
        let done = query.execute(&mut **tx).await?;
        tracing::trace!(rows_affected = done.rows_affected(), "statement executed");
        Ok(done.rows_affected())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Storage("session already committed".to_string()))?;
        tx.commit().await?;
        Ok(())
    }
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Uuid(u) => query.bind(*u),
        Value::Timestamp(t) => query.bind(*t),
        Value::Date(d) => query.bind(*d),
        Value::Json(j) => query.bind(j.clone()),
    }
}

/// Decode a driver row into column name/value pairs by type name.
fn decode_row(row: &PgRow) -> Row {
    let mut out = Row::new();
    for column in row.columns() {
        let name = column.name();
        let value: Option<Value> = match column.type_info().name() {
            "BOOL" => row
                .try_get::<Option<bool>, _>(name)
                .ok()
                .flatten()
                .map(Value::Bool),
            "INT2" => row
                .try_get::<Option<i16>, _>(name)
                .ok()
                .flatten()
                .map(|n| Value::Int(i64::from(n))),
            "INT4" => row
                .try_get::<Option<i32>, _>(name)
                .ok()
                .flatten()
                .map(|n| Value::Int(i64::from(n))),
            "INT8" => row
                .try_get::<Option<i64>, _>(name)
                .ok()
                .flatten()
                .map(Value::Int),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(name)
                .ok()
                .flatten()
                .map(|f| Value::Float(f64::from(f))),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(name)
                .ok()
                .flatten()
                .map(Value::Float),
            "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => row
                .try_get::<Option<String>, _>(name)
                .ok()
                .flatten()
                .map(Value::Text),
            "UUID" => row
                .try_get::<Option<Uuid>, _>(name)
                .ok()
                .flatten()
                .map(Value::Uuid),
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(name)
                .ok()
                .flatten()
                .map(Value::Timestamp),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(name)
                .ok()
                .flatten()
                .map(|naive| Value::Timestamp(DateTime::from_naive_utc_and_offset(naive, Utc))),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(name)
                .ok()
                .flatten()
                .map(Value::Date),
            "JSON" | "JSONB" => row
                .try_get::<Option<JsonValue>, _>(name)
                .ok()
                .flatten()
                .map(Value::Json),
            _ => None,
        };
        out.push(name, value.unwrap_or(Value::Null));
    }
    out
}
