//! The generic CRUD facade
//!
//! [`Crud<T>`] bundles the filter compiler, sort normalizer, row counter
//! and statement builders behind the operations callers actually want:
//! create one/many, find by id or by filter, update and delete by id or by
//! filter. Every operation is bound to a caller-supplied
//! [`Session`](crate::session::Session); mutations take an explicit
//! `commit` flag and otherwise leave durability to the session's outer
//! transaction.
//!
//! Filter-based mutations are guarded: the facade counts matching rows
//! first and refuses to touch more than one row unless `allow_multiple` is
//! set. The count and the mutation are separate statements; under
//! concurrent writers the guard is only as strong as the session's
//! isolation level.
//!
//! # Example
//!
//! ```rust,ignore
//! use crudkit::prelude::*;
//!
//! let crud = Crud::<User>::new();
//! let mut session = PgSession::begin(&pool).await?;
//!
//! let user = crud.create(&mut session, &NewUser { name: "alice".into() }, false).await?;
//! let adults = crud
//!     .find_all_sorted(
//!         &mut session,
//!         &filters! { "age__ge" => 18 },
//!         &Sort::by("name"),
//!     )
//!     .await?;
//! session.commit().await?;
//! ```

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::expr::{BinaryOperator, Expr};
use crate::filter::{compile_filters, Filter};
use crate::schema::{resolve, ColumnRef, Entity, Table};
use crate::session::{FromRow, Row, Session};
use crate::sort::{apply_sorting, Sort};
use crate::statement::{Delete, Insert, Select, Update};
use crate::value::Value;

/// Options for [`Crud::delete_by_filter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeleteOptions {
    /// Permit deleting more than one matching row
    pub allow_multiple: bool,
    /// Mark rows deleted via a flag column instead of removing them
    pub logical: bool,
    /// The boolean column set to `TRUE` by logical deletion
    pub flag_column: String,
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self {
            allow_multiple: false,
            logical: false,
            flag_column: "del_flag".to_string(),
        }
    }
}

/// Generic CRUD operations for one entity type
///
/// The facade is stateless apart from the primary-key column chosen at
/// construction, so it is cheap to create and freely shareable.
pub struct Crud<T> {
    primary_key: Option<&'static str>,
    _entity: PhantomData<T>,
}

impl<T> Crud<T>
where
    T: Entity + FromRow,
{
    /// Create the facade for `T`.
    ///
    /// Composite primary keys are not supported: when the entity declares
    /// more than one key column, the first is used and a diagnostic is
    /// logged.
    pub fn new() -> Self {
        let keys = T::primary_keys();
        if keys.len() > 1 {
            tracing::warn!(
                entity = T::table(),
                using = keys[0],
                "composite primary keys are not supported, using the first declared key column"
            );
        }
        Self {
            primary_key: keys.first().copied(),
            _entity: PhantomData,
        }
    }

    fn source(&self) -> Table<T> {
        Table::new()
    }

    fn primary_key(&self) -> Result<ColumnRef> {
        self.primary_key
            .map(ColumnRef::new)
            .ok_or(Error::NoPrimaryKey(T::table()))
    }

    fn id_predicate(&self, id: Value) -> Result<Expr> {
        Ok(Expr::binary(
            Expr::Column(self.primary_key()?),
            BinaryOperator::Eq,
            Expr::Value(id),
        ))
    }

    /// Serialize a payload to column/value pairs, checking every column
    /// against the schema.
    fn checked_values<P>(&self, payload: &P) -> Result<Vec<(String, Value)>>
    where
        P: Serialize,
    {
        let values = column_values(payload)?;
        for (column, _) in &values {
            resolve(&self.source(), column)?;
        }
        Ok(values)
    }

    async fn commit_if_needed<S>(&self, session: &mut S, commit: bool) -> Result<()>
    where
        S: Session + ?Sized,
    {
        if commit {
            session.commit().await
        } else {
            Ok(())
        }
    }

    async fn count_where<S>(&self, session: &mut S, predicates: Vec<Expr>) -> Result<u64>
    where
        S: Session + ?Sized,
    {
        let stmt = Select::count_from(T::table())
            .filter_all(predicates)
            .render();
        let rows = session.fetch_all(&stmt).await?;
        let count = rows
            .first()
            .and_then(Row::first)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    /// Insert one row and return the created entity.
    pub async fn create<S, P>(&self, session: &mut S, payload: &P, commit: bool) -> Result<T>
    where
        S: Session + ?Sized,
        P: Serialize,
    {
        self.create_with(session, payload, &[], commit).await
    }

    /// Insert one row with extra column values merged over the payload.
    ///
    /// Overrides replace payload columns of the same name and may add
    /// columns the payload does not carry.
    pub async fn create_with<S, P>(
        &self,
        session: &mut S,
        payload: &P,
        overrides: &[(&str, Value)],
        commit: bool,
    ) -> Result<T>
    where
        S: Session + ?Sized,
        P: Serialize,
    {
        let mut values = self.checked_values(payload)?;
        for (column, value) in overrides {
            resolve(&self.source(), column)?;
            match values.iter().position(|(existing, _)| existing == column) {
                Some(index) => values[index].1 = value.clone(),
                None => values.push(((*column).to_string(), value.clone())),
            }
        }

        let (columns, row): (Vec<String>, Vec<Value>) = values.into_iter().unzip();
        let stmt = Insert::into(T::table())
            .columns(columns)
            .row(row)
            .returning_all()
            .render()?;
        let rows = session.fetch_all(&stmt).await?;
        let created = rows
            .first()
            .ok_or_else(|| Error::Storage("insert returned no rows".to_string()))?;
        let entity = T::from_row(created)?;
        self.commit_if_needed(session, commit).await?;
        Ok(entity)
    }

    /// Insert many rows in one statement and return the created entities.
    ///
    /// All payloads must serialize to the same column set.
    pub async fn create_many<S, P>(
        &self,
        session: &mut S,
        payloads: &[P],
        commit: bool,
    ) -> Result<Vec<T>>
    where
        S: Session + ?Sized,
        P: Serialize,
    {
        let Some(first) = payloads.first() else {
            return Ok(Vec::new());
        };

        let head = self.checked_values(first)?;
        let columns: Vec<String> = head.iter().map(|(column, _)| column.clone()).collect();
        let mut insert = Insert::into(T::table())
            .columns(columns.clone())
            .row(head.into_iter().map(|(_, value)| value).collect())
            .returning_all();

        for payload in &payloads[1..] {
            let values = self.checked_values(payload)?;
            if values.len() != columns.len() {
                return Err(Error::Payload(
                    "all payloads must serialize to the same column set".to_string(),
                ));
            }
            let mut row = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = values
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, value)| value.clone())
                    .ok_or_else(|| {
                        Error::Payload(format!("payload is missing column `{column}`"))
                    })?;
                row.push(value);
            }
            insert = insert.row(row);
        }

        let stmt = insert.render()?;
        let rows = session.fetch_all(&stmt).await?;
        let entities = rows.iter().map(T::from_row).collect::<Result<Vec<_>>>()?;
        self.commit_if_needed(session, commit).await?;
        Ok(entities)
    }

    /// Fetch one entity by primary key.
    pub async fn find_by_id<S>(&self, session: &mut S, id: impl Into<Value>) -> Result<Option<T>>
    where
        S: Session + ?Sized,
    {
        let stmt = Select::from(T::table())
            .filter(self.id_predicate(id.into())?)
            .limit(1)
            .render();
        let rows = session.fetch_all(&stmt).await?;
        rows.first().map(T::from_row).transpose()
    }

    /// Fetch the first entity matching a filter.
    pub async fn find_one<S>(&self, session: &mut S, filter: &Filter) -> Result<Option<T>>
    where
        S: Session + ?Sized,
    {
        let compiled = compile_filters(&self.source(), filter)?;
        let stmt = Select::from(T::table())
            .filter_all(compiled.predicates)
            .limit(1)
            .render();
        let rows = session.fetch_all(&stmt).await?;
        rows.first().map(T::from_row).transpose()
    }

    /// Fetch every entity matching a filter.
    pub async fn find_all<S>(&self, session: &mut S, filter: &Filter) -> Result<Vec<T>>
    where
        S: Session + ?Sized,
    {
        let compiled = compile_filters(&self.source(), filter)?;
        let stmt = Select::from(T::table())
            .filter_all(compiled.predicates)
            .render();
        let rows = session.fetch_all(&stmt).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Fetch every entity matching a filter, ordered by a sort
    /// specification.
    pub async fn find_all_sorted<S>(
        &self,
        session: &mut S,
        filter: &Filter,
        sort: &Sort,
    ) -> Result<Vec<T>>
    where
        S: Session + ?Sized,
    {
        let compiled = compile_filters(&self.source(), filter)?;
        let stmt = Select::from(T::table()).filter_all(compiled.predicates);
        let stmt = apply_sorting(&self.source(), stmt, sort)?;
        let rows = session.fetch_all(&stmt.render()).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Count the rows matching a filter.
    pub async fn count<S>(&self, session: &mut S, filter: &Filter) -> Result<u64>
    where
        S: Session + ?Sized,
    {
        let compiled = compile_filters(&self.source(), filter)?;
        self.count_where(session, compiled.predicates).await
    }

    /// True when at least one row matches the filter.
    pub async fn exists<S>(&self, session: &mut S, filter: &Filter) -> Result<bool>
    where
        S: Session + ?Sized,
    {
        Ok(self.count(session, filter).await? > 0)
    }

    /// Update one row by primary key, returning the storage-reported
    /// affected-row count.
    pub async fn update_by_id<S, P>(
        &self,
        session: &mut S,
        id: impl Into<Value>,
        changes: &P,
        commit: bool,
    ) -> Result<u64>
    where
        S: Session + ?Sized,
        P: Serialize,
    {
        let assignments = self.checked_values(changes)?;
        let stmt = Update::table(T::table())
            .set_all(assignments)
            .filter_all([self.id_predicate(id.into())?])
            .render()?;
        let affected = session.execute(&stmt).await?;
        self.commit_if_needed(session, commit).await?;
        Ok(affected)
    }

    /// Update the rows matching a filter, returning the storage-reported
    /// affected-row count.
    ///
    /// The matching rows are counted first; without `allow_multiple` a
    /// count above one fails with [`Error::MultipleResults`] before any
    /// mutation is issued.
    pub async fn update_by_filter<S, P>(
        &self,
        session: &mut S,
        changes: &P,
        filter: &Filter,
        allow_multiple: bool,
        commit: bool,
    ) -> Result<u64>
    where
        S: Session + ?Sized,
        P: Serialize,
    {
        let assignments = self.checked_values(changes)?;
        let compiled = compile_filters(&self.source(), filter)?;
        let stmt = Update::table(T::table())
            .set_all(assignments)
            .filter_all(compiled.predicates.clone())
            .render()?;

        let total = self.count_where(session, compiled.predicates).await?;
        if !allow_multiple && total > 1 {
            return Err(Error::MultipleResults {
                operation: "updated",
                found: total,
            });
        }

        let affected = session.execute(&stmt).await?;
        self.commit_if_needed(session, commit).await?;
        Ok(affected)
    }

    /// Delete one row by primary key, returning the storage-reported
    /// affected-row count.
    pub async fn delete_by_id<S>(
        &self,
        session: &mut S,
        id: impl Into<Value>,
        commit: bool,
    ) -> Result<u64>
    where
        S: Session + ?Sized,
    {
        let stmt = Delete::from(T::table())
            .filter_all([self.id_predicate(id.into())?])
            .render();
        let affected = session.execute(&stmt).await?;
        self.commit_if_needed(session, commit).await?;
        Ok(affected)
    }

    /// Delete the rows matching a filter, physically or logically.
    ///
    /// The same pre-mutation guard as [`Crud::update_by_filter`] applies.
    /// With [`DeleteOptions::logical`] set, the rows are kept and
    /// [`DeleteOptions::flag_column`] is set to `TRUE` instead.
    ///
    /// Returns the **pre-mutation match count**, not the storage-reported
    /// affected-row count. This is an inherited contract this facade
    /// preserves, deliberately different from [`Crud::update_by_filter`] and
    /// [`Crud::delete_by_id`].
    pub async fn delete_by_filter<S>(
        &self,
        session: &mut S,
        filter: &Filter,
        options: &DeleteOptions,
        commit: bool,
    ) -> Result<u64>
    where
        S: Session + ?Sized,
    {
        let compiled = compile_filters(&self.source(), filter)?;
        let stmt = if options.logical {
            let flag = resolve(&self.source(), &options.flag_column)?;
            Update::table(T::table())
                .set(flag.name, true)
                .filter_all(compiled.predicates.clone())
                .render()?
        } else {
            Delete::from(T::table())
                .filter_all(compiled.predicates.clone())
                .render()
        };

        let total = self.count_where(session, compiled.predicates).await?;
        if !options.allow_multiple && total > 1 {
            return Err(Error::MultipleResults {
                operation: "deleted",
                found: total,
            });
        }

        session.execute(&stmt).await?;
        self.commit_if_needed(session, commit).await?;
        Ok(total)
    }
}

impl<T> Default for Crud<T>
where
    T: Entity + FromRow,
{
    fn default() -> Self {
        Self::new()
    }
}

fn column_values<P>(payload: &P) -> Result<Vec<(String, Value)>>
where
    P: Serialize,
{
    let json = serde_json::to_value(payload).map_err(|e| Error::Payload(e.to_string()))?;
    match json {
        serde_json::Value::Object(map) => Ok(map
            .into_iter()
            .map(|(column, value)| (column, Value::from_json(value)))
            .collect()),
        _ => Err(Error::Payload(
            "payload must serialize to an object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::*;
    use crate::filters;
    use crate::statement::SqlStatement;

    #[derive(Debug, PartialEq)]
    struct User {
        id: i64,
        name: String,
        active: bool,
    }

    impl Entity for User {
        fn table() -> &'static str {
            "users"
        }

        fn columns() -> &'static [&'static str] {
            &["id", "name", "active", "del_flag"]
        }

        fn primary_keys() -> &'static [&'static str] {
            &["id"]
        }
    }

    impl FromRow for User {
        fn from_row(row: &Row) -> crate::error::Result<Self> {
            Ok(Self {
                id: row.decode_i64("id")?,
                name: row.decode_string("name")?,
                active: row.decode_bool("active")?,
            })
        }
    }

    #[derive(Serialize)]
    struct NewUser {
        name: String,
        active: bool,
    }

    /// Session double that records statements and replays staged results.
    #[derive(Default)]
    struct ScriptedSession {
        fetch_results: VecDeque<Vec<Row>>,
        execute_results: VecDeque<u64>,
        fetched: Vec<SqlStatement>,
        executed: Vec<SqlStatement>,
        commits: usize,
    }

    impl ScriptedSession {
        fn stage_rows(mut self, rows: Vec<Row>) -> Self {
            self.fetch_results.push_back(rows);
            self
        }

        fn stage_count(self, count: i64) -> Self {
            self.stage_rows(vec![Row::new().with("count", count)])
        }

        fn stage_affected(mut self, affected: u64) -> Self {
            self.execute_results.push_back(affected);
            self
        }
    }

    #[async_trait]
    impl Session for ScriptedSession {
        async fn fetch_all(&mut self, statement: &SqlStatement) -> crate::error::Result<Vec<Row>> {
            self.fetched.push(statement.clone());
            Ok(self.fetch_results.pop_front().unwrap_or_default())
        }

        async fn execute(&mut self, statement: &SqlStatement) -> crate::error::Result<u64> {
            self.executed.push(statement.clone());
            Ok(self.execute_results.pop_front().unwrap_or_default())
        }

        async fn commit(&mut self) -> crate::error::Result<()> {
            self.commits += 1;
            Ok(())
        }
    }

    fn user_row(id: i64, name: &str, active: bool) -> Row {
        Row::new()
            .with("id", id)
            .with("name", name)
            .with("active", active)
    }

    fn crud() -> Crud<User> {
        Crud::new()
    }

    #[tokio::test]
    async fn test_create_returns_decoded_entity() {
        let mut session =
            ScriptedSession::default().stage_rows(vec![user_row(1, "alice", true)]);
        let user = crud()
            .create(
                &mut session,
                &NewUser {
                    name: "alice".to_string(),
                    active: true,
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(
            user,
            User {
                id: 1,
                name: "alice".to_string(),
                active: true
            }
        );
        // Payload columns serialize in sorted order.
        assert_eq!(
            session.fetched[0].sql,
            r#"INSERT INTO "users" ("active", "name") VALUES ($1, $2) RETURNING *"#
        );
        assert_eq!(session.commits, 0);
    }

    #[tokio::test]
    async fn test_create_with_overrides_replaces_payload_columns() {
        let mut session =
            ScriptedSession::default().stage_rows(vec![user_row(2, "bot", false)]);
        crud()
            .create_with(
                &mut session,
                &NewUser {
                    name: "alice".to_string(),
                    active: true,
                },
                &[("active", Value::Bool(false))],
                false,
            )
            .await
            .unwrap();
        assert_eq!(
            session.fetched[0].params,
            vec![Value::Bool(false), Value::Text("alice".to_string())]
        );
    }

    #[tokio::test]
    async fn test_create_rejects_undeclared_payload_column() {
        #[derive(Serialize)]
        struct Bogus {
            nickname: String,
        }

        let mut session = ScriptedSession::default();
        let err = crud()
            .create(
                &mut session,
                &Bogus {
                    nickname: "x".to_string(),
                },
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
        assert!(session.fetched.is_empty());
    }

    #[tokio::test]
    async fn test_create_many_builds_one_multi_row_insert() {
        let mut session = ScriptedSession::default()
            .stage_rows(vec![user_row(1, "a", true), user_row(2, "b", false)]);
        let users = crud()
            .create_many(
                &mut session,
                &[
                    NewUser {
                        name: "a".to_string(),
                        active: true,
                    },
                    NewUser {
                        name: "b".to_string(),
                        active: false,
                    },
                ],
                false,
            )
            .await
            .unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(
            session.fetched[0].sql,
            r#"INSERT INTO "users" ("active", "name") VALUES ($1, $2), ($3, $4) RETURNING *"#
        );
    }

    #[tokio::test]
    async fn test_create_many_with_no_payloads_is_a_no_op() {
        let mut session = ScriptedSession::default();
        let users = crud()
            .create_many(&mut session, &Vec::<NewUser>::new(), false)
            .await
            .unwrap();
        assert!(users.is_empty());
        assert!(session.fetched.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_id_selects_on_primary_key() {
        let mut session =
            ScriptedSession::default().stage_rows(vec![user_row(7, "zoe", true)]);
        let user = crud().find_by_id(&mut session, 7_i64).await.unwrap();
        assert_eq!(user.unwrap().id, 7);
        assert_eq!(
            session.fetched[0].sql,
            r#"SELECT * FROM "users" WHERE ("id" = $1) LIMIT 1"#
        );
        assert_eq!(session.fetched[0].params, vec![Value::Int(7)]);
    }

    #[tokio::test]
    async fn test_find_by_id_missing_row_is_none() {
        let mut session = ScriptedSession::default().stage_rows(vec![]);
        let user = crud().find_by_id(&mut session, 7_i64).await.unwrap();
        assert!(user.is_none());
    }

    #[tokio::test]
    async fn test_find_all_applies_compiled_filters() {
        let mut session =
            ScriptedSession::default().stage_rows(vec![user_row(1, "a", true)]);
        let users = crud()
            .find_all(&mut session, &filters! { "active" => true })
            .await
            .unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(
            session.fetched[0].sql,
            r#"SELECT * FROM "users" WHERE ("active" = $1)"#
        );
    }

    #[tokio::test]
    async fn test_find_all_sorted_appends_order_by() {
        let mut session = ScriptedSession::default().stage_rows(vec![]);
        crud()
            .find_all_sorted(
                &mut session,
                &Filter::new(),
                &Sort::by(["name", "id"]),
            )
            .await
            .unwrap();
        assert_eq!(
            session.fetched[0].sql,
            r#"SELECT * FROM "users" ORDER BY "name" ASC, "id" ASC"#
        );
    }

    #[tokio::test]
    async fn test_count_reads_scalar_and_defaults_to_zero() {
        let mut session = ScriptedSession::default().stage_count(5);
        assert_eq!(crud().count(&mut session, &Filter::new()).await.unwrap(), 5);

        let mut empty = ScriptedSession::default().stage_rows(vec![]);
        assert_eq!(crud().count(&mut empty, &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_by_filter_guard_blocks_before_mutation() {
        let mut session = ScriptedSession::default().stage_count(2);
        let err = crud()
            .update_by_filter(
                &mut session,
                &serde_json::json!({ "name": "dup" }),
                &filters! { "active" => true },
                false,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MultipleResults {
                operation: "updated",
                found: 2
            }
        ));
        // The guard fired before any mutation was issued.
        assert!(session.executed.is_empty());
    }

    #[tokio::test]
    async fn test_update_by_filter_returns_storage_rowcount() {
        let mut session = ScriptedSession::default().stage_count(2).stage_affected(5);
        let affected = crud()
            .update_by_filter(
                &mut session,
                &serde_json::json!({ "name": "dup" }),
                &filters! { "active" => true },
                true,
                false,
            )
            .await
            .unwrap();
        assert_eq!(affected, 5);
    }

    #[tokio::test]
    async fn test_update_with_empty_changes_fails_before_session_io() {
        let mut session = ScriptedSession::default();
        let err = crud()
            .update_by_filter(
                &mut session,
                &serde_json::json!({}),
                &Filter::new(),
                true,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Payload(_)));
        assert!(session.fetched.is_empty());
        assert!(session.executed.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_filter_returns_pre_mutation_count() {
        // The storage layer reports a different rowcount; the pre-mutation
        // match count wins.
        let mut session = ScriptedSession::default().stage_count(3).stage_affected(99);
        let deleted = crud()
            .delete_by_filter(
                &mut session,
                &filters! { "active" => false },
                &DeleteOptions {
                    allow_multiple: true,
                    ..DeleteOptions::default()
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(
            session.executed[0].sql,
            r#"DELETE FROM "users" WHERE ("active" = $1)"#
        );
    }

    #[tokio::test]
    async fn test_delete_by_filter_guard_blocks_before_mutation() {
        let mut session = ScriptedSession::default().stage_count(2);
        let err = crud()
            .delete_by_filter(
                &mut session,
                &filters! { "active" => false },
                &DeleteOptions::default(),
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MultipleResults {
                operation: "deleted",
                found: 2
            }
        ));
        assert!(session.executed.is_empty());
    }

    #[tokio::test]
    async fn test_logical_deletion_updates_flag_column() {
        let mut session = ScriptedSession::default().stage_count(2).stage_affected(2);
        let deleted = crud()
            .delete_by_filter(
                &mut session,
                &filters! { "active" => false },
                &DeleteOptions {
                    allow_multiple: true,
                    logical: true,
                    ..DeleteOptions::default()
                },
                false,
            )
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(
            session.executed[0].sql,
            r#"UPDATE "users" SET "del_flag" = $1 WHERE ("active" = $2)"#
        );
        assert_eq!(session.executed[0].params[0], Value::Bool(true));
    }

    #[tokio::test]
    async fn test_logical_deletion_rejects_undeclared_flag_column() {
        let mut session = ScriptedSession::default();
        let err = crud()
            .delete_by_filter(
                &mut session,
                &Filter::new(),
                &DeleteOptions {
                    logical: true,
                    flag_column: "gone".to_string(),
                    ..DeleteOptions::default()
                },
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ColumnNotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_by_id_returns_storage_rowcount() {
        let mut session = ScriptedSession::default().stage_affected(1);
        let affected = crud()
            .update_by_id(
                &mut session,
                9_i64,
                &serde_json::json!({ "name": "renamed" }),
                false,
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);
        assert_eq!(
            session.executed[0].sql,
            r#"UPDATE "users" SET "name" = $1 WHERE ("id" = $2)"#
        );
    }

    #[tokio::test]
    async fn test_delete_by_id_returns_storage_rowcount() {
        let mut session = ScriptedSession::default().stage_affected(1);
        let affected = crud().delete_by_id(&mut session, 9_i64, false).await.unwrap();
        assert_eq!(affected, 1);
        assert_eq!(
            session.executed[0].sql,
            r#"DELETE FROM "users" WHERE ("id" = $1)"#
        );
    }

    #[tokio::test]
    async fn test_commit_flag_commits_exactly_once() {
        let mut session = ScriptedSession::default().stage_affected(1);
        crud()
            .delete_by_id(&mut session, 1_i64, true)
            .await
            .unwrap();
        assert_eq!(session.commits, 1);

        let mut session = ScriptedSession::default().stage_affected(1);
        crud()
            .delete_by_id(&mut session, 1_i64, false)
            .await
            .unwrap();
        assert_eq!(session.commits, 0);
    }

    #[tokio::test]
    async fn test_exists() {
        let mut session = ScriptedSession::default().stage_count(1);
        assert!(crud().exists(&mut session, &Filter::new()).await.unwrap());

        let mut session = ScriptedSession::default().stage_count(0);
        assert!(!crud().exists(&mut session, &Filter::new()).await.unwrap());
    }

    mod composite_keys {
        use super::*;

        #[derive(Debug)]
        struct Membership;

        impl Entity for Membership {
            fn table() -> &'static str {
                "memberships"
            }

            fn columns() -> &'static [&'static str] {
                &["user_id", "group_id"]
            }

            fn primary_keys() -> &'static [&'static str] {
                &["user_id", "group_id"]
            }
        }

        impl FromRow for Membership {
            fn from_row(_row: &Row) -> crate::error::Result<Self> {
                Ok(Self)
            }
        }

        #[tokio::test]
        async fn test_first_key_column_is_used() {
            let mut session = ScriptedSession::default().stage_rows(vec![]);
            Crud::<Membership>::new()
                .find_by_id(&mut session, 1_i64)
                .await
                .unwrap();
            assert_eq!(
                session.fetched[0].sql,
                r#"SELECT * FROM "memberships" WHERE ("user_id" = $1) LIMIT 1"#
            );
        }
    }

    mod keyless {
        use super::*;

        #[derive(Debug)]
        struct Ledger;

        impl Entity for Ledger {
            fn table() -> &'static str {
                "ledger"
            }

            fn columns() -> &'static [&'static str] {
                &["entry"]
            }

            fn primary_keys() -> &'static [&'static str] {
                &[]
            }
        }

        impl FromRow for Ledger {
            fn from_row(_row: &Row) -> crate::error::Result<Self> {
                Ok(Self)
            }
        }

        #[tokio::test]
        async fn test_id_operations_fail_without_a_key() {
            let mut session = ScriptedSession::default();
            let err = Crud::<Ledger>::new()
                .find_by_id(&mut session, 1_i64)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::NoPrimaryKey("ledger")));
        }
    }
}
