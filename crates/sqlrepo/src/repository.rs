//! The repository: CRUD and typed-predicate queries over one connection.
//!
//! A [`Repository`] pairs an entity type with a shared connection and the
//! entity's cached [`TableDefinition`]. Every operation serializes through
//! the repository's own lock (so multi-statement operations like
//! insert-then-fetch run atomically per instance) and then through the
//! shared connection lock while each statement executes.
//!
//! Absence is not an error: lookups return `Option`, and an update whose
//! WHERE matched nothing returns `Ok(None)`.

use std::sync::{Arc, Mutex, MutexGuard};

use sqlrepo_core::{
    ColumnAccessor, ColumnNames, Connection, ConnectionExt, Entity, Error, Result, Row,
    SqlTemplate, TableCache, TableDefinition, Value,
};
use sqlrepo_query::{bind_predicate, Predicate, SqlBuilder};
use tracing::debug;

use crate::config::RepositoryOptions;
use crate::delta::Delta;

/// Typed repository over a shared connection.
pub struct Repository<E: Entity, C: Connection> {
    connection: Arc<Mutex<C>>,
    table: Arc<TableDefinition<E>>,
    options: RepositoryOptions,
    gate: Mutex<()>,
}

impl<E: Entity, C: Connection> Repository<E, C> {
    /// Create a repository with the default dialect, the process-wide
    /// metadata cache and default options.
    pub fn new(connection: Arc<Mutex<C>>) -> Self {
        Self::configured(
            connection,
            &SqlTemplate::default(),
            TableCache::global(),
            RepositoryOptions::default(),
        )
    }

    /// Create a repository with an explicit dialect, cache and options.
    pub fn configured(
        connection: Arc<Mutex<C>>,
        dialect: &SqlTemplate,
        cache: &TableCache,
        options: RepositoryOptions,
    ) -> Self {
        Self {
            connection,
            table: cache.definition::<E>(dialect),
            options,
            gate: Mutex::new(()),
        }
    }

    /// The entity's table definition.
    pub fn table(&self) -> &TableDefinition<E> {
        &self.table
    }

    /// This repository's configuration.
    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// A builder over the entity's SELECT template, ready for clauses.
    pub fn select_builder(&self) -> SqlBuilder {
        SqlBuilder::for_dialect(self.table.select_template(), self.table.template())
    }

    /// Insert an entity and return its persisted state.
    ///
    /// Identity tables execute the insert as a scalar to obtain the
    /// generated key, then fetch the row back. Keyed tables re-fetch by
    /// the entity's own keys; keyless tables return the input unchanged.
    /// An insert that stores nothing fails with [`Error::InsertFailed`].
    pub fn add(&self, entity: E) -> Result<E> {
        let _guard = self.guard();
        let sql = self.table.insert_template().to_string();
        let params: Vec<(String, Value)> = self
            .table
            .members()
            .iter()
            .filter(|m| !m.is_identity())
            .map(|m| (m.name().to_string(), m.get(&entity)))
            .collect();

        if self.table.has_identity() {
            let key = self
                .with_connection(|conn| conn.execute_scalar(&sql, &params))?
                .ok_or(Error::InsertFailed {
                    table: self.table.table_name(),
                })?;
            let mut keys = self.entity_keys(&entity);
            if let Some(pos) = self
                .table
                .key_columns()
                .iter()
                .position(|m| m.is_identity())
            {
                keys[pos] = key;
            }
            return self.find_inner(&keys)?.ok_or(Error::InsertFailed {
                table: self.table.table_name(),
            });
        }

        let affected = self.with_connection(|conn| conn.execute(&sql, &params))?;
        if affected == 0 {
            return Err(Error::InsertFailed {
                table: self.table.table_name(),
            });
        }
        if self.table.key_columns().is_empty() {
            return Ok(entity);
        }
        let keys = self.entity_keys(&entity);
        Ok(self.find_inner(&keys)?.unwrap_or(entity))
    }

    /// Delete the row matching the entity's key values.
    pub fn remove(&self, entity: &E) -> Result<bool> {
        let _guard = self.guard();
        let key_columns = self.table.key_columns();
        if key_columns.is_empty() {
            return Err(Error::NoPrimaryKey {
                table: self.table.table_name(),
            });
        }
        let mut builder =
            SqlBuilder::for_dialect(self.table.delete_template(), self.table.template());
        for member in key_columns {
            builder = Self::bind_key(builder, member, member.get(entity))?;
        }
        let (sql, params) = Self::consume(&mut builder);
        let affected = self.with_connection(|conn| conn.execute(&sql, &params))?;
        Ok(affected > 0)
    }

    /// Update the row matching the entity's key values.
    ///
    /// In delta mode (the default) the current row is fetched and only the
    /// columns that actually differ are written; an update with nothing to
    /// write skips the statement and returns the input unchanged. Returns
    /// the persisted row, or `None` when the write matched nothing.
    pub fn update(&self, entity: &E) -> Result<Option<E>> {
        let _guard = self.guard();
        if self.table.key_columns().is_empty() {
            return Err(Error::NoPrimaryKey {
                table: self.table.table_name(),
            });
        }
        if self.options.update_changed_only {
            self.update_delta(entity)
        } else {
            self.update_full(entity)
        }
    }

    /// Fetch one row by primary key values, in column declaration order.
    ///
    /// A null key value binds as `IS NULL`. Entities without a primary key
    /// fail with [`Error::NoPrimaryKey`], and a key count that does not
    /// match the declared key columns fails with [`Error::KeyMismatch`],
    /// both before any SQL is issued.
    pub fn find(&self, keys: &[Value]) -> Result<Option<E>> {
        let _guard = self.guard();
        self.find_inner(keys)
    }

    /// Fetch every row matching a typed predicate.
    pub fn query(&self, predicate: &Predicate) -> Result<Vec<E>> {
        let _guard = self.guard();
        let mut builder = bind_predicate(self.select_builder(), &self.table, predicate)?;
        self.fetch_inner(&mut builder)
    }

    /// Count the rows matching a typed predicate.
    pub fn count(&self, predicate: &Predicate) -> Result<u64> {
        let _guard = self.guard();
        let builder = SqlBuilder::for_dialect(self.table.count_template(), self.table.template());
        let mut builder = bind_predicate(builder, &self.table, predicate)?;
        let (sql, params) = Self::consume(&mut builder);
        let scalar = self.with_connection(|conn| conn.execute_scalar(&sql, &params))?;
        Ok(scalar
            .and_then(|v| v.as_i64())
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0))
    }

    /// Execute a prepared builder and materialize every row.
    ///
    /// Consumes the builder: a second execution, or any later clause
    /// mutation, fails with [`Error::AlreadyExecuted`].
    pub fn fetch(&self, builder: &mut SqlBuilder) -> Result<Vec<E>> {
        let _guard = self.guard();
        self.fetch_inner(builder)
    }

    /// Execute raw SQL with named parameters and materialize every row.
    pub fn execute_query(&self, sql: &str, params: &[(String, Value)]) -> Result<Vec<E>> {
        let _guard = self.guard();
        let rows = self.with_connection(|conn| conn.query_rows(sql, params))?;
        self.materialize_rows(rows)
    }

    fn update_full(&self, entity: &E) -> Result<Option<E>> {
        let mut builder =
            SqlBuilder::for_dialect(self.table.update_template(), self.table.template());
        for member in self
            .table
            .members()
            .iter()
            .filter(|m| !m.is_primary_key() && !m.is_identity())
        {
            builder.add_parameter(member.name(), member.get(entity))?;
        }
        for member in self.table.key_columns() {
            builder = Self::bind_key(builder, member, member.get(entity))?;
        }
        self.apply_update(builder, entity)
    }

    fn update_delta(&self, entity: &E) -> Result<Option<E>> {
        let keys = self.entity_keys(entity);
        let current = self.find_inner(&keys)?.ok_or(Error::NullEntity {
            operation: "delta update",
        })?;

        let mut delta = Delta::with_table(entity, Arc::clone(&self.table));
        delta.compare(&current, true);
        let changed: Vec<&ColumnAccessor<E>> = delta
            .changed_properties()
            .into_iter()
            .filter(|m| !m.is_primary_key() && !m.is_identity())
            .collect();
        if changed.is_empty() {
            debug!(table = self.table.table_name(), "no changed columns, skipping write");
            // Nothing written, so hand the caller's own state back.
            let mut unchanged = E::blank();
            for member in self.table.members() {
                member.copy(entity, &mut unchanged)?;
            }
            return Ok(Some(unchanged));
        }

        let set_list = changed
            .iter()
            .map(|m| m.update_fragment())
            .collect::<Vec<_>>()
            .join(", ");
        let quoted_table = self.table.template().enquote(self.table.table_name());
        let sql = self.table.template().update_stmt(&quoted_table, &set_list);
        let mut builder = SqlBuilder::for_dialect(sql, self.table.template());
        for member in &changed {
            builder.add_parameter(member.name(), member.get(entity))?;
        }
        for member in self.table.key_columns() {
            builder = Self::bind_key(builder, member, member.get(entity))?;
        }
        self.apply_update(builder, entity)
    }

    fn apply_update(&self, mut builder: SqlBuilder, entity: &E) -> Result<Option<E>> {
        let (sql, params) = Self::consume(&mut builder);
        let affected = self.with_connection(|conn| conn.execute(&sql, &params))?;
        if affected == 0 {
            return Ok(None);
        }
        self.find_inner(&self.entity_keys(entity))
    }

    fn find_inner(&self, keys: &[Value]) -> Result<Option<E>> {
        let key_columns = self.table.key_columns();
        if key_columns.is_empty() {
            return Err(Error::NoPrimaryKey {
                table: self.table.table_name(),
            });
        }
        if keys.len() != key_columns.len() {
            return Err(Error::KeyMismatch {
                table: self.table.table_name(),
                expected: key_columns.len(),
                actual: keys.len(),
            });
        }
        let mut builder = self.select_builder();
        for (member, key) in key_columns.into_iter().zip(keys) {
            builder = Self::bind_key(builder, member, key.clone())?;
        }
        let mut builder = builder.take(1)?;
        let (sql, params) = Self::consume(&mut builder);
        match self.with_connection(|conn| conn.query_first(&sql, &params))? {
            Some(row) => {
                let map = self.member_map(&row.column_names());
                Ok(Some(self.materialize_row(&row, &map)?))
            }
            None => Ok(None),
        }
    }

    fn fetch_inner(&self, builder: &mut SqlBuilder) -> Result<Vec<E>> {
        if builder.is_executed() {
            return Err(Error::AlreadyExecuted);
        }
        let (sql, params) = Self::consume(builder);
        let rows = self.with_connection(|conn| conn.query_rows(&sql, &params))?;
        self.materialize_rows(rows)
    }

    /// Render the statement, snapshot the parameters and freeze the builder.
    fn consume(builder: &mut SqlBuilder) -> (String, Vec<(String, Value)>) {
        let sql = builder.raw_sql().to_string();
        let params = builder.parameters().entries().to_vec();
        builder.mark_executed();
        (sql, params)
    }

    fn bind_key(
        mut builder: SqlBuilder,
        member: &ColumnAccessor<E>,
        key: Value,
    ) -> Result<SqlBuilder> {
        if key.is_null() {
            builder.where_(format!("{} IS NULL", member.quoted_db_name()))
        } else {
            let name = builder.add_positional(key)?;
            builder.where_(format!("{} = @{name}", member.quoted_db_name()))
        }
    }

    fn entity_keys(&self, entity: &E) -> Vec<Value> {
        self.table
            .key_columns()
            .iter()
            .map(|m| m.get(entity))
            .collect()
    }

    /// Map result-set field positions to member indices, once per result
    /// set. Unmatched result columns are skipped during materialization.
    fn member_map(&self, columns: &ColumnNames) -> Vec<Option<usize>> {
        columns
            .names()
            .iter()
            .map(|name| {
                self.table.members().iter().position(|m| {
                    m.name().eq_ignore_ascii_case(name)
                        || m.column_name().eq_ignore_ascii_case(name)
                })
            })
            .collect()
    }

    fn materialize_row(&self, row: &Row, map: &[Option<usize>]) -> Result<E> {
        let members = self.table.members();
        let mut entity = E::blank();
        for (field, slot) in map.iter().enumerate() {
            let Some(member) = slot.map(|i| &members[i]) else {
                continue;
            };
            if let Some(value) = row.get(field) {
                member.set(&mut entity, value.clone())?;
            }
        }
        Ok(entity)
    }

    fn materialize_rows(&self, rows: Vec<Row>) -> Result<Vec<E>> {
        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let map = self.member_map(&first.column_names());
        rows.iter()
            .map(|row| self.materialize_row(row, &map))
            .collect()
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_connection<T>(&self, body: impl FnOnce(&mut C) -> Result<T>) -> Result<T> {
        let mut conn = self.connection.lock().unwrap_or_else(|e| e.into_inner());
        body(&mut conn)
    }
}
