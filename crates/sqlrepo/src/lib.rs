//! sqlrepo - typed-predicate repositories over any SQL connection.
//!
//! The engine maps plain structs to tables through an [`Entity`]
//! implementation, translates typed boolean predicates into parameterized
//! SQL, and runs CRUD through a [`Repository`] that serializes access to
//! a shared connection. Drivers plug in by implementing the small
//! `Connection`/`Command`/`RowCursor` capability; dialects plug in by
//! swapping the [`SqlTemplate`](sqlrepo_core::SqlTemplate) record.
//!
//! # Quick start
//!
//! ```
//! use sqlrepo::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Hero {
//!     id: Option<i64>,
//!     name: String,
//!     age: Option<i64>,
//! }
//!
//! impl Entity for Hero {
//!     const TABLE_NAME: &'static str = "heroes";
//!
//!     fn columns() -> Vec<ColumnDef<Self>> {
//!         vec![
//!             ColumnDef::new(
//!                 "Id",
//!                 |e: &Self| Value::from(e.id),
//!                 |e: &mut Self, v| {
//!                     e.id = FromValue::from_value(v, "Id")?;
//!                     Ok(())
//!                 },
//!             )
//!             .primary_key(true)
//!             .identity(true),
//!             ColumnDef::new(
//!                 "Name",
//!                 |e: &Self| Value::from(e.name.clone()),
//!                 |e: &mut Self, v| {
//!                     e.name = FromValue::from_value(v, "Name")?;
//!                     Ok(())
//!                 },
//!             ),
//!             ColumnDef::new(
//!                 "Age",
//!                 |e: &Self| Value::from(e.age),
//!                 |e: &mut Self, v| {
//!                     e.age = FromValue::from_value(v, "Age")?;
//!                     Ok(())
//!                 },
//!             ),
//!         ]
//!     }
//!
//!     fn blank() -> Self {
//!         Self::default()
//!     }
//! }
//!
//! fn adults<C: Connection>(repo: &Repository<Hero, C>) -> Result<Vec<Hero>> {
//!     repo.query(&col("Age").ge(18).and(col("Name").starts_with("J")))
//! }
//! ```

pub mod config;
pub mod delta;
pub mod repository;

pub use config::RepositoryOptions;
pub use delta::Delta;
pub use repository::Repository;

pub use sqlrepo_core::{
    ColumnAccessor, ColumnDef, Command, Connection, ConnectionExt, Entity, Error, FromValue,
    Result, Row, RowCursor, SqlTemplate, TableCache, TableDefinition, Value,
};
pub use sqlrepo_query::{col, ParameterBag, Predicate, SqlBuilder};

/// Convenient single import.
///
/// ```
/// use sqlrepo::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        col, ColumnDef, Connection, ConnectionExt, Delta, Entity, Error, FromValue, Predicate,
        Repository, RepositoryOptions, Result, Row, SqlBuilder, SqlTemplate, TableCache, Value,
    };
}
