//! Core types and traits for sqlrepo.
//!
//! This crate defines the building blocks shared by the query composer and
//! the repository layer:
//!
//! - [`Value`] - dynamically typed SQL values for binding and materialization
//! - [`Error`] / [`Result`] - the error taxonomy for the whole engine
//! - [`Entity`] - the contract mapping a struct to a table or view
//! - [`ColumnDef`] - per-column metadata with compiled get/set accessors
//! - [`TableDefinition`] / [`TableCache`] - memoized schema metadata with
//!   pre-rendered SQL statement templates
//! - [`Connection`] - the opaque execution capability the engine drives
//! - [`SqlTemplate`] - the per-dialect statement format record

pub mod accessor;
pub mod connection;
pub mod entity;
pub mod error;
pub mod row;
pub mod table;
pub mod template;
pub mod value;

pub use accessor::{ColumnDef, FromValue};
pub use connection::{Command, Connection, ConnectionExt, RowCursor};
pub use entity::Entity;
pub use error::{Error, Result};
pub use row::{ColumnNames, Row};
pub use table::{ColumnAccessor, TableCache, TableDefinition};
pub use template::SqlTemplate;
pub use value::Value;
