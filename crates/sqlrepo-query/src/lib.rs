//! Predicate translation and SQL template composition.
//!
//! This crate turns typed boolean predicates into parameterized SQL:
//!
//! - [`Predicate`] - the explicit predicate AST callers build with [`col`]
//! - [`translate`] - walks the AST into ordered query fragments
//! - [`SqlBuilder`] - accumulates named clauses into a dialect template
//!   and compiles the final SQL text once, lazily
//! - [`ParameterBag`] - the insertion-ordered bind-name to value mapping
//!
//! ```
//! use sqlrepo_query::{col, SqlBuilder};
//!
//! let mut builder = SqlBuilder::new("SELECT * FROM \"t\"/**where**/")
//!     .where_("\"Age\" > @p0")
//!     .unwrap();
//! builder.add_positional(18_i64.into()).unwrap();
//! assert_eq!(builder.raw_sql(), "SELECT * FROM \"t\"\nWHERE \"Age\" > @p0");
//!
//! let predicate = col("Age").gt(18).and(col("Name").starts_with("J"));
//! assert!(matches!(predicate, sqlrepo_query::Predicate::And(..)));
//! ```

pub mod builder;
pub mod clause;
pub mod params;
pub mod predicate;
pub mod translate;

pub use builder::SqlBuilder;
pub use clause::{SqlClause, SqlClauseCollection};
pub use params::ParameterBag;
pub use predicate::{col, CallKind, CompareOp, Operand, Predicate};
pub use translate::{bind_predicate, translate, LinkOp, QueryFragment};
