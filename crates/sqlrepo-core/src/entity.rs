//! Entity trait: the contract mapping a struct to a table or view.

use crate::accessor::ColumnDef;

/// Trait for types that map to a database table.
///
/// Implementations declare the table name, an optional view to read from,
/// and one [`ColumnDef`] per mapped property. Column declaration order is
/// binding order everywhere in the engine: select lists, key binding and
/// delta comparison all follow it.
///
/// # Example
///
/// ```
/// use sqlrepo_core::{ColumnDef, Entity, FromValue, Value};
///
/// #[derive(Debug, Default)]
/// struct Hero {
///     id: Option<i64>,
///     name: String,
/// }
///
/// impl Entity for Hero {
///     const TABLE_NAME: &'static str = "heroes";
///
///     fn columns() -> Vec<ColumnDef<Self>> {
///         vec![
///             ColumnDef::new(
///                 "Id",
///                 |e: &Self| Value::from(e.id),
///                 |e: &mut Self, v| {
///                     e.id = FromValue::from_value(v, "Id")?;
///                     Ok(())
///                 },
///             )
///             .primary_key(true)
///             .identity(true),
///             ColumnDef::new(
///                 "Name",
///                 |e: &Self| Value::from(e.name.clone()),
///                 |e: &mut Self, v| {
///                     e.name = FromValue::from_value(v, "Name")?;
///                     Ok(())
///                 },
///             ),
///         ]
///     }
///
///     fn blank() -> Self {
///         Self::default()
///     }
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// The name of the database table written to.
    const TABLE_NAME: &'static str;

    /// Optional view name to read from when the read source differs from
    /// the write target.
    const VIEW_NAME: Option<&'static str> = None;

    /// Column definitions in declaration order.
    ///
    /// Called once per process by the metadata cache; the result is
    /// wrapped into an immutable [`TableDefinition`](crate::TableDefinition).
    fn columns() -> Vec<ColumnDef<Self>>;

    /// Construct an empty instance for row materialization to fill.
    fn blank() -> Self;
}
