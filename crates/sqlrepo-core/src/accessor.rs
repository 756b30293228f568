//! Per-column metadata with compiled accessors.
//!
//! A [`ColumnDef`] carries what the engine needs to know about one mapped
//! property: its names, its key/identity flags, and a get/set function
//! pair compiled once per entity type. Accessors are plain function
//! pointers, so reading or writing a property never touches reflection or
//! string lookup on the hot path.

use crate::error::{Error, Result};
use crate::value::Value;

/// Compiled getter: reads one property off an entity as a [`Value`].
pub type Getter<E> = fn(&E) -> Value;

/// Compiled setter: writes one [`Value`] into a property, converting to
/// the declared type or failing with [`Error::Conversion`].
pub type Setter<E> = fn(&mut E, Value) -> Result<()>;

/// Metadata about one mapped column, fused with its compiled accessors.
pub struct ColumnDef<E> {
    /// Logical property name on the entity
    pub name: &'static str,
    /// Database column name (may differ from the property name)
    pub column_name: &'static str,
    /// Whether this column is part of the primary key
    pub primary_key: bool,
    /// Whether this column is auto-generated by the database
    pub identity: bool,
    getter: Getter<E>,
    setter: Setter<E>,
}

// Manual impls: derives would bound `E` even though only fn pointers are held.
impl<E> Clone for ColumnDef<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ColumnDef<E> {}

impl<E> std::fmt::Debug for ColumnDef<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnDef")
            .field("name", &self.name)
            .field("column_name", &self.column_name)
            .field("primary_key", &self.primary_key)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl<E> ColumnDef<E> {
    /// Create a column definition; the column name defaults to the
    /// property name until overridden with [`column`](Self::column).
    pub const fn new(name: &'static str, getter: Getter<E>, setter: Setter<E>) -> Self {
        Self {
            name,
            column_name: name,
            primary_key: false,
            identity: false,
            getter,
            setter,
        }
    }

    /// Override the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Mark this column as part of the primary key.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Mark this column as auto-generated (identity).
    ///
    /// Identity columns are excluded from insert and update column lists.
    pub const fn identity(mut self, value: bool) -> Self {
        self.identity = value;
        self
    }

    /// Read the property value from an entity.
    pub fn get(&self, entity: &E) -> Value {
        (self.getter)(entity)
    }

    /// Write a value into the property, converting to the declared type.
    pub fn set(&self, entity: &mut E, value: Value) -> Result<()> {
        (self.setter)(entity, value)
    }

    /// Copy this property from one entity onto another.
    pub fn copy(&self, from: &E, to: &mut E) -> Result<()> {
        self.set(to, self.get(from))
    }
}

/// Conversion from a dynamic [`Value`] into a declared property type.
///
/// Setters use this to mirror assignment semantics: integers widen, NULL
/// maps onto `Option::None`, and anything else fails with a
/// [`Error::Conversion`] naming the property.
pub trait FromValue: Sized {
    /// Convert `value`, reporting failures against `property`.
    fn from_value(value: Value, property: &'static str) -> Result<Self>;
}

impl FromValue for bool {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::conversion(property, &value, "BOOLEAN"))
    }
}

impl FromValue for i32 {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| Error::conversion(property, &value, "INTEGER"))
    }
}

impl FromValue for i64 {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::conversion(property, &value, "BIGINT"))
    }
}

impl FromValue for f64 {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::conversion(property, &value, "REAL"))
    }
}

impl FromValue for String {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(Error::conversion(property, &other, "TEXT")),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(Error::conversion(property, &other, "BLOB")),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(v),
            other => Err(Error::conversion(property, &other, "JSON")),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value, property: &'static str) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other, property).map(Some),
        }
    }
}
