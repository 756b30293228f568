//! Table definitions and the process-wide metadata cache.
//!
//! A [`TableDefinition`] is derived once per entity type: it binds every
//! [`ColumnDef`] to its quoted identifiers and pre-renders the CRUD
//! statement templates for the active dialect. Definitions are immutable
//! after construction and cached for process lifetime; schema is assumed
//! fixed while the process runs.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::warn;

use crate::accessor::ColumnDef;
use crate::entity::Entity;
use crate::error::Result;
use crate::template::SqlTemplate;
use crate::value::Value;

/// A column bound to its table: metadata, compiled accessors and the
/// pre-rendered SQL fragments the composer and repository splice in.
pub struct ColumnAccessor<E> {
    def: ColumnDef<E>,
    quoted_db_name: String,
    select_fragment: String,
    update_fragment: String,
}

impl<E> Clone for ColumnAccessor<E> {
    fn clone(&self) -> Self {
        Self {
            def: self.def,
            quoted_db_name: self.quoted_db_name.clone(),
            select_fragment: self.select_fragment.clone(),
            update_fragment: self.update_fragment.clone(),
        }
    }
}

impl<E> std::fmt::Debug for ColumnAccessor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnAccessor")
            .field("def", &self.def)
            .field("quoted_db_name", &self.quoted_db_name)
            .finish_non_exhaustive()
    }
}

impl<E> ColumnAccessor<E> {
    fn bind(def: ColumnDef<E>, table_name: &str, template: &SqlTemplate) -> Self {
        let quoted_db_name = template.enquote(def.column_name);
        let quoted_table_name = template.enquote(table_name);
        let select_fragment = if def.name == def.column_name {
            format!("{quoted_table_name}.{quoted_db_name}")
        } else {
            format!(
                "{quoted_table_name}.{quoted_db_name} AS {}",
                template.enquote(def.name)
            )
        };
        let update_fragment = format!("{quoted_db_name} = @{}", def.name);
        Self {
            def,
            quoted_db_name,
            select_fragment,
            update_fragment,
        }
    }

    /// Logical property name.
    pub fn name(&self) -> &'static str {
        self.def.name
    }

    /// Raw database column name.
    pub fn column_name(&self) -> &'static str {
        self.def.column_name
    }

    /// Quote-escaped database column name.
    pub fn quoted_db_name(&self) -> &str {
        &self.quoted_db_name
    }

    /// Whether this column is part of the primary key.
    pub fn is_primary_key(&self) -> bool {
        self.def.primary_key
    }

    /// Whether this column is auto-generated.
    pub fn is_identity(&self) -> bool {
        self.def.identity
    }

    /// The `table.column AS name` fragment used in select lists.
    pub fn select_fragment(&self) -> &str {
        &self.select_fragment
    }

    /// The `column = @Name` fragment used in SET lists and key binding.
    pub fn update_fragment(&self) -> &str {
        &self.update_fragment
    }

    /// Read this property off an entity.
    pub fn get(&self, entity: &E) -> Value {
        self.def.get(entity)
    }

    /// Write a value into this property.
    pub fn set(&self, entity: &mut E, value: Value) -> Result<()> {
        self.def.set(entity, value)
    }

    /// Copy this property from one entity onto another.
    pub fn copy(&self, from: &E, to: &mut E) -> Result<()> {
        self.def.copy(from, to)
    }
}

/// Immutable schema metadata for one entity type.
///
/// Holds the bound column members in declaration order plus the five
/// statement templates rendered against the dialect at build time.
pub struct TableDefinition<E: Entity> {
    members: Vec<ColumnAccessor<E>>,
    has_identity: bool,
    select_template: String,
    count_template: String,
    insert_template: String,
    update_template: String,
    delete_template: String,
    template: SqlTemplate,
}

impl<E: Entity> std::fmt::Debug for TableDefinition<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableDefinition")
            .field("table", &E::TABLE_NAME)
            .field("members", &self.members.len())
            .field("has_identity", &self.has_identity)
            .finish_non_exhaustive()
    }
}

impl<E: Entity> TableDefinition<E> {
    /// Derive the definition for `E` against the given dialect template.
    ///
    /// Duplicate member names (case-insensitive) keep the first
    /// declaration; later duplicates are dropped with a warning. An entity
    /// with zero columns produces degenerate templates; any CRUD call
    /// against it is caller error.
    pub fn build(template: &SqlTemplate) -> Self {
        let mut members: Vec<ColumnAccessor<E>> = Vec::new();
        for def in E::columns() {
            if members
                .iter()
                .any(|m| m.name().eq_ignore_ascii_case(def.name))
            {
                warn!(table = E::TABLE_NAME, member = def.name, "duplicate column member dropped");
                continue;
            }
            members.push(ColumnAccessor::bind(def, E::TABLE_NAME, template));
        }

        let has_identity = members.iter().any(ColumnAccessor::is_identity);
        let quoted_table = template.enquote(E::TABLE_NAME);

        let (select_source, select_columns) = match E::VIEW_NAME {
            Some(view) => {
                let quoted_view = template.enquote(view);
                (quoted_view.clone(), format!("{quoted_view}.*"))
            }
            None => (
                quoted_table.clone(),
                members
                    .iter()
                    .map(|m| m.select_fragment().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        };

        let select_template = template.select_stmt(&select_columns, &select_source);
        let count_template = template.select_stmt("COUNT(*)", &select_source);
        let delete_template = template.delete_stmt(&quoted_table);

        let set_list = members
            .iter()
            .filter(|m| !m.is_primary_key() && !m.is_identity())
            .map(|m| m.update_fragment().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let update_template = template.update_stmt(&quoted_table, &set_list);

        let insert_columns = members
            .iter()
            .filter(|m| !m.is_identity())
            .map(|m| m.quoted_db_name().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let insert_values = members
            .iter()
            .filter(|m| !m.is_identity())
            .map(|m| format!("@{}", m.name()))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_template =
            template.insert_stmt(&quoted_table, &insert_columns, &insert_values, has_identity);

        Self {
            members,
            has_identity,
            select_template,
            count_template,
            insert_template,
            update_template,
            delete_template,
            template: template.clone(),
        }
    }

    /// Table name written to.
    pub fn table_name(&self) -> &'static str {
        E::TABLE_NAME
    }

    /// Bound column members in declaration order.
    pub fn members(&self) -> &[ColumnAccessor<E>] {
        &self.members
    }

    /// Look up a member by logical name, case-insensitively.
    pub fn member(&self, name: &str) -> Option<&ColumnAccessor<E>> {
        self.members
            .iter()
            .find(|m| m.name().eq_ignore_ascii_case(name))
    }

    /// Primary-key members in declaration order.
    pub fn key_columns(&self) -> Vec<&ColumnAccessor<E>> {
        self.members.iter().filter(|m| m.is_primary_key()).collect()
    }

    /// Whether the table carries an auto-generated key.
    pub fn has_identity(&self) -> bool {
        self.has_identity
    }

    /// The dialect template this definition was rendered against.
    pub fn template(&self) -> &SqlTemplate {
        &self.template
    }

    /// Pre-rendered SELECT statement with clause markers.
    pub fn select_template(&self) -> &str {
        &self.select_template
    }

    /// Pre-rendered COUNT statement with clause markers.
    pub fn count_template(&self) -> &str {
        &self.count_template
    }

    /// Pre-rendered INSERT statement.
    pub fn insert_template(&self) -> &str {
        &self.insert_template
    }

    /// Pre-rendered UPDATE statement with a `/**where**/` marker.
    pub fn update_template(&self) -> &str {
        &self.update_template
    }

    /// Pre-rendered DELETE statement with a `/**where**/` marker.
    pub fn delete_template(&self) -> &str {
        &self.delete_template
    }
}

/// Memoizing cache of table definitions, keyed by entity type.
///
/// The cache is an explicit object so tests can construct a fresh one per
/// run; [`TableCache::global`] provides the conventional process-wide
/// instance. Population is first-writer-wins: concurrent first access for
/// the same type converges on a single definition. A cache instance is
/// meant to serve a single dialect; the definition built for a type keeps
/// the template it first saw.
#[derive(Debug, Default)]
pub struct TableCache {
    tables: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl TableCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache instance.
    pub fn global() -> &'static TableCache {
        static GLOBAL: OnceLock<TableCache> = OnceLock::new();
        GLOBAL.get_or_init(TableCache::new)
    }

    /// Get or derive the definition for `E`.
    ///
    /// The first call for a type performs the one-time derivation; every
    /// later call is a read-locked map lookup.
    pub fn definition<E: Entity>(&self, template: &SqlTemplate) -> Arc<TableDefinition<E>> {
        let key = TypeId::of::<E>();
        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = tables.get(&key) {
            if let Ok(def) = Arc::clone(existing).downcast::<TableDefinition<E>>() {
                return def;
            }
        }
        drop(tables);

        let built = Arc::new(TableDefinition::<E>::build(template));
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let entry = tables
            .entry(key)
            .or_insert_with(|| Arc::clone(&built) as Arc<dyn Any + Send + Sync>);
        Arc::clone(entry)
            .downcast::<TableDefinition<E>>()
            .unwrap_or(built)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::FromValue;

    #[derive(Debug, Default)]
    struct Hero {
        id: Option<i64>,
        name: String,
        age: Option<i64>,
    }

    impl Entity for Hero {
        const TABLE_NAME: &'static str = "heroes";

        fn columns() -> Vec<ColumnDef<Self>> {
            vec![
                ColumnDef::new(
                    "Id",
                    |e: &Self| Value::from(e.id),
                    |e: &mut Self, v| {
                        e.id = FromValue::from_value(v, "Id")?;
                        Ok(())
                    },
                )
                .column("hero_id")
                .primary_key(true)
                .identity(true),
                ColumnDef::new(
                    "Name",
                    |e: &Self| Value::from(e.name.clone()),
                    |e: &mut Self, v| {
                        e.name = FromValue::from_value(v, "Name")?;
                        Ok(())
                    },
                ),
                ColumnDef::new(
                    "Age",
                    |e: &Self| Value::from(e.age),
                    |e: &mut Self, v| {
                        e.age = FromValue::from_value(v, "Age")?;
                        Ok(())
                    },
                ),
            ]
        }

        fn blank() -> Self {
            Self::default()
        }
    }

    fn definition() -> TableDefinition<Hero> {
        TableDefinition::build(&SqlTemplate::sqlite())
    }

    #[test]
    fn test_identity_excluded_from_insert() {
        let def = definition();
        assert!(def.has_identity());
        assert!(!def.insert_template().contains("hero_id"));
        assert!(def.insert_template().contains("\"Name\""));
        assert!(def.insert_template().ends_with("; SELECT last_insert_rowid()"));
    }

    #[test]
    fn test_keys_excluded_from_update_set() {
        let def = definition();
        assert!(!def.update_template().contains("hero_id"));
        assert!(def.update_template().contains("\"Name\" = @Name"));
        assert!(def.update_template().contains("/**where**/"));
    }

    #[test]
    fn test_select_aliases_renamed_columns() {
        let def = definition();
        assert!(def
            .select_template()
            .contains("\"heroes\".\"hero_id\" AS \"Id\""));
        assert!(def.select_template().contains("\"heroes\".\"Name\""));
    }

    #[test]
    fn test_member_lookup_is_case_insensitive() {
        let def = definition();
        assert!(def.member("age").is_some());
        assert!(def.member("AGE").is_some());
        assert!(def.member("missing").is_none());
    }

    #[test]
    fn test_key_columns_in_declaration_order() {
        let def = definition();
        let keys = def.key_columns();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].name(), "Id");
    }

    #[test]
    fn test_cache_returns_same_definition() {
        let cache = TableCache::new();
        let a = cache.definition::<Hero>(&SqlTemplate::sqlite());
        let b = cache.definition::<Hero>(&SqlTemplate::sqlite());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
