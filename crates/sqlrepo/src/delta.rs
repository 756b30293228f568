//! Delta comparator: property-level change detection between two entities.
//!
//! A [`Delta`] holds a candidate entity and, after [`Delta::compare`],
//! knows which properties differ from some original. The changed set
//! drives partial updates ([`Delta::patch`] and the repository's
//! delta-mode `update`); the full set drives overwrites ([`Delta::put`]).
//! Comparison is value equality through the compiled accessors, in column
//! declaration order.

use std::sync::Arc;

use sqlrepo_core::{ColumnAccessor, Entity, Error, Result, SqlTemplate, TableCache, TableDefinition};

/// Change detector for one candidate entity.
pub struct Delta<'a, E: Entity> {
    candidate: &'a E,
    table: Arc<TableDefinition<E>>,
    excluded: Vec<&'static str>,
    changed: Vec<usize>,
    unchanged: Vec<usize>,
}

impl<'a, E: Entity> Delta<'a, E> {
    /// Create a delta for a candidate, resolving metadata through the
    /// process-wide cache. Comparison never looks at the dialect, so the
    /// default template is fine here.
    pub fn new(candidate: &'a E) -> Self {
        Self::with_table(
            candidate,
            TableCache::global().definition::<E>(&SqlTemplate::default()),
        )
    }

    /// Create a delta against an already-resolved table definition.
    pub fn with_table(candidate: &'a E, table: Arc<TableDefinition<E>>) -> Self {
        Self {
            candidate,
            table,
            excluded: Vec::new(),
            changed: Vec::new(),
            unchanged: Vec::new(),
        }
    }

    /// Exclude a property from comparison and copying. Unknown names fail
    /// with [`Error::UnknownProperty`].
    pub fn exclude(mut self, name: &str) -> Result<Self> {
        let member = self
            .table
            .member(name)
            .ok_or_else(|| Error::UnknownProperty {
                property: name.to_string(),
                table: self.table.table_name(),
            })?;
        let canonical = member.name();
        if !self.excluded.contains(&canonical) {
            self.excluded.push(canonical);
        }
        Ok(self)
    }

    /// Diff the candidate against an original, in declaration order.
    ///
    /// With `nulls_unchanged` set, a null candidate value counts as "not
    /// provided" and the property lands in the unchanged set regardless of
    /// the original's value. This is the partial-update reading: absent
    /// fields on the candidate must not wipe stored data.
    pub fn compare(&mut self, original: &E, nulls_unchanged: bool) {
        self.changed.clear();
        self.unchanged.clear();
        for (index, member) in self.table.members().iter().enumerate() {
            if self.excluded.contains(&member.name()) {
                continue;
            }
            let candidate = member.get(self.candidate);
            if nulls_unchanged && candidate.is_null() {
                self.unchanged.push(index);
                continue;
            }
            if candidate == member.get(original) {
                self.unchanged.push(index);
            } else {
                self.changed.push(index);
            }
        }
    }

    /// Properties whose candidate value differs from the compared original.
    pub fn changed_properties(&self) -> Vec<&ColumnAccessor<E>> {
        self.changed
            .iter()
            .map(|&i| &self.table.members()[i])
            .collect()
    }

    /// Properties whose candidate value matched (or was skipped as null).
    pub fn unchanged_properties(&self) -> Vec<&ColumnAccessor<E>> {
        self.unchanged
            .iter()
            .map(|&i| &self.table.members()[i])
            .collect()
    }

    /// Copy only the changed properties onto `target`.
    pub fn patch(&self, target: &mut E) -> Result<()> {
        for member in self.changed_properties() {
            member.copy(self.candidate, target)?;
        }
        Ok(())
    }

    /// Copy changed and unchanged properties onto `target`: a full
    /// overwrite of everything that was compared. Excluded properties are
    /// left alone.
    pub fn put(&self, target: &mut E) -> Result<()> {
        self.patch(target)?;
        for member in self.unchanged_properties() {
            member.copy(self.candidate, target)?;
        }
        Ok(())
    }
}
