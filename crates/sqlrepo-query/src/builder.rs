//! The SQL builder: named clause slots over a dialect template.
//!
//! A builder starts from a statement template carrying `/**slot**/`
//! markers. Fluent calls accumulate fragments into named slots; nothing
//! is rendered until [`SqlBuilder::raw_sql`] compiles the text, replacing
//! each populated slot with its keyword plus the flattened fragments and
//! stripping every marker that stayed empty. The compiled text is cached
//! and invalidated by any later mutation.
//!
//! Once a repository call has materialized results from a builder, every
//! further mutation fails with [`Error::AlreadyExecuted`]; results and
//! statement text can no longer drift apart silently.

use std::sync::OnceLock;

use regex::Regex;
use sqlrepo_core::{Error, Result, SqlTemplate, Value};
use tracing::debug;

use crate::clause::SqlClauseCollection;
use crate::params::ParameterBag;

const DEFAULT_TAKE: &str = "\nLIMIT ";
const DEFAULT_SKIP: &str = "\nOFFSET ";

static SLOT_MARKER: OnceLock<Regex> = OnceLock::new();

fn slot_marker() -> &'static Regex {
    SLOT_MARKER.get_or_init(|| Regex::new(r"/\*\*[^*]*\*\*/").expect("literal pattern"))
}

/// Composes one SQL statement from a template and named clause slots.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    template: String,
    slots: Vec<(&'static str, SqlClauseCollection)>,
    parameters: ParameterBag,
    take_keyword: &'static str,
    skip_keyword: &'static str,
    compiled: Option<String>,
    executed: bool,
}

impl SqlBuilder {
    /// Create a builder over a statement template. Paging keywords
    /// default to `LIMIT`/`OFFSET`; use [`SqlBuilder::for_dialect`] when
    /// the target dialect pages differently.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            slots: Vec::new(),
            parameters: ParameterBag::new(),
            take_keyword: DEFAULT_TAKE,
            skip_keyword: DEFAULT_SKIP,
            compiled: None,
            executed: false,
        }
    }

    /// Create a builder whose paging keywords come from a dialect template.
    pub fn for_dialect(template: impl Into<String>, dialect: &SqlTemplate) -> Self {
        let mut builder = Self::new(template);
        builder.take_keyword = dialect.take;
        builder.skip_keyword = dialect.skip;
        builder
    }

    fn check_execution(&self) -> Result<()> {
        if self.executed {
            return Err(Error::AlreadyExecuted);
        }
        Ok(())
    }

    fn slot_mut(&mut self, name: &'static str, keyword: &'static str) -> &mut SqlClauseCollection {
        self.compiled = None;
        if let Some(index) = self.slots.iter().position(|(n, _)| *n == name) {
            &mut self.slots[index].1
        } else {
            self.slots.push((name, SqlClauseCollection::new(keyword)));
            let last = self.slots.len() - 1;
            &mut self.slots[last].1
        }
    }

    /// Add a WHERE condition, AND-linked to any previous one.
    pub fn where_(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("where", "\nWHERE ").push(sql, " AND ");
        Ok(self)
    }

    /// Add a WHERE condition, OR-linked to any previous one.
    pub fn or_where(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("where", "\nWHERE ").push(sql, " OR ");
        Ok(self)
    }

    /// Add a bare JOIN clause (`"other" ON ...`).
    pub fn join(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("join", "\nJOIN ").push(sql, "\nJOIN ");
        Ok(self)
    }

    /// Add an INNER JOIN clause.
    pub fn inner_join(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("innerjoin", "\nINNER JOIN ")
            .push(sql, "\nINNER JOIN ");
        Ok(self)
    }

    /// Add a LEFT JOIN clause.
    pub fn left_join(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("leftjoin", "\nLEFT JOIN ")
            .push(sql, "\nLEFT JOIN ");
        Ok(self)
    }

    /// Add a RIGHT JOIN clause.
    pub fn right_join(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("rightjoin", "\nRIGHT JOIN ")
            .push(sql, "\nRIGHT JOIN ");
        Ok(self)
    }

    /// Add a GROUP BY expression.
    pub fn group_by(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("groupby", "\nGROUP BY ").push(sql, ", ");
        Ok(self)
    }

    /// Add a HAVING condition, AND-linked to any previous one.
    pub fn having(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("having", "\nHAVING ").push(sql, " AND ");
        Ok(self)
    }

    /// Add an ORDER BY expression.
    pub fn order_by(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("orderby", "\nORDER BY ").push(sql, ", ");
        Ok(self)
    }

    /// Mark the projection DISTINCT. Calling twice has no further effect.
    pub fn distinct(mut self) -> Result<Self> {
        self.check_execution()?;
        let slot = self.slot_mut("distinct", "DISTINCT ");
        if slot.is_empty() {
            slot.push("", "");
        }
        Ok(self)
    }

    /// Limit the result to `count` rows. Calling again replaces the limit.
    pub fn take(mut self, count: u64) -> Result<Self> {
        self.check_execution()?;
        let keyword = self.take_keyword;
        // Inline keywords (TOP) sit before the column list and need a
        // trailing separator; line keywords (LIMIT) end the statement.
        let clause = if keyword.starts_with('\n') {
            count.to_string()
        } else {
            format!("{count} ")
        };
        let slot = self.slot_mut("take", keyword);
        slot.clear();
        slot.push(clause, "");
        Ok(self)
    }

    /// Skip the first `count` rows. Calling again replaces the offset.
    pub fn skip(mut self, count: u64) -> Result<Self> {
        self.check_execution()?;
        let keyword = self.skip_keyword;
        let slot = self.slot_mut("skip", keyword);
        slot.clear();
        slot.push(count.to_string(), "");
        Ok(self)
    }

    /// Intersect with another complete SELECT statement.
    pub fn intersect(mut self, sql: impl Into<String>) -> Result<Self> {
        self.check_execution()?;
        self.slot_mut("intersect", "\nINTERSECT\n")
            .push(sql, "\nINTERSECT\n");
        Ok(self)
    }

    /// Bind a named parameter.
    pub fn add_parameter(&mut self, name: impl Into<String>, value: Value) -> Result<()> {
        self.check_execution()?;
        self.parameters.add(name, value);
        Ok(())
    }

    /// Bind an anonymous value under the next `p{N}` name.
    pub fn add_positional(&mut self, value: Value) -> Result<String> {
        self.check_execution()?;
        Ok(self.parameters.add_positional(value))
    }

    /// Parameters bound so far.
    pub fn parameters(&self) -> &ParameterBag {
        &self.parameters
    }

    /// Freeze this builder; every later mutation fails with
    /// [`Error::AlreadyExecuted`]. Repository calls that materialize
    /// results invoke this.
    pub fn mark_executed(&mut self) {
        self.executed = true;
    }

    /// Check whether the builder has been consumed by an execution.
    pub fn is_executed(&self) -> bool {
        self.executed
    }

    /// Compile and cache the statement text.
    pub fn raw_sql(&mut self) -> &str {
        if self.compiled.is_none() {
            self.compiled = Some(self.compile());
        }
        self.compiled.as_deref().unwrap_or_default()
    }

    fn compile(&self) -> String {
        let mut sql = self.template.clone();
        for (name, slot) in &self.slots {
            if slot.is_empty() {
                continue;
            }
            let marker = format!("/**{name}**/");
            let rendered = format!("{}{}", slot.keyword, slot.flatten());
            sql = sql.replace(&marker, &rendered);
        }
        let sql = slot_marker().replace_all(&sql, "").into_owned();
        debug!(%sql, "statement compiled");
        sql
    }
}
