//! Clause collections: ordered SQL fragments sharing one template slot.

/// One raw SQL fragment with the joiner that links it to its predecessor.
#[derive(Debug, Clone)]
pub struct SqlClause {
    /// The fragment text
    pub sql: String,
    /// Joiner token preceding this fragment (` AND `, ` OR `, `, `, ...)
    pub joiner: &'static str,
}

/// All fragments accumulated under one named slot (where, orderby, ...).
#[derive(Debug, Clone)]
pub struct SqlClauseCollection {
    /// Slot-level keyword emitted once before the flattened fragments
    /// (`\nWHERE `, `\nORDER BY `, ...)
    pub keyword: &'static str,
    clauses: Vec<SqlClause>,
}

impl SqlClauseCollection {
    /// Create an empty collection for a slot keyword.
    pub fn new(keyword: &'static str) -> Self {
        Self {
            keyword,
            clauses: Vec::new(),
        }
    }

    /// Append a fragment with its joiner.
    pub fn push(&mut self, sql: impl Into<String>, joiner: &'static str) {
        self.clauses.push(SqlClause {
            sql: sql.into(),
            joiner,
        });
    }

    /// Check whether no fragments were accumulated.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Drop all accumulated fragments; used by replace-on-repeat slots.
    pub fn clear(&mut self) {
        self.clauses.clear();
    }

    /// Join the fragments, stripping the first fragment's own joiner
    /// (it precedes nothing).
    pub fn flatten(&self) -> String {
        let mut out = String::new();
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                out.push_str(clause.joiner);
            }
            out.push_str(&clause.sql);
        }
        out
    }
}
