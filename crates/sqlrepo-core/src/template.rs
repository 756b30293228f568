//! Per-dialect SQL statement templates.
//!
//! A [`SqlTemplate`] is a plain record of format strings: one per CRUD
//! verb, a quoting format for identifiers, an identity suffix appended to
//! inserts on tables with an auto-generated key, and the paging keywords.
//! Swapping the record is the engine's sole dialect-adaptation seam.
//!
//! Statement templates use positional `{0}`/`{1}`/`{2}` slots and carry
//! `/**slot**/` clause markers that the SQL composer later fills in or
//! strips.

/// Dialect template record.
#[derive(Debug, Clone)]
pub struct SqlTemplate {
    /// SELECT format: `{0}` column list, `{1}` source table/view
    pub select: &'static str,
    /// INSERT format: `{0}` table, `{1}` column list, `{2}` value list
    pub insert: &'static str,
    /// UPDATE format: `{0}` table, `{1}` SET list
    pub update: &'static str,
    /// DELETE format: `{0}` table
    pub delete: &'static str,
    /// Suffix appended to INSERT when the table has an identity column
    pub identity: &'static str,
    /// Identifier quoting format: `{0}` is the raw identifier
    pub quote: &'static str,
    /// Row-limit keyword for the `take` slot
    pub take: &'static str,
    /// Row-offset keyword for the `skip` slot
    pub skip: &'static str,
}

impl SqlTemplate {
    /// SQLite template set.
    pub fn sqlite() -> Self {
        Self {
            select: "SELECT /**distinct**/{0} FROM {1}/**join**//**innerjoin**//**leftjoin**//**rightjoin**//**where**//**groupby**//**having**//**orderby**//**take**//**skip**//**intersect**/",
            insert: "INSERT INTO {0} ({1}) VALUES ({2})",
            update: "UPDATE {0} SET {1}/**where**/",
            delete: "DELETE FROM {0}/**where**/",
            identity: "; SELECT last_insert_rowid()",
            quote: "\"{0}\"",
            take: "\nLIMIT ",
            skip: "\nOFFSET ",
        }
    }

    /// PostgreSQL template set.
    pub fn postgres() -> Self {
        Self {
            identity: "; SELECT lastval()",
            ..Self::sqlite()
        }
    }

    /// MySQL template set.
    pub fn mysql() -> Self {
        Self {
            identity: "; SELECT LAST_INSERT_ID()",
            quote: "`{0}`",
            ..Self::sqlite()
        }
    }

    /// SQL Server template set. `TOP` sits before the column list, so the
    /// `take` slot moves to the head of the SELECT template.
    pub fn mssql() -> Self {
        Self {
            select: "SELECT /**distinct**//**take**/{0} FROM {1}/**join**//**innerjoin**//**leftjoin**//**rightjoin**//**where**//**groupby**//**having**//**orderby**//**skip**//**intersect**/",
            insert: "INSERT INTO {0} ({1}) VALUES ({2})",
            update: "UPDATE {0} SET {1}/**where**/",
            delete: "DELETE FROM {0}/**where**/",
            identity: "; SELECT SCOPE_IDENTITY()",
            quote: "[{0}]",
            take: "TOP ",
            skip: "\nOFFSET ",
        }
    }

    /// Quote an identifier with this dialect's quoting format.
    pub fn enquote(&self, identifier: &str) -> String {
        format_positional(self.quote, &[identifier])
    }

    /// Render the SELECT template for a column list and source.
    pub fn select_stmt(&self, columns: &str, source: &str) -> String {
        format_positional(self.select, &[columns, source])
    }

    /// Render the INSERT template, appending the identity suffix when the
    /// target table carries an auto-generated key.
    pub fn insert_stmt(
        &self,
        table: &str,
        columns: &str,
        values: &str,
        with_identity: bool,
    ) -> String {
        let mut sql = format_positional(self.insert, &[table, columns, values]);
        if with_identity {
            sql.push_str(self.identity);
        }
        sql
    }

    /// Render the UPDATE template for a SET list.
    pub fn update_stmt(&self, table: &str, set_list: &str) -> String {
        format_positional(self.update, &[table, set_list])
    }

    /// Render the DELETE template.
    pub fn delete_stmt(&self, table: &str) -> String {
        format_positional(self.delete, &[table])
    }
}

impl Default for SqlTemplate {
    fn default() -> Self {
        Self::sqlite()
    }
}

/// Replace positional `{N}` slots with the given arguments.
///
/// Only the slots present in the template are substituted; the shipped
/// templates never exceed four slots.
pub fn format_positional(template: &str, args: &[&str]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{i}}}"), arg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enquote_sqlite() {
        assert_eq!(SqlTemplate::sqlite().enquote("users"), "\"users\"");
    }

    #[test]
    fn test_enquote_mysql_and_mssql() {
        assert_eq!(SqlTemplate::mysql().enquote("users"), "`users`");
        assert_eq!(SqlTemplate::mssql().enquote("users"), "[users]");
    }

    #[test]
    fn test_insert_identity_suffix() {
        let tpl = SqlTemplate::sqlite();
        let sql = tpl.insert_stmt("\"t\"", "\"a\"", "@a", true);
        assert_eq!(sql, "INSERT INTO \"t\" (\"a\") VALUES (@a); SELECT last_insert_rowid()");
        let plain = tpl.insert_stmt("\"t\"", "\"a\"", "@a", false);
        assert_eq!(plain, "INSERT INTO \"t\" (\"a\") VALUES (@a)");
    }

    #[test]
    fn test_select_keeps_slot_markers() {
        let sql = SqlTemplate::sqlite().select_stmt("*", "\"t\"");
        assert!(sql.contains("/**where**/"));
        assert!(sql.contains("/**orderby**/"));
        assert!(sql.starts_with("SELECT /**distinct**/* FROM \"t\""));
    }

    #[test]
    fn test_mssql_take_precedes_columns() {
        let sql = SqlTemplate::mssql().select_stmt("*", "[t]");
        let take = sql.find("/**take**/").unwrap();
        let from = sql.find(" FROM ").unwrap();
        assert!(take < from);
    }

    #[test]
    fn test_format_positional_repeated_slot() {
        assert_eq!(format_positional("{0}-{1}-{0}", &["a", "b"]), "a-b-a");
    }
}
