//! The opaque connection capability the engine executes against.
//!
//! The core never manages pooling, transactions or provider discovery: it
//! opens before use, executes through a command, and closes on every exit
//! path, including errors. Drivers implement the three small traits here;
//! everything else in the engine is written against them.

use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::row::{ColumnNames, Row};
use crate::value::Value;

/// A forward-only cursor over query results.
///
/// Dropping a cursor mid-iteration must release the underlying resources;
/// implementations do their cleanup in `Drop` so abandoning an iteration
/// early still closes deterministically.
pub trait RowCursor {
    /// Number of fields per row.
    fn field_count(&self) -> usize;

    /// Name of the field at `index`.
    fn field_name(&self, index: usize) -> &str;

    /// Advance to the next row; `false` when exhausted.
    fn read(&mut self) -> Result<bool>;

    /// Values of the current row in field order.
    fn values(&mut self) -> Result<Vec<Value>>;
}

/// A single executable statement with named parameters.
pub trait Command {
    /// Set the SQL text to execute.
    fn set_text(&mut self, sql: &str);

    /// Bind a named parameter.
    fn add_parameter(&mut self, name: &str, value: Value);

    /// Execute and return the affected row count.
    fn execute_non_query(&mut self) -> Result<u64>;

    /// Execute and return the first column of the first row, if any.
    fn execute_scalar(&mut self) -> Result<Option<Value>>;

    /// Execute and return a cursor over the result rows.
    fn execute_reader(&mut self) -> Result<Box<dyn RowCursor + '_>>;
}

/// A database connection: open, create commands, close.
pub trait Connection: Send {
    /// Open the connection. Opening an already-open connection is a no-op.
    fn open(&mut self) -> Result<()>;

    /// Close the connection. Closing a closed connection is a no-op.
    fn close(&mut self) -> Result<()>;

    /// Create a command bound to this connection.
    fn create_command(&mut self) -> Box<dyn Command + '_>;
}

/// Buffered execution helpers layered over any [`Connection`].
///
/// Each helper brackets the call with open/close, binds the given named
/// parameters, and wraps any driver failure in [`Error::Execution`] with
/// the attempted SQL text and the call site.
pub trait ConnectionExt: Connection {
    /// Execute a statement and return the affected row count.
    fn execute(&mut self, sql: &str, params: &[(String, Value)]) -> Result<u64> {
        debug!(sql, "execute");
        run(self, sql, params, "execute", |cmd| cmd.execute_non_query())
    }

    /// Execute a statement and return the first column of the first row.
    fn execute_scalar(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Option<Value>> {
        debug!(sql, "execute_scalar");
        run(self, sql, params, "execute_scalar", |cmd| cmd.execute_scalar())
    }

    /// Execute a query and buffer every result row before returning.
    ///
    /// Rows share one [`ColumnNames`] allocation. The connection is closed
    /// before the rows are handed back, trading memory for a short lock
    /// hold at the caller.
    fn query_rows(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Vec<Row>> {
        debug!(sql, "query_rows");
        run(self, sql, params, "query_rows", |cmd| {
            let mut reader = cmd.execute_reader()?;
            let columns = Arc::new(ColumnNames::new(
                (0..reader.field_count())
                    .map(|i| reader.field_name(i).to_string())
                    .collect(),
            ));
            let mut rows = Vec::new();
            while reader.read()? {
                rows.push(Row::with_columns(Arc::clone(&columns), reader.values()?));
            }
            Ok(rows)
        })
    }

    /// Execute a query and return only the first row, if any.
    fn query_first(&mut self, sql: &str, params: &[(String, Value)]) -> Result<Option<Row>> {
        debug!(sql, "query_first");
        run(self, sql, params, "query_first", |cmd| {
            let mut reader = cmd.execute_reader()?;
            if !reader.read()? {
                return Ok(None);
            }
            let columns = (0..reader.field_count())
                .map(|i| reader.field_name(i).to_string())
                .collect();
            Ok(Some(Row::new(columns, reader.values()?)))
        })
    }
}

impl<C: Connection + ?Sized> ConnectionExt for C {}

/// Open/bind/execute/close bracket shared by the helpers above.
fn run<C, T>(
    conn: &mut C,
    sql: &str,
    params: &[(String, Value)],
    operation: &'static str,
    body: impl FnOnce(&mut dyn Command) -> Result<T>,
) -> Result<T>
where
    C: Connection + ?Sized,
{
    conn.open()
        .map_err(|e| Error::execution(sql, operation, e))?;
    let result = {
        let mut cmd = conn.create_command();
        cmd.set_text(sql);
        for (name, value) in params {
            cmd.add_parameter(name, value.clone());
        }
        body(cmd.as_mut())
    };
    let closed = conn.close();
    let value = result.map_err(|e| Error::execution(sql, operation, e))?;
    closed.map_err(|e| Error::execution(sql, operation, e))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal scripted connection: returns a fixed rowcount and rows.
    struct Scripted {
        open_calls: u32,
        close_calls: u32,
        fail_execute: bool,
    }

    struct ScriptedCommand<'a> {
        conn: &'a mut Scripted,
        sql: String,
        params: Vec<(String, Value)>,
    }

    struct ScriptedCursor {
        rows: Vec<Vec<Value>>,
        at: usize,
    }

    impl RowCursor for ScriptedCursor {
        fn field_count(&self) -> usize {
            2
        }

        fn field_name(&self, index: usize) -> &str {
            ["Id", "Name"][index]
        }

        fn read(&mut self) -> Result<bool> {
            if self.at < self.rows.len() {
                self.at += 1;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        fn values(&mut self) -> Result<Vec<Value>> {
            Ok(self.rows[self.at - 1].clone())
        }
    }

    impl Command for ScriptedCommand<'_> {
        fn set_text(&mut self, sql: &str) {
            self.sql = sql.to_string();
        }

        fn add_parameter(&mut self, name: &str, value: Value) {
            self.params.push((name.to_string(), value));
        }

        fn execute_non_query(&mut self) -> Result<u64> {
            if self.conn.fail_execute {
                Err(Error::Custom("constraint violation".into()))
            } else {
                Ok(1)
            }
        }

        fn execute_scalar(&mut self) -> Result<Option<Value>> {
            Ok(Some(Value::Int(7)))
        }

        fn execute_reader(&mut self) -> Result<Box<dyn RowCursor + '_>> {
            Ok(Box::new(ScriptedCursor {
                rows: vec![
                    vec![Value::Int(1), Value::Text("a".into())],
                    vec![Value::Int(2), Value::Text("b".into())],
                ],
                at: 0,
            }))
        }
    }

    impl Connection for Scripted {
        fn open(&mut self) -> Result<()> {
            self.open_calls += 1;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.close_calls += 1;
            Ok(())
        }

        fn create_command(&mut self) -> Box<dyn Command + '_> {
            Box::new(ScriptedCommand {
                conn: self,
                sql: String::new(),
                params: Vec::new(),
            })
        }
    }

    fn scripted() -> Scripted {
        Scripted {
            open_calls: 0,
            close_calls: 0,
            fail_execute: false,
        }
    }

    #[test]
    fn test_execute_brackets_open_close() {
        let mut conn = scripted();
        let n = conn.execute("DELETE FROM t", &[]).unwrap();
        assert_eq!(n, 1);
        assert_eq!(conn.open_calls, 1);
        assert_eq!(conn.close_calls, 1);
    }

    #[test]
    fn test_failure_still_closes_and_wraps_sql() {
        let mut conn = scripted();
        conn.fail_execute = true;
        let err = conn.execute("DELETE FROM t", &[]).unwrap_err();
        assert_eq!(conn.close_calls, 1);
        match err {
            Error::Execution { sql, operation, .. } => {
                assert_eq!(sql, "DELETE FROM t");
                assert_eq!(operation, "execute");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_query_rows_buffers_and_shares_columns() {
        let mut conn = scripted();
        let rows = conn.query_rows("SELECT * FROM t", &[]).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_by_name("Name"), Some(&Value::Text("a".into())));
        assert!(Arc::ptr_eq(&rows[0].column_names(), &rows[1].column_names()));
        assert_eq!(conn.close_calls, 1);
    }

    #[test]
    fn test_query_first_stops_at_one_row() {
        let mut conn = scripted();
        let row = conn.query_first("SELECT * FROM t", &[]).unwrap().unwrap();
        assert_eq!(row.get_by_name("Id"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_scalar() {
        let mut conn = scripted();
        let v = conn.execute_scalar("SELECT COUNT(*) FROM t", &[]).unwrap();
        assert_eq!(v, Some(Value::Int(7)));
    }
}
