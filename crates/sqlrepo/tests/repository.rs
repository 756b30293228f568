//! End-to-end repository tests against a scripted stub connection.
//!
//! The stub records every executed statement with its bound parameters
//! and answers from a queue of canned results, so each test can assert
//! both the exact SQL the engine produced and the materialized entities.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use sqlrepo::prelude::*;
use sqlrepo::{Command, RowCursor};

#[derive(Debug, Clone)]
enum Script {
    Rows(Vec<&'static str>, Vec<Vec<Value>>),
    Scalar(Option<Value>),
    Affected(u64),
}

#[derive(Default)]
struct StubConnection {
    scripts: VecDeque<Script>,
    log: Vec<(String, Vec<(String, Value)>)>,
}

impl StubConnection {
    fn next_script(&mut self) -> Script {
        self.scripts.pop_front().unwrap_or(Script::Affected(0))
    }
}

struct StubCommand<'a> {
    conn: &'a mut StubConnection,
    sql: String,
    params: Vec<(String, Value)>,
}

impl StubCommand<'_> {
    fn log_and_pop(&mut self) -> Script {
        self.conn.log.push((self.sql.clone(), self.params.clone()));
        self.conn.next_script()
    }
}

struct StubCursor {
    columns: Vec<&'static str>,
    rows: VecDeque<Vec<Value>>,
    current: Vec<Value>,
}

impl RowCursor for StubCursor {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn field_name(&self, index: usize) -> &str {
        self.columns[index]
    }

    fn read(&mut self) -> Result<bool> {
        match self.rows.pop_front() {
            Some(row) => {
                self.current = row;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn values(&mut self) -> Result<Vec<Value>> {
        Ok(self.current.clone())
    }
}

impl Command for StubCommand<'_> {
    fn set_text(&mut self, sql: &str) {
        self.sql = sql.to_string();
    }

    fn add_parameter(&mut self, name: &str, value: Value) {
        self.params.push((name.to_string(), value));
    }

    fn execute_non_query(&mut self) -> Result<u64> {
        match self.log_and_pop() {
            Script::Affected(n) => Ok(n),
            Script::Rows(_, rows) => Ok(rows.len() as u64),
            Script::Scalar(Some(_)) => Ok(1),
            Script::Scalar(None) => Ok(0),
        }
    }

    fn execute_scalar(&mut self) -> Result<Option<Value>> {
        match self.log_and_pop() {
            Script::Scalar(value) => Ok(value),
            Script::Rows(_, rows) => Ok(rows.first().and_then(|r| r.first().cloned())),
            Script::Affected(_) => Ok(None),
        }
    }

    fn execute_reader(&mut self) -> Result<Box<dyn RowCursor + '_>> {
        let (columns, rows) = match self.log_and_pop() {
            Script::Rows(columns, rows) => (columns, rows),
            _ => (Vec::new(), Vec::new()),
        };
        Ok(Box::new(StubCursor {
            columns,
            rows: rows.into(),
            current: Vec::new(),
        }))
    }
}

impl Connection for StubConnection {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn create_command(&mut self) -> Box<dyn Command + '_> {
        Box::new(StubCommand {
            conn: self,
            sql: String::new(),
            params: Vec::new(),
        })
    }
}

#[derive(Debug, Default, PartialEq)]
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

/// An append-only entity with no primary key.
#[derive(Debug, Default, PartialEq)]
struct LogEntry {
    message: String,
}

impl Entity for LogEntry {
    const TABLE_NAME: &'static str = "log";

    fn columns() -> Vec<ColumnDef<Self>> {
        vec![ColumnDef::new(
            "Message",
            |e: &Self| Value::from(e.message.clone()),
            |e: &mut Self, v| {
                e.message = FromValue::from_value(v, "Message")?;
                Ok(())
            },
        )]
    }

    fn blank() -> Self {
        Self::default()
    }
}

fn stub(scripts: Vec<Script>) -> Arc<Mutex<StubConnection>> {
    Arc::new(Mutex::new(StubConnection {
        scripts: scripts.into(),
        log: Vec::new(),
    }))
}

fn repo<E: Entity>(conn: Arc<Mutex<StubConnection>>) -> Repository<E, StubConnection> {
    let cache = TableCache::new();
    Repository::configured(
        conn,
        &SqlTemplate::sqlite(),
        &cache,
        RepositoryOptions::default(),
    )
}

fn log(conn: &Arc<Mutex<StubConnection>>) -> Vec<(String, Vec<(String, Value)>)> {
    conn.lock().unwrap().log.clone()
}

fn hero_columns() -> Vec<&'static str> {
    vec!["Id", "Name", "Age"]
}

#[test]
fn test_add_executes_insert_and_fetches_by_generated_key() {
    let conn = stub(vec![
        Script::Scalar(Some(Value::Int(7))),
        Script::Rows(
            hero_columns(),
            vec![vec![Value::Int(7), Value::Text("Jane".into()), Value::Int(30)]],
        ),
    ]);
    let repo = repo::<Hero>(Arc::clone(&conn));

    let saved = repo
        .add(Hero {
            id: None,
            name: "Jane".into(),
            age: Some(30),
        })
        .unwrap();

    assert_eq!(
        saved,
        Hero {
            id: Some(7),
            name: "Jane".into(),
            age: Some(30),
        }
    );

    let log = log(&conn);
    assert_eq!(log.len(), 2);
    assert_eq!(
        log[0].0,
        "INSERT INTO \"heroes\" (\"Name\", \"Age\") VALUES (@Name, @Age); SELECT last_insert_rowid()"
    );
    // identity column never binds on insert
    assert!(log[0].1.iter().all(|(n, _)| n != "Id"));
    assert!(log[0].1.contains(&("Name".to_string(), Value::Text("Jane".into()))));
    assert!(log[1].0.contains("\nWHERE \"Id\" = @p0"));
    assert!(log[1].0.ends_with("\nLIMIT 1"));
    assert_eq!(log[1].1, vec![("p0".to_string(), Value::Int(7))]);
}

#[test]
fn test_add_insert_failure_when_no_key_comes_back() {
    let conn = stub(vec![Script::Scalar(None)]);
    let repo = repo::<Hero>(conn);
    let err = repo.add(Hero::default()).unwrap_err();
    assert!(matches!(err, Error::InsertFailed { table: "heroes" }));
}

#[test]
fn test_keyless_add_returns_input() {
    let conn = stub(vec![Script::Affected(1)]);
    let repo = repo::<LogEntry>(Arc::clone(&conn));
    let entry = repo
        .add(LogEntry {
            message: "started".into(),
        })
        .unwrap();
    assert_eq!(entry.message, "started");
    let log = log(&conn);
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].0, "INSERT INTO \"log\" (\"Message\") VALUES (@Message)");
}

#[test]
fn test_keyless_add_zero_rows_is_insert_failure() {
    let conn = stub(vec![Script::Affected(0)]);
    let repo = repo::<LogEntry>(conn);
    let err = repo.add(LogEntry::default()).unwrap_err();
    assert!(matches!(err, Error::InsertFailed { table: "log" }));
}

#[test]
fn test_find_on_keyless_entity_issues_no_sql() {
    let conn = stub(Vec::new());
    let repo = repo::<LogEntry>(Arc::clone(&conn));
    let err = repo.find(&[Value::Int(1)]).unwrap_err();
    assert!(matches!(err, Error::NoPrimaryKey { table: "log" }));
    assert!(log(&conn).is_empty());
}

#[test]
fn test_find_with_null_key_binds_is_null() {
    let conn = stub(vec![Script::Rows(hero_columns(), Vec::new())]);
    let repo = repo::<Hero>(Arc::clone(&conn));
    let found = repo.find(&[Value::Null]).unwrap();
    assert!(found.is_none());
    let log = log(&conn);
    assert!(log[0].0.contains("\nWHERE \"Id\" IS NULL"));
    assert!(log[0].1.is_empty());
}

#[test]
fn test_query_translates_predicate_left_to_right() {
    let conn = stub(vec![Script::Rows(
        hero_columns(),
        vec![
            vec![Value::Int(1), Value::Text("Jane".into()), Value::Int(30)],
            vec![Value::Int(2), Value::Text("John".into()), Value::Int(19)],
        ],
    )]);
    let repo = repo::<Hero>(Arc::clone(&conn));

    let heroes = repo
        .query(&col("Age").gt(18).and(col("Name").starts_with("J")))
        .unwrap();
    assert_eq!(heroes.len(), 2);
    assert_eq!(heroes[1].name, "John");

    let log = log(&conn);
    assert!(log[0]
        .0
        .contains("\nWHERE \"Age\" > @p0 AND \"Name\" LIKE @p1"));
    assert_eq!(
        log[0].1,
        vec![
            ("p0".to_string(), Value::Int(18)),
            ("p1".to_string(), Value::Text("J%".into())),
        ]
    );
}

#[test]
fn test_count_uses_count_template() {
    let conn = stub(vec![Script::Scalar(Some(Value::Int(5)))]);
    let repo = repo::<Hero>(Arc::clone(&conn));
    let n = repo.count(&col("Age").gt(18)).unwrap();
    assert_eq!(n, 5);
    let log = log(&conn);
    assert!(log[0].0.starts_with("SELECT COUNT(*) FROM \"heroes\""));
    assert!(log[0].0.contains("\nWHERE \"Age\" > @p0"));
}

#[test]
fn test_remove_binds_keys() {
    let conn = stub(vec![Script::Affected(1)]);
    let repo = repo::<Hero>(Arc::clone(&conn));
    let removed = repo
        .remove(&Hero {
            id: Some(3),
            name: "Jane".into(),
            age: None,
        })
        .unwrap();
    assert!(removed);
    let log = log(&conn);
    assert_eq!(log[0].0, "DELETE FROM \"heroes\"\nWHERE \"Id\" = @p0");
    assert_eq!(log[0].1, vec![("p0".to_string(), Value::Int(3))]);
}

#[test]
fn test_remove_missing_row_reports_false() {
    let conn = stub(vec![Script::Affected(0)]);
    let repo = repo::<Hero>(conn);
    let removed = repo
        .remove(&Hero {
            id: Some(3),
            ..Hero::default()
        })
        .unwrap();
    assert!(!removed);
}

#[test]
fn test_delta_update_writes_changed_columns_only() {
    let conn = stub(vec![
        // current row
        Script::Rows(
            hero_columns(),
            vec![vec![Value::Int(1), Value::Text("A".into()), Value::Int(30)]],
        ),
        Script::Affected(1),
        // re-fetch after write
        Script::Rows(
            hero_columns(),
            vec![vec![Value::Int(1), Value::Text("B".into()), Value::Int(30)]],
        ),
    ]);
    let repo = repo::<Hero>(Arc::clone(&conn));

    let updated = repo
        .update(&Hero {
            id: Some(1),
            name: "B".into(),
            age: None, // absent on candidate: must not wipe the stored 30
        })
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "B");
    assert_eq!(updated.age, Some(30));

    let log = log(&conn);
    assert_eq!(log.len(), 3);
    assert_eq!(log[1].0, "UPDATE \"heroes\" SET \"Name\" = @Name\nWHERE \"Id\" = @p1");
    assert_eq!(
        log[1].1,
        vec![
            ("Name".to_string(), Value::Text("B".into())),
            ("p1".to_string(), Value::Int(1)),
        ]
    );
}

#[test]
fn test_delta_update_with_no_changes_skips_the_write() {
    let conn = stub(vec![Script::Rows(
        hero_columns(),
        vec![vec![Value::Int(1), Value::Text("A".into()), Value::Int(30)]],
    )]);
    let repo = repo::<Hero>(Arc::clone(&conn));

    let candidate = Hero {
        id: Some(1),
        name: "A".into(),
        age: None, // absent on candidate, so nothing differs
    };
    let result = repo.update(&candidate).unwrap();
    // the caller gets their own state back, not the fetched row
    assert_eq!(result, Some(candidate));

    // only the current-row fetch ran
    let log = log(&conn);
    assert_eq!(log.len(), 1);
    assert!(log[0].0.starts_with("SELECT "));
}

#[test]
fn test_find_with_wrong_key_count_issues_no_sql() {
    let conn = stub(Vec::new());
    let repo = repo::<Hero>(Arc::clone(&conn));
    let err = repo.find(&[Value::Int(1), Value::Int(2)]).unwrap_err();
    assert!(matches!(
        err,
        Error::KeyMismatch {
            table: "heroes",
            expected: 1,
            actual: 2
        }
    ));
    assert!(log(&conn).is_empty());
}

#[test]
fn test_delta_update_against_vanished_row() {
    let conn = stub(vec![Script::Rows(hero_columns(), Vec::new())]);
    let repo = repo::<Hero>(conn);
    let err = repo
        .update(&Hero {
            id: Some(9),
            name: "A".into(),
            age: None,
        })
        .unwrap_err();
    assert!(matches!(err, Error::NullEntity { .. }));
}

#[test]
fn test_full_update_writes_every_non_key_column() {
    let conn = stub(vec![
        Script::Affected(1),
        Script::Rows(
            hero_columns(),
            vec![vec![Value::Int(1), Value::Text("B".into()), Value::Null]],
        ),
    ]);
    let cache = TableCache::new();
    let repo: Repository<Hero, StubConnection> = Repository::configured(
        Arc::clone(&conn),
        &SqlTemplate::sqlite(),
        &cache,
        RepositoryOptions::new().update_changed_only(false),
    );

    let updated = repo
        .update(&Hero {
            id: Some(1),
            name: "B".into(),
            age: None,
        })
        .unwrap();
    assert!(updated.is_some());

    let log = log(&conn);
    assert_eq!(
        log[0].0,
        "UPDATE \"heroes\" SET \"Name\" = @Name, \"Age\" = @Age\nWHERE \"Id\" = @p2"
    );
    assert_eq!(
        log[0].1,
        vec![
            ("Name".to_string(), Value::Text("B".into())),
            ("Age".to_string(), Value::Null),
            ("p2".to_string(), Value::Int(1)),
        ]
    );
}

#[test]
fn test_update_matching_nothing_returns_none() {
    let conn = stub(vec![
        Script::Rows(
            hero_columns(),
            vec![vec![Value::Int(1), Value::Text("A".into()), Value::Null]],
        ),
        Script::Affected(0),
    ]);
    let repo = repo::<Hero>(conn);
    let result = repo
        .update(&Hero {
            id: Some(1),
            name: "B".into(),
            age: None,
        })
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_builder_cannot_be_mutated_after_fetch() {
    let conn = stub(vec![Script::Rows(hero_columns(), Vec::new())]);
    let repo = repo::<Hero>(conn);

    let mut builder = repo.select_builder().order_by("\"Name\"").unwrap();
    let heroes = repo.fetch(&mut builder).unwrap();
    assert!(heroes.is_empty());

    let err = builder.clone().where_("\"Age\" > 18").unwrap_err();
    assert!(matches!(err, Error::AlreadyExecuted));
    let err = repo.fetch(&mut builder).unwrap_err();
    assert!(matches!(err, Error::AlreadyExecuted));
}

#[test]
fn test_execute_query_materializes_by_column_name() {
    let conn = stub(vec![Script::Rows(
        vec!["Age", "Name", "Ignored", "Id"],
        vec![vec![
            Value::Int(41),
            Value::Text("Jane".into()),
            Value::Bool(true),
            Value::Int(6),
        ]],
    )]);
    let repo = repo::<Hero>(Arc::clone(&conn));

    let heroes = repo
        .execute_query(
            "SELECT * FROM \"heroes_view\" WHERE \"Age\" > @min",
            &[("min".to_string(), Value::Int(40))],
        )
        .unwrap();
    assert_eq!(
        heroes,
        vec![Hero {
            id: Some(6),
            name: "Jane".into(),
            age: Some(41),
        }]
    );

    let log = log(&conn);
    assert_eq!(log[0].1, vec![("min".to_string(), Value::Int(40))]);
}
