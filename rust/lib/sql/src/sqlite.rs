use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::warn;

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Statement, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled
/// SQLite).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // Enable WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let mut columns = Vec::new();
                for (i, name) in column_names.iter().enumerate() {
                    let val = row_value_at(row, i);
                    columns.push((name.clone(), val));
                }
                Ok(Row { columns })
            })
            .map_err(|e| SQLError::Query(e.to_string()))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| SQLError::Query(e.to_string()))?);
        }
        Ok(result)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let affected = conn
            .execute(sql, param_refs.as_slice())
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, statements: &[Statement]) -> Result<u64, SQLError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        let tx = conn
            .transaction()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;

        let mut affected: u64 = 0;
        for (sql, params) in statements {
            let bound = bind_params(params);
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                bound.iter().map(|b| b.as_ref()).collect();

            // Dropping the transaction without commit rolls back every
            // statement executed so far.
            match tx.execute(sql, param_refs.as_slice()) {
                Ok(n) => affected += n as u64,
                Err(e) => {
                    warn!(error = %e, "batch statement failed, rolling back");
                    return Err(SQLError::Execution(e.to_string()));
                }
            }
        }

        tx.commit()
            .map_err(|e| SQLError::Transaction(e.to_string()))?;
        Ok(affected)
    }

    fn exec_script(&self, sql: &str) -> Result<(), SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Execution(e.to_string()))?;

        conn.execute_batch(sql)
            .map_err(|e| SQLError::Execution(e.to_string()))
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    // Try integer first, then real, then text, then blob, then null.
    if let Ok(i) = row.get::<_, i64>(idx) {
        return Value::Integer(i);
    }
    if let Ok(f) = row.get::<_, f64>(idx) {
        return Value::Real(f);
    }
    if let Ok(s) = row.get::<_, String>(idx) {
        return Value::Text(s);
    }
    if let Ok(b) = row.get::<_, Vec<u8>>(idx) {
        return Value::Blob(b);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec_script(
                "CREATE TABLE items (
                    id    INTEGER PRIMARY KEY AUTOINCREMENT,
                    name  TEXT NOT NULL,
                    qty   INTEGER
                );",
            )
            .unwrap();
        store
    }

    fn count(store: &SqliteStore) -> i64 {
        store
            .query("SELECT COUNT(*) as cnt FROM items", &[])
            .unwrap()
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap()
    }

    #[test]
    fn exec_and_query_roundtrip() {
        let store = test_store();
        let affected = store
            .exec(
                "INSERT INTO items (name, qty) VALUES (?1, ?2)",
                &[Value::Text("widget".into()), Value::Integer(3)],
            )
            .unwrap();
        assert_eq!(affected, 1);

        let rows = store
            .query("SELECT name, qty FROM items WHERE name = ?1", &[Value::Text("widget".into())])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("name"), Some("widget"));
        assert_eq!(rows[0].get_i64("qty"), Some(3));
    }

    #[test]
    fn null_param_binds_as_null() {
        let store = test_store();
        store
            .exec(
                "INSERT INTO items (name, qty) VALUES (?1, ?2)",
                &[Value::Text("a".into()), Value::Null],
            )
            .unwrap();
        let rows = store.query("SELECT qty FROM items", &[]).unwrap();
        assert!(rows[0].get_i64("qty").is_none());
    }

    #[test]
    fn exec_batch_commits_all() {
        let store = test_store();
        let statements: Vec<Statement> = (0..3)
            .map(|i| {
                (
                    "INSERT INTO items (name, qty) VALUES (?1, ?2)".to_string(),
                    vec![Value::Text(format!("item-{i}")), Value::Integer(i)],
                )
            })
            .collect();

        let affected = store.exec_batch(&statements).unwrap();
        assert_eq!(affected, 3);
        assert_eq!(count(&store), 3);
    }

    #[test]
    fn exec_batch_rolls_back_on_failure() {
        let store = test_store();
        store
            .exec(
                "INSERT INTO items (name, qty) VALUES (?1, ?2)",
                &[Value::Text("existing".into()), Value::Integer(1)],
            )
            .unwrap();

        // Second statement violates NOT NULL on name; the delete and the
        // first insert must both be rolled back.
        let statements: Vec<Statement> = vec![
            ("DELETE FROM items".to_string(), vec![]),
            (
                "INSERT INTO items (name, qty) VALUES (?1, ?2)".to_string(),
                vec![Value::Text("fresh".into()), Value::Integer(2)],
            ),
            (
                "INSERT INTO items (name, qty) VALUES (?1, ?2)".to_string(),
                vec![Value::Null, Value::Integer(3)],
            ),
        ];

        assert!(store.exec_batch(&statements).is_err());
        let rows = store.query("SELECT name FROM items", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("name"), Some("existing"));
    }

    #[test]
    fn open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.sqlite")).unwrap();
        store
            .exec_script("CREATE TABLE t (x INTEGER);")
            .unwrap();
        store
            .exec("INSERT INTO t (x) VALUES (?1)", &[Value::Integer(7)])
            .unwrap();
        let rows = store.query("SELECT x FROM t", &[]).unwrap();
        assert_eq!(rows[0].get_i64("x"), Some(7));
    }
}
