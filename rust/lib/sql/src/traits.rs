use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// A row returned from a SQL query — column name to value.
#[derive(Debug, Clone)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a text column value by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }
}

/// One parameterized statement for batch execution.
pub type Statement = (String, Vec<Value>);

/// SQLStore provides a SQL execution interface backed by an embedded
/// database.
///
/// `exec_batch` is the unit-of-work primitive: every statement in the list
/// commits together or not at all. Callers that must replace a set of rows
/// atomically put the delete and all inserts into one batch.
pub trait SQLStore: Send + Sync {
    /// Execute a query and return rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;

    /// Execute all statements inside a single transaction.
    ///
    /// Returns the total affected row count. If any statement fails, none
    /// of the batch's effects remain visible.
    fn exec_batch(&self, statements: &[Statement]) -> Result<u64, SQLError>;

    /// Execute a multi-statement SQL script (schema migrations, pragmas).
    /// No parameters, no result rows.
    fn exec_script(&self, sql: &str) -> Result<(), SQLError>;
}
