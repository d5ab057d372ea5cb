use std::sync::Arc;

use polsnap_core::{ServiceError, now_stamp};
use polsnap_sql::{Row, SQLStore, Statement, Value};

use crate::generation::next_generation;
use crate::model::{GenerationMarker, NewPolicyRecord, PolicyRecord};

/// SQL schema for generation markers and policy records.
///
/// Both tables use AUTOINCREMENT keys because insertion order defines
/// recency, for marker lookup and for export ordering alike. `generation`
/// on records is nullable to tolerate legacy rows; new writes always set it.
/// Applied once at startup, outside the request-handling path.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS policy_generations (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    generation    INTEGER NOT NULL,
    allocated_at  TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS policy_records (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    generation       INTEGER,
    policy_id        TEXT NOT NULL,
    name             TEXT NOT NULL,
    type             TEXT NOT NULL,
    description      TEXT,
    mode             TEXT,
    owner            TEXT NOT NULL,
    reference_count  INTEGER NOT NULL,
    last_updated     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_policy_records_generation
    ON policy_records(generation);
";

const INSERT_RECORD: &str = "INSERT INTO policy_records \
    (generation, policy_id, name, type, description, mode, owner, reference_count, last_updated) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

const SELECT_RECORD_COLUMNS: &str = "SELECT id, generation, policy_id, name, type, \
    description, mode, owner, reference_count, last_updated FROM policy_records";

/// Persistent storage for generation markers and policy records, backed by
/// SQLStore (SQLite).
pub struct PolicyStore {
    db: Arc<dyn SQLStore>,
}

impl PolicyStore {
    /// Create a new PolicyStore and initialise the schema.
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        db.exec_script(SCHEMA)
            .map_err(|e| ServiceError::Storage(format!("policy schema init: {e}")))?;
        Ok(Self { db })
    }

    // -----------------------------------------------------------------------
    // Generation markers
    // -----------------------------------------------------------------------

    /// Allocate the next generation number and persist its marker.
    ///
    /// The previous number is read from the newest marker by insertion
    /// order, not numeric order; numeric order stops being monotonic once
    /// the counter wraps. The marker row commits here, before any record
    /// write for the generation; a failed allocation surfaces as a hard
    /// error and the caller must allocate again rather than guess.
    pub fn allocate_generation(&self) -> Result<i64, ServiceError> {
        let previous = self.latest_marker()?.map(|m| m.generation);
        let generation = next_generation(previous);

        self.db
            .exec(
                "INSERT INTO policy_generations (generation, allocated_at) VALUES (?1, ?2)",
                &[Value::Integer(generation), Value::Text(now_stamp())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(generation)
    }

    /// Newest marker by insertion order, if any.
    pub fn latest_marker(&self) -> Result<Option<GenerationMarker>, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT id, generation, allocated_at FROM policy_generations \
                 ORDER BY id DESC LIMIT 1",
                &[],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.first().map(row_to_marker).transpose()
    }

    // -----------------------------------------------------------------------
    // Policy records
    // -----------------------------------------------------------------------

    /// Remove all records tagged with a generation.
    ///
    /// No-op when none exist; never errors on zero matches.
    pub fn delete_generation(&self, generation: i64) -> Result<u64, ServiceError> {
        self.db
            .exec(
                "DELETE FROM policy_records WHERE generation = ?1",
                &[Value::Integer(generation)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))
    }

    /// Replace a generation's record set: the delete and every insert run
    /// in one transaction. A single failed insert rolls back the whole
    /// unit, delete included, and the previous record set stays visible.
    pub fn replace_generation(
        &self,
        generation: i64,
        records: &[NewPolicyRecord],
    ) -> Result<(), ServiceError> {
        let mut statements: Vec<Statement> = Vec::with_capacity(records.len() + 1);
        statements.push((
            "DELETE FROM policy_records WHERE generation = ?1".to_string(),
            vec![Value::Integer(generation)],
        ));
        for record in records {
            statements.push((INSERT_RECORD.to_string(), record_params(record)));
        }

        self.db
            .exec_batch(&statements)
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Up to `limit` records ordered newest-inserted first, across all
    /// generations. Export history is not filtered by generation.
    pub fn latest(&self, limit: usize) -> Result<Vec<PolicyRecord>, ServiceError> {
        let rows = self
            .db
            .query(
                &format!("{SELECT_RECORD_COLUMNS} ORDER BY id DESC LIMIT ?1"),
                &[Value::Integer(limit as i64)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter().map(row_to_record).collect()
    }

    /// Count records tagged with a generation.
    pub fn count_generation(&self, generation: i64) -> Result<u64, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT COUNT(*) as cnt FROM policy_records WHERE generation = ?1",
                &[Value::Integer(generation)],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;

        Ok(rows.first().and_then(|r| r.get_i64("cnt")).unwrap_or(0) as u64)
    }
}

fn record_params(record: &NewPolicyRecord) -> Vec<Value> {
    vec![
        Value::Integer(record.generation),
        opt_text(&record.policy_id),
        opt_text(&record.name),
        opt_text(&record.policy_type),
        Value::Text(record.description.clone()),
        Value::Text(record.mode.clone()),
        opt_text(&record.owner),
        Value::Integer(record.reference_count),
        Value::Text(record.last_updated.clone()),
    ]
}

fn opt_text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn row_to_marker(row: &Row) -> Result<GenerationMarker, ServiceError> {
    Ok(GenerationMarker {
        id: req_i64(row, "id")?,
        generation: req_i64(row, "generation")?,
        allocated_at: req_str(row, "allocated_at")?,
    })
}

fn row_to_record(row: &Row) -> Result<PolicyRecord, ServiceError> {
    Ok(PolicyRecord {
        id: req_i64(row, "id")?,
        generation: row.get_i64("generation"),
        policy_id: req_str(row, "policy_id")?,
        name: req_str(row, "name")?,
        policy_type: req_str(row, "type")?,
        // Nullable in legacy rows; read back as empty.
        description: row.get_str("description").unwrap_or_default().to_string(),
        mode: row.get_str("mode").unwrap_or_default().to_string(),
        owner: req_str(row, "owner")?,
        reference_count: req_i64(row, "reference_count")?,
        last_updated: req_str(row, "last_updated")?,
    })
}

fn req_i64(row: &Row, name: &str) -> Result<i64, ServiceError> {
    row.get_i64(name)
        .ok_or_else(|| ServiceError::Storage(format!("missing column '{name}'")))
}

fn req_str(row: &Row, name: &str) -> Result<String, ServiceError> {
    row.get_str(name)
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Storage(format!("missing column '{name}'")))
}
