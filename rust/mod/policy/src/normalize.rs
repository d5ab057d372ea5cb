use chrono::DateTime;
use serde_json::Value;
use thiserror::Error;

use crate::model::NewPolicyRecord;

/// `lastUpdated` stamp produced for a missing or zero source value.
pub const EPOCH_STAMP: &str = "197001010000";

/// Error raised when a raw record cannot be transformed.
///
/// Any one of these aborts the whole batch; partial generations are
/// never made visible.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("field '{field}' is not a number: {value}")]
    NotANumber { field: &'static str, value: String },

    #[error("field 'lastUpdated' is out of range: {0}")]
    TimestampRange(i64),
}

/// Transform one raw controller record into the fixed internal schema.
///
/// Pure function, no I/O. Optional fields take their documented defaults:
/// empty string for `description`/`mode`, 0 for `referenceCount`, the
/// epoch-zero stamp for a missing or zero `lastUpdated`. Required string
/// fields missing upstream are carried through as `None`; whether that
/// aborts the batch is the store's concern, not this layer's. A present
/// but non-numeric `lastUpdated` or `referenceCount` is unrecoverable
/// here and fails the record.
pub fn normalize(raw: &Value, generation: i64) -> Result<NewPolicyRecord, NormalizeError> {
    let last_updated_ms = int_field(raw, "lastUpdated")?.unwrap_or(0);

    Ok(NewPolicyRecord {
        generation,
        policy_id: str_field(raw, "definitionId"),
        name: str_field(raw, "name"),
        policy_type: str_field(raw, "type"),
        description: str_field(raw, "description").unwrap_or_default(),
        mode: str_field(raw, "mode").unwrap_or_default(),
        owner: str_field(raw, "owner"),
        reference_count: int_field(raw, "referenceCount")?.unwrap_or(0),
        last_updated: stamp_from_epoch_ms(last_updated_ms)?,
    })
}

fn str_field(raw: &Value, field: &str) -> Option<String> {
    raw.get(field).and_then(Value::as_str).map(str::to_string)
}

fn int_field(raw: &Value, field: &'static str) -> Result<Option<i64>, NormalizeError> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| NormalizeError::NotANumber {
                field,
                value: v.to_string(),
            }),
    }
}

/// Convert a millisecond epoch value into a UTC `YYYYMMDDHHMM` stamp.
///
/// The division truncates to whole seconds; the format truncates further
/// to the minute. Values chrono cannot represent fail the record.
fn stamp_from_epoch_ms(ms: i64) -> Result<String, NormalizeError> {
    let secs = ms / 1000;
    let dt = DateTime::from_timestamp(secs, 0).ok_or(NormalizeError::TimestampRange(ms))?;
    Ok(dt.format(polsnap_core::STAMP_FORMAT).to_string())
}
