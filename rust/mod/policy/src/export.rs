use crate::model::PolicyRecord;
use crate::service::PolicyError;

/// Fixed column order for the export surface.
const HEADER: [&str; 9] = [
    "Index",
    "Policy ID",
    "Name",
    "Type",
    "Description",
    "Mode",
    "Owner",
    "Reference Count",
    "Last Updated",
];

/// Serialize records to CSV, one row per record in the order given.
///
/// The caller controls ordering; rows are written as received. An empty
/// input yields `NoRecords` so the HTTP layer answers 404 instead of
/// shipping a header-only file. Well-formed records never fail.
pub fn export_csv(records: &[PolicyRecord]) -> Result<String, PolicyError> {
    if records.is_empty() {
        return Err(PolicyError::NoRecords);
    }

    let mut out = String::new();
    push_row(&mut out, &HEADER.map(String::from));

    for record in records {
        push_row(
            &mut out,
            &[
                record.generation.map(|g| g.to_string()).unwrap_or_default(),
                record.policy_id.clone(),
                record.name.clone(),
                record.policy_type.clone(),
                record.description.clone(),
                record.mode.clone(),
                record.owner.clone(),
                record.reference_count.to_string(),
                record.last_updated.clone(),
            ],
        );
    }

    Ok(out)
}

/// Append one CSV row, quoting fields that embed the delimiter, a quote,
/// or a line break. Quotes inside quoted fields are doubled.
fn push_row(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}
