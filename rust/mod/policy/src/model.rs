// ---------------------------------------------------------------------------
// GenerationMarker — one allocation event in the generation sequence
// ---------------------------------------------------------------------------

/// A single allocation of a generation number.
///
/// Markers are append-only: one is written per refresh cycle and never
/// mutated or deleted afterwards. The storage key's insertion order, not
/// the generation number, defines which marker is newest: the number
/// wraps back to 1 past the ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationMarker {
    /// Storage key; insertion order defines recency.
    pub id: i64,
    /// Wrapping counter in `[1, 10000]`.
    pub generation: i64,
    /// Local-clock `YYYYMMDDHHMM` stamp taken at allocation.
    pub allocated_at: String,
}

// ---------------------------------------------------------------------------
// PolicyRecord — a stored row, maps 1:1 to SQL columns
// ---------------------------------------------------------------------------

/// A normalized policy row as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyRecord {
    pub id: i64,
    /// Generation this row belongs to. Nullable only in legacy rows; new
    /// writes always set it.
    pub generation: Option<i64>,
    pub policy_id: String,
    pub name: String,
    pub policy_type: String,
    pub description: String,
    pub mode: String,
    pub owner: String,
    pub reference_count: i64,
    /// UTC `YYYYMMDDHHMM` stamp converted from the controller's
    /// millisecond epoch value.
    pub last_updated: String,
}

// ---------------------------------------------------------------------------
// NewPolicyRecord — a normalized row ready for insertion
// ---------------------------------------------------------------------------

/// The write-side shape produced by normalization.
///
/// Required string fields stay `Option` here: a record the controller sent
/// without them is carried through unchanged, and the store's NOT NULL
/// constraints reject it, aborting the whole batch rather than storing a
/// fabricated value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPolicyRecord {
    pub generation: i64,
    pub policy_id: Option<String>,
    pub name: Option<String>,
    pub policy_type: Option<String>,
    pub description: String,
    pub mode: String,
    pub owner: Option<String>,
    pub reference_count: i64,
    pub last_updated: String,
}

// ---------------------------------------------------------------------------
// RefreshOutcome
// ---------------------------------------------------------------------------

/// Result of one completed refresh cycle.
#[derive(Debug, Clone, Copy)]
pub struct RefreshOutcome {
    /// Generation number allocated for this cycle.
    pub generation: i64,
    /// Number of records persisted under that generation.
    pub records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_defaults_are_explicit() {
        let record = NewPolicyRecord {
            generation: 1,
            policy_id: Some("P1".into()),
            name: Some("n".into()),
            policy_type: Some("t".into()),
            description: String::new(),
            mode: String::new(),
            owner: Some("o".into()),
            reference_count: 0,
            last_updated: "197001010000".into(),
        };
        assert_eq!(record.description, "");
        assert_eq!(record.mode, "");
        assert_eq!(record.reference_count, 0);
    }
}
