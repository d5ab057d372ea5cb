/// Generation numbers live in `[1, GENERATION_CEILING]` and wrap back to 1
/// once the ceiling has been handed out.
pub const GENERATION_CEILING: i64 = 10_000;

/// Compute the generation number that follows `previous`.
///
/// `previous` is the number carried by the newest stored marker in
/// insertion order, never the numeric maximum, which stops being
/// monotonic once the counter wraps. `None` means no marker has ever been
/// written; the sequence starts at 1.
///
/// A stored number at or above the ceiling wraps to 1. That includes
/// out-of-range values from corrupted markers: the sequence restarts
/// rather than chasing an invalid number upward.
pub fn next_generation(previous: Option<i64>) -> i64 {
    match previous {
        Some(n) if n < GENERATION_CEILING => n + 1,
        Some(_) => 1,
        None => 1,
    }
}
