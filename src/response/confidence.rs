/// Confidence for answers that never touch the database.
pub const INFORMATIONAL_CONFIDENCE: f64 = 0.95;

const DATA_CONFIDENCE: f64 = 0.95;
const NO_DATA_CONFIDENCE: f64 = 0.5;

/// Depends on the row count only. A synthetic error row counts as a row.
pub fn score(row_count: usize) -> f64 {
    if row_count > 0 {
        DATA_CONFIDENCE
    } else {
        NO_DATA_CONFIDENCE
    }
}
