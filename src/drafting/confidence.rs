//! Draft confidence from retrieval scores.

use super::RankedExemplars;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean similarity of the ranked matches, rounded to two decimals.
///
/// Zero when nothing was retrieved. All ranked matches count, including any
/// beyond the prompt's exemplar limit.
pub fn estimate(exemplars: &RankedExemplars) -> f64 {
    let scores = exemplars.as_slice();
    let Ok(count) = u32::try_from(scores.len()) else {
        return 0.0;
    };
    if count == 0 {
        return 0.0;
    }
    let total: f64 = scores
        .iter()
        .map(|m| f64::from(m.similarity_score))
        .sum();
    round2(total / f64::from(count)).clamp(0.0, 1.0)
}
