//! Confidence estimation tests.

use mailvoice::drafting::confidence::{estimate, round2};
use mailvoice::drafting::ranker::RetrievalRanker;
use mailvoice::drafting::RankedExemplars;

use crate::support::reply;

#[test]
fn empty_set_has_zero_confidence() {
    assert_eq!(estimate(&RankedExemplars::default()), 0.0);
}

#[test]
fn confidence_is_mean_rounded_to_two_decimals() {
    let set = RetrievalRanker::default().rank(vec![
        reply("a", 0.9, "s", "b"),
        reply("b", 0.8, "s", "b"),
        reply("c", 0.75, "s", "b"),
    ]);
    assert_eq!(estimate(&set), 0.82);
}

#[test]
fn confidence_counts_matches_beyond_prompt_limit() {
    let set = RetrievalRanker::default().rank(vec![
        reply("a", 0.9, "s", "b"),
        reply("b", 0.9, "s", "b"),
        reply("c", 0.9, "s", "b"),
        reply("d", 0.7, "s", "b"),
        reply("e", 0.7, "s", "b"),
    ]);
    assert_eq!(estimate(&set), 0.82);
}

#[test]
fn single_match_confidence_is_its_score() {
    let set = RetrievalRanker::default().rank(vec![reply("a", 0.8, "s", "b")]);
    assert_eq!(estimate(&set), 0.8);
}

#[test]
fn round2_rounds_half_away_from_zero() {
    assert_eq!(round2(0.125), 0.13);
    assert_eq!(round2(0.8449), 0.84);
}
