//! Exemplar block tests.

use mailvoice::drafting::context::ContextAssembler;
use mailvoice::drafting::ranker::RetrievalRanker;
use mailvoice::drafting::RankedExemplars;

use crate::support::reply;

fn ranked(matches: Vec<mailvoice::index::Match>) -> RankedExemplars {
    RetrievalRanker::new(10, 0.0).rank(matches)
}

#[test]
fn assemble_renders_numbered_blocks() {
    let set = ranked(vec![
        reply("a", 0.873, "Dinner plans", "Sounds lovely, see you at 7."),
        reply("b", 0.71, "Re: Trip", "Have a great time!"),
    ]);

    let block = ContextAssembler::default().assemble(&set);

    assert_eq!(block.used, 2);
    assert_eq!(
        block.text,
        "\nExample 1 (similarity: 0.87):\nSubject: Dinner plans\nResponse: Sounds lovely, see you at 7....\n\
         \nExample 2 (similarity: 0.71):\nSubject: Re: Trip\nResponse: Have a great time!...\n"
    );
}

#[test]
fn assemble_uses_at_most_three_exemplars() {
    let set = ranked(vec![
        reply("a", 0.95, "s1", "b1"),
        reply("b", 0.9, "s2", "b2"),
        reply("c", 0.85, "s3", "b3"),
        reply("d", 0.8, "s4", "b4"),
        reply("e", 0.75, "s5", "b5"),
    ]);

    let block = ContextAssembler::default().assemble(&set);

    assert_eq!(block.used, 3);
    assert!(block.text.contains("Example 3"));
    assert!(!block.text.contains("Example 4"));
    assert!(!block.text.contains("s4"));
}

#[test]
fn assemble_truncates_bodies_to_excerpt_budget() {
    let body = "x".repeat(500);
    let set = ranked(vec![reply("a", 0.9, "Long one", &body)]);

    let block = ContextAssembler::default().assemble(&set);

    let expected = format!("Response: {}...\n", "x".repeat(300));
    assert!(block.text.ends_with(&expected));
    assert!(!block.text.contains(&"x".repeat(301)));
}

#[test]
fn assemble_of_empty_set_is_empty() {
    let block = ContextAssembler::default().assemble(&RankedExemplars::default());
    assert!(block.is_empty());
    assert!(block.text.is_empty());
}

#[test]
fn assemble_respects_custom_limits() {
    let set = ranked(vec![
        reply("a", 0.9, "s1", "abcdef"),
        reply("b", 0.8, "s2", "ghijkl"),
    ]);
    let block = ContextAssembler::new(1, 3).assemble(&set);
    assert_eq!(block.used, 1);
    assert!(block.text.contains("Response: abc...\n"));
    assert!(!block.text.contains("s2"));
}
