//! Retrieval ranking tests.

use std::sync::Arc;

use mailvoice::drafting::ranker::{build_query_text, RetrievalRanker};
use mailvoice::index::memory::{InMemoryIndex, IndexedEmail};
use mailvoice::index::{Match, MetadataFilter};

use crate::support::{message, reply, StaticIndex};

fn scores(matches: &[Match]) -> Vec<f32> {
    matches.iter().map(|m| m.similarity_score).collect()
}

#[test]
fn query_text_frames_subject_sender_and_body() {
    let text = build_query_text(&message("Lunch?", "Free Thursday?", "sam@example.com"));
    assert_eq!(
        text,
        "Subject: Lunch?\n\nFrom: sam@example.com\n\nBody: Free Thursday?"
    );
}

#[test]
fn query_text_keeps_empty_fields() {
    let text = build_query_text(&message("", "Just the body", ""));
    assert_eq!(text, "Subject: \n\nFrom: \n\nBody: Just the body");
}

#[test]
fn rank_drops_scores_at_or_below_threshold() {
    let ranker = RetrievalRanker::new(5, 0.6);
    let ranked = ranker.rank(vec![
        reply("a", 0.9, "a", "a"),
        reply("b", 0.6, "b", "b"),
        reply("c", 0.59, "c", "c"),
    ]);
    assert_eq!(scores(ranked.as_slice()), vec![0.9]);
}

#[test]
fn rank_drops_non_replies() {
    let ranker = RetrievalRanker::default();
    let mut inbound = reply("in", 0.95, "question", "question");
    inbound.is_reply = false;
    let ranked = ranker.rank(vec![inbound, reply("out", 0.8, "answer", "answer")]);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked.as_slice()[0].id, "out");
}

#[test]
fn rank_preserves_index_order_when_sorted() {
    let ranker = RetrievalRanker::default();
    let ranked = ranker.rank(vec![
        reply("first", 0.9, "s", "b"),
        reply("second", 0.9, "s", "b"),
        reply("third", 0.7, "s", "b"),
    ]);
    let ids: Vec<&str> = ranked.as_slice().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
}

#[test]
fn rank_resorts_out_of_order_backends() {
    let ranker = RetrievalRanker::default();
    let ranked = ranker.rank(vec![
        reply("low", 0.7, "s", "b"),
        reply("high", 0.95, "s", "b"),
        reply("mid", 0.8, "s", "b"),
    ]);
    assert_eq!(scores(ranked.as_slice()), vec![0.95, 0.8, 0.7]);
}

#[test]
fn rank_caps_at_top_k() {
    let ranker = RetrievalRanker::new(2, 0.0);
    let ranked = ranker.rank(vec![
        reply("a", 0.9, "s", "b"),
        reply("b", 0.8, "s", "b"),
        reply("c", 0.7, "s", "b"),
    ]);
    assert_eq!(ranked.len(), 2);
}

#[test]
fn rank_of_nothing_is_empty() {
    assert!(RetrievalRanker::default().rank(Vec::new()).is_empty());
}

#[tokio::test]
async fn retrieve_asks_for_replies_only_with_top_k() {
    let index = Arc::new(StaticIndex::new(vec![reply("a", 0.9, "s", "b")]));
    let ranker = RetrievalRanker::new(5, 0.6);

    let ranked = match ranker
        .retrieve(index.as_ref(), "admin-team-emails", &[0.1, 0.2])
        .await
    {
        Ok(ranked) => ranked,
        Err(err) => panic!("retrieve should succeed: {err}"),
    };

    assert_eq!(ranked.len(), 1);
    let queries = index.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].0, "admin-team-emails");
    assert_eq!(queries[0].1, 5);
    assert_eq!(queries[0].2, MetadataFilter::replies_only());
}

#[tokio::test]
async fn retrieve_from_empty_collection_is_empty_not_error() {
    let index = InMemoryIndex::new().with_collection("jordan-personal-emails", Vec::new());
    let ranked = RetrievalRanker::default()
        .retrieve(&index, "jordan-personal-emails", &[1.0, 0.0])
        .await;
    match ranked {
        Ok(ranked) => assert!(ranked.is_empty()),
        Err(err) => panic!("empty collection should not error: {err}"),
    }
}

#[tokio::test]
async fn retrieve_against_memory_index_ranks_by_cosine() {
    let record = |id: &str, vector: Vec<f32>, is_reply: bool| IndexedEmail {
        id: id.to_owned(),
        vector,
        subject: format!("subject {id}"),
        body: format!("body {id}"),
        source_tag: "sent".to_owned(),
        is_reply,
    };
    let index = InMemoryIndex::new().with_collection(
        "c",
        vec![
            record("close", vec![1.0, 0.1], true),
            record("far", vec![0.0, 1.0], true),
            record("inbound", vec![1.0, 0.0], false),
        ],
    );

    let ranked = match RetrievalRanker::default()
        .retrieve(&index, "c", &[1.0, 0.0])
        .await
    {
        Ok(ranked) => ranked,
        Err(err) => panic!("retrieve should succeed: {err}"),
    };

    let ids: Vec<&str> = ranked.as_slice().iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["close"]);
}
