//! Final packaging of a generated reply.

use super::Draft;

/// Subject prefixes that mark a message as a reply or forward.
const THREAD_MARKERS: [&str; 3] = ["re:", "fwd:", "fw:"];

fn has_thread_marker(subject: &str) -> bool {
    let subject = subject.trim_start();
    THREAD_MARKERS.iter().any(|marker| {
        subject
            .get(..marker.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(marker))
    })
}

/// Subject line for the reply.
///
/// Subjects already marked as a reply or forward (any case) are kept as-is;
/// everything else gets `Re: `.
pub fn reply_subject(subject: &str) -> String {
    if has_thread_marker(subject) {
        subject.to_owned()
    } else {
        format!("Re: {subject}")
    }
}

/// Assemble the caller-facing draft.
pub fn package(
    persona_id: &str,
    incoming_subject: &str,
    generated: &str,
    confidence_score: f64,
    similar_examples_used: usize,
) -> Draft {
    Draft {
        style: persona_id.to_owned(),
        draft_subject: reply_subject(incoming_subject),
        draft_body: generated.trim().to_owned(),
        confidence_score,
        similar_examples_used,
    }
}
