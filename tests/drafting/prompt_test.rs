//! Prompt construction tests.

use mailvoice::drafting::context::{ContextAssembler, ExemplarBlock};
use mailvoice::drafting::prompt::{build_request, user_prompt, NO_EXAMPLES_NOTE};
use mailvoice::drafting::ranker::RetrievalRanker;
use mailvoice::persona::Persona;
use mailvoice::providers::Role;

use crate::support::reply;

const QUERY: &str = "Subject: Catch up?\n\nFrom: sam@example.com\n\nBody: Coffee next week?";

fn one_example() -> ExemplarBlock {
    let set = RetrievalRanker::default().rank(vec![reply(
        "a",
        0.82,
        "Coffee",
        "Would love to, Tuesday works!",
    )]);
    ContextAssembler::default().assemble(&set)
}

#[test]
fn personal_prompt_matches_template() {
    let prompt = user_prompt(&Persona::personal(), QUERY, &one_example());

    let expected = "You are drafting an email response in Jordan's personal communication style.\n\n\
        Based on Jordan's past email patterns, draft a warm, relationship-focused response to this incoming email:\n\n\
        Subject: Catch up?\n\nFrom: sam@example.com\n\nBody: Coffee next week?\n\n\
        Here are similar responses Jordan has sent before:\n\
        \nExample 1 (similarity: 0.82):\nSubject: Coffee\nResponse: Would love to, Tuesday works!...\n\
        \n\nInstructions for Jordan's personal style:\n\
        - Be warm and relationship-focused\n\
        - Use a friendly, approachable tone\n\
        - Show genuine interest in the person\n\
        - Keep responses conversational\n\
        - Match the length and formality of examples\n\
        - Include personal touches when appropriate\n\
        \nDraft Response:";
    assert_eq!(prompt, expected);
}

#[test]
fn admin_prompt_uses_admin_voice_and_directives() {
    let prompt = user_prompt(&Persona::admin(), QUERY, &one_example());
    assert!(prompt.starts_with(
        "You are drafting an email response in the admin team's professional style."
    ));
    assert!(prompt.contains("draft a professional, efficient response"));
    assert!(prompt.contains("Here are similar responses the admin team has sent before:"));
    assert!(prompt.contains("\n\nInstructions for admin team style:\n- Be professional and efficient\n"));
    assert!(prompt.contains("- Include specific details (dates, amounts, confirmations)\n"));
    assert!(prompt.ends_with("Draft Response:"));
}

#[test]
fn prompt_without_exemplars_says_so() {
    let prompt = user_prompt(&Persona::personal(), QUERY, &ExemplarBlock::default());
    assert!(prompt.contains(NO_EXAMPLES_NOTE));
    assert!(!prompt.contains("Here are similar responses"));
    assert!(prompt.contains(&format!(
        "{NO_EXAMPLES_NOTE}\n\nInstructions for Jordan's personal style:\n"
    )));
}

#[test]
fn request_carries_persona_sampling_settings() {
    let persona = Persona::admin();
    let request = build_request(&persona, QUERY, &one_example());

    assert_eq!(request.system.as_deref(), Some(persona.system_instructions.as_str()));
    assert_eq!(request.max_tokens, Some(400));
    assert_eq!(request.temperature, Some(0.6));
    assert_eq!(request.messages.len(), 1);
    assert_eq!(request.messages[0].role, Role::User);
    assert!(request.messages[0].content.contains(QUERY));
}

#[test]
fn personal_request_uses_warmer_temperature() {
    let request = build_request(&Persona::personal(), QUERY, &ExemplarBlock::default());
    assert_eq!(request.temperature, Some(0.7));
}
