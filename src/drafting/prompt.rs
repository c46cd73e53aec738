//! Prompt construction for reply generation.

use std::fmt::Write as _;

use super::context::ExemplarBlock;
use crate::persona::Persona;
use crate::providers::{CompletionRequest, Message};

/// Sentence used in place of the exemplar section when nothing matched.
pub const NO_EXAMPLES_NOTE: &str =
    "No sufficiently similar past responses were found; rely on the style instructions below.";

/// Render the user instruction for `persona`.
///
/// `query_text` is the framed incoming message, the same text that was
/// embedded for retrieval.
pub fn user_prompt(persona: &Persona, query_text: &str, exemplars: &ExemplarBlock) -> String {
    let mut prompt = format!(
        "You are drafting an email response in {voice}.\n\n\
         Based on {author}'s past email patterns, draft a {tone} response to this incoming email:\n\n\
         {query_text}\n\n",
        voice = persona.voice,
        author = persona.author,
        tone = persona.tone,
    );

    if exemplars.is_empty() {
        prompt.push_str(NO_EXAMPLES_NOTE);
    } else {
        let _ = write!(
            prompt,
            "Here are similar responses {} has sent before:\n{}",
            persona.author, exemplars.text
        );
    }

    let _ = write!(prompt, "\n\nInstructions for {}:\n", persona.style_label);
    for directive in &persona.style_directives {
        let _ = writeln!(prompt, "- {directive}");
    }
    prompt.push_str("\nDraft Response:");
    prompt
}

/// Build the completion request: persona system message, one user turn,
/// and the persona's sampling settings.
pub fn build_request(
    persona: &Persona,
    query_text: &str,
    exemplars: &ExemplarBlock,
) -> CompletionRequest {
    CompletionRequest {
        messages: vec![Message::user(user_prompt(persona, query_text, exemplars))],
        system: Some(persona.system_instructions.clone()),
        max_tokens: Some(persona.max_output_tokens),
        temperature: Some(persona.temperature),
    }
}
