//! Few-shot exemplar block for the prompt.

use std::fmt::Write as _;

use super::RankedExemplars;

/// Most exemplars placed in a prompt.
pub const DEFAULT_MAX_EXAMPLES: usize = 3;

/// Body characters kept per exemplar.
pub const DEFAULT_EXCERPT_CHARS: usize = 300;

/// Marker appended after every body excerpt.
pub const ELLIPSIS: &str = "...";

/// Rendered exemplars plus how many were used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExemplarBlock {
    /// Text for the prompt; empty when no exemplars were used.
    pub text: String,
    /// Exemplars rendered into `text`.
    pub used: usize,
}

impl ExemplarBlock {
    /// Whether the block has no exemplars.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }
}

/// Renders ranked exemplars within a fixed size budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    max_examples: usize,
    excerpt_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXAMPLES, DEFAULT_EXCERPT_CHARS)
    }
}

/// First `limit` characters of `text`, on a character boundary.
pub fn excerpt(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

impl ContextAssembler {
    /// Assembler using at most `max_examples` exemplars of `excerpt_chars` each.
    pub fn new(max_examples: usize, excerpt_chars: usize) -> Self {
        Self {
            max_examples,
            excerpt_chars,
        }
    }

    /// Render the leading exemplars.
    ///
    /// Each exemplar becomes a numbered block with its score to two decimals,
    /// its subject, and its body cut to the excerpt budget followed by
    /// [`ELLIPSIS`].
    pub fn assemble(&self, exemplars: &RankedExemplars) -> ExemplarBlock {
        let mut block = ExemplarBlock::default();
        for (position, exemplar) in exemplars
            .as_slice()
            .iter()
            .take(self.max_examples)
            .enumerate()
        {
            let number = position.saturating_add(1);
            let _ = write!(
                block.text,
                "\nExample {number} (similarity: {:.2}):\nSubject: {}\nResponse: {}{ELLIPSIS}\n",
                exemplar.similarity_score,
                exemplar.subject,
                excerpt(&exemplar.body, self.excerpt_chars),
            );
            block.used = number;
        }
        block
    }
}
