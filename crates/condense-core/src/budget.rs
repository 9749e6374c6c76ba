//! Token budget accounting for an assembled context

use condense_telemetry::tokens_for_chars;

use crate::types::{ContextSummary, ConversationContext, Message};

/// Characters the downstream call will see from the three content lists
pub fn context_chars(
    messages: &[Message],
    summaries: &[ContextSummary],
    contexts: &[ConversationContext],
) -> usize {
    let message_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();

    let summary_chars: usize = summaries
        .iter()
        .map(|s| {
            s.summary.chars().count()
                + s.key_topics.join(", ").chars().count()
                + s.important_decisions.join(", ").chars().count()
        })
        .sum();

    let context_chars: usize = contexts
        .iter()
        .map(|c| c.payload.to_string().chars().count())
        .sum();

    message_chars + summary_chars + context_chars
}

/// `ceil(chars / 4)`, and never zero while any list has an item
pub fn estimate_context_tokens(
    messages: &[Message],
    summaries: &[ContextSummary],
    contexts: &[ConversationContext],
) -> usize {
    let tokens = tokens_for_chars(context_chars(messages, summaries, contexts));
    let has_items = !(messages.is_empty() && summaries.is_empty() && contexts.is_empty());
    if has_items {
        tokens.max(1)
    } else {
        tokens
    }
}
