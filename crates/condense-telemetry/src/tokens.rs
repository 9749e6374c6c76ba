//! Token estimation utilities

/// Characters per token used by every estimate in the engine.
pub const CHARS_PER_TOKEN: usize = 4;

/// Convert a character count into an estimated token count, rounding up.
pub fn tokens_for_chars(chars: usize) -> usize {
    chars.div_ceil(CHARS_PER_TOKEN)
}

/// Estimate the token cost of `text` as `ceil(chars / 4)`.
///
/// Characters are Unicode scalar values, so multi-byte text is not
/// over-counted relative to ASCII.
pub fn estimate_tokens(text: &str) -> usize {
    tokens_for_chars(text.chars().count())
}
