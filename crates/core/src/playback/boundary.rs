/// Map a character offset reported by a speech engine to a word index.
///
/// Walks the word list accumulating `word length + 1` (for the separating
/// space) until the running total exceeds the offset; that word is the one
/// being spoken. Offsets past the end clamp to the last word. Lengths are
/// counted in Unicode scalar values to match the word splitting.
///
/// O(n) per call, which is fine: engines report at most one boundary per
/// spoken word and stories are tens to low hundreds of words.
#[must_use]
pub fn word_index_at_offset(words: &[String], char_offset: usize) -> Option<usize> {
    if words.is_empty() {
        return None;
    }
    let mut cumulative = 0usize;
    for (index, word) in words.iter().enumerate() {
        cumulative += word.chars().count() + 1;
        if cumulative > char_offset {
            return Some(index);
        }
    }
    Some(words.len() - 1)
}
