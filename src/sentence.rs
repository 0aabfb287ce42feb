use std::ops::Range;

pub(crate) fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '\n')
}

/// Splits `text` into sentences. A run of terminator characters closes the
/// sentence it follows; whitespace after it opens the next one. Joining the
/// result reproduces `text` exactly.
pub fn split_into_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut previous_was_terminator = false;
    for (idx, ch) in text.char_indices() {
        let terminator = is_terminator(ch);
        if previous_was_terminator && !terminator {
            sentences.push(&text[start..idx]);
            start = idx;
        }
        previous_was_terminator = terminator;
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Index of the first sentence whose cumulative end (in chars) reaches
/// `offset`.
pub fn find_sentence_containing_cursor(sentences: &[&str], offset: usize) -> Option<usize> {
    let mut end = 0;
    for (idx, sentence) in sentences.iter().enumerate() {
        end += sentence.chars().count();
        if end >= offset {
            return Some(idx);
        }
    }
    None
}

/// Char range `[start, end)` covered by sentence `index`.
pub fn sentence_window(sentences: &[&str], index: usize) -> Option<Range<usize>> {
    let mut start = 0;
    for (idx, sentence) in sentences.iter().enumerate() {
        let len = sentence.chars().count();
        if idx == index {
            return Some(start..start + len);
        }
        start += len;
    }
    None
}
