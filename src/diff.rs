use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::{Result, ReviewError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOp {
    Equal,
    Insert,
    Delete,
}

impl DiffOp {
    /// Maps the conventional edit-script codes (`0`, `1`, `-1`).
    pub fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(DiffOp::Equal),
            1 => Some(DiffOp::Insert),
            -1 => Some(DiffOp::Delete),
            _ => None,
        }
    }

    pub fn is_edit(self) -> bool {
        !matches!(self, DiffOp::Equal)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DiffSegment {
    #[serde(rename = "op")]
    pub operation: DiffOp,
    pub text: String,
    #[serde(default, rename = "sentence_original")]
    pub sentence_index_original: Option<usize>,
    #[serde(default, rename = "sentence")]
    pub sentence_index_corrected: Option<usize>,
}

impl DiffSegment {
    pub fn new(operation: DiffOp, text: impl Into<String>) -> Self {
        Self {
            operation,
            text: text.into(),
            sentence_index_original: None,
            sentence_index_corrected: None,
        }
    }

    pub fn equal(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Equal, text)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Insert, text)
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Self::new(DiffOp::Delete, text)
    }

    pub fn with_sentence(mut self, corrected: usize) -> Self {
        self.sentence_index_corrected = Some(corrected);
        self
    }

    pub fn with_original_sentence(mut self, original: usize) -> Self {
        self.sentence_index_original = Some(original);
        self
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_edit(&self) -> bool {
        self.operation.is_edit()
    }

    fn in_original(&self) -> bool {
        self.operation != DiffOp::Insert
    }

    fn in_corrected(&self) -> bool {
        self.operation != DiffOp::Delete
    }
}

/// Builds segments from `(code, text)` tuples as produced by common diff
/// libraries. Unknown codes are skipped.
pub fn segments_from_tuples(tuples: &[(i8, &str)]) -> Vec<DiffSegment> {
    tuples
        .iter()
        .filter_map(|(code, text)| DiffOp::from_code(*code).map(|op| DiffSegment::new(op, *text)))
        .collect()
}

pub fn original_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|segment| segment.in_original())
        .map(|segment| segment.text.as_str())
        .collect()
}

pub fn corrected_text(segments: &[DiffSegment]) -> String {
    segments
        .iter()
        .filter(|segment| segment.in_corrected())
        .map(|segment| segment.text.as_str())
        .collect()
}

pub fn view_text(segments: &[DiffSegment]) -> String {
    segments.iter().map(|segment| segment.text.as_str()).collect()
}

pub fn has_edits(segments: &[DiffSegment]) -> bool {
    segments.iter().any(|segment| segment.is_edit() && !segment.is_empty())
}

pub fn validate(segments: &[DiffSegment], original: &str) -> Result<()> {
    if original_text(segments) != original {
        return Err(ReviewError::DiffMismatch);
    }
    Ok(())
}

/// Maps an offset in the original text onto the diff-rendered text, where
/// both inserted and deleted segments are present.
pub fn original_offset_to_view_offset(segments: &[DiffSegment], offset: usize) -> usize {
    let mut original_pos = 0;
    let mut view_pos = 0;
    for segment in segments {
        let len = segment.len();
        match segment.operation {
            DiffOp::Equal | DiffOp::Delete => {
                if offset >= original_pos && offset <= original_pos + len {
                    return view_pos + (offset - original_pos);
                }
                original_pos += len;
                view_pos += len;
            }
            DiffOp::Insert => {
                if offset == original_pos {
                    return view_pos;
                }
                view_pos += len;
            }
        }
    }
    view_pos
}

/// Inverse of [`original_offset_to_view_offset`]. Offsets inside an inserted
/// segment collapse onto the original position preceding the insertion.
pub fn view_offset_to_original_offset(segments: &[DiffSegment], offset: usize) -> usize {
    let mut original_pos = 0;
    let mut view_pos = 0;
    for segment in segments {
        let len = segment.len();
        let within = offset >= view_pos && offset <= view_pos + len;
        match segment.operation {
            DiffOp::Equal | DiffOp::Delete => {
                if within {
                    return original_pos + (offset - view_pos);
                }
                original_pos += len;
                view_pos += len;
            }
            DiffOp::Insert => {
                if within {
                    return original_pos;
                }
                view_pos += len;
            }
        }
    }
    original_pos
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    Accept,
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub segments: Vec<DiffSegment>,
    /// Full-view offset just past the last resolved segment in `segments`.
    pub caret: usize,
}

/// Applies `resolution` to the edits listed in `ids`. Accepted inserts and
/// rejected deletes become equal text, accepted deletes and rejected inserts
/// disappear. Everything else is carried over untouched.
pub fn resolve(segments: &[DiffSegment], ids: &BTreeSet<usize>, resolution: Resolution) -> Resolved {
    let mut out: Vec<DiffSegment> = Vec::with_capacity(segments.len());
    let mut view_len = 0;
    let mut caret = 0;
    for (idx, segment) in segments.iter().enumerate() {
        let selected = ids.contains(&idx);
        let kept = if selected && segment.is_edit() {
            match (segment.operation, resolution) {
                (DiffOp::Insert, Resolution::Accept) | (DiffOp::Delete, Resolution::Reject) => {
                    let mut equal = segment.clone();
                    equal.operation = DiffOp::Equal;
                    Some(equal)
                }
                _ => None,
            }
        } else {
            Some(segment.clone())
        };
        if let Some(segment) = kept {
            view_len += segment.len();
            push_merged(&mut out, segment);
        }
        if selected {
            caret = view_len;
        }
    }
    Resolved { segments: out, caret }
}

fn push_merged(out: &mut Vec<DiffSegment>, segment: DiffSegment) {
    if segment.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut() {
        if last.operation == DiffOp::Equal
            && segment.operation == DiffOp::Equal
            && last.sentence_index_corrected == segment.sentence_index_corrected
        {
            last.text.push_str(&segment.text);
            return;
        }
    }
    out.push(segment);
}

/// Expands a set of edit indices so that an insert directly next to a delete
/// (ignoring whitespace-only equal text between them) travels together with
/// it as one logical replacement.
pub fn expand_replacements(segments: &[DiffSegment], ids: &BTreeSet<usize>) -> BTreeSet<usize> {
    let mut result = ids.clone();
    for &idx in ids {
        let Some(segment) = segments.get(idx) else {
            continue;
        };
        let partner = match segment.operation {
            DiffOp::Insert => DiffOp::Delete,
            DiffOp::Delete => DiffOp::Insert,
            DiffOp::Equal => continue,
        };
        if let Some(prev) = adjacent_edit(segments, idx, Direction::Backward) {
            if segments[prev].operation == partner {
                result.insert(prev);
            }
        }
        if let Some(next) = adjacent_edit(segments, idx, Direction::Forward) {
            if segments[next].operation == partner {
                result.insert(next);
            }
        }
    }
    result
}

#[derive(Clone, Copy)]
enum Direction {
    Backward,
    Forward,
}

fn adjacent_edit(segments: &[DiffSegment], idx: usize, direction: Direction) -> Option<usize> {
    let mut current = idx;
    loop {
        current = match direction {
            Direction::Backward => current.checked_sub(1)?,
            Direction::Forward => current + 1,
        };
        let segment = segments.get(current)?;
        if segment.is_edit() {
            return Some(current);
        }
        if !segment.text.chars().all(char::is_whitespace) {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hi_there_bob() -> Vec<DiffSegment> {
        segments_from_tuples(&[(0, "Hi "), (1, "there "), (0, "Bob")])
    }

    #[test]
    fn caret_stays_before_insertion() {
        let diffs = hi_there_bob();
        assert_eq!(original_text(&diffs), "Hi Bob");
        assert_eq!(corrected_text(&diffs), "Hi there Bob");
        assert_eq!(original_offset_to_view_offset(&diffs, 3), 3);
        assert_eq!(original_offset_to_view_offset(&diffs, 4), 10);
        assert_eq!(original_offset_to_view_offset(&diffs, 6), 12);
    }

    #[test]
    fn leading_insertion_keeps_caret_at_start() {
        let diffs = segments_from_tuples(&[(1, "Well, "), (0, "ok")]);
        assert_eq!(original_offset_to_view_offset(&diffs, 0), 0);
        assert_eq!(original_offset_to_view_offset(&diffs, 1), 7);
    }

    #[test]
    fn view_offset_inside_insertion_maps_before_it() {
        let diffs = hi_there_bob();
        for view in 3..=9 {
            assert_eq!(view_offset_to_original_offset(&diffs, view), 3, "view {view}");
        }
        assert_eq!(view_offset_to_original_offset(&diffs, 10), 4);
    }

    #[test]
    fn deleted_text_maps_proportionally() {
        let diffs = segments_from_tuples(&[(0, "a "), (-1, "very "), (0, "big")]);
        assert_eq!(original_offset_to_view_offset(&diffs, 4), 4);
        assert_eq!(view_offset_to_original_offset(&diffs, 4), 4);
        assert_eq!(original_offset_to_view_offset(&diffs, 9), 9);
    }

    #[test]
    fn offset_past_end_returns_final_position() {
        let diffs = hi_there_bob();
        assert_eq!(original_offset_to_view_offset(&diffs, 50), 12);
        assert_eq!(view_offset_to_original_offset(&diffs, 50), 6);
    }

    #[test]
    fn validate_rejects_foreign_original() {
        let diffs = hi_there_bob();
        assert_eq!(validate(&diffs, "Hi Bob"), Ok(()));
        assert_eq!(validate(&diffs, "Hello Bob"), Err(ReviewError::DiffMismatch));
    }

    #[test]
    fn resolve_accepts_insert_and_reports_caret() {
        let diffs = hi_there_bob();
        let resolved = resolve(&diffs, &BTreeSet::from([1]), Resolution::Accept);
        assert_eq!(resolved.segments, vec![DiffSegment::equal("Hi there Bob")]);
        assert_eq!(resolved.caret, 9);
    }

    #[test]
    fn resolve_rejects_replacement_pair() {
        let diffs = segments_from_tuples(&[(0, "a "), (-1, "cat"), (1, "dog"), (0, " ran")]);
        let resolved = resolve(&diffs, &BTreeSet::from([1, 2]), Resolution::Reject);
        assert_eq!(resolved.segments, vec![DiffSegment::equal("a cat ran")]);
        assert_eq!(resolved.caret, 5);
    }

    #[test]
    fn resolve_keeps_unselected_edits_pending() {
        let diffs = segments_from_tuples(&[(1, "So "), (0, "we go"), (-1, "!")]);
        let resolved = resolve(&diffs, &BTreeSet::from([2]), Resolution::Accept);
        assert_eq!(
            resolved.segments,
            vec![DiffSegment::insert("So "), DiffSegment::equal("we go")]
        );
        assert!(has_edits(&resolved.segments));
    }

    #[test]
    fn equal_segments_from_different_sentences_stay_apart() {
        let diffs = vec![
            DiffSegment::equal("One.").with_sentence(0),
            DiffSegment::insert(" Two.").with_sentence(1),
            DiffSegment::equal(" Three.").with_sentence(1),
        ];
        let resolved = resolve(&diffs, &BTreeSet::from([1]), Resolution::Accept);
        assert_eq!(resolved.segments.len(), 2);
        assert_eq!(resolved.segments[1].text, " Two. Three.");
    }

    #[test]
    fn replacement_expansion_skips_whitespace() {
        let diffs = segments_from_tuples(&[(0, "a "), (-1, "cat"), (0, " "), (1, "dog"), (0, " ran")]);
        let expanded = expand_replacements(&diffs, &BTreeSet::from([3]));
        assert_eq!(expanded, BTreeSet::from([1, 3]));

        let separated = segments_from_tuples(&[(-1, "cat"), (0, " and "), (1, "dog")]);
        assert_eq!(
            expand_replacements(&separated, &BTreeSet::from([2])),
            BTreeSet::from([2])
        );
    }

    fn arbitrary_segments() -> impl Strategy<Value = Vec<DiffSegment>> {
        prop::collection::vec((-1i8..=1, "[a-z ]{1,6}"), 0..8)
            .prop_map(|tuples| {
                tuples
                    .into_iter()
                    .filter_map(|(code, text)| DiffOp::from_code(code).map(|op| DiffSegment::new(op, text)))
                    .collect()
            })
    }

    proptest! {
        #[test]
        fn original_offsets_round_trip(segments in arbitrary_segments(), pick in 0usize..64) {
            let original_len = original_text(&segments).chars().count();
            let offset = pick % (original_len + 1);
            let view = original_offset_to_view_offset(&segments, offset);
            prop_assert_eq!(view_offset_to_original_offset(&segments, view), offset);
        }

        #[test]
        fn accepting_everything_yields_corrected_text(segments in arbitrary_segments()) {
            let ids: BTreeSet<usize> = (0..segments.len()).collect();
            let resolved = resolve(&segments, &ids, Resolution::Accept);
            prop_assert_eq!(view_text(&resolved.segments), corrected_text(&segments));
            prop_assert!(!has_edits(&resolved.segments));
        }
    }
}
