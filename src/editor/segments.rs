use std::collections::BTreeSet;

use tracing::debug;

use crate::diff::DiffSegment;
use crate::sentence::{find_sentence_containing_cursor, sentence_window, split_into_sentences};
use crate::surface::{CoordinateSpace, NodeKind, Surface};

use super::cursor::Cursor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinderMode {
    /// Every edit whose runs overlap a non-empty selection.
    Range,
    /// Every edit belonging to the corrected sentence around the caret.
    Sentence,
    /// The edit the caret sits in, or touches from the left.
    Adjacent,
}

impl FinderMode {
    pub fn for_cursor(cursor: &dyn Cursor, segments: &[DiffSegment]) -> Self {
        if cursor.selected_range().is_some() {
            FinderMode::Range
        } else if segments
            .iter()
            .any(|segment| segment.sentence_index_corrected.is_some())
        {
            FinderMode::Sentence
        } else {
            FinderMode::Adjacent
        }
    }
}

/// Indices of the edit segments in `segments` that the cursor touches.
/// Malformed input yields an empty set.
pub fn find_segments_at_cursor(
    mode: FinderMode,
    surface: &Surface,
    cursor: &dyn Cursor,
    segments: &[DiffSegment],
) -> BTreeSet<usize> {
    let found = match mode {
        FinderMode::Range => overlapping_segments(surface, cursor),
        FinderMode::Sentence => sentence_segments(surface, cursor, segments),
        FinderMode::Adjacent => adjacent_segments(surface, cursor),
    };
    debug!(target: "editor.segments", ?mode, found = found.len(), "segments_at_cursor");
    found
}

fn overlapping_segments(surface: &Surface, cursor: &dyn Cursor) -> BTreeSet<usize> {
    cursor
        .range_overlap(surface, CoordinateSpace::FullView)
        .into_iter()
        .filter_map(|run| surface.tag(run))
        .filter(|tag| tag.operation.is_edit())
        .map(|tag| tag.segment_index)
        .collect()
}

fn sentence_segments(surface: &Surface, cursor: &dyn Cursor, segments: &[DiffSegment]) -> BTreeSet<usize> {
    let Some(sentence) = voted_sentence(surface, cursor) else {
        return BTreeSet::new();
    };
    let found: BTreeSet<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, segment)| segment.is_edit() && segment.sentence_index_corrected == Some(sentence))
        .map(|(idx, _)| idx)
        .collect();
    if found.is_empty() {
        debug!(target: "editor.segments", sentence, "sentence_without_edits");
    }
    found
}

/// Corrected sentence index shared by most tagged runs starting inside the
/// caret's sentence window. Ties go to the earliest run. When no run starts
/// inside the window the run nearest to the window start decides.
fn voted_sentence(surface: &Surface, cursor: &dyn Cursor) -> Option<usize> {
    let space = CoordinateSpace::CorrectedView;
    let boundary = surface.quote_boundary();
    let position = cursor.collapsed_position()?;
    let offset = surface.tree_position_to_offset(position, space, boundary)?;
    let text = surface.projected_text(space, boundary);
    let sentences = split_into_sentences(&text);
    let index = find_sentence_containing_cursor(&sentences, offset)?;
    let window = sentence_window(&sentences, index)?;

    let candidates: Vec<(usize, usize)> = surface
        .run_offsets(space, boundary)
        .into_iter()
        .filter_map(|(run, start)| {
            let sentence = surface.tag(run)?.sentence_index_corrected?;
            Some((start, sentence))
        })
        .collect();

    let mut votes: Vec<(usize, usize)> = Vec::new();
    for (start, sentence) in &candidates {
        if !window.contains(start) {
            continue;
        }
        match votes.iter_mut().find(|(value, _)| value == sentence) {
            Some((_, count)) => *count += 1,
            None => votes.push((*sentence, 1)),
        }
    }

    let mut winner: Option<(usize, usize)> = None;
    for (sentence, count) in votes {
        if winner.is_none_or(|(_, best)| count > best) {
            winner = Some((sentence, count));
        }
    }
    if let Some((sentence, _)) = winner {
        return Some(sentence);
    }

    let nearest = candidates
        .iter()
        .min_by_key(|(start, _)| start.abs_diff(window.start))
        .map(|(_, sentence)| *sentence);
    debug!(target: "editor.segments", window_start = window.start, ?nearest, "sentence_vote_fallback_nearest");
    nearest
}

fn adjacent_segments(surface: &Surface, cursor: &dyn Cursor) -> BTreeSet<usize> {
    let mut found = BTreeSet::new();
    let Some(position) = cursor.collapsed_position() else {
        return found;
    };
    if let Some((_, tag)) = surface.tagged_ancestor(position.node) {
        if tag.operation.is_edit() {
            found.insert(tag.segment_index);
        }
    }
    let at_trailing_edge = match surface.kind(position.node) {
        Some(NodeKind::Text(text)) => position.offset >= text.chars().count(),
        _ => false,
    };
    if at_trailing_edge {
        if let Some(tag) = surface.next_run(position.node).and_then(|next| surface.tag(next)) {
            if tag.operation.is_edit() {
                found.insert(tag.segment_index);
            }
        }
    }
    found
}

#[cfg(test)]
#[path = "segments_tests.rs"]
mod segments_tests;
