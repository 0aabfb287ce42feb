use tracing::debug;

use crate::config::SeparatorConfig;
use crate::diff::DiffSegment;
use crate::surface::{BlockKind, DiffTag, NodeId, NodeKind, Surface};

/// New content for the user-authored prefix.
#[derive(Clone, Copy, Debug)]
pub enum Replacement<'a> {
    Plain(&'a str),
    /// Tagged runs for every segment, including equal text.
    Suggestion(&'a [DiffSegment]),
}

/// Replaces everything before the quote boundary with `replacement` and
/// returns the new paragraph. Content from the boundary onward is left
/// untouched; a separator is placed between the two when a boundary exists.
pub fn replace_user_content(
    surface: &mut Surface,
    replacement: Replacement<'_>,
    separator: &SeparatorConfig,
) -> NodeId {
    let boundary = surface.quote_boundary();
    clear_user_prefix(surface, boundary);

    let root = surface.root();
    let paragraph = surface.insert_child(root, 0, NodeKind::Block(BlockKind::Paragraph));
    let chars = match replacement {
        Replacement::Plain(text) => {
            surface.append_runs(paragraph, text, None);
            text.chars().count()
        }
        Replacement::Suggestion(segments) => {
            for (segment_index, segment) in segments.iter().enumerate() {
                let tag = DiffTag {
                    operation: segment.operation,
                    segment_index,
                    sentence_index_corrected: segment.sentence_index_corrected,
                };
                surface.append_runs(paragraph, &segment.text, Some(tag));
            }
            segments.iter().map(DiffSegment::len).sum()
        }
    };

    let mut blank_lines = None;
    if let Some(boundary) = boundary {
        let lines = if surface.signature_followed_by_quote(boundary) {
            separator.blank_lines_signature_with_quote
        } else {
            separator.blank_lines
        };
        surface.insert_child(root, 1, NodeKind::Separator { blank_lines: lines });
        blank_lines = Some(lines);
    }
    debug!(target: "editor.rewrite", chars, ?blank_lines, "replace_user_content");
    paragraph
}

/// Removes every node that precedes `boundary` in document order, together
/// with any separator left in front of it. Without a boundary the whole
/// surface is cleared.
fn clear_user_prefix(surface: &mut Surface, boundary: Option<NodeId>) {
    let Some(boundary) = boundary else {
        let root = surface.root();
        for child in surface.children(root).to_vec() {
            surface.remove_subtree(child);
        }
        return;
    };
    let mut current = boundary;
    while let Some(parent) = surface.parent(current) {
        let siblings = surface.children(parent).to_vec();
        for sibling in siblings.into_iter().take_while(|id| *id != current) {
            surface.remove_subtree(sibling);
        }
        current = parent;
    }
}

#[cfg(test)]
#[path = "rewrite_tests.rs"]
mod rewrite_tests;
