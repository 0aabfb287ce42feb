use std::collections::BTreeSet;
use std::ops::Range;

use tracing::{debug, info, warn};

use crate::config::{Config, SeparatorConfig};
use crate::diff::{self, DiffSegment, Resolution};
use crate::error::{Result, ReviewError};
use crate::surface::{CoordinateSpace, Surface};

pub mod cursor;
pub mod guard;
pub mod rewrite;
pub mod segments;
pub mod undo;

pub use cursor::{Cursor, Selection};
pub use guard::{DetachedHost, EditorHost, MutationGuard, SharedHost};
pub use segments::FinderMode;
pub use undo::{EditMarker, UndoHistory, UndoSnapshot};

use rewrite::Replacement;

/// The suggestion currently rendered into the surface.
#[derive(Clone, Debug)]
struct Suggestion {
    segments: Vec<DiffSegment>,
}

/// One editing session over a review surface: caret, visible suggestion,
/// undo history and the mutation guard shared with the host.
pub struct ReviewEditor {
    surface: Option<Surface>,
    selection: Option<Selection>,
    suggestion: Option<Suggestion>,
    history: UndoHistory,
    guard: MutationGuard,
    host: SharedHost,
    separator: SeparatorConfig,
    preferred_column: Option<usize>,
}

impl ReviewEditor {
    /// Takes over `surface` and normalises its user text into a single
    /// paragraph followed by the separator. Passing `None` yields an editor
    /// whose operations do nothing.
    pub fn new(surface: Option<Surface>, host: SharedHost, config: &Config) -> Self {
        let mut editor = Self {
            surface,
            selection: None,
            suggestion: None,
            history: UndoHistory::new(config.undo.history_max),
            guard: MutationGuard::new(host.clone()),
            host,
            separator: config.separator,
            preferred_column: None,
        };
        if let Some(text) = editor.surface.as_ref().map(|s| s.user_text(CoordinateSpace::OriginalView)) {
            editor.with_mutation_guard(|editor| editor.rewrite(Replacement::Plain(&text)));
        }
        editor
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn host(&self) -> &SharedHost {
        &self.host
    }

    pub fn guard(&self) -> &MutationGuard {
        &self.guard
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Segments of the visible suggestion, if any.
    pub fn suggestion(&self) -> Option<&[DiffSegment]> {
        self.suggestion.as_ref().map(|s| s.segments.as_slice())
    }

    /// User text without any suggested edits applied.
    pub fn user_text(&self) -> String {
        self.surface
            .as_ref()
            .map(|surface| surface.user_text(CoordinateSpace::OriginalView))
            .unwrap_or_default()
    }

    /// User text with every suggested edit applied.
    pub fn corrected_text(&self) -> String {
        self.surface
            .as_ref()
            .map(|surface| surface.user_text(CoordinateSpace::CorrectedView))
            .unwrap_or_default()
    }

    /// Runs `f` with host undo recording and input dispatch suspended.
    pub fn with_mutation_guard<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let guard = self.guard.clone();
        guard.run(|| f(self))
    }

    pub(crate) fn notify_selection_changed(&self) {
        let user_initiated = !self.guard.is_active();
        match self.host.try_borrow_mut() {
            Ok(mut host) => host.selection_changed(user_initiated),
            Err(_) => debug!(target: "editor.guard", user_initiated, "selection_notify_skipped"),
        }
    }

    /// Pushes `snapshot` onto the history and hands it to the host when it
    /// changed something.
    fn record_undo(&mut self, snapshot: UndoSnapshot) {
        let marker = snapshot.marker;
        let mirrored = snapshot.clone();
        if !self.history.push(snapshot) {
            return;
        }
        match self.host.try_borrow_mut() {
            Ok(mut host) => host.record_undo(&mirrored),
            Err(_) => debug!(target: "editor.undo", ?marker, "host_record_skipped"),
        }
    }

    /// Rewrites the user prefix. The caret is parked at the start without
    /// notifying the host; callers place it afterwards.
    fn rewrite(&mut self, replacement: Replacement<'_>) {
        let Some(surface) = self.surface.as_mut() else {
            debug!(target: "editor.rewrite", "surface_missing");
            return;
        };
        rewrite::replace_user_content(surface, replacement, &self.separator);
        let start = surface.offset_to_tree_position(0, CoordinateSpace::FullView, surface.quote_boundary());
        self.selection = Some(Selection::collapsed(start));
        self.suggestion = None;
        self.preferred_column = None;
    }

    fn rewrite_then(&mut self, text: &str, then: impl FnOnce(&mut Self)) {
        self.rewrite(Replacement::Plain(text));
        then(self);
    }

    pub fn replace_user_text(&mut self, text: &str) {
        self.replace_user_text_then(text, |_| {});
    }

    /// Replaces the user text, records the change and then runs `then`. The
    /// callback runs even when there is no surface.
    pub fn replace_user_text_then(&mut self, text: &str, then: impl FnOnce(&mut Self)) {
        let before = self
            .surface
            .is_some()
            .then(|| (self.user_text(), self.caret_offset(CoordinateSpace::OriginalView).unwrap_or(0)));
        let end = text.chars().count();
        self.with_mutation_guard(|editor| {
            editor.rewrite_then(text, |editor| editor.place_caret(end, CoordinateSpace::OriginalView));
        });
        if let Some((before_text, before_offset)) = before {
            let after_offset = self.caret_offset(CoordinateSpace::OriginalView).unwrap_or(end);
            self.record_undo(UndoSnapshot::new(
                before_text,
                before_offset,
                self.user_text(),
                after_offset,
                EditMarker::Replace,
            ));
        }
        then(self);
    }

    /// Renders `segments` as a suggestion over the current user text, which
    /// must equal `original`. The caret keeps its place in the original text.
    pub fn show_suggestion(&mut self, segments: Vec<DiffSegment>, original: &str) -> Result<()> {
        let Some(surface) = self.surface.as_ref() else {
            return Err(ReviewError::MissingSurface);
        };
        if let Err(err) = diff::validate(&segments, original) {
            warn!(target: "editor.suggest", segments = segments.len(), "diff_does_not_match_original");
            return Err(err);
        }
        if surface.user_text(CoordinateSpace::OriginalView) != original {
            warn!(target: "editor.suggest", "original_differs_from_user_text");
            return Err(ReviewError::DiffMismatch);
        }
        if !diff::has_edits(&segments) {
            return Err(ReviewError::NoSuggestion);
        }
        let caret = self.caret_offset(CoordinateSpace::OriginalView).unwrap_or(0);
        let view = diff::original_offset_to_view_offset(&segments, caret);
        self.with_mutation_guard(|editor| {
            editor.rewrite(Replacement::Suggestion(&segments));
            editor.place_caret(view, CoordinateSpace::FullView);
        });
        info!(
            target: "editor.suggest",
            segments = segments.len(),
            edits = segments.iter().filter(|s| s.is_edit()).count(),
            caret,
            view,
            "suggestion_shown"
        );
        self.suggestion = Some(Suggestion { segments });
        Ok(())
    }

    /// Drops the visible suggestion and restores the original text.
    pub fn dismiss_suggestion(&mut self) -> bool {
        let Some(suggestion) = self.suggestion.take() else {
            return false;
        };
        let view = self.caret_offset(CoordinateSpace::FullView).unwrap_or(0);
        let caret = diff::view_offset_to_original_offset(&suggestion.segments, view);
        let original = diff::original_text(&suggestion.segments);
        self.with_mutation_guard(|editor| {
            editor.rewrite(Replacement::Plain(&original));
            editor.place_caret(caret, CoordinateSpace::OriginalView);
        });
        info!(target: "editor.suggest", view, caret, "suggestion_dismissed");
        true
    }

    pub fn accept_all(&mut self) -> Result<()> {
        let Some(suggestion) = self.suggestion.as_ref() else {
            return Err(ReviewError::NoSuggestion);
        };
        let ids: BTreeSet<usize> = (0..suggestion.segments.len()).collect();
        self.apply_resolution(&ids, Resolution::Accept)
    }

    /// Accepts the edits the caret or selection touches. Returns false when
    /// nothing is touched.
    pub fn accept_at_cursor(&mut self) -> Result<bool> {
        self.resolve_at_cursor(Resolution::Accept)
    }

    pub fn reject_at_cursor(&mut self) -> Result<bool> {
        self.resolve_at_cursor(Resolution::Reject)
    }

    /// Resolves one edit by its segment index.
    pub fn resolve_segment(&mut self, index: usize, resolution: Resolution) -> Result<()> {
        let Some(suggestion) = self.suggestion.as_ref() else {
            return Err(ReviewError::NoSuggestion);
        };
        if !suggestion.segments.get(index).is_some_and(DiffSegment::is_edit) {
            return Err(ReviewError::NoSuggestion);
        }
        let ids = diff::expand_replacements(&suggestion.segments, &BTreeSet::from([index]));
        self.apply_resolution(&ids, resolution)
    }

    /// Resolves every edit in corrected sentence `sentence`.
    pub fn resolve_sentence(&mut self, sentence: usize, resolution: Resolution) -> Result<()> {
        let Some(suggestion) = self.suggestion.as_ref() else {
            return Err(ReviewError::NoSuggestion);
        };
        let ids: BTreeSet<usize> = suggestion
            .segments
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_edit() && s.sentence_index_corrected == Some(sentence))
            .map(|(idx, _)| idx)
            .collect();
        if ids.is_empty() {
            return Err(ReviewError::UnknownSentence(sentence));
        }
        self.apply_resolution(&ids, resolution)
    }

    fn resolve_at_cursor(&mut self, resolution: Resolution) -> Result<bool> {
        if self.suggestion.is_none() {
            return Err(ReviewError::NoSuggestion);
        }
        let ids = self.highlighted_segments();
        if ids.is_empty() {
            debug!(target: "editor.suggest", ?resolution, "nothing_at_cursor");
            return Ok(false);
        }
        self.apply_resolution(&ids, resolution)?;
        Ok(true)
    }

    fn apply_resolution(&mut self, ids: &BTreeSet<usize>, resolution: Resolution) -> Result<()> {
        let Some(suggestion) = self.suggestion.take() else {
            return Err(ReviewError::NoSuggestion);
        };
        let view = self.caret_offset(CoordinateSpace::FullView).unwrap_or(0);
        let before_text = diff::original_text(&suggestion.segments);
        let before_offset = diff::view_offset_to_original_offset(&suggestion.segments, view);
        let resolved = diff::resolve(&suggestion.segments, ids, resolution);
        let pending = diff::has_edits(&resolved.segments);

        self.with_mutation_guard(|editor| {
            if pending {
                editor.rewrite(Replacement::Suggestion(&resolved.segments));
                editor.place_caret(resolved.caret, CoordinateSpace::FullView);
            } else {
                editor.rewrite(Replacement::Plain(&diff::view_text(&resolved.segments)));
                editor.place_caret(resolved.caret, CoordinateSpace::OriginalView);
            }
        });

        let after_text = diff::original_text(&resolved.segments);
        let after_offset = diff::view_offset_to_original_offset(&resolved.segments, resolved.caret);
        info!(
            target: "editor.suggest",
            ?resolution,
            resolved = ids.len(),
            pending,
            "suggestion_resolved"
        );
        if pending {
            self.suggestion = Some(Suggestion {
                segments: resolved.segments,
            });
        }
        let marker = match resolution {
            Resolution::Accept => EditMarker::Accept,
            Resolution::Reject => EditMarker::Reject,
        };
        self.record_undo(UndoSnapshot::new(
            before_text,
            before_offset,
            after_text,
            after_offset,
            marker,
        ));
        Ok(())
    }

    /// Edit segments the finder returns for the current caret or selection.
    pub fn segments_at_cursor(&self) -> BTreeSet<usize> {
        let (Some(surface), Some(selection), Some(suggestion)) =
            (self.surface.as_ref(), self.selection.as_ref(), self.suggestion.as_ref())
        else {
            return BTreeSet::new();
        };
        let mode = FinderMode::for_cursor(selection, &suggestion.segments);
        segments::find_segments_at_cursor(mode, surface, selection, &suggestion.segments)
    }

    /// Segments at the cursor widened to whole replacements.
    pub fn highlighted_segments(&self) -> BTreeSet<usize> {
        let found = self.segments_at_cursor();
        match self.suggestion.as_ref() {
            Some(suggestion) if !found.is_empty() => diff::expand_replacements(&suggestion.segments, &found),
            _ => found,
        }
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        if text.is_empty() {
            return false;
        }
        self.edit_user_text(|current, range| {
            let mut next = String::with_capacity(current.len() + text.len());
            next.push_str(&current[..byte_index(current, range.start)]);
            next.push_str(text);
            next.push_str(&current[byte_index(current, range.end)..]);
            Some((next, range.start + text.chars().count()))
        })
    }

    pub fn backspace(&mut self) -> bool {
        self.edit_user_text(|current, range| {
            let range = if range.is_empty() {
                range.start.checked_sub(1)?..range.end
            } else {
                range
            };
            Some((remove_chars(current, &range), range.start))
        })
    }

    pub fn delete_forward(&mut self) -> bool {
        self.edit_user_text(|current, range| {
            let range = if range.is_empty() {
                if range.end >= current.chars().count() {
                    return None;
                }
                range.start..range.end + 1
            } else {
                range
            };
            Some((remove_chars(current, &range), range.start))
        })
    }

    /// Applies a typing edit to the user text. A visible suggestion is
    /// dismissed first. `edit` receives the text and the selected char range.
    fn edit_user_text(&mut self, edit: impl FnOnce(&str, Range<usize>) -> Option<(String, usize)>) -> bool {
        if self.surface.is_none() {
            return false;
        }
        self.dismiss_suggestion();
        let before_text = self.user_text();
        let Some(range) = self.selection_offsets(CoordinateSpace::OriginalView) else {
            return false;
        };
        let before_offset = self.caret_offset(CoordinateSpace::OriginalView).unwrap_or(range.end);
        let Some((after_text, after_offset)) = edit(&before_text, range) else {
            return false;
        };
        self.with_mutation_guard(|editor| editor.rewrite(Replacement::Plain(&after_text)));
        self.place_caret(after_offset, CoordinateSpace::OriginalView);
        self.record_undo(UndoSnapshot::new(
            before_text,
            before_offset,
            after_text,
            after_offset,
            EditMarker::Typing,
        ));
        true
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.take_undo() else {
            return false;
        };
        info!(target: "editor.undo", marker = ?snapshot.marker, offset = snapshot.before_offset, "undo");
        self.restore(&snapshot.before_text, snapshot.before_offset);
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.take_redo() else {
            return false;
        };
        info!(target: "editor.undo", marker = ?snapshot.marker, offset = snapshot.after_offset, "redo");
        self.restore(&snapshot.after_text, snapshot.after_offset);
        true
    }

    fn restore(&mut self, text: &str, offset: usize) {
        self.with_mutation_guard(|editor| {
            editor.rewrite_then(text, |editor| editor.place_caret(offset, CoordinateSpace::OriginalView));
        });
    }
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

fn remove_chars(text: &str, range: &Range<usize>) -> String {
    let start = byte_index(text, range.start);
    let end = byte_index(text, range.end);
    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..start]);
    out.push_str(&text[end..]);
    out
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;
