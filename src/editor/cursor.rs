use std::ops::Range;

use crate::surface::{CoordinateSpace, NodeId, Surface, TreePosition};

use super::ReviewEditor;

/// Selection capability the segment finder works against.
pub trait Cursor {
    /// Caret position when nothing is selected.
    fn collapsed_position(&self) -> Option<TreePosition>;

    /// `(anchor, head)` of a non-empty selection.
    fn selected_range(&self) -> Option<(TreePosition, TreePosition)>;

    fn set_collapsed_position(&mut self, position: TreePosition);

    /// Non-empty selection as an ordered offset range in `space`.
    fn selected_offsets(&self, surface: &Surface, space: CoordinateSpace) -> Option<Range<usize>> {
        let (anchor, head) = self.selected_range()?;
        let a = surface.tree_position_to_offset(anchor, space, None)?;
        let b = surface.tree_position_to_offset(head, space, None)?;
        Some(a.min(b)..a.max(b))
    }

    /// Runs the selection overlaps when both are measured in `space`, in
    /// document order. Zero-width runs count when they sit inside the
    /// selection.
    fn range_overlap(&self, surface: &Surface, space: CoordinateSpace) -> Vec<NodeId> {
        let Some(selection) = self.selected_offsets(surface, space) else {
            return Vec::new();
        };
        surface
            .run_spans(space, None)
            .into_iter()
            .filter(|(_, span)| overlaps(&selection, span))
            .map(|(id, _)| id)
            .collect()
    }
}

fn overlaps(selection: &Range<usize>, span: &Range<usize>) -> bool {
    if span.is_empty() {
        return selection.start <= span.start && span.start < selection.end;
    }
    span.start < selection.end && selection.start < span.end
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: TreePosition,
    pub head: TreePosition,
}

impl Selection {
    pub fn collapsed(position: TreePosition) -> Self {
        Self {
            anchor: position,
            head: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }
}

impl Cursor for Selection {
    fn collapsed_position(&self) -> Option<TreePosition> {
        self.is_collapsed().then_some(self.head)
    }

    fn selected_range(&self) -> Option<(TreePosition, TreePosition)> {
        (!self.is_collapsed()).then_some((self.anchor, self.head))
    }

    fn set_collapsed_position(&mut self, position: TreePosition) {
        *self = Self::collapsed(position);
    }
}

impl ReviewEditor {
    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Offset of the caret in `space`, counted before the quote boundary.
    pub fn caret_offset(&self, space: CoordinateSpace) -> Option<usize> {
        let surface = self.surface.as_ref()?;
        let selection = self.selection?;
        surface.tree_position_to_offset(selection.head, space, surface.quote_boundary())
    }

    /// Ordered `start..end` offsets of the selection in `space`.
    pub fn selection_offsets(&self, space: CoordinateSpace) -> Option<Range<usize>> {
        let surface = self.surface.as_ref()?;
        let selection = self.selection?;
        let boundary = surface.quote_boundary();
        let anchor = surface.tree_position_to_offset(selection.anchor, space, boundary)?;
        let head = surface.tree_position_to_offset(selection.head, space, boundary)?;
        Some(anchor.min(head)..anchor.max(head))
    }

    pub fn move_to_offset(&mut self, offset: usize) -> bool {
        let Some(len) = self.user_len(CoordinateSpace::FullView) else {
            return false;
        };
        self.preferred_column = None;
        self.place_caret(offset.min(len), CoordinateSpace::FullView);
        true
    }

    /// Moves the selection head to `offset`, keeping the anchor.
    pub fn select_to(&mut self, offset: usize) -> bool {
        let Some(len) = self.user_len(CoordinateSpace::FullView) else {
            return false;
        };
        let Some(surface) = self.surface.as_ref() else {
            return false;
        };
        let Some(current) = self.selection else {
            return false;
        };
        let head = surface.offset_to_tree_position(
            offset.min(len),
            CoordinateSpace::FullView,
            surface.quote_boundary(),
        );
        self.selection = Some(Selection {
            anchor: current.anchor,
            head,
        });
        self.preferred_column = None;
        self.notify_selection_changed();
        true
    }

    pub fn move_left(&mut self) -> bool {
        let Some(range) = self.selection_offsets(CoordinateSpace::FullView) else {
            return false;
        };
        self.preferred_column = None;
        if !range.is_empty() {
            self.place_caret(range.start, CoordinateSpace::FullView);
            return true;
        }
        if range.start == 0 {
            return false;
        }
        self.place_caret(range.start - 1, CoordinateSpace::FullView);
        true
    }

    pub fn move_right(&mut self) -> bool {
        let Some(range) = self.selection_offsets(CoordinateSpace::FullView) else {
            return false;
        };
        let Some(len) = self.user_len(CoordinateSpace::FullView) else {
            return false;
        };
        self.preferred_column = None;
        if !range.is_empty() {
            self.place_caret(range.end, CoordinateSpace::FullView);
            return true;
        }
        if range.end >= len {
            return false;
        }
        self.place_caret(range.end + 1, CoordinateSpace::FullView);
        true
    }

    pub fn move_up(&mut self) -> bool {
        self.move_vertically(-1)
    }

    pub fn move_down(&mut self) -> bool {
        self.move_vertically(1)
    }

    fn move_vertically(&mut self, delta: isize) -> bool {
        let Some(surface) = self.surface.as_ref() else {
            return false;
        };
        let Some(offset) = self.caret_offset(CoordinateSpace::FullView) else {
            return false;
        };
        let text = surface.user_text(CoordinateSpace::FullView);
        let (line, column) = line_and_column(&text, offset);
        let Some(target_line) = line.checked_add_signed(delta) else {
            return false;
        };
        let column = self.preferred_column.unwrap_or(column);
        let Some(target) = offset_at(&text, target_line, column) else {
            return false;
        };
        self.place_caret(target, CoordinateSpace::FullView);
        self.preferred_column = Some(column);
        true
    }

    pub(crate) fn user_len(&self, space: CoordinateSpace) -> Option<usize> {
        let surface = self.surface.as_ref()?;
        Some(surface.user_text(space).chars().count())
    }

    /// Collapses the selection onto `offset` in `space` and tells the host.
    pub(crate) fn place_caret(&mut self, offset: usize, space: CoordinateSpace) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        let position = surface.offset_to_tree_position(offset, space, surface.quote_boundary());
        match self.selection.as_mut() {
            Some(selection) => selection.set_collapsed_position(position),
            None => self.selection = Some(Selection::collapsed(position)),
        }
        self.notify_selection_changed();
    }
}

fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let mut line = 0;
    let mut column = 0;
    for ch in text.chars().take(offset) {
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    (line, column)
}

fn offset_at(text: &str, line: usize, column: usize) -> Option<usize> {
    let mut offset = 0;
    for (idx, content) in text.split('\n').enumerate() {
        let len = content.chars().count();
        if idx == line {
            return Some(offset + column.min(len));
        }
        offset += len + 1;
    }
    None
}
