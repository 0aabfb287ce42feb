use tracing::trace;

/// Maximum number of snapshots retained when no configuration says otherwise.
pub const UNDO_HISTORY_MAX: usize = 200;

/// What kind of edit produced a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditMarker {
    /// Typing or deleting characters. Consecutive typing coalesces.
    Typing,
    Accept,
    Reject,
    /// Wholesale replacement of the user text by the host.
    Replace,
}

/// Before/after state of one logical edit. Offsets count chars of the user
/// text, so snapshots stay valid after the surface is rebuilt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoSnapshot {
    pub before_text: String,
    pub before_offset: usize,
    pub after_text: String,
    pub after_offset: usize,
    pub marker: EditMarker,
}

impl UndoSnapshot {
    pub fn new(
        before_text: impl Into<String>,
        before_offset: usize,
        after_text: impl Into<String>,
        after_offset: usize,
        marker: EditMarker,
    ) -> Self {
        Self {
            before_text: before_text.into(),
            before_offset,
            after_text: after_text.into(),
            after_offset,
            marker,
        }
    }

    fn continues(&self, next: &UndoSnapshot) -> bool {
        self.marker == EditMarker::Typing
            && next.marker == EditMarker::Typing
            && self.after_text == next.before_text
            && self.after_offset == next.before_offset
    }
}

pub struct UndoHistory {
    undo_stack: Vec<UndoSnapshot>,
    redo_stack: Vec<UndoSnapshot>,
    max: usize,
    coalescing: bool,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::new(UNDO_HISTORY_MAX)
    }
}

impl UndoHistory {
    pub fn new(max: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max: max.max(1),
            coalescing: true,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Closes the current typing run so the next keystroke starts a new entry.
    pub fn break_coalescing(&mut self) {
        self.coalescing = false;
    }

    /// Records `snapshot`. Returns false when it changes nothing.
    pub fn push(&mut self, snapshot: UndoSnapshot) -> bool {
        if snapshot.before_text == snapshot.after_text {
            trace!(target: "editor.undo", undo_depth = self.undo_stack.len(), "snapshot_dedupe_skip");
            return false;
        }
        self.redo_stack.clear();
        let coalescing = std::mem::replace(&mut self.coalescing, true);
        if coalescing {
            if let Some(last) = self.undo_stack.last_mut() {
                if last.continues(&snapshot) {
                    last.after_text = snapshot.after_text;
                    last.after_offset = snapshot.after_offset;
                    trace!(target: "editor.undo", undo_depth = self.undo_stack.len(), "snapshot_coalesced");
                    return true;
                }
            }
        }
        self.undo_stack.push(snapshot);
        trace!(target: "editor.undo", undo_depth = self.undo_stack.len(), "push_snapshot");
        if self.undo_stack.len() > self.max {
            self.undo_stack.remove(0);
            trace!(target: "editor.undo", "undo_stack_trimmed");
        }
        true
    }

    /// Moves the newest entry onto the redo stack and returns it.
    pub fn take_undo(&mut self) -> Option<UndoSnapshot> {
        let snapshot = self.undo_stack.pop()?;
        self.redo_stack.push(snapshot.clone());
        self.coalescing = false;
        trace!(target: "editor.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        Some(snapshot)
    }

    /// Moves the newest redo entry back onto the undo stack and returns it.
    pub fn take_redo(&mut self) -> Option<UndoSnapshot> {
        let snapshot = self.redo_stack.pop()?;
        self.undo_stack.push(snapshot.clone());
        self.coalescing = false;
        trace!(target: "editor.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "redo_pop");
        Some(snapshot)
    }
}

#[cfg(test)]
#[path = "undo_tests.rs"]
mod undo_tests;
