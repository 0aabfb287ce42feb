use std::ops::Range;

use tracing::debug;

use super::{CoordinateSpace, NodeId, NodeKind, Surface, TreePosition};

enum Count {
    Found(usize),
    Continue(usize),
    Stopped,
}

enum Seek {
    Found(TreePosition),
    Continue(usize),
    Stopped,
}

impl Surface {
    /// Linear offset of `position` in `space`, counting only content before
    /// `stop_before`. Positions inside a run that `space` skips collapse onto
    /// the offset where that run would start.
    pub fn tree_position_to_offset(
        &self,
        position: TreePosition,
        space: CoordinateSpace,
        stop_before: Option<NodeId>,
    ) -> Option<usize> {
        if !self.contains(position.node) {
            debug!(target: "surface.coords", ?space, "position_node_missing");
            return None;
        }
        match self.count_to(self.root, position, space, stop_before, 0) {
            Count::Found(offset) => Some(offset),
            Count::Continue(_) | Count::Stopped => {
                debug!(target: "surface.coords", ?space, offset = position.offset, "position_not_found");
                None
            }
        }
    }

    fn count_to(
        &self,
        id: NodeId,
        target: TreePosition,
        space: CoordinateSpace,
        stop_before: Option<NodeId>,
        count: usize,
    ) -> Count {
        if Some(id) == stop_before {
            return Count::Stopped;
        }
        let Some(node) = self.nodes.get(id) else {
            return Count::Continue(count);
        };
        if space.skips(self.tags.get(&id)) {
            if id == target.node || self.is_ancestor(id, target.node) {
                return Count::Found(count);
            }
            return Count::Continue(count);
        }
        match &node.kind {
            NodeKind::Text(_) => {
                let len = node.kind.width();
                if id == target.node {
                    Count::Found(count + target.offset.min(len))
                } else {
                    Count::Continue(count + len)
                }
            }
            NodeKind::LineBreak => {
                if id == target.node {
                    Count::Found(count + target.offset.min(1))
                } else {
                    Count::Continue(count + 1)
                }
            }
            NodeKind::Placeholder | NodeKind::Separator { .. } => {
                if id == target.node {
                    Count::Found(count)
                } else {
                    Count::Continue(count)
                }
            }
            NodeKind::Root | NodeKind::Block(_) => {
                let mut count = count;
                for (index, child) in node.children.iter().enumerate() {
                    if id == target.node && index == target.offset {
                        return Count::Found(count);
                    }
                    match self.count_to(*child, target, space, stop_before, count) {
                        Count::Continue(next) => count = next,
                        other => return other,
                    }
                }
                if id == target.node {
                    return Count::Found(count);
                }
                if self.adds_block_terminator(id, space) {
                    count += 1;
                }
                Count::Continue(count)
            }
        }
    }

    /// Tree position for `offset` in `space`. An offset that sits exactly on
    /// a block boundary lands at the start of the following block. Offsets
    /// that cannot be reached fall back to the end of content before
    /// `stop_before`.
    pub fn offset_to_tree_position(
        &self,
        offset: usize,
        space: CoordinateSpace,
        stop_before: Option<NodeId>,
    ) -> TreePosition {
        match self.seek(self.root, offset, space, stop_before, 0) {
            Seek::Found(position) => position,
            Seek::Continue(_) | Seek::Stopped => {
                debug!(target: "surface.coords", offset, ?space, "offset_not_found_fallback");
                self.end_of_content(space, stop_before)
            }
        }
    }

    fn seek(
        &self,
        id: NodeId,
        target: usize,
        space: CoordinateSpace,
        stop_before: Option<NodeId>,
        count: usize,
    ) -> Seek {
        if Some(id) == stop_before {
            return Seek::Stopped;
        }
        let Some(node) = self.nodes.get(id) else {
            return Seek::Continue(count);
        };
        if space.skips(self.tags.get(&id)) {
            return Seek::Continue(count);
        }
        match &node.kind {
            NodeKind::Text(_) => {
                let len = node.kind.width();
                if target <= count + len {
                    return Seek::Found(TreePosition::new(id, target.saturating_sub(count)));
                }
                Seek::Continue(count + len)
            }
            NodeKind::LineBreak => {
                if target == count {
                    return Seek::Found(TreePosition::new(id, 0));
                }
                Seek::Continue(count + 1)
            }
            NodeKind::Placeholder | NodeKind::Separator { .. } => Seek::Continue(count),
            NodeKind::Root | NodeKind::Block(_) => {
                if node.is_block() && target == count && !self.has_meaningful_children(id, space) {
                    return Seek::Found(TreePosition::new(id, 0));
                }
                let mut count = count;
                for child in &node.children {
                    match self.seek(*child, target, space, stop_before, count) {
                        Seek::Continue(next) => count = next,
                        other => return other,
                    }
                }
                if self.adds_block_terminator(id, space) {
                    count += 1;
                }
                Seek::Continue(count)
            }
        }
    }

    fn has_meaningful_children(&self, id: NodeId, space: CoordinateSpace) -> bool {
        self.children(id)
            .iter()
            .any(|child| self.is_meaningful(*child, space))
    }

    /// Caret position after the last content `space` can see before
    /// `stop_before`.
    pub fn end_of_content(&self, space: CoordinateSpace, stop_before: Option<NodeId>) -> TreePosition {
        let mut last = None;
        for id in self.descendants(self.root) {
            if Some(id) == stop_before {
                break;
            }
            if stop_before.is_some_and(|stop| self.is_ancestor(id, stop)) {
                continue;
            }
            if self.is_skipped_in(id, space) {
                continue;
            }
            match self.kind(id) {
                Some(NodeKind::Text(text)) => {
                    last = Some(TreePosition::new(id, text.chars().count()));
                }
                Some(NodeKind::LineBreak) => last = Some(TreePosition::new(id, 1)),
                Some(NodeKind::Block(_)) if !self.has_meaningful_children(id, space) => {
                    last = Some(TreePosition::new(id, 0));
                }
                _ => {}
            }
        }
        last.unwrap_or_else(|| TreePosition::new(self.root, 0))
    }

    fn is_skipped_in(&self, id: NodeId, space: CoordinateSpace) -> bool {
        if space.skips(self.tags.get(&id)) {
            return true;
        }
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if space.skips(self.tags.get(&ancestor)) {
                return true;
            }
            current = self.parent(ancestor);
        }
        false
    }

    /// Start offset in `space` of every run before `stop_before`, in
    /// document order. Runs the space skips report the offset they would
    /// occupy.
    pub fn run_offsets(&self, space: CoordinateSpace, stop_before: Option<NodeId>) -> Vec<(NodeId, usize)> {
        self.run_spans(space, stop_before)
            .into_iter()
            .map(|(id, span)| (id, span.start))
            .collect()
    }

    /// Offsets covered by every run before `stop_before`, gathered in one
    /// walk. Runs the space skips get an empty span at the offset they would
    /// occupy.
    pub fn run_spans(&self, space: CoordinateSpace, stop_before: Option<NodeId>) -> Vec<(NodeId, Range<usize>)> {
        let mut out = Vec::new();
        self.collect_run_spans(self.root, space, stop_before, 0, false, &mut out);
        out
    }

    fn collect_run_spans(
        &self,
        id: NodeId,
        space: CoordinateSpace,
        stop_before: Option<NodeId>,
        count: usize,
        skipped: bool,
        out: &mut Vec<(NodeId, Range<usize>)>,
    ) -> Option<usize> {
        if Some(id) == stop_before {
            return None;
        }
        let node = self.nodes.get(id)?;
        let skipped = skipped || space.skips(self.tags.get(&id));
        match &node.kind {
            NodeKind::Text(_) | NodeKind::LineBreak | NodeKind::Placeholder => {
                let end = if skipped { count } else { count + node.kind.width() };
                out.push((id, count..end));
                Some(end)
            }
            NodeKind::Separator { .. } => Some(count),
            NodeKind::Root | NodeKind::Block(_) => {
                let mut count = count;
                for child in &node.children {
                    count = self.collect_run_spans(*child, space, stop_before, count, skipped, out)?;
                }
                if !skipped && self.adds_block_terminator(id, space) {
                    count += 1;
                }
                Some(count)
            }
        }
    }
}
