use std::collections::HashMap;

use slotmap::SlotMap;

use crate::diff::DiffOp;

mod coords;

pub const DEFAULT_PLACEHOLDER: char = '\u{200B}';

slotmap::new_key_type! {
    pub struct NodeId;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Paragraph,
    Quote,
    Signature,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Block(BlockKind),
    Text(String),
    LineBreak,
    /// Zero-width glyph the engine puts in front of a deleted line break so
    /// the hidden break stays selectable.
    Placeholder,
    /// Non-editable spacing between user text and the quote boundary.
    Separator { blank_lines: usize },
}

impl NodeKind {
    /// Positions this node occupies on its own; blocks count separately.
    pub fn width(&self) -> usize {
        match self {
            NodeKind::Text(text) => text.chars().count(),
            NodeKind::LineBreak => 1,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_run(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_) | NodeKind::LineBreak | NodeKind::Placeholder)
    }

    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block(_))
    }

    pub fn is_boundary(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Block(BlockKind::Quote) | NodeKind::Block(BlockKind::Signature)
        )
    }
}

/// Diff metadata attached to a run that was rendered from a diff segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiffTag {
    pub operation: DiffOp,
    pub segment_index: usize,
    pub sentence_index_corrected: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoordinateSpace {
    /// Every run is counted.
    FullView,
    /// Inserted runs are skipped.
    OriginalView,
    /// Deleted runs are skipped.
    CorrectedView,
}

impl CoordinateSpace {
    pub fn skips(self, tag: Option<&DiffTag>) -> bool {
        match (self, tag.map(|tag| tag.operation)) {
            (CoordinateSpace::OriginalView, Some(DiffOp::Insert)) => true,
            (CoordinateSpace::CorrectedView, Some(DiffOp::Delete)) => true,
            _ => false,
        }
    }
}

/// A location inside the rendered tree. On a text run `offset` counts chars,
/// on a line break it is `0` (before) or `1` (after), on a block it is a
/// child index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreePosition {
    pub node: NodeId,
    pub offset: usize,
}

impl TreePosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Clone, Debug)]
pub struct Surface {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    tags: HashMap<NodeId, DiffTag>,
    placeholder: char,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(DEFAULT_PLACEHOLDER)
    }
}

impl Surface {
    pub fn new(placeholder: char) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(NodeKind::Root));
        Self {
            nodes,
            root,
            tags: HashMap::new(),
            placeholder,
        }
    }

    /// Builds a surface holding `user_text` followed by optional signature
    /// and quoted-reply blocks.
    pub fn from_parts(
        user_text: &str,
        signature: Option<&str>,
        quote: Option<&str>,
        placeholder: char,
    ) -> Self {
        let mut surface = Self::new(placeholder);
        let root = surface.root;
        let paragraph = surface.append_child(root, NodeKind::Block(BlockKind::Paragraph));
        surface.append_runs(paragraph, user_text, None);
        if let Some(signature) = signature {
            let block = surface.append_child(root, NodeKind::Block(BlockKind::Signature));
            surface.append_runs(block, signature, None);
        }
        if let Some(quote) = quote {
            let block = surface.append_child(root, NodeKind::Block(BlockKind::Quote));
            surface.append_runs(block, quote, None);
        }
        surface
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Glyph configured for placeholder nodes.
    pub fn placeholder(&self) -> char {
        self.placeholder
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id).map(Node::kind)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(Node::parent)
    }

    pub fn append_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let index = self.children(parent).len();
        self.insert_child(parent, index, kind)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, kind: NodeKind) -> NodeId {
        let mut node = Node::new(kind);
        node.parent = Some(parent);
        let id = self.nodes.insert(node);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            let index = index.min(parent_node.children.len());
            parent_node.children.insert(index, id);
        }
        id
    }

    /// Removes `id` and everything below it, dropping their diff tags.
    pub fn remove_subtree(&mut self, id: NodeId) -> bool {
        if id == self.root || !self.nodes.contains_key(id) {
            return false;
        }
        if let Some(parent) = self.parent(id) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|child| *child != id);
            }
        }
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(current) {
                pending.extend(node.children);
            }
            self.tags.remove(&current);
        }
        true
    }

    /// Appends `text` as text runs separated by line breaks. Deleted
    /// newlines get a placeholder node in front of their line break so the
    /// hidden break stays selectable.
    pub fn append_runs(&mut self, parent: NodeId, text: &str, tag: Option<DiffTag>) -> Vec<NodeId> {
        let mut created = Vec::new();
        let deleted = tag.is_some_and(|tag| tag.operation == DiffOp::Delete);
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                if deleted {
                    created.push(self.append_child(parent, NodeKind::Placeholder));
                }
                created.push(self.append_child(parent, NodeKind::LineBreak));
            }
            if !line.is_empty() {
                created.push(self.append_child(parent, NodeKind::Text(line.to_string())));
            }
        }
        if let Some(tag) = tag {
            for id in &created {
                self.tags.insert(*id, tag);
            }
        }
        created
    }

    pub fn tag(&self, id: NodeId) -> Option<&DiffTag> {
        self.tags.get(&id)
    }

    pub fn has_tags(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Nearest tagged node among `id` and its ancestors.
    pub fn tagged_ancestor(&self, id: NodeId) -> Option<(NodeId, DiffTag)> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(tag) = self.tags.get(&node) {
                return Some((node, *tag));
            }
            current = self.parent(node);
        }
        None
    }

    /// All nodes below `id` in document order, `id` included.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            result.push(current);
            pending.extend(node.children.iter().rev().copied());
        }
        result
    }

    /// Text runs and line breaks in document order.
    pub fn runs(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.nodes.get(*id).is_some_and(Node::is_run))
            .collect()
    }

    pub fn tagged_runs(&self) -> Vec<(NodeId, DiffTag)> {
        self.runs()
            .into_iter()
            .filter_map(|id| self.tags.get(&id).map(|tag| (id, *tag)))
            .collect()
    }

    pub fn next_run(&self, id: NodeId) -> Option<NodeId> {
        let runs = self.runs();
        let idx = runs.iter().position(|run| *run == id)?;
        runs.get(idx + 1).copied()
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// First quoted-reply or signature block in document order.
    pub fn quote_boundary(&self) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|id| self.nodes.get(*id).is_some_and(Node::is_boundary))
    }

    /// True when `boundary` is a signature whose next meaningful sibling is a
    /// quoted reply.
    pub fn signature_followed_by_quote(&self, boundary: NodeId) -> bool {
        if self.kind(boundary) != Some(&NodeKind::Block(BlockKind::Signature)) {
            return false;
        }
        let Some(parent) = self.parent(boundary) else {
            return false;
        };
        let siblings = self.children(parent);
        let Some(idx) = siblings.iter().position(|id| *id == boundary) else {
            return false;
        };
        siblings[idx + 1..]
            .iter()
            .find(|id| !self.is_blank(**id))
            .is_some_and(|id| self.kind(*id) == Some(&NodeKind::Block(BlockKind::Quote)))
    }

    fn is_blank(&self, id: NodeId) -> bool {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => text.chars().all(char::is_whitespace),
            Some(NodeKind::Placeholder) | Some(NodeKind::Separator { .. }) => true,
            _ => false,
        }
    }

    /// Plain text of the whole surface as seen from `space`, cut before
    /// `stop_before`. Its char length agrees with the coordinate translator.
    pub fn projected_text(&self, space: CoordinateSpace, stop_before: Option<NodeId>) -> String {
        let mut out = String::new();
        self.project(self.root, space, stop_before, &mut out);
        out
    }

    /// Text the user authored: everything before the quote boundary, without
    /// the terminator of the final block.
    pub fn user_text(&self, space: CoordinateSpace) -> String {
        let mut text = self.projected_text(space, self.quote_boundary());
        if text.ends_with('\n') && self.ends_with_block_terminator(space, self.quote_boundary()) {
            text.pop();
        }
        text
    }

    /// Returns false once `stop_before` has been reached.
    fn project(&self, id: NodeId, space: CoordinateSpace, stop_before: Option<NodeId>, out: &mut String) -> bool {
        if Some(id) == stop_before {
            return false;
        }
        let Some(node) = self.nodes.get(id) else {
            return true;
        };
        if space.skips(self.tags.get(&id)) {
            return true;
        }
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::LineBreak => out.push('\n'),
            NodeKind::Placeholder | NodeKind::Separator { .. } => {}
            NodeKind::Root | NodeKind::Block(_) => {
                for child in &node.children {
                    if !self.project(*child, space, stop_before, out) {
                        return false;
                    }
                }
                if self.adds_block_terminator(id, space) {
                    out.push('\n');
                }
            }
        }
        true
    }

    /// A block contributes one position after its children unless its last
    /// meaningful child is a line break. A nested block as last child still
    /// leaves the outer block its own terminator.
    pub(crate) fn adds_block_terminator(&self, id: NodeId, space: CoordinateSpace) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        if !node.is_block() {
            return false;
        }
        let last = node.children.iter().rev().find(|child| self.is_meaningful(**child, space));
        match last.and_then(|child| self.nodes.get(*child)) {
            Some(child) => !matches!(child.kind, NodeKind::LineBreak),
            None => true,
        }
    }

    fn is_meaningful(&self, id: NodeId, space: CoordinateSpace) -> bool {
        if space.skips(self.tags.get(&id)) {
            return false;
        }
        match self.kind(id) {
            Some(NodeKind::Text(text)) => !text.is_empty(),
            Some(NodeKind::Placeholder) | Some(NodeKind::Separator { .. }) | None => false,
            Some(_) => true,
        }
    }

    /// Whether the last thing counted before `stop_before` is a block terminator.
    fn ends_with_block_terminator(&self, space: CoordinateSpace, stop_before: Option<NodeId>) -> bool {
        let mut last_block = None;
        for id in self.descendants(self.root) {
            if Some(id) == stop_before {
                break;
            }
            if stop_before.is_some_and(|stop| self.is_ancestor(id, stop)) {
                continue;
            }
            if self.nodes.get(id).is_some_and(Node::is_block) {
                last_block = Some(id);
            }
        }
        last_block.is_some_and(|block| self.adds_block_terminator(block, space))
    }
}


#[cfg(test)]
#[path = "surface/coords_tests.rs"]
mod coords_tests;
