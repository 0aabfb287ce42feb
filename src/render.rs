use std::collections::BTreeSet;

use ratatui::{
    style::Style,
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::diff::DiffOp;
use crate::editor::ReviewEditor;
use crate::surface::{BlockKind, NodeId, NodeKind, Surface, TreePosition};
use crate::theme::Theme;

/// Glyph drawn for a placeholder node when the configured placeholder has no
/// visible width.
pub const PLACEHOLDER_GLYPH: char = '¶';

const QUOTE_PREFIX: &str = "> ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
}

pub struct RenderOptions<'a> {
    pub theme: &'a Theme,
    pub highlighted: &'a BTreeSet<usize>,
    pub caret: Option<TreePosition>,
}

/// Renders the editor's surface with its caret and the edits the caret
/// currently touches highlighted.
pub fn render_editor(editor: &ReviewEditor, width: usize, theme: &Theme) -> RenderResult {
    let highlighted = editor.highlighted_segments();
    let options = RenderOptions {
        theme,
        highlighted: &highlighted,
        caret: editor.selection().map(|selection| selection.head),
    };
    match editor.surface() {
        Some(surface) => render_surface(surface, width, &options),
        None => Renderer::new(width.max(1), &options).finish(),
    }
}

pub fn render_surface(surface: &Surface, width: usize, options: &RenderOptions<'_>) -> RenderResult {
    let mut renderer = Renderer::new(width.max(1), options);
    renderer.render_root(surface);
    renderer.finish()
}

struct Renderer<'a> {
    wrap_width: usize,
    options: &'a RenderOptions<'a>,
    cursor: Option<CursorVisualPosition>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
}

impl<'a> Renderer<'a> {
    fn new(wrap_width: usize, options: &'a RenderOptions<'a>) -> Self {
        Self {
            wrap_width,
            options,
            cursor: None,
            lines: Vec::new(),
            current_line_index: 0,
        }
    }

    fn render_root(&mut self, surface: &Surface) {
        let root = surface.root();
        let mut loose = Vec::new();
        for (idx, child) in surface.children(root).iter().enumerate() {
            self.caret_before_child(root, idx, Style::default(), &mut loose);
            match surface.kind(*child) {
                Some(NodeKind::Block(_)) => {
                    self.flush(&mut loose, "");
                    self.render_block(surface, *child, "", Style::default());
                }
                Some(NodeKind::Separator { blank_lines }) => {
                    self.flush(&mut loose, "");
                    for _ in 0..*blank_lines {
                        self.push_blank_line();
                    }
                }
                Some(NodeKind::Text(_)) | Some(NodeKind::LineBreak) | Some(NodeKind::Placeholder) => {
                    self.collect_run(surface, *child, Style::default(), &mut loose);
                }
                Some(NodeKind::Root) | None => {}
            }
        }
        let count = surface.children(root).len();
        self.caret_before_child(root, count, Style::default(), &mut loose);
        self.flush(&mut loose, "");
    }

    fn render_block(&mut self, surface: &Surface, block: NodeId, prefix: &str, base: Style) {
        let theme = self.options.theme;
        let (prefix, base) = match surface.kind(block) {
            Some(NodeKind::Block(BlockKind::Quote)) => {
                (format!("{prefix}{QUOTE_PREFIX}"), base.patch(theme.quote_style()))
            }
            Some(NodeKind::Block(BlockKind::Signature)) => {
                (prefix.to_string(), base.patch(theme.signature_style()))
            }
            _ => (prefix.to_string(), base),
        };

        let first_line = self.lines.len();
        let children = surface.children(block);
        let mut fragments = Vec::new();
        for (idx, child) in children.iter().enumerate() {
            self.caret_before_child(block, idx, base, &mut fragments);
            match surface.kind(*child) {
                Some(NodeKind::Block(_)) => {
                    self.flush(&mut fragments, &prefix);
                    self.render_block(surface, *child, &prefix, base);
                }
                Some(NodeKind::Separator { blank_lines }) => {
                    self.flush(&mut fragments, &prefix);
                    for _ in 0..*blank_lines {
                        self.push_plain_line(&prefix);
                    }
                }
                _ => self.collect_run(surface, *child, base, &mut fragments),
            }
        }
        self.caret_before_child(block, children.len(), base, &mut fragments);
        self.flush(&mut fragments, &prefix);
        if self.lines.len() == first_line {
            self.push_plain_line(&prefix);
        }
    }

    fn collect_run(&self, surface: &Surface, run: NodeId, base: Style, fragments: &mut Vec<FragmentItem>) {
        let style = self.run_style(surface, run, base);
        let caret = self
            .options
            .caret
            .filter(|position| position.node == run)
            .map(|position| position.offset);
        match surface.kind(run) {
            Some(NodeKind::Text(text)) => tokenize_text(text, style, caret, fragments),
            Some(NodeKind::Placeholder) => {
                let configured = surface.placeholder();
                let glyph = match configured.width() {
                    Some(width) if width > 0 => configured,
                    _ => PLACEHOLDER_GLYPH,
                };
                let style = style.patch(self.options.theme.placeholder_style());
                tokenize_text(&glyph.to_string(), style, caret, fragments);
            }
            Some(NodeKind::LineBreak) => {
                if caret == Some(0) {
                    fragments.push(cursor_fragment(style));
                }
                fragments.push(FragmentItem::LineBreak);
                if caret.is_some_and(|offset| offset > 0) {
                    fragments.push(cursor_fragment(style));
                }
            }
            _ => {}
        }
    }

    fn run_style(&self, surface: &Surface, run: NodeId, base: Style) -> Style {
        let theme = self.options.theme;
        let Some(tag) = surface.tag(run) else {
            return base;
        };
        let style = match tag.operation {
            DiffOp::Insert => base.patch(theme.insert_style()),
            DiffOp::Delete => base.patch(theme.delete_style()),
            DiffOp::Equal => base,
        };
        if self.options.highlighted.contains(&tag.segment_index) {
            style.patch(theme.highlight_style())
        } else {
            style
        }
    }

    fn caret_before_child(&self, parent: NodeId, index: usize, style: Style, fragments: &mut Vec<FragmentItem>) {
        if self.options.caret == Some(TreePosition::new(parent, index)) {
            fragments.push(cursor_fragment(style));
        }
    }

    fn flush(&mut self, fragments: &mut Vec<FragmentItem>, prefix: &str) {
        if fragments.is_empty() {
            return;
        }
        let lines = wrap_fragments(fragments, prefix, prefix, self.wrap_width);
        fragments.clear();
        self.consume_lines(lines);
    }

    fn push_blank_line(&mut self) {
        self.lines.push(Line::from(""));
        self.current_line_index += 1;
    }

    fn push_plain_line(&mut self, content: &str) {
        let span = Span::raw(content.to_string());
        self.lines.push(Line::from(vec![span]));
        self.current_line_index += 1;
    }

    fn consume_lines(&mut self, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            if let Some(column) = output.cursor {
                self.cursor = Some(CursorVisualPosition {
                    line: self.current_line_index,
                    column,
                });
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
        }
    }
}

#[derive(Clone)]
struct LineSegment {
    text: String,
    style: Style,
}

#[derive(Clone)]
struct LineOutput {
    spans: Vec<LineSegment>,
    cursor: Option<u16>,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    /// Column of the caret inside this fragment.
    cursor: Option<usize>,
}

#[derive(Clone, Copy)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone)]
enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

fn cursor_fragment(style: Style) -> FragmentItem {
    FragmentItem::Token(Fragment {
        text: String::new(),
        style,
        kind: FragmentKind::Word,
        width: 0,
        cursor: Some(0),
    })
}

/// Splits a run into word and whitespace tokens. `caret` is a char offset
/// into `text`; offsets at or past the end put the caret after the last char.
fn tokenize_text(text: &str, style: Style, caret: Option<usize>, fragments: &mut Vec<FragmentItem>) {
    let mut builder: Option<TokenBuilder> = None;
    let mut pending_cursor = false;
    let mut char_count = 0;

    for (idx, ch) in text.chars().enumerate() {
        char_count = idx + 1;
        if caret == Some(idx) {
            pending_cursor = true;
        }
        if ch == '\r' {
            continue;
        }
        let (actual, repeat) = if ch == '\t' { (' ', 4) } else { (ch, 1) };
        for _ in 0..repeat {
            let is_whitespace = actual.is_whitespace();
            if !builder
                .as_ref()
                .is_some_and(|existing| existing.kind_matches(is_whitespace))
            {
                if let Some(existing) = builder.take() {
                    fragments.push(FragmentItem::Token(existing.finish()));
                }
                builder = Some(TokenBuilder::new(style, is_whitespace));
            }
            if let Some(current) = builder.as_mut() {
                if pending_cursor {
                    current.mark_cursor();
                    pending_cursor = false;
                }
                current.push_char(actual);
            }
        }
    }

    if caret.is_some_and(|offset| offset >= char_count) {
        pending_cursor = true;
    }
    match builder {
        Some(mut token) => {
            if pending_cursor {
                token.mark_cursor();
            }
            fragments.push(FragmentItem::Token(token.finish()));
        }
        None if pending_cursor => fragments.push(cursor_fragment(style)),
        None => {}
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    cursor: Option<usize>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            cursor: None,
        }
    }

    fn kind_matches(&self, is_whitespace: bool) -> bool {
        matches!(
            (self.kind, is_whitespace),
            (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
        )
    }

    fn mark_cursor(&mut self) {
        self.cursor = Some(self.width);
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            cursor: self.cursor,
        }
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &str,
    continuation_prefix: &str,
    width: usize,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix);
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new(continuation_prefix);
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => pending_whitespace.push(token.clone()),
                FragmentKind::Word => {
                    let whitespace_width: usize = pending_whitespace.iter().map(|item| item.width).sum();
                    if builder.width > builder.prefix_width
                        && token.width > 0
                        && builder.width + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new(continuation_prefix);
                    }
                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    cursor: Option<u16>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: &str) -> Self {
        let prefix_width = visible_width(prefix);
        let mut segments = Vec::new();
        if !prefix.is_empty() {
            segments.push(LineSegment {
                text: prefix.to_string(),
                style: Style::default(),
            });
        }
        Self {
            segments,
            cursor: None,
            width: prefix_width,
            prefix_width,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        if let Some(offset) = fragment.cursor {
            self.cursor = Some((start + offset) as u16);
        }
        if !fragment.text.is_empty() {
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
            self.width += fragment.width;
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            cursor: self.cursor,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod render_tests;
