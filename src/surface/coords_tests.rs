use super::*;
use crate::test_support::BufferWriter;
use tracing::Level;
use tracing::subscriber::with_default;

use CoordinateSpace::{CorrectedView, FullView, OriginalView};

fn tag(operation: DiffOp, segment_index: usize) -> DiffTag {
    DiffTag {
        operation,
        segment_index,
        sentence_index_corrected: None,
    }
}

/// Appends a paragraph made of `(text, op)` parts and returns the paragraph
/// together with the first run created for every part.
fn paragraph(surface: &mut Surface, parts: &[(&str, Option<DiffOp>)]) -> (NodeId, Vec<NodeId>) {
    let root = surface.root();
    let block = surface.append_child(root, NodeKind::Block(BlockKind::Paragraph));
    let mut firsts = Vec::new();
    for (idx, (text, op)) in parts.iter().enumerate() {
        let created = surface.append_runs(block, text, op.map(|op| tag(op, idx)));
        if let Some(first) = created.first() {
            firsts.push(*first);
        }
    }
    (block, firsts)
}

fn text_of(surface: &Surface, id: NodeId) -> String {
    match surface.kind(id) {
        Some(NodeKind::Text(text)) => text.clone(),
        other => panic!("expected text run, got {other:?}"),
    }
}

#[test]
fn offsets_count_block_terminators() {
    let mut surface = Surface::default();
    let (_, first) = paragraph(&mut surface, &[("ab", None)]);
    let (_, second) = paragraph(&mut surface, &[("cd", None)]);
    let ab = first[0];
    let cd = second[0];

    assert_eq!(surface.tree_position_to_offset(TreePosition::new(ab, 2), FullView, None), Some(2));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(cd, 0), FullView, None), Some(3));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(cd, 2), FullView, None), Some(5));

    assert_eq!(surface.offset_to_tree_position(2, FullView, None), TreePosition::new(ab, 2));
    assert_eq!(surface.offset_to_tree_position(3, FullView, None), TreePosition::new(cd, 0));
    assert_eq!(surface.offset_to_tree_position(5, FullView, None), TreePosition::new(cd, 2));
}

#[test]
fn block_boundary_lands_in_following_block() {
    let mut surface = Surface::default();
    paragraph(&mut surface, &[("ab", None)]);
    let (_, second) = paragraph(&mut surface, &[("\ncd", None)]);
    let line_break = second[0];
    assert_eq!(surface.kind(line_break), Some(&NodeKind::LineBreak));
    assert_eq!(surface.offset_to_tree_position(3, FullView, None), TreePosition::new(line_break, 0));

    let mut surface = Surface::default();
    paragraph(&mut surface, &[("ab", None)]);
    let (empty, _) = paragraph(&mut surface, &[]);
    assert_eq!(surface.offset_to_tree_position(3, FullView, None), TreePosition::new(empty, 0));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(empty, 0), FullView, None), Some(3));
}

#[test]
fn trailing_line_break_is_not_counted_twice() {
    let mut surface = Surface::default();
    let (first_block, _) = paragraph(&mut surface, &[("ab\n", None)]);
    let (_, second) = paragraph(&mut surface, &[("cd", None)]);
    let line_break = surface.children(first_block)[1];

    assert_eq!(surface.tree_position_to_offset(TreePosition::new(line_break, 0), FullView, None), Some(2));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(line_break, 1), FullView, None), Some(3));
    assert_eq!(surface.offset_to_tree_position(3, FullView, None), TreePosition::new(second[0], 0));
}

#[test]
fn placeholder_node_has_no_width() {
    let mut surface = Surface::default();
    let (block, runs) = paragraph(&mut surface, &[("one", None), ("\n", Some(DiffOp::Delete)), ("two", None)]);
    let children = surface.children(block).to_vec();
    let (placeholder, line_break) = (children[1], children[2]);
    assert_eq!(surface.kind(placeholder), Some(&NodeKind::Placeholder));
    assert_eq!(runs[1], placeholder);

    assert_eq!(surface.projected_text(FullView, None), "one\ntwo\n");
    assert_eq!(surface.projected_text(CorrectedView, None), "onetwo\n");
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(placeholder, 0), FullView, None), Some(3));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(line_break, 1), FullView, None), Some(4));
    assert_eq!(surface.offset_to_tree_position(3, FullView, None), TreePosition::new(runs[0], 3));
    assert_eq!(surface.offset_to_tree_position(4, FullView, None), TreePosition::new(runs[2], 0));
}

#[test]
fn user_zero_width_chars_keep_their_width() {
    let mut surface = Surface::default();
    let (_, runs) = paragraph(&mut surface, &[("a\u{200B}b", None)]);
    let run = runs[0];
    assert_eq!(surface.projected_text(FullView, None), "a\u{200B}b\n");
    assert_eq!(surface.user_text(OriginalView), "a\u{200B}b");
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(run, 2), FullView, None), Some(2));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(run, 3), FullView, None), Some(3));
    assert_eq!(surface.offset_to_tree_position(2, FullView, None), TreePosition::new(run, 2));
}

#[test]
fn nested_block_leaves_outer_terminator() {
    let mut surface = Surface::default();
    let (outer, runs) = paragraph(&mut surface, &[("ab", None)]);
    let inner = surface.append_child(outer, NodeKind::Block(BlockKind::Paragraph));
    let cd = surface.append_runs(inner, "cd", None)[0];
    let (_, next) = paragraph(&mut surface, &[("ef", None)]);
    let ef = next[0];

    assert_eq!(surface.projected_text(FullView, None), "abcd\n\nef\n");
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(cd, 2), FullView, None), Some(4));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(ef, 0), FullView, None), Some(6));
    assert_eq!(surface.offset_to_tree_position(6, FullView, None), TreePosition::new(ef, 0));
    assert_eq!(
        surface.run_offsets(FullView, None),
        vec![(runs[0], 0), (cd, 2), (ef, 6)]
    );
}

#[test]
fn spaces_skip_tagged_runs() {
    let mut surface = Surface::default();
    let (_, runs) = paragraph(
        &mut surface,
        &[("Hi ", None), ("there ", Some(DiffOp::Insert)), ("Bob", None)],
    );
    let (hi, there, bob) = (runs[0], runs[1], runs[2]);

    assert_eq!(surface.offset_to_tree_position(3, OriginalView, None), TreePosition::new(hi, 3));
    assert_eq!(surface.offset_to_tree_position(4, OriginalView, None), TreePosition::new(bob, 1));
    assert_eq!(surface.offset_to_tree_position(4, CorrectedView, None), TreePosition::new(there, 1));
    assert_eq!(surface.offset_to_tree_position(9, FullView, None), TreePosition::new(there, 6));

    let bob_start = TreePosition::new(bob, 0);
    assert_eq!(surface.tree_position_to_offset(bob_start, OriginalView, None), Some(3));
    assert_eq!(surface.tree_position_to_offset(bob_start, CorrectedView, None), Some(9));
    assert_eq!(
        surface.tree_position_to_offset(TreePosition::new(there, 2), OriginalView, None),
        Some(3)
    );
}

#[test]
fn deleted_runs_vanish_from_corrected_view() {
    let mut surface = Surface::default();
    let (_, runs) = paragraph(
        &mut surface,
        &[("a ", None), ("very ", Some(DiffOp::Delete)), ("big", None)],
    );
    assert_eq!(surface.offset_to_tree_position(2, CorrectedView, None), TreePosition::new(runs[0], 2));
    assert_eq!(surface.offset_to_tree_position(3, CorrectedView, None), TreePosition::new(runs[2], 1));
    assert_eq!(surface.offset_to_tree_position(4, FullView, None), TreePosition::new(runs[1], 2));
}

#[test]
fn stop_before_scopes_counting_and_fallback() {
    let surface = Surface::from_parts("Hello", Some("Rob"), None, DEFAULT_PLACEHOLDER);
    let boundary = surface.quote_boundary();
    let runs = surface.runs();
    let (hello, rob) = (runs[0], runs[1]);

    assert_eq!(
        surface.offset_to_tree_position(100, FullView, boundary),
        TreePosition::new(hello, 5)
    );
    assert_eq!(surface.offset_to_tree_position(100, FullView, None), TreePosition::new(rob, 3));
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(rob, 0), FullView, boundary), None);
    assert_eq!(surface.tree_position_to_offset(TreePosition::new(rob, 0), FullView, None), Some(6));
}

#[test]
fn fully_skipped_block_still_hosts_the_caret() {
    let mut surface = Surface::default();
    let (block, _) = paragraph(&mut surface, &[("new", Some(DiffOp::Insert))]);
    assert_eq!(surface.offset_to_tree_position(0, OriginalView, None), TreePosition::new(block, 0));
    assert_eq!(surface.end_of_content(OriginalView, None), TreePosition::new(block, 0));
}

#[test]
fn run_offsets_agree_with_translator() {
    let mut surface = Surface::default();
    paragraph(
        &mut surface,
        &[
            ("Hi ", None),
            ("there ", Some(DiffOp::Insert)),
            ("old\n", Some(DiffOp::Delete)),
            ("Bob", None),
        ],
    );
    paragraph(&mut surface, &[("Next", None)]);
    for space in [FullView, OriginalView, CorrectedView] {
        for (run, offset) in surface.run_offsets(space, None) {
            assert_eq!(
                surface.tree_position_to_offset(TreePosition::new(run, 0), space, None),
                Some(offset),
                "{space:?} run {:?}",
                surface.kind(run)
            );
        }
    }
}

#[test]
fn interior_positions_round_trip_in_original_view() {
    let mut surface = Surface::default();
    paragraph(
        &mut surface,
        &[
            ("Hi ", None),
            ("there ", Some(DiffOp::Insert)),
            ("old ", Some(DiffOp::Delete)),
            ("Bob", None),
        ],
    );
    let (_, second) = paragraph(&mut surface, &[("Next\nline", None)]);

    for run in surface.runs() {
        if surface.tag(run).is_some_and(|tag| tag.operation == DiffOp::Insert) {
            continue;
        }
        let Some(NodeKind::Text(text)) = surface.kind(run) else {
            continue;
        };
        for k in 1..text.chars().count() {
            let position = TreePosition::new(run, k);
            let offset = surface
                .tree_position_to_offset(position, OriginalView, None)
                .expect("reachable position");
            assert_eq!(
                surface.offset_to_tree_position(offset, OriginalView, None),
                position,
                "run {:?} offset {k}",
                text_of(&surface, run)
            );
        }
    }

    // Run starts right after a block end or a line break are canonical too.
    let next = second[0];
    let line = *surface.children(surface.parent(next).unwrap()).last().unwrap();
    for position in [TreePosition::new(next, 0), TreePosition::new(line, 0)] {
        let offset = surface.tree_position_to_offset(position, OriginalView, None).unwrap();
        assert_eq!(surface.offset_to_tree_position(offset, OriginalView, None), position);
    }
}

#[test]
fn run_spans_cover_each_run_once() {
    let mut surface = Surface::default();
    let (_, runs) = paragraph(
        &mut surface,
        &[("Hi ", None), ("there ", Some(DiffOp::Insert)), ("Bob", None)],
    );
    assert_eq!(
        surface.run_spans(FullView, None),
        vec![(runs[0], 0..3), (runs[1], 3..9), (runs[2], 9..12)]
    );
    assert_eq!(
        surface.run_spans(OriginalView, None),
        vec![(runs[0], 0..3), (runs[1], 3..3), (runs[2], 3..6)]
    );
}

#[test]
fn unreachable_offset_logs_a_diagnostic() {
    let surface = Surface::from_parts("ab", None, None, DEFAULT_PLACEHOLDER);
    let writer = BufferWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .without_time()
        .with_writer(writer.clone())
        .finish();

    let position = with_default(subscriber, || surface.offset_to_tree_position(40, FullView, None));

    assert_eq!(position, TreePosition::new(surface.runs()[0], 2));
    let output = writer.output();
    assert!(output.contains("surface.coords"));
    assert!(output.contains("offset_not_found_fallback"));
}
