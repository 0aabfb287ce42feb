use super::*;
use crate::diff::{DiffOp, segments_from_tuples};
use crate::surface::{CoordinateSpace, DEFAULT_PLACEHOLDER};

fn outline(surface: &Surface) -> Vec<(usize, NodeKind)> {
    surface
        .descendants(surface.root())
        .into_iter()
        .map(|id| {
            let mut depth = 0;
            let mut current = surface.parent(id);
            while let Some(parent) = current {
                depth += 1;
                current = surface.parent(parent);
            }
            (depth, surface.kind(id).cloned().unwrap_or(NodeKind::Root))
        })
        .collect()
}

fn separator_lines(surface: &Surface) -> Vec<usize> {
    surface
        .children(surface.root())
        .iter()
        .filter_map(|id| match surface.kind(*id) {
            Some(NodeKind::Separator { blank_lines }) => Some(*blank_lines),
            _ => None,
        })
        .collect()
}

#[test]
fn rewrites_prefix_before_signature_with_quote() {
    let mut surface = Surface::from_parts("old text", Some("-- \nRob"), Some("> earlier"), DEFAULT_PLACEHOLDER);
    let paragraph = replace_user_content(
        &mut surface,
        Replacement::Plain("Hello\nWorld"),
        &SeparatorConfig::default(),
    );

    let kinds: Vec<_> = surface
        .children(paragraph)
        .iter()
        .filter_map(|id| surface.kind(*id).cloned())
        .collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::Text("Hello".into()),
            NodeKind::LineBreak,
            NodeKind::Text("World".into()),
        ]
    );

    let root_kinds: Vec<_> = surface
        .children(surface.root())
        .iter()
        .filter_map(|id| surface.kind(*id).cloned())
        .collect();
    assert_eq!(
        root_kinds,
        vec![
            NodeKind::Block(BlockKind::Paragraph),
            NodeKind::Separator { blank_lines: 1 },
            NodeKind::Block(BlockKind::Signature),
            NodeKind::Block(BlockKind::Quote),
        ]
    );
    assert_eq!(
        surface.projected_text(CoordinateSpace::FullView, None),
        "Hello\nWorld\n-- \nRob\n> earlier\n"
    );
    assert_eq!(surface.user_text(CoordinateSpace::FullView), "Hello\nWorld");
}

#[test]
fn lone_signature_or_quote_gets_wider_separator() {
    let config = SeparatorConfig::default();

    let mut signature_only = Surface::from_parts("x", Some("Rob"), None, DEFAULT_PLACEHOLDER);
    replace_user_content(&mut signature_only, Replacement::Plain("y"), &config);
    assert_eq!(separator_lines(&signature_only), vec![2]);

    let mut quote_only = Surface::from_parts("x", None, Some("> hi"), DEFAULT_PLACEHOLDER);
    replace_user_content(&mut quote_only, Replacement::Plain("y"), &config);
    assert_eq!(separator_lines(&quote_only), vec![2]);
}

#[test]
fn custom_separator_counts_are_used() {
    let config = SeparatorConfig {
        blank_lines: 4,
        blank_lines_signature_with_quote: 0,
    };
    let mut surface = Surface::from_parts("x", Some("Rob"), Some("> hi"), DEFAULT_PLACEHOLDER);
    replace_user_content(&mut surface, Replacement::Plain("y"), &config);
    assert_eq!(separator_lines(&surface), vec![0]);
}

#[test]
fn without_boundary_everything_is_replaced() {
    let mut surface = Surface::from_parts("first\nsecond", None, None, DEFAULT_PLACEHOLDER);
    replace_user_content(&mut surface, Replacement::Plain("third"), &SeparatorConfig::default());
    assert_eq!(surface.children(surface.root()).len(), 1);
    assert!(separator_lines(&surface).is_empty());
    assert_eq!(surface.projected_text(CoordinateSpace::FullView, None), "third\n");
}

#[test]
fn replacing_twice_matches_replacing_once() {
    let config = SeparatorConfig::default();
    let mut once = Surface::from_parts("draft", Some("Rob"), Some("> hi"), DEFAULT_PLACEHOLDER);
    replace_user_content(&mut once, Replacement::Plain("Final\ntext"), &config);

    let mut twice = Surface::from_parts("draft", Some("Rob"), Some("> hi"), DEFAULT_PLACEHOLDER);
    replace_user_content(&mut twice, Replacement::Plain("Final\ntext"), &config);
    replace_user_content(&mut twice, Replacement::Plain("Final\ntext"), &config);

    assert_eq!(outline(&once), outline(&twice));
    assert_eq!(separator_lines(&twice), vec![1]);
}

#[test]
fn suggestion_runs_carry_segment_tags() {
    let segments = segments_from_tuples(&[(0, "Hi "), (1, "there "), (-1, "old\n"), (0, "Bob")]);
    let mut surface = Surface::from_parts("Hi old\nBob", Some("Rob"), None, DEFAULT_PLACEHOLDER);
    replace_user_content(&mut surface, Replacement::Suggestion(&segments), &SeparatorConfig::default());

    let tags: Vec<_> = surface
        .tagged_runs()
        .into_iter()
        .map(|(_, tag)| (tag.operation, tag.segment_index))
        .collect();
    assert_eq!(
        tags,
        vec![
            (DiffOp::Equal, 0),
            (DiffOp::Insert, 1),
            (DiffOp::Delete, 2),
            (DiffOp::Delete, 2),
            (DiffOp::Delete, 2),
            (DiffOp::Equal, 3),
        ]
    );
    assert_eq!(surface.user_text(CoordinateSpace::OriginalView), "Hi old\nBob");
    assert_eq!(surface.user_text(CoordinateSpace::CorrectedView), "Hi there Bob");
    assert_eq!(surface.user_text(CoordinateSpace::FullView), "Hi there old\nBob");
}

#[test]
fn nested_boundary_keeps_its_container() {
    let mut surface = Surface::new(DEFAULT_PLACEHOLDER);
    let root = surface.root();
    let intro = surface.append_child(root, NodeKind::Block(BlockKind::Paragraph));
    surface.append_runs(intro, "intro", None);
    let wrapper = surface.append_child(root, NodeKind::Block(BlockKind::Paragraph));
    surface.append_runs(wrapper, "lead", None);
    let quote = surface.append_child(wrapper, NodeKind::Block(BlockKind::Quote));
    surface.append_runs(quote, "> q", None);

    replace_user_content(&mut surface, Replacement::Plain("new"), &SeparatorConfig::default());

    assert!(surface.contains(wrapper));
    assert!(surface.contains(quote));
    assert!(!surface.contains(intro));
    assert_eq!(surface.children(wrapper), &[quote]);
    assert_eq!(surface.user_text(CoordinateSpace::FullView), "new");
}
