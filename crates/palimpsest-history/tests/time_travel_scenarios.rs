#![forbid(unsafe_code)]

//! End-to-end time travel scenarios through the [`Editor`] surface.
//!
//! Run:
//!   cargo test -p palimpsest-history --test time_travel_scenarios

use palimpsest_core::fixtures::stroke;
use palimpsest_core::{Document, Keyframe, Layer};
use palimpsest_history::target::{Keyframes, Strokes};
use palimpsest_history::{Editor, HistoryConfig, Indexed};

const MAIN: Strokes = Strokes::new(0, Layer::Main);

fn editor_with(ids: &[u64]) -> Editor {
    let mut document = Document::with_keyframes(1);
    document.animation.keyframes[0].picture.strokes = ids.iter().map(|&i| stroke(i)).collect();
    Editor::with_config(document, HistoryConfig::unlimited())
}

fn ids(editor: &Editor) -> Vec<u64> {
    editor.document().animation.keyframes[0]
        .picture
        .strokes
        .iter()
        .map(|s| s.id.raw())
        .collect()
}

#[test]
fn two_groups_travel_to_every_cursor() {
    let mut editor = editor_with(&[]);
    editor.group("A", |e| {
        e.append("S1", MAIN, vec![stroke(1)]);
    });
    editor.group("B", |e| {
        e.append("S2", MAIN, vec![stroke(2)]);
    });
    assert_eq!(editor.log().len(), 2);

    editor.undo_to(0);
    assert!(ids(&editor).is_empty());
    assert!(!editor.can_undo());

    editor.undo_to(2);
    assert_eq!(ids(&editor), vec![1, 2]);
    assert!(!editor.can_redo());

    editor.undo_to(1);
    assert_eq!(ids(&editor), vec![1]);
    assert_eq!(editor.log().undo_description(), Some("A"));
    assert_eq!(editor.log().redo_description(), Some("B"));
}

#[test]
fn remove_two_and_undo_restores_order() {
    let mut editor = editor_with(&[1, 2, 3, 4, 5]);
    editor.remove("cut", MAIN, &[1, 3]);
    assert_eq!(ids(&editor), vec![1, 3, 5]);

    let region = editor.undo();
    assert_eq!(ids(&editor), vec![1, 2, 3, 4, 5]);
    assert!(region.is_some());

    editor.redo();
    assert_eq!(ids(&editor), vec![1, 3, 5]);
}

#[test]
fn equal_insert_indices_land_in_list_order() {
    let mut editor = editor_with(&[10, 11, 12]);
    editor.insert(
        "insert",
        MAIN,
        vec![Indexed::new(2, stroke(20)), Indexed::new(2, stroke(21))],
    );
    assert_eq!(ids(&editor), vec![10, 11, 20, 21, 12]);

    editor.undo();
    assert_eq!(ids(&editor), vec![10, 11, 12]);
    editor.redo();
    assert_eq!(ids(&editor), vec![10, 11, 20, 21, 12]);
}

#[test]
fn replay_to_the_cursor_is_a_no_op() {
    let mut editor = editor_with(&[1]);
    editor.append("a", MAIN, vec![stroke(2)]);
    editor.append("b", MAIN, vec![stroke(3)]);
    let before = editor.document().clone();
    let revision = editor.revision();

    let cursor = editor.log().cursor();
    assert!(editor.log().undo_and_results(cursor).is_empty());
    assert_eq!(editor.undo_to(cursor), None);
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.revision(), revision);
}

#[test]
fn keyframe_insert_shifts_root_and_undo_restores_it() {
    let mut document = Document::with_keyframes(5);
    document.animation.set_root_index(3);
    let mut editor = Editor::new(document);

    editor.insert(
        "insert keyframes",
        Keyframes,
        vec![
            Indexed::new(1, Keyframe::default()),
            Indexed::new(1, Keyframe::default()),
        ],
    );
    assert_eq!(editor.document().animation.frame_count(), 7);
    assert_eq!(editor.document().animation.root_index(), 5);

    editor.undo();
    assert_eq!(editor.document().animation.frame_count(), 5);
    assert_eq!(editor.document().animation.root_index(), 3);
}

#[test]
fn keyframe_remove_shifts_root() {
    let mut document = Document::with_keyframes(5);
    document.animation.set_root_index(3);
    let mut editor = Editor::new(document);

    editor.remove("remove keyframes", Keyframes, &[0, 1]);
    assert_eq!(editor.document().animation.root_index(), 1);
    editor.undo();
    assert_eq!(editor.document().animation.root_index(), 3);
    editor.redo();
    assert_eq!(editor.document().animation.root_index(), 1);
}

#[test]
fn new_capture_discards_redo_branch() {
    let mut editor = editor_with(&[]);
    editor.append("a", MAIN, vec![stroke(1)]);
    editor.append("b", MAIN, vec![stroke(2)]);
    editor.undo();
    editor.append("c", MAIN, vec![stroke(3)]);

    assert_eq!(editor.log().len(), 2);
    assert!(!editor.can_redo());
    editor.undo_to(0);
    assert!(ids(&editor).is_empty());
    editor.undo_to(2);
    assert_eq!(ids(&editor), vec![1, 3]);
}

#[test]
fn max_depth_bounds_how_far_back_undo_goes() {
    let mut editor = Editor::with_config(
        Document::with_keyframes(1),
        HistoryConfig::default().with_max_depth(2),
    );
    for id in 1..=4 {
        editor.append("draw", MAIN, vec![stroke(id)]);
    }
    assert_eq!(editor.log().len(), 2);
    editor.undo_to(0);
    assert_eq!(ids(&editor), vec![1, 2]);
}

#[test]
fn clear_history_keeps_the_document() {
    let mut editor = editor_with(&[]);
    editor.append("a", MAIN, vec![stroke(1)]);
    editor.clear_history();
    assert!(!editor.can_undo());
    assert_eq!(editor.undo(), None);
    assert_eq!(ids(&editor), vec![1]);
}
