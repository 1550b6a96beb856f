#![forbid(unsafe_code)]

//! Copy/paste of picture elements between keyframes.
//!
//! The pasteboard is an ordinary value owned by the caller and passed where
//! it is needed. Pasting goes through the editor's capture path, so pasted
//! elements whose ids collide with the target collection get fresh ids and
//! the paste is undoable as one Version.

use palimpsest_core::{Address, Document, FilledRegion, Layer, Stroke};

use crate::apply::{SkipReason, Touched};
use crate::editor::Editor;
use crate::item::valid_indices;
use crate::target::{Regions, Strokes};

/// Indices of the selected elements in one keyframe layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub strokes: Vec<usize>,
    pub regions: Vec<usize>,
}

impl Selection {
    #[must_use]
    pub fn strokes(indices: impl Into<Vec<usize>>) -> Self {
        Self {
            strokes: indices.into(),
            regions: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.regions.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pasteboard {
    strokes: Vec<Stroke>,
    regions: Vec<FilledRegion>,
}

impl Pasteboard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.regions.is_empty()
    }

    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    #[must_use]
    pub fn regions(&self) -> &[FilledRegion] {
        &self.regions
    }

    /// Replace the contents with the selected elements.
    ///
    /// Out-of-range indices are ignored. Returns how many elements were
    /// copied; an unresolved keyframe copies nothing and keeps the previous
    /// contents.
    pub fn copy_selection(
        &mut self,
        document: &Document,
        keyframe: usize,
        layer: Layer,
        selection: &Selection,
    ) -> usize {
        let strokes = document.collection::<Stroke>(Address::strokes(keyframe, layer));
        let regions = document.collection::<FilledRegion>(Address::regions(keyframe, layer));
        let (Some(strokes), Some(regions)) = (strokes, regions) else {
            return 0;
        };
        self.strokes = pick(strokes, &selection.strokes);
        self.regions = pick(regions, &selection.regions);
        tracing::trace!(
            target: "palimpsest.history",
            strokes = self.strokes.len(),
            regions = self.regions.len(),
            "copied selection"
        );
        self.strokes.len() + self.regions.len()
    }

    /// Append the contents to a keyframe layer as one undoable Version.
    pub fn paste_into(&self, editor: &mut Editor, keyframe: usize, layer: Layer) -> Touched {
        if keyframe >= editor.document().animation.frame_count() {
            return Touched::skipped(SkipReason::UnresolvedAddress);
        }
        editor.group("paste", |editor| {
            let mut touched = editor.append("paste", Strokes::new(keyframe, layer), self.strokes.clone());
            touched.merge(editor.append("paste", Regions::new(keyframe, layer), self.regions.clone()));
            touched
        })
    }

    pub fn clear(&mut self) {
        self.strokes.clear();
        self.regions.clear();
    }
}

fn pick<T: Clone>(items: &[T], indices: &[usize]) -> Vec<T> {
    let (valid, _) = valid_indices(indices, items.len());
    valid.into_iter().map(|i| items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HistoryConfig;
    use palimpsest_core::fixtures::{region, stroke};

    fn document() -> Document {
        let mut document = Document::with_keyframes(2);
        let picture = &mut document.animation.keyframes[0].picture;
        picture.strokes = vec![stroke(1), stroke(2), stroke(3)];
        picture.regions = vec![region(4)];
        document
    }

    fn ids(document: &Document, keyframe: usize) -> Vec<u64> {
        document.animation.keyframes[keyframe]
            .picture
            .strokes
            .iter()
            .map(|s| s.id.raw())
            .collect()
    }

    #[test]
    fn copy_picks_in_index_order_and_ignores_stale_indices() {
        let mut board = Pasteboard::new();
        let selection = Selection {
            strokes: vec![2, 0, 9],
            regions: vec![0],
        };
        assert_eq!(board.copy_selection(&document(), 0, Layer::Main, &selection), 3);
        let copied: Vec<u64> = board.strokes().iter().map(|s| s.id.raw()).collect();
        assert_eq!(copied, vec![1, 3]);
        assert_eq!(board.regions().len(), 1);
    }

    #[test]
    fn copy_from_missing_keyframe_keeps_contents() {
        let mut board = Pasteboard::new();
        board.copy_selection(&document(), 0, Layer::Main, &Selection::strokes([0]));
        assert_eq!(board.copy_selection(&document(), 7, Layer::Main, &Selection::strokes([0])), 0);
        assert_eq!(board.strokes().len(), 1);
    }

    #[test]
    fn paste_refreshes_colliding_ids_and_undoes_as_one_version() {
        let mut editor = Editor::with_config(document(), HistoryConfig::unlimited());
        let mut board = Pasteboard::new();
        board.copy_selection(editor.document(), 0, Layer::Main, &Selection::strokes([0, 1]));

        board.paste_into(&mut editor, 0, Layer::Main);
        assert_eq!(ids(editor.document(), 0), vec![1, 2, 3, 5, 6]);
        assert_eq!(editor.log().len(), 1);

        board.paste_into(&mut editor, 1, Layer::Main);
        assert_eq!(ids(editor.document(), 1), vec![1, 2]);

        editor.undo_to(0);
        assert_eq!(ids(editor.document(), 0), vec![1, 2, 3]);
        assert!(ids(editor.document(), 1).is_empty());
    }

    #[test]
    fn paste_into_missing_keyframe_is_skipped() {
        let mut editor = Editor::new(document());
        let mut board = Pasteboard::new();
        board.copy_selection(editor.document(), 0, Layer::Main, &Selection::strokes([0]));
        let touched = board.paste_into(&mut editor, 5, Layer::Draft);
        assert!(!touched.outcome.mutated());
        assert!(editor.log().is_empty());
    }

    #[test]
    fn clear_empties_the_board() {
        let mut board = Pasteboard::new();
        board.copy_selection(&document(), 0, Layer::Main, &Selection::strokes([0]));
        board.clear();
        assert!(board.is_empty());
    }
}
