#![forbid(unsafe_code)]

//! The applier: executes one [`UndoItem`] against a [`Document`].
//!
//! # Invariants
//!
//! - Every variant either fully commits its (possibly clipped) effect or
//!   mutates nothing; there is no partially applied item.
//! - Indices outside the current bounds are clipped to the valid sub-range.
//!   When no valid sub-range remains the item is skipped.
//! - Element ids stay unique within one collection: inserted, appended,
//!   replacing or set elements whose id is already taken receive
//!   [`Document::fresh_element_id`] first. A replaced slot does not count as
//!   taken.
//! - Keyframe edits keep the animation root index pointing at the same
//!   keyframe (see `Animation::shift_root_for_insert`).
//!
//! # Failure Modes
//!
//! - **Unresolved address** (keyframe index out of range): skipped.
//! - **Out-of-bounds indices**: clipped, reported as [`ApplyOutcome::Clipped`].

use ahash::AHashSet;
use palimpsest_core::{
    Address, CollectionTag, Document, Element, ElementId, Keyframe, KeyframeOption, Rect,
    element_ids,
};

use crate::item::{Edit, Indexed, UndoItem, plan_insert, valid_indices};

/// An element touched by an applied item, for selection highlighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub address: Address,
    pub index: usize,
}

/// Why an item performed no mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The item's address does not name an existing collection.
    UnresolvedAddress,
    /// Every index of the item was out of bounds.
    OutOfBounds,
    /// The history value was flagged unrepairable.
    Erroneous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Applied after `adjusted` entries were clipped or filtered.
    Clipped { adjusted: usize },
    Skipped(SkipReason),
}

impl ApplyOutcome {
    /// Whether the document was mutated.
    #[must_use]
    pub const fn mutated(self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

/// What applying an item changed, for display invalidation.
#[derive(Debug, Clone, PartialEq)]
pub struct Touched {
    /// Union of the old and new extents of every touched element.
    pub region: Option<Rect>,
    /// The item changed something without extent (background, view position).
    pub full_redraw: bool,
    pub highlights: Vec<Highlight>,
    pub outcome: ApplyOutcome,
}

impl Touched {
    #[must_use]
    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            region: None,
            full_redraw: false,
            highlights: Vec::new(),
            outcome: ApplyOutcome::Skipped(reason),
        }
    }

    pub(crate) fn applied() -> Self {
        Self {
            region: None,
            full_redraw: false,
            highlights: Vec::new(),
            outcome: ApplyOutcome::Applied,
        }
    }

    fn redraw() -> Self {
        Self {
            full_redraw: true,
            ..Self::applied()
        }
    }

    /// Fold `other` into `self`, keeping the first adjustment reported.
    pub fn merge(&mut self, other: Touched) {
        self.grow(other.region);
        self.full_redraw |= other.full_redraw;
        self.highlights.extend(other.highlights);
        if self.outcome == ApplyOutcome::Applied {
            self.outcome = other.outcome;
        }
    }

    fn grow(&mut self, rect: Option<Rect>) {
        self.region = Rect::union_opt(self.region, rect);
    }

    fn adjusted(&mut self, adjusted: usize) {
        if adjusted > 0 {
            self.outcome = ApplyOutcome::Clipped { adjusted };
        }
    }
}

/// Positions inserted or removed by an edit, for root-index shifting.
#[derive(Debug, Default)]
struct Effect {
    inserted: Vec<usize>,
    removed: Vec<usize>,
    reset: bool,
}

/// Execute `item` against `document`.
///
/// With `make_rect == false` the touched region is not computed.
pub fn apply(item: &UndoItem, document: &mut Document, make_rect: bool) -> Touched {
    let touched = match item {
        UndoItem::Strokes {
            keyframe,
            layer,
            edit,
        } => apply_edit(document, Address::strokes(*keyframe, *layer), edit, make_rect).0,
        UndoItem::Regions {
            keyframe,
            layer,
            edit,
        } => apply_edit(document, Address::regions(*keyframe, *layer), edit, make_rect).0,
        UndoItem::Notes { layer, edit } => {
            apply_edit(document, Address::notes(*layer), edit, make_rect).0
        }
        UndoItem::Keyframes(edit) => apply_keyframes(document, edit, make_rect),
        UndoItem::Contents(edit) => {
            apply_edit(document, Address::document(CollectionTag::Contents), edit, make_rect).0
        }
        UndoItem::Texts(edit) => {
            apply_edit(document, Address::document(CollectionTag::Texts), edit, make_rect).0
        }
        UndoItem::Guides(edit) => {
            let address = Address::document(CollectionTag::Guides);
            let mut touched = apply_edit(document, address, edit, make_rect).0;
            touched.full_redraw = touched.outcome.mutated();
            touched
        }
        UndoItem::KeyframeOptions(entries) => apply_keyframe_options(document, entries),
        UndoItem::AnimationOption(option) => {
            document.animation.option = *option;
            document.animation.clamp_root_index();
            Touched::redraw()
        }
        UndoItem::ScoreOption(option) => {
            document.score.option = option.clone();
            Touched::applied()
        }
        UndoItem::BackgroundColor(color) => {
            document.background_color = *color;
            Touched::redraw()
        }
        UndoItem::RootIndex(root) => {
            document.animation.set_root_index(*root);
            Touched::redraw()
        }
    };

    match touched.outcome {
        ApplyOutcome::Applied => {
            tracing::trace!(target: "palimpsest.apply", item = %item, "applied");
        }
        outcome => {
            tracing::debug!(target: "palimpsest.apply", item = %item, ?outcome, "applied with adjustment");
        }
    }
    touched
}

fn apply_keyframes(document: &mut Document, edit: &Edit<Keyframe>, make_rect: bool) -> Touched {
    let old_count = document.animation.frame_count();
    let address = Address::document(CollectionTag::Keyframes);
    let (mut touched, effect) = apply_edit(document, address, edit, make_rect);
    if !touched.outcome.mutated() {
        return touched;
    }
    let animation = &mut document.animation;
    if effect.reset {
        animation.clamp_root_index();
    } else if !effect.inserted.is_empty() {
        animation.shift_root_for_insert(old_count, &effect.inserted);
    } else if !effect.removed.is_empty() {
        animation.shift_root_for_remove(old_count, &effect.removed);
    }
    touched.full_redraw = true;
    touched
}

fn apply_keyframe_options(
    document: &mut Document,
    entries: &[Indexed<KeyframeOption>],
) -> Touched {
    let keyframes = &mut document.animation.keyframes;
    let len = keyframes.len();
    let valid = entries.iter().filter(|e| e.index < len).count();
    if valid == 0 && !entries.is_empty() {
        return Touched::skipped(SkipReason::OutOfBounds);
    }
    let mut touched = Touched::redraw();
    for entry in entries.iter().filter(|e| e.index < len) {
        keyframes[entry.index].option = entry.value;
        touched.highlights.push(Highlight {
            address: Address::document(CollectionTag::Keyframes),
            index: entry.index,
        });
    }
    touched.adjusted(entries.len() - valid);
    touched
}

/// Give every element of `values` whose id is already taken a fresh one.
///
/// `taken` holds the ids of the target collection and grows as values are
/// accepted, so duplicates inside one batch are refreshed too.
fn refresh_ids<T: Element>(values: &mut [T], taken: &mut AHashSet<ElementId>, next: &mut ElementId) {
    for value in values {
        let Some(id) = value.element_id() else {
            continue;
        };
        if taken.contains(&id) {
            while taken.contains(next) {
                *next = next.next();
            }
            let fresh = *next;
            tracing::debug!(target: "palimpsest.apply", old = %id, new = %fresh, "refreshed colliding element id");
            value.set_element_id(fresh);
            taken.insert(fresh);
            *next = fresh.next();
        } else {
            taken.insert(id);
        }
    }
}

fn region_of<T: Element>(values: &[T]) -> Option<Rect> {
    values
        .iter()
        .filter_map(Element::bounds)
        .fold(None, |acc, r| Rect::union_opt(acc, Some(r)))
}

fn apply_edit<T: Element>(
    document: &mut Document,
    address: Address,
    edit: &Edit<T>,
    make_rect: bool,
) -> (Touched, Effect) {
    let mut next_id = document.fresh_element_id();
    let Some(items) = document.collection_mut::<T>(address) else {
        return (Touched::skipped(SkipReason::UnresolvedAddress), Effect::default());
    };

    let mut touched = Touched::applied();
    let mut effect = Effect::default();
    let highlight = |index| Highlight { address, index };

    match edit {
        Edit::Append(values) => {
            let mut values = values.clone();
            let mut taken = element_ids(items);
            refresh_ids(&mut values, &mut taken, &mut next_id);
            if make_rect {
                touched.grow(region_of(&values));
            }
            let start = items.len();
            effect.inserted = (start..start + values.len()).collect();
            touched.highlights = effect.inserted.iter().copied().map(highlight).collect();
            items.extend(values);
        }
        Edit::Insert(entries) => {
            let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
            let plan = plan_insert(&indices, items.len());
            let mut values: Vec<T> = plan.order.iter().map(|&i| entries[i].value.clone()).collect();
            let mut taken = element_ids(items);
            refresh_ids(&mut values, &mut taken, &mut next_id);
            if make_rect {
                touched.grow(region_of(&values));
            }
            for (value, &position) in values.into_iter().zip(&plan.positions) {
                items.insert(position, value);
            }
            touched.highlights = plan.positions.iter().copied().map(highlight).collect();
            touched.adjusted(plan.clipped);
            effect.inserted = plan.positions;
        }
        Edit::Remove(indices) => {
            let (valid, _) = valid_indices(indices, items.len());
            if valid.is_empty() {
                if indices.is_empty() {
                    return (touched, effect);
                }
                return (Touched::skipped(SkipReason::OutOfBounds), effect);
            }
            if make_rect {
                for &i in &valid {
                    touched.grow(items[i].bounds());
                }
            }
            for &i in valid.iter().rev() {
                items.remove(i);
            }
            touched.adjusted(indices.len() - valid.len());
            effect.removed = valid;
        }
        Edit::Replace(entries) => {
            let len = items.len();
            let valid: Vec<&Indexed<T>> = entries.iter().filter(|e| e.index < len).collect();
            if valid.is_empty() && !entries.is_empty() {
                return (Touched::skipped(SkipReason::OutOfBounds), effect);
            }
            let slots: AHashSet<usize> = valid.iter().map(|e| e.index).collect();
            let mut taken: AHashSet<ElementId> = items
                .iter()
                .enumerate()
                .filter(|(i, _)| !slots.contains(i))
                .filter_map(|(_, value)| value.element_id())
                .collect();
            let mut values: Vec<T> = valid.iter().map(|e| e.value.clone()).collect();
            refresh_ids(&mut values, &mut taken, &mut next_id);
            for (entry, value) in valid.iter().zip(values) {
                if make_rect {
                    touched.grow(items[entry.index].bounds());
                    touched.grow(value.bounds());
                }
                items[entry.index] = value;
                touched.highlights.push(highlight(entry.index));
            }
            touched.adjusted(entries.len() - valid.len());
        }
        Edit::Set(values) => {
            let mut values = values.clone();
            refresh_ids(&mut values, &mut AHashSet::new(), &mut next_id);
            if make_rect {
                touched.grow(region_of(items));
                touched.grow(region_of(&values));
            }
            *items = values;
            touched.highlights = (0..items.len()).map(highlight).collect();
            effect.reset = true;
        }
    }
    (touched, effect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use palimpsest_core::fixtures::{guide, note, stroke};
    use palimpsest_core::{Color, Layer, Stroke};

    fn strokes_doc(ids: &[u64]) -> Document {
        let mut doc = Document::with_keyframes(1);
        doc.animation.keyframes[0].picture.strokes = ids.iter().map(|&i| stroke(i)).collect();
        doc
    }

    fn ids(doc: &Document) -> Vec<u64> {
        doc.animation.keyframes[0]
            .picture
            .strokes
            .iter()
            .map(|s| s.id.raw())
            .collect()
    }

    fn strokes(edit: Edit<Stroke>) -> UndoItem {
        UndoItem::Strokes {
            keyframe: 0,
            layer: Layer::Main,
            edit,
        }
    }

    #[test]
    fn equal_insert_indices_keep_list_order() {
        let mut doc = strokes_doc(&[10, 11, 12]);
        let item = strokes(Edit::Insert(vec![
            Indexed::new(2, stroke(20)),
            Indexed::new(2, stroke(21)),
        ]));
        let touched = apply(&item, &mut doc, true);
        assert_eq!(ids(&doc), vec![10, 11, 20, 21, 12]);
        assert_eq!(touched.outcome, ApplyOutcome::Applied);
        assert_eq!(touched.highlights.len(), 2);
    }

    #[test]
    fn remove_is_descending_and_inverse_insert_restores() {
        let mut doc = strokes_doc(&[1, 2, 3, 4, 5]);
        apply(&strokes(Edit::Remove(vec![1, 3])), &mut doc, true);
        assert_eq!(ids(&doc), vec![1, 3, 5]);

        apply(
            &strokes(Edit::Insert(vec![
                Indexed::new(1, stroke(2)),
                Indexed::new(3, stroke(4)),
            ])),
            &mut doc,
            true,
        );
        assert_eq!(ids(&doc), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn remove_out_of_bounds_is_filtered() {
        let mut doc = strokes_doc(&[1, 2, 3]);
        let touched = apply(&strokes(Edit::Remove(vec![1, 3, 4])), &mut doc, false);
        assert_eq!(ids(&doc), vec![1, 3]);
        assert_eq!(touched.outcome, ApplyOutcome::Clipped { adjusted: 2 });
        assert_eq!(touched.region, None);
    }

    #[test]
    fn remove_with_nothing_valid_is_skipped() {
        let mut doc = strokes_doc(&[1, 2]);
        let before = doc.clone();
        let touched = apply(&strokes(Edit::Remove(vec![5])), &mut doc, true);
        assert_eq!(touched.outcome, ApplyOutcome::Skipped(SkipReason::OutOfBounds));
        assert_eq!(doc, before);
    }

    #[test]
    fn replace_skips_when_every_index_is_stale() {
        let mut doc = strokes_doc(&[1]);
        let before = doc.clone();
        let touched = apply(
            &strokes(Edit::Replace(vec![Indexed::new(4, stroke(9))])),
            &mut doc,
            true,
        );
        assert!(!touched.outcome.mutated());
        assert_eq!(doc, before);
    }

    #[test]
    fn replace_reports_old_and_new_extent() {
        let mut doc = strokes_doc(&[1]);
        let touched = apply(
            &strokes(Edit::Replace(vec![Indexed::new(0, stroke(3))])),
            &mut doc,
            true,
        );
        assert_eq!(ids(&doc), vec![3]);
        let region = touched.region.unwrap();
        assert!(region.x <= 10.0 && region.right() >= 35.0);
    }

    #[test]
    fn unresolved_keyframe_is_skipped() {
        let mut doc = strokes_doc(&[]);
        let item = UndoItem::Strokes {
            keyframe: 4,
            layer: Layer::Draft,
            edit: Edit::Append(vec![stroke(1)]),
        };
        let touched = apply(&item, &mut doc, true);
        assert_eq!(
            touched.outcome,
            ApplyOutcome::Skipped(SkipReason::UnresolvedAddress)
        );
    }

    #[test]
    fn colliding_ids_are_refreshed_on_append() {
        let mut doc = strokes_doc(&[1, 2]);
        doc.score.notes.push(note(6));
        apply(&strokes(Edit::Append(vec![stroke(2), stroke(2), stroke(9)])), &mut doc, true);
        assert_eq!(ids(&doc), vec![1, 2, 7, 8, 9]);
    }

    #[test]
    fn replace_refreshes_ids_taken_by_other_slots() {
        let mut doc = strokes_doc(&[1, 2]);
        apply(&strokes(Edit::Replace(vec![Indexed::new(0, stroke(2))])), &mut doc, true);
        assert_eq!(ids(&doc), vec![3, 2]);

        // The slot being replaced does not count as taken.
        apply(&strokes(Edit::Replace(vec![Indexed::new(1, stroke(2))])), &mut doc, true);
        assert_eq!(ids(&doc), vec![3, 2]);
    }

    #[test]
    fn swapping_ids_between_replaced_slots_keeps_them() {
        let mut doc = strokes_doc(&[1, 2]);
        apply(
            &strokes(Edit::Replace(vec![
                Indexed::new(0, stroke(2)),
                Indexed::new(1, stroke(1)),
            ])),
            &mut doc,
            true,
        );
        assert_eq!(ids(&doc), vec![2, 1]);
    }

    #[test]
    fn set_refreshes_duplicates_within_the_values() {
        let mut doc = strokes_doc(&[1]);
        apply(&strokes(Edit::Set(vec![stroke(5), stroke(5)])), &mut doc, true);
        assert_eq!(ids(&doc), vec![5, 2]);
    }

    #[test]
    fn same_id_in_another_keyframe_is_kept() {
        let mut doc = Document::with_keyframes(2);
        doc.animation.keyframes[0].picture.strokes.push(stroke(4));
        let item = UndoItem::Strokes {
            keyframe: 1,
            layer: Layer::Main,
            edit: Edit::Append(vec![stroke(4)]),
        };
        apply(&item, &mut doc, true);
        assert_eq!(doc.animation.keyframes[1].picture.strokes[0].id.raw(), 4);
    }

    #[test]
    fn keyframe_insert_shifts_root_index() {
        let mut doc = Document::with_keyframes(5);
        doc.animation.set_root_index(3);
        let item = UndoItem::Keyframes(Edit::Insert(vec![
            Indexed::new(1, Keyframe::default()),
            Indexed::new(1, Keyframe::default()),
        ]));
        let touched = apply(&item, &mut doc, true);
        assert_eq!(doc.animation.root_index(), 5);
        assert!(touched.full_redraw);
    }

    #[test]
    fn keyframe_remove_shifts_root_index() {
        let mut doc = Document::with_keyframes(5);
        doc.animation.set_root_index(3);
        apply(&UndoItem::Keyframes(Edit::Remove(vec![0, 1])), &mut doc, true);
        assert_eq!(doc.animation.root_index(), 1);
    }

    #[test]
    fn keyframe_set_clamps_root_index() {
        let mut doc = Document::with_keyframes(5);
        doc.animation.set_root_index(4);
        apply(
            &UndoItem::Keyframes(Edit::Set(vec![Keyframe::default()])),
            &mut doc,
            true,
        );
        assert_eq!(doc.animation.root_index(), 0);
    }

    #[test]
    fn scalars_request_full_redraw() {
        let mut doc = Document::new();
        let touched = apply(&UndoItem::BackgroundColor(Color::BLACK), &mut doc, true);
        assert!(touched.full_redraw);
        assert_eq!(doc.background_color, Color::BLACK);

        let touched = apply(&UndoItem::Guides(Edit::Append(vec![guide(4.0)])), &mut doc, true);
        assert!(touched.full_redraw);
        assert_eq!(doc.guides.len(), 1);
    }

    #[test]
    fn keyframe_options_filter_stale_indices() {
        let mut doc = Document::with_keyframes(2);
        let mut option = doc.animation.keyframes[1].option;
        option.beat = 960;
        option.is_key = false;
        let touched = apply(
            &UndoItem::KeyframeOptions(vec![Indexed::new(1, option), Indexed::new(7, option)]),
            &mut doc,
            true,
        );
        assert!(!doc.animation.keyframes[1].option.is_key);
        assert_eq!(touched.outcome, ApplyOutcome::Clipped { adjusted: 1 });
    }
}
