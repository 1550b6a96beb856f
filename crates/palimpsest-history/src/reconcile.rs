#![forbid(unsafe_code)]

//! Reconciliation of history values against drifted document state.
//!
//! A value recorded long ago (or rehydrated from storage) may address
//! elements that moved, changed or disappeared since. Before such a value is
//! applied for the first time, [`reconcile`] compares it with the current
//! document, with `S` the side about to be applied and `O` the side that
//! reverts it:
//!
//! 1. `O` is re-derived as the inverse of `S` against current state and
//!    rewritten when it differs.
//! 2. Index lists of `S` are filtered and clipped to current bounds; when the
//!    set changes, `S` and `O` are rewritten identically.
//! 3. For collections whose elements carry ids (strokes, regions, notes), a
//!    recorded payload that no longer matches the elements at its indices is
//!    resolved in this order:
//!    - same ids with different payload: `O` takes the current payload;
//!    - every recorded id found elsewhere: both sides move to the new indices;
//!    - recorded count equal to the in-bounds count: erroneous;
//!    - otherwise: both sides are clipped to the current range.
//!
//! Unresolvable addresses and mismatched sides are erroneous. Erroneous values
//! stay in the log and time travel skips them.

use palimpsest_core::{Address, CollectionTag, Document, Element, KeyframeOption};

use crate::item::{Edit, Indexed, UndoItem, plan_insert, valid_indices};
use crate::value::{Direction, ItemPair, Version};

/// Result of reconciling one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// The value matched current state.
    Clean,
    /// The value was rewritten to match current state.
    Repaired,
    /// No consistent repair exists.
    Erroneous,
}

/// Outcome of [`check_value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checked {
    pub reconciliation: Reconciliation,
    /// A restore-root value was inserted at the head of the Version, shifting
    /// every value index of that Version by one.
    pub head_inserted: bool,
}

/// Prepare value `index` of `version` for application in `direction`.
///
/// Decodes the value if unloaded and reconciles it when it needs a check.
/// The first reconciled value of a Version also seeds the Version with the
/// current root index, provided the document has keyframes.
pub fn check_value(
    version: &mut Version,
    index: usize,
    direction: Direction,
    document: &Document,
) -> Checked {
    let Some(value) = version.value_mut(index) else {
        return Checked {
            reconciliation: Reconciliation::Erroneous,
            head_inserted: false,
        };
    };
    if value.is_erroneous() {
        return Checked {
            reconciliation: Reconciliation::Erroneous,
            head_inserted: false,
        };
    }
    if !value.needs_check() {
        return Checked {
            reconciliation: Reconciliation::Clean,
            head_inserted: false,
        };
    }

    let reconciliation = match value.materialize() {
        Ok(pair) => reconcile(pair, direction, document),
        Err(error) => {
            tracing::warn!(target: "palimpsest.reconcile", %error, "history value could not be decoded; it will be skipped");
            Reconciliation::Erroneous
        }
    };
    match reconciliation {
        Reconciliation::Erroneous => value.mark_erroneous(),
        Reconciliation::Clean | Reconciliation::Repaired => value.mark_checked(),
    }

    let head_inserted = document.animation.frame_count() > 0
        && version.insert_restore_root(document.animation.root_index());
    if head_inserted {
        tracing::debug!(
            target: "palimpsest.reconcile",
            root = document.animation.root_index(),
            "seeded version with restore-root value"
        );
    }
    Checked {
        reconciliation,
        head_inserted,
    }
}

/// Reconcile `pair` against `document` before applying its `direction` side.
pub fn reconcile(pair: &mut ItemPair, direction: Direction, document: &Document) -> Reconciliation {
    let (apply, other) = pair.split_mut(direction);
    let result = if apply.kind() != other.kind() || apply.address() != other.address() {
        Reconciliation::Erroneous
    } else if apply.address().is_some_and(|a| !document.resolves(a)) {
        Reconciliation::Erroneous
    } else {
        reconcile_matched(apply, other, document)
    };

    match result {
        Reconciliation::Clean => {
            tracing::trace!(target: "palimpsest.reconcile", item = %apply, ?direction, "clean");
        }
        Reconciliation::Repaired => {
            tracing::debug!(
                target: "palimpsest.reconcile",
                item = %apply,
                ?direction,
                "repaired drifted history value"
            );
        }
        Reconciliation::Erroneous => {
            tracing::warn!(
                target: "palimpsest.reconcile",
                item = %apply,
                other = %other,
                ?direction,
                "history value could not be reconciled; it will be skipped"
            );
        }
    }
    result
}

fn reconcile_matched(apply: &mut UndoItem, other: &mut UndoItem, document: &Document) -> Reconciliation {
    match (apply, other) {
        (
            UndoItem::Strokes {
                keyframe,
                layer,
                edit: s,
            },
            UndoItem::Strokes { edit: o, .. },
        ) => reconcile_edit(document.collection(Address::strokes(*keyframe, *layer)), s, o),
        (
            UndoItem::Regions {
                keyframe,
                layer,
                edit: s,
            },
            UndoItem::Regions { edit: o, .. },
        ) => reconcile_edit(document.collection(Address::regions(*keyframe, *layer)), s, o),
        (UndoItem::Notes { layer, edit: s }, UndoItem::Notes { edit: o, .. }) => {
            reconcile_edit(document.collection(Address::notes(*layer)), s, o)
        }
        (UndoItem::Keyframes(s), UndoItem::Keyframes(o)) => reconcile_edit(
            document.collection(Address::document(CollectionTag::Keyframes)),
            s,
            o,
        ),
        (UndoItem::Contents(s), UndoItem::Contents(o)) => reconcile_edit(
            document.collection(Address::document(CollectionTag::Contents)),
            s,
            o,
        ),
        (UndoItem::Texts(s), UndoItem::Texts(o)) => reconcile_edit(
            document.collection(Address::document(CollectionTag::Texts)),
            s,
            o,
        ),
        (UndoItem::Guides(s), UndoItem::Guides(o)) => reconcile_edit(
            document.collection(Address::document(CollectionTag::Guides)),
            s,
            o,
        ),
        (UndoItem::KeyframeOptions(s), UndoItem::KeyframeOptions(o)) => {
            let current: Vec<KeyframeOption> =
                document.animation.keyframes.iter().map(|k| k.option).collect();
            reconcile_keyframe_options(&current, s, o)
        }
        (UndoItem::AnimationOption(_), UndoItem::AnimationOption(o)) => {
            heal(o, document.animation.option)
        }
        (UndoItem::ScoreOption(_), UndoItem::ScoreOption(o)) => {
            heal(o, document.score.option.clone())
        }
        (UndoItem::BackgroundColor(_), UndoItem::BackgroundColor(o)) => {
            heal(o, document.background_color)
        }
        (UndoItem::RootIndex(_), UndoItem::RootIndex(_)) => Reconciliation::Clean,
        _ => Reconciliation::Erroneous,
    }
}

fn heal<T: PartialEq>(recorded: &mut T, current: T) -> Reconciliation {
    if *recorded == current {
        Reconciliation::Clean
    } else {
        *recorded = current;
        Reconciliation::Repaired
    }
}

fn reconcile_keyframe_options(
    current: &[KeyframeOption],
    s: &mut Vec<Indexed<KeyframeOption>>,
    o: &mut Vec<Indexed<KeyframeOption>>,
) -> Reconciliation {
    let before = s.len();
    s.retain(|e| e.index < current.len());
    if s.is_empty() && before > 0 {
        return Reconciliation::Erroneous;
    }
    let expected: Vec<Indexed<KeyframeOption>> = s
        .iter()
        .map(|e| Indexed::new(e.index, current[e.index]))
        .collect();
    let healed = heal(o, expected);
    if s.len() != before {
        Reconciliation::Repaired
    } else {
        healed
    }
}

/// A rewrite decided for one edit pair.
enum Plan<T> {
    Keep,
    Rewrite {
        apply: Option<Edit<T>>,
        other: Option<Edit<T>>,
    },
    Erroneous,
}

impl<T: PartialEq> Plan<T> {
    fn other(recorded: &Edit<T>, expected: Edit<T>) -> Self {
        if *recorded == expected {
            Self::Keep
        } else {
            Self::Rewrite {
                apply: None,
                other: Some(expected),
            }
        }
    }

    fn both(apply: Edit<T>, other: Edit<T>) -> Self {
        Self::Rewrite {
            apply: Some(apply),
            other: Some(other),
        }
    }
}

fn reconcile_edit<T: Element>(
    current: Option<&Vec<T>>,
    s: &mut Edit<T>,
    o: &mut Edit<T>,
) -> Reconciliation {
    let Some(current) = current else {
        return Reconciliation::Erroneous;
    };
    match plan_edit(current, s, o) {
        Plan::Keep => Reconciliation::Clean,
        Plan::Erroneous => Reconciliation::Erroneous,
        Plan::Rewrite { apply, other } => {
            if let Some(apply) = apply {
                *s = apply;
            }
            if let Some(other) = other {
                *o = other;
            }
            Reconciliation::Repaired
        }
    }
}

fn plan_edit<T: Element>(current: &[T], s: &Edit<T>, o: &Edit<T>) -> Plan<T> {
    match (s, o) {
        (Edit::Append(values), Edit::Remove(_)) => {
            let start = current.len();
            Plan::other(o, Edit::Remove((start..start + values.len()).collect()))
        }
        (Edit::Insert(entries), Edit::Remove(_)) => {
            let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
            let plan = plan_insert(&indices, current.len());
            if plan.clipped > 0 {
                let clipped = plan
                    .order
                    .iter()
                    .zip(&plan.positions)
                    .map(|(&i, &p)| Indexed::new(p, entries[i].value.clone()))
                    .collect();
                Plan::both(Edit::Insert(clipped), Edit::Remove(plan.positions))
            } else {
                Plan::other(o, Edit::Remove(plan.positions))
            }
        }
        (Edit::Remove(indices), Edit::Insert(entries)) => {
            let mut sorted: Vec<&Indexed<T>> = entries.iter().collect();
            sorted.sort_by_key(|e| e.index);
            let recorded: Vec<T> = sorted.into_iter().map(|e| e.value.clone()).collect();
            plan_remove(current, indices, &recorded)
        }
        (Edit::Remove(indices), Edit::Append(values)) => plan_remove(current, indices, values),
        (Edit::Replace(s_entries), Edit::Replace(o_entries)) => {
            plan_replace(current, s_entries, o_entries)
        }
        (Edit::Set(_), Edit::Set(_)) => Plan::other(o, Edit::Set(current.to_vec())),
        _ => Plan::Erroneous,
    }
}

/// How recorded payloads relate to the current elements.
enum Positional<T> {
    Clean,
    /// Same positions; the recorded payloads become these.
    Heal(Vec<T>),
    /// The recorded elements now live at these indices (recorded order).
    Move(Vec<usize>),
    /// Keep only these in-bounds indices.
    Clip(Vec<usize>),
    Erroneous,
}

/// Compare `recorded`, the payloads expected at `indices`, with `current`.
fn positional<T: Element>(current: &[T], indices: &[usize], recorded: &[T]) -> Positional<T> {
    let (valid, dropped) = valid_indices(indices, current.len());
    let at = |positions: &[usize]| -> Vec<T> { positions.iter().map(|&i| current[i].clone()).collect() };

    if !dropped && recorded.len() == valid.len() {
        let pairs = || valid.iter().map(|&i| &current[i]).zip(recorded);
        if pairs().all(|(now, then)| now == then) {
            return Positional::Clean;
        }
        let same_ids = pairs().all(|(now, then)| {
            now.element_id().is_some() && now.element_id() == then.element_id()
        });
        let has_ids = recorded.iter().all(|r| r.element_id().is_some());
        if same_ids || !has_ids {
            return Positional::Heal(at(&valid));
        }
    }

    let has_ids = !recorded.is_empty() && recorded.iter().all(|r| r.element_id().is_some());
    if has_ids {
        let found: Option<Vec<usize>> = recorded
            .iter()
            .map(|r| current.iter().position(|c| c.element_id() == r.element_id()))
            .collect();
        if let Some(found) = found {
            return Positional::Move(found);
        }
        if recorded.len() == valid.len() {
            return Positional::Erroneous;
        }
    }
    if valid.is_empty() {
        Positional::Erroneous
    } else {
        Positional::Clip(valid)
    }
}

fn inserts_at<T: Clone>(current: &[T], positions: &[usize]) -> Vec<Indexed<T>> {
    positions
        .iter()
        .map(|&p| Indexed::new(p, current[p].clone()))
        .collect()
}

fn plan_remove<T: Element>(current: &[T], indices: &[usize], recorded: &[T]) -> Plan<T> {
    match positional(current, indices, recorded) {
        Positional::Clean => Plan::Keep,
        Positional::Heal(payloads) => {
            let (valid, _) = valid_indices(indices, current.len());
            let entries = valid.into_iter().zip(payloads).map(|(i, v)| Indexed::new(i, v));
            Plan::Rewrite {
                apply: None,
                other: Some(Edit::Insert(entries.collect())),
            }
        }
        Positional::Move(mut positions) => {
            positions.sort_unstable();
            positions.dedup();
            let other = Edit::Insert(inserts_at(current, &positions));
            Plan::both(Edit::Remove(positions), other)
        }
        Positional::Clip(valid) => {
            let other = Edit::Insert(inserts_at(current, &valid));
            Plan::both(Edit::Remove(valid), other)
        }
        Positional::Erroneous => Plan::Erroneous,
    }
}

fn plan_replace<T: Element>(
    current: &[T],
    s_entries: &[Indexed<T>],
    o_entries: &[Indexed<T>],
) -> Plan<T> {
    if s_entries.len() != o_entries.len()
        || s_entries.iter().zip(o_entries).any(|(a, b)| a.index != b.index)
    {
        return Plan::Erroneous;
    }
    let mut pairs: Vec<(&Indexed<T>, &Indexed<T>)> = s_entries.iter().zip(o_entries).collect();
    pairs.sort_by_key(|(s, _)| s.index);
    let indices: Vec<usize> = pairs.iter().map(|(s, _)| s.index).collect();
    let recorded: Vec<T> = pairs.iter().map(|(_, o)| o.value.clone()).collect();

    match positional(current, &indices, &recorded) {
        Positional::Clean => Plan::Keep,
        Positional::Heal(payloads) => {
            let other = indices
                .iter()
                .zip(payloads)
                .map(|(&i, v)| Indexed::new(i, v))
                .collect();
            Plan::Rewrite {
                apply: None,
                other: Some(Edit::Replace(other)),
            }
        }
        Positional::Move(positions) => {
            let apply = pairs
                .iter()
                .zip(&positions)
                .map(|((s, _), &p)| Indexed::new(p, s.value.clone()))
                .collect();
            Plan::both(
                Edit::Replace(apply),
                Edit::Replace(inserts_at(current, &positions)),
            )
        }
        Positional::Clip(valid) => {
            let mut kept: Vec<Indexed<T>> = Vec::with_capacity(valid.len());
            for (s, _) in &pairs {
                let fresh = kept.last().is_none_or(|k| k.index != s.index);
                if fresh && valid.binary_search(&s.index).is_ok() {
                    kept.push((*s).clone());
                }
            }
            let positions: Vec<usize> = kept.iter().map(|e| e.index).collect();
            Plan::both(Edit::Replace(kept), Edit::Replace(inserts_at(current, &positions)))
        }
        Positional::Erroneous => Plan::Erroneous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::UndoDataValue;
    use palimpsest_core::fixtures::stroke;
    use palimpsest_core::{Color, Keyframe, Layer, Stroke};

    fn doc(ids: &[u64]) -> Document {
        let mut doc = Document::with_keyframes(1);
        doc.animation.keyframes[0].picture.strokes = ids.iter().map(|&i| stroke(i)).collect();
        doc
    }

    fn strokes(edit: Edit<Stroke>) -> UndoItem {
        UndoItem::Strokes {
            keyframe: 0,
            layer: Layer::Main,
            edit,
        }
    }

    fn removal(indices: Vec<usize>, recorded: &[(usize, u64)]) -> ItemPair {
        let entries = recorded.iter().map(|&(i, id)| Indexed::new(i, stroke(id))).collect();
        ItemPair::new(strokes(Edit::Remove(indices)), strokes(Edit::Insert(entries)))
    }

    #[test]
    fn matching_value_is_clean() {
        let document = doc(&[1, 2, 3]);
        let mut pair = removal(vec![1], &[(1, 2)]);
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Clean);
    }

    #[test]
    fn same_ids_with_new_payload_heal_the_other_side() {
        let mut document = doc(&[1, 2, 3]);
        document.animation.keyframes[0].picture.strokes[1].width = 9.0;
        let mut pair = removal(vec![1], &[(1, 2)]);
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Repaired);
        let UndoItem::Strokes { edit: Edit::Insert(entries), .. } = &pair.redo else {
            panic!("expected insert, got {:?}", pair.redo);
        };
        assert_eq!(entries[0].value.width, 9.0);
        assert_eq!(pair.undo, strokes(Edit::Remove(vec![1])));
    }

    #[test]
    fn drifted_ids_are_relocated() {
        let document = doc(&[7, 8, 1, 2, 3, 4]);
        let mut pair = removal(vec![3, 4], &[(3, 3), (4, 4)]);
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Repaired);
        assert_eq!(pair.undo, strokes(Edit::Remove(vec![4, 5])));
    }

    #[test]
    fn same_length_mismatch_is_erroneous() {
        let document = doc(&[1, 2, 3, 5, 6]);
        let mut pair = removal(vec![3, 4], &[(3, 30), (4, 40)]);
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Erroneous);
        assert_eq!(pair.undo, strokes(Edit::Remove(vec![3, 4])));
    }

    #[test]
    fn shrunk_collection_is_clipped() {
        let document = doc(&[1, 2, 3, 4]);
        let mut pair = removal(vec![3, 4], &[(3, 30), (4, 40)]);
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Repaired);
        assert_eq!(pair.undo, strokes(Edit::Remove(vec![3])));
        assert_eq!(
            pair.redo,
            strokes(Edit::Insert(vec![Indexed::new(3, stroke(4))]))
        );
    }

    #[test]
    fn indices_entirely_out_of_range_are_erroneous() {
        let document = doc(&[1, 2, 3]);
        let mut pair = removal(vec![3, 4], &[(3, 30)]);
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Erroneous);
    }

    #[test]
    fn append_inverse_is_rederived() {
        let document = doc(&[1, 2, 3]);
        let mut pair = ItemPair::new(
            strokes(Edit::Remove(vec![0])),
            strokes(Edit::Append(vec![stroke(9)])),
        );
        assert_eq!(reconcile(&mut pair, Direction::Redo, &document), Reconciliation::Repaired);
        assert_eq!(pair.undo, strokes(Edit::Remove(vec![3])));
    }

    #[test]
    fn clipped_insert_rewrites_both_sides() {
        let document = doc(&[1]);
        let mut pair = ItemPair::new(
            strokes(Edit::Remove(vec![5])),
            strokes(Edit::Insert(vec![Indexed::new(5, stroke(9))])),
        );
        assert_eq!(reconcile(&mut pair, Direction::Redo, &document), Reconciliation::Repaired);
        assert_eq!(
            pair.redo,
            strokes(Edit::Insert(vec![Indexed::new(1, stroke(9))]))
        );
        assert_eq!(pair.undo, strokes(Edit::Remove(vec![1])));
    }

    #[test]
    fn replace_follows_relocated_ids() {
        let document = doc(&[5, 1, 2]);
        let mut pair = ItemPair::new(
            strokes(Edit::Replace(vec![Indexed::new(0, stroke(1))])),
            strokes(Edit::Replace(vec![Indexed::new(0, {
                let mut changed = stroke(1);
                changed.width = 4.0;
                changed
            })])),
        );
        assert_eq!(reconcile(&mut pair, Direction::Redo, &document), Reconciliation::Repaired);
        let UndoItem::Strokes { edit: Edit::Replace(entries), .. } = &pair.undo else {
            panic!("expected replace");
        };
        assert_eq!(entries[0].index, 1);
        assert_eq!(entries[0].value, stroke(1));
        let UndoItem::Strokes { edit: Edit::Replace(entries), .. } = &pair.redo else {
            panic!("expected replace");
        };
        assert_eq!(entries[0].index, 1);
    }

    #[test]
    fn scalar_inverse_takes_current_value() {
        let mut document = Document::new();
        document.background_color = Color::BLACK;
        let mut pair = ItemPair::new(
            UndoItem::BackgroundColor(Color::WHITE),
            UndoItem::BackgroundColor(Color::rgb(1.0, 0.0, 0.0)),
        );
        assert_eq!(reconcile(&mut pair, Direction::Redo, &document), Reconciliation::Repaired);
        assert_eq!(pair.undo, UndoItem::BackgroundColor(Color::BLACK));
    }

    #[test]
    fn mismatched_sides_and_unresolved_addresses_are_erroneous() {
        let document = doc(&[1]);
        let mut pair = ItemPair::new(
            strokes(Edit::Remove(vec![0])),
            UndoItem::Guides(Edit::Set(vec![])),
        );
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Erroneous);

        let far = UndoItem::Strokes {
            keyframe: 3,
            layer: Layer::Main,
            edit: Edit::Remove(vec![0]),
        };
        let mut pair = ItemPair::new(far.clone(), far);
        assert_eq!(reconcile(&mut pair, Direction::Undo, &document), Reconciliation::Erroneous);
    }

    #[test]
    fn keyframe_set_inverse_is_rederived() {
        let document = Document::with_keyframes(2);
        let mut pair = ItemPair::new(
            UndoItem::Keyframes(Edit::Set(vec![])),
            UndoItem::Keyframes(Edit::Set(vec![Keyframe::default()])),
        );
        assert_eq!(reconcile(&mut pair, Direction::Redo, &document), Reconciliation::Repaired);
        assert_eq!(
            pair.undo,
            UndoItem::Keyframes(Edit::Set(document.animation.keyframes.clone()))
        );
    }

    #[test]
    fn first_check_seeds_restore_root_once() {
        let mut document = doc(&[1, 2]);
        document.animation.set_root_index(0);
        let mut version = Version::new("draw");
        let mut value = UndoDataValue::new(
            strokes(Edit::Remove(vec![1])),
            strokes(Edit::Insert(vec![Indexed::new(1, stroke(2))])),
        );
        value.unload().unwrap();
        version.push(value.clone());
        version.push(value);

        let checked = check_value(&mut version, 1, Direction::Undo, &document);
        assert_eq!(checked.reconciliation, Reconciliation::Clean);
        assert!(checked.head_inserted);
        assert_eq!(version.len(), 3);

        let checked = check_value(&mut version, 1, Direction::Undo, &document);
        assert!(!checked.head_inserted);
        assert!(version.value(1).is_some_and(|v| v.is_loaded() && !v.needs_check()));
    }

    #[test]
    fn loaded_values_skip_reconciliation() {
        let document = doc(&[]);
        let mut version = Version::new("draw");
        version.push(UndoDataValue::new(
            strokes(Edit::Remove(vec![4])),
            strokes(Edit::Append(vec![])),
        ));
        let checked = check_value(&mut version, 0, Direction::Undo, &document);
        assert_eq!(checked.reconciliation, Reconciliation::Clean);
        assert!(!checked.head_inserted);
    }
}
