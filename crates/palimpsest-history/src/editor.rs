#![forbid(unsafe_code)]

//! The editing surface over one document and its history.
//!
//! Every mutation that should be undoable goes through a capture helper.
//! The helper applies the forward side, reads back what actually landed and
//! records the `(undo, redo)` pair in the current undo group. Helpers called
//! inside [`Editor::group`] share one Version; called on their own, each opens
//! its own.
//!
//! # Invariants
//!
//! 1. Recorded pairs describe what was applied: appended, inserted,
//!    replacing and set elements are recorded with the ids they received,
//!    so replaying a pair on the state it was recorded against never
//!    refreshes an id.
//! 2. A Version containing an item that moves the root index starts with a
//!    restore-root value holding the root index from before the group.
//! 3. Time travel never fails. Values that cannot be reconciled are flagged
//!    erroneous and skipped, and [`Editor::error_count`] grows.

use palimpsest_core::{Document, Rect};

use crate::apply::{SkipReason, Touched, apply};
use crate::batch::{BatchOutcome, DocumentSnapshot};
use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::item::{Edit, Indexed, UndoItem, valid_indices};
use crate::log::HistoryLog;
use crate::reconcile::{Reconciliation, check_value};
use crate::target::Target;
use crate::value::{ItemPair, UndoDataValue};

#[derive(Debug)]
struct OpenGroup {
    description: String,
    /// Root index when the group started.
    root: usize,
    /// A Version was opened for this group.
    opened: bool,
    /// The document changed inside this group.
    mutated: bool,
}

/// A document plus the history of edits made to it.
#[derive(Debug)]
pub struct Editor {
    document: Document,
    log: HistoryLog,
    revision: u64,
    errors: usize,
    group: Option<OpenGroup>,
}

impl Editor {
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self::with_config(document, HistoryConfig::default())
    }

    #[must_use]
    pub fn with_config(document: Document, config: HistoryConfig) -> Self {
        Self::from_parts(document, HistoryLog::new(config))
    }

    /// Resume editing with a previously persisted log.
    #[must_use]
    pub fn from_parts(document: Document, log: HistoryLog) -> Self {
        Self {
            document,
            log,
            revision: 0,
            errors: 0,
            group: None,
        }
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    #[must_use]
    pub fn into_document(self) -> Document {
        self.document
    }

    #[must_use]
    pub fn log(&self) -> &HistoryLog {
        &self.log
    }

    /// Incremented once by every outermost call that mutated the document.
    ///
    /// Captures inside one [`Editor::group`] count as one call.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Values flagged erroneous during this session.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    pub fn clear_history(&mut self) {
        self.log.reset();
        if let Some(group) = &mut self.group {
            group.opened = false;
        }
    }

    /// A copy of the document for off-thread work.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            document: self.document.clone(),
            revision: self.revision,
        }
    }

    /// Apply `item` without recording it.
    pub fn set(&mut self, item: &UndoItem, make_rect: bool) -> Touched {
        let touched = apply(item, &mut self.document, make_rect);
        if touched.outcome.mutated() {
            self.mark_mutated();
        }
        touched
    }

    /// Run `f` with every capture inside it recorded into one Version.
    ///
    /// Nested groups join the outermost one. A group that captures nothing
    /// leaves no Version behind.
    pub fn group<R>(&mut self, description: impl Into<String>, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.group.is_some() {
            return f(self);
        }
        self.group = Some(OpenGroup {
            description: description.into(),
            root: self.document.animation.root_index(),
            opened: false,
            mutated: false,
        });
        let result = f(self);
        if self.group.take().is_some_and(|group| group.mutated) {
            self.revision += 1;
        }
        self.unload_distant();
        result
    }

    /// Apply and record caller-built pairs, in order.
    ///
    /// Pairs whose forward side changes nothing are not recorded.
    pub fn capture(&mut self, description: impl Into<String>, pairs: Vec<ItemPair>) -> Touched {
        self.group(description, |editor| {
            let mut touched = Touched::applied();
            for pair in pairs {
                touched.merge(editor.commit(pair.undo, pair.redo));
            }
            touched
        })
    }

    /// Append `values` to the collection named by `target`.
    pub fn append<T: Target>(
        &mut self,
        description: impl Into<String>,
        target: T,
        values: Vec<T::Element>,
    ) -> Touched {
        self.group(description, |editor| {
            if editor.collection::<T>(target).is_none() {
                return Touched::skipped(SkipReason::UnresolvedAddress);
            }
            if values.is_empty() {
                return Touched::applied();
            }
            let touched = editor.set(&target.item(Edit::Append(values)), true);
            if touched.outcome.mutated() {
                let positions: Vec<usize> = touched.highlights.iter().map(|h| h.index).collect();
                let landed = editor.elements_at(target, &positions);
                editor.record(
                    target.item(Edit::Remove(positions)),
                    target.item(Edit::Append(landed)),
                );
            }
            touched
        })
    }

    /// Insert entries at final positions.
    pub fn insert<T: Target>(
        &mut self,
        description: impl Into<String>,
        target: T,
        entries: Vec<Indexed<T::Element>>,
    ) -> Touched {
        self.group(description, |editor| {
            if editor.collection::<T>(target).is_none() {
                return Touched::skipped(SkipReason::UnresolvedAddress);
            }
            if entries.is_empty() {
                return Touched::applied();
            }
            let touched = editor.set(&target.item(Edit::Insert(entries)), true);
            if touched.outcome.mutated() {
                let positions: Vec<usize> = touched.highlights.iter().map(|h| h.index).collect();
                let landed = editor.elements_at(target, &positions);
                let inserted = positions
                    .iter()
                    .zip(landed)
                    .map(|(&p, value)| Indexed::new(p, value))
                    .collect();
                editor.record(
                    target.item(Edit::Remove(positions)),
                    target.item(Edit::Insert(inserted)),
                );
            }
            touched
        })
    }

    /// Remove the elements at `indices`. Out-of-range indices are ignored.
    pub fn remove<T: Target>(
        &mut self,
        description: impl Into<String>,
        target: T,
        indices: &[usize],
    ) -> Touched {
        self.group(description, |editor| {
            let Some(items) = editor.collection::<T>(target) else {
                return Touched::skipped(SkipReason::UnresolvedAddress);
            };
            let (valid, _) = valid_indices(indices, items.len());
            if valid.is_empty() {
                return Touched::skipped(SkipReason::OutOfBounds);
            }
            let removed = valid
                .iter()
                .map(|&i| Indexed::new(i, items[i].clone()))
                .collect();
            editor.commit(
                target.item(Edit::Insert(removed)),
                target.item(Edit::Remove(valid)),
            )
        })
    }

    /// Replace elements in place. Out-of-range entries are ignored.
    ///
    /// When several entries name one index the last one wins.
    pub fn replace<T: Target>(
        &mut self,
        description: impl Into<String>,
        target: T,
        entries: Vec<Indexed<T::Element>>,
    ) -> Touched {
        self.group(description, |editor| {
            let Some(items) = editor.collection::<T>(target) else {
                return Touched::skipped(SkipReason::UnresolvedAddress);
            };
            let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
            let (slots, _) = valid_indices(&indices, items.len());
            if slots.is_empty() {
                return Touched::skipped(SkipReason::OutOfBounds);
            }
            let previous = slots
                .iter()
                .map(|&i| Indexed::new(i, items[i].clone()))
                .collect();
            let touched = editor.set(&target.item(Edit::Replace(entries)), true);
            if touched.outcome.mutated() {
                let landed = editor.elements_at(target, &slots);
                let landed = slots
                    .iter()
                    .zip(landed)
                    .map(|(&i, value)| Indexed::new(i, value))
                    .collect();
                editor.record(
                    target.item(Edit::Replace(previous)),
                    target.item(Edit::Replace(landed)),
                );
            }
            touched
        })
    }

    /// Replace the whole collection.
    pub fn set_whole<T: Target>(
        &mut self,
        description: impl Into<String>,
        target: T,
        values: Vec<T::Element>,
    ) -> Touched {
        self.group(description, |editor| {
            let Some(items) = editor.collection::<T>(target) else {
                return Touched::skipped(SkipReason::UnresolvedAddress);
            };
            let previous = items.clone();
            let touched = editor.set(&target.item(Edit::Set(values)), true);
            if touched.outcome.mutated() {
                let landed = editor.collection(target).cloned().unwrap_or_default();
                editor.record(
                    target.item(Edit::Set(previous)),
                    target.item(Edit::Set(landed)),
                );
            }
            touched
        })
    }

    /// Record a scalar change: an option, the background color, the root
    /// index or keyframe options.
    ///
    /// Returns `None` for collection edits, which go through the typed
    /// helpers.
    pub fn set_scalar(&mut self, description: impl Into<String>, item: UndoItem) -> Option<Touched> {
        let undo = self.scalar_inverse(&item)?;
        Some(self.group(description, |editor| editor.commit(undo, item)))
    }

    /// Move the history cursor to `target`, replaying every Version between.
    ///
    /// Returns the union of the regions touched on the way.
    pub fn undo_to(&mut self, target: usize) -> Option<Rect> {
        let target = target.min(self.log.len());
        if let Some(group) = &mut self.group {
            group.opened = false;
        }
        let steps = self.log.undo_and_results(target);
        if steps.is_empty() {
            return None;
        }

        let span = tracing::debug_span!(
            target: "palimpsest.history",
            "undo_to",
            from = self.log.cursor(),
            to = target,
            steps = steps.len()
        );
        let _guard = span.enter();

        let mut region = None;
        let mut mutated = false;
        let mut shifted: Option<(usize, usize)> = None;
        for step in steps {
            let offset = match shifted {
                Some((version, offset)) if version == step.version => offset,
                _ => 0,
            };
            let Some(version) = self.log.version_mut(step.version) else {
                continue;
            };
            let mut index = step.value + offset;
            let was_erroneous = version.value(index).is_some_and(UndoDataValue::is_erroneous);
            let checked = check_value(version, index, step.direction, &self.document);
            if checked.head_inserted {
                index += 1;
                shifted = Some((step.version, offset + 1));
            }
            if checked.reconciliation == Reconciliation::Erroneous {
                if !was_erroneous {
                    self.errors += 1;
                }
                tracing::trace!(target: "palimpsest.history", version = step.version, value = index, "skipped erroneous value");
                continue;
            }
            let Some(pair) = version.value(index).and_then(UndoDataValue::pair) else {
                continue;
            };
            let touched = apply(pair.side(step.direction), &mut self.document, true);
            mutated |= touched.outcome.mutated();
            region = Rect::union_opt(region, touched.region);
        }
        self.log.set_cursor(target);
        if mutated {
            self.mark_mutated();
        }
        tracing::debug!(target: "palimpsest.history", cursor = target, "moved history cursor");
        self.unload_distant();
        region
    }

    /// Revert the most recent Version.
    pub fn undo(&mut self) -> Option<Rect> {
        if !self.can_undo() {
            return None;
        }
        self.undo_to(self.log.cursor() - 1)
    }

    /// Re-apply the next Version.
    pub fn redo(&mut self) -> Option<Rect> {
        if !self.can_redo() {
            return None;
        }
        self.undo_to(self.log.cursor() + 1)
    }

    /// Commit pairs computed off-thread as one Version.
    ///
    /// Fails without touching anything when the document changed since the
    /// snapshot the batch was computed from.
    pub fn submit_batch(&mut self, outcome: BatchOutcome) -> Result<Touched> {
        if outcome.base_revision != self.revision {
            tracing::debug!(
                target: "palimpsest.batch",
                base = outcome.base_revision,
                current = self.revision,
                "rejected stale batch"
            );
            return Err(HistoryError::StaleSubmission {
                base: outcome.base_revision,
                current: self.revision,
            });
        }
        let count = outcome.pairs.len();
        let touched = self.capture(outcome.description, outcome.pairs);
        tracing::debug!(target: "palimpsest.batch", pairs = count, "committed batch");
        Ok(touched)
    }

    fn collection<T: Target>(&self, target: T) -> Option<&Vec<T::Element>> {
        self.document.collection::<T::Element>(target.address())
    }

    fn elements_at<T: Target>(&self, target: T, positions: &[usize]) -> Vec<T::Element> {
        self.collection(target)
            .map(|items| {
                positions
                    .iter()
                    .filter_map(|&p| items.get(p).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn scalar_inverse(&self, item: &UndoItem) -> Option<UndoItem> {
        let document = &self.document;
        match item {
            UndoItem::AnimationOption(_) => {
                Some(UndoItem::AnimationOption(document.animation.option))
            }
            UndoItem::ScoreOption(_) => Some(UndoItem::ScoreOption(document.score.option.clone())),
            UndoItem::BackgroundColor(_) => {
                Some(UndoItem::BackgroundColor(document.background_color))
            }
            UndoItem::RootIndex(_) => Some(UndoItem::RootIndex(document.animation.root_index())),
            UndoItem::KeyframeOptions(entries) => {
                let keyframes = &document.animation.keyframes;
                let previous = entries
                    .iter()
                    .filter(|e| e.index < keyframes.len())
                    .map(|e| Indexed::new(e.index, keyframes[e.index].option))
                    .collect();
                Some(UndoItem::KeyframeOptions(previous))
            }
            UndoItem::Strokes { .. }
            | UndoItem::Regions { .. }
            | UndoItem::Notes { .. }
            | UndoItem::Keyframes(_)
            | UndoItem::Contents(_)
            | UndoItem::Texts(_)
            | UndoItem::Guides(_) => None,
        }
    }

    /// Apply `redo` and record the pair if it changed anything.
    fn commit(&mut self, undo: UndoItem, redo: UndoItem) -> Touched {
        let touched = self.set(&redo, true);
        if touched.outcome.mutated() {
            self.record(undo, redo);
        }
        touched
    }

    fn record(&mut self, undo: UndoItem, redo: UndoItem) {
        let moves_root = undo.moves_root_index() || redo.moves_root_index();
        let current_root = self.document.animation.root_index();
        let (open, root) = match &mut self.group {
            Some(group) if group.opened => (None, group.root),
            Some(group) => {
                group.opened = true;
                (Some(group.description.clone()), group.root)
            }
            None => (Some(String::new()), current_root),
        };
        if let Some(description) = open {
            tracing::debug!(target: "palimpsest.history", %description, "opened undo group");
            self.log.new_undo_group(description, None);
        }
        let Some(version) = self
            .log
            .cursor()
            .checked_sub(1)
            .and_then(|i| self.log.version_mut(i))
        else {
            return;
        };
        if moves_root {
            version.insert_restore_root(root);
        }
        version.push(UndoDataValue::new(undo, redo));
    }

    fn mark_mutated(&mut self) {
        match &mut self.group {
            Some(group) => group.mutated = true,
            None => self.revision += 1,
        }
    }

    fn unload_distant(&mut self) {
        if let Err(error) = self.log.unload_distant() {
            tracing::warn!(target: "palimpsest.history", %error, "failed to unload distant versions");
        }
    }
}
