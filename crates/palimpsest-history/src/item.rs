#![forbid(unsafe_code)]

//! Structural operations: the closed set of reversible document edits.
//!
//! An [`UndoItem`] names one collection (or one scalar) of a document and the
//! [`Edit`] to perform on it. Items are plain data: they are recorded in the
//! history log, serialized when unloaded, rewritten by the reconciler and
//! executed by [`apply`](crate::apply::apply).
//!
//! # Index semantics
//!
//! - `Insert` indices are **final positions**: entries are stably sorted by
//!   index and an entry whose index does not exceed the previous entry's
//!   position lands right after it. This makes `Insert` the exact inverse of
//!   `Remove`: removing `[1, 3]` from `[a, b, c, d, e]` is undone by inserting
//!   `[(1, b), (3, d)]`.
//! - `Remove` indices are de-duplicated and removed highest first.
//! - `Replace` never changes the collection length.

use std::fmt;

use palimpsest_core::{
    Address, AnimationOption, CollectionTag, Color, Content, FilledRegion, Guide, Keyframe,
    KeyframeOption, Layer, Note, ScoreOption, Stroke, Text,
};
use serde::{Deserialize, Serialize};

/// A payload bound to a position in an ordered collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indexed<T> {
    pub index: usize,
    pub value: T,
}

impl<T> Indexed<T> {
    #[must_use]
    pub const fn new(index: usize, value: T) -> Self {
        Self { index, value }
    }
}

/// One edit of an ordered collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Edit<T> {
    /// Add payloads at the end.
    Append(Vec<T>),
    /// Insert payloads at final positions.
    Insert(Vec<Indexed<T>>),
    /// Remove the elements at the given indices.
    Remove(Vec<usize>),
    /// Replace elements in place.
    Replace(Vec<Indexed<T>>),
    /// Replace the whole collection.
    Set(Vec<T>),
}

impl<T> Edit<T> {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Append(_) => "append",
            Self::Insert(_) => "insert",
            Self::Remove(_) => "remove",
            Self::Replace(_) => "replace",
            Self::Set(_) => "set",
        }
    }

    /// Number of entries carried by the edit.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Append(v) | Self::Set(v) => v.len(),
            Self::Insert(v) | Self::Replace(v) => v.len(),
            Self::Remove(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Placement of a batch of insertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    /// Entry indices in insertion order.
    pub order: Vec<usize>,
    /// Effective final position of each entry, parallel to `order`, ascending.
    pub positions: Vec<usize>,
    /// Number of entries whose index exceeded the bounds and was clipped.
    pub clipped: usize,
}

/// Compute where `indices` land when inserted into a collection of `len`.
///
/// Entries are taken in stable index order; each lands at
/// `max(index, previous + 1)`, clipped to the length at that moment.
#[must_use]
pub fn plan_insert(indices: &[usize], len: usize) -> InsertPlan {
    let mut order: Vec<usize> = (0..indices.len()).collect();
    order.sort_by_key(|&i| indices[i]);

    let mut positions = Vec::with_capacity(order.len());
    let mut clipped = 0;
    let mut previous: Option<usize> = None;
    for (inserted, &entry) in order.iter().enumerate() {
        let wanted = match previous {
            Some(p) => indices[entry].max(p + 1),
            None => indices[entry],
        };
        let bound = len + inserted;
        if wanted > bound {
            clipped += 1;
        }
        let position = wanted.min(bound);
        positions.push(position);
        previous = Some(position);
    }
    InsertPlan {
        order,
        positions,
        clipped,
    }
}

/// De-duplicated, ascending indices below `len`, and whether any were dropped.
#[must_use]
pub fn valid_indices(indices: &[usize], len: usize) -> (Vec<usize>, bool) {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    let before = sorted.len();
    sorted.retain(|&i| i < len);
    let dropped = sorted.len() != before || before != indices.len();
    (sorted, dropped)
}

/// A reversible edit of one document collection or scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UndoItem {
    Strokes {
        keyframe: usize,
        layer: Layer,
        edit: Edit<Stroke>,
    },
    Regions {
        keyframe: usize,
        layer: Layer,
        edit: Edit<FilledRegion>,
    },
    Notes {
        layer: Layer,
        edit: Edit<Note>,
    },
    Keyframes(Edit<Keyframe>),
    Contents(Edit<Content>),
    Texts(Edit<Text>),
    Guides(Edit<Guide>),
    /// Replace the options of the listed keyframes.
    KeyframeOptions(Vec<Indexed<KeyframeOption>>),
    AnimationOption(AnimationOption),
    ScoreOption(ScoreOption),
    BackgroundColor(Color),
    /// Move the animation's current play/edit position.
    RootIndex(usize),
}

/// Discriminant of [`UndoItem`], for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Strokes,
    Regions,
    Notes,
    Keyframes,
    Contents,
    Texts,
    Guides,
    KeyframeOptions,
    AnimationOption,
    ScoreOption,
    BackgroundColor,
    RootIndex,
}

impl UndoItem {
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self {
            Self::Strokes { .. } => ItemKind::Strokes,
            Self::Regions { .. } => ItemKind::Regions,
            Self::Notes { .. } => ItemKind::Notes,
            Self::Keyframes(_) => ItemKind::Keyframes,
            Self::Contents(_) => ItemKind::Contents,
            Self::Texts(_) => ItemKind::Texts,
            Self::Guides(_) => ItemKind::Guides,
            Self::KeyframeOptions(_) => ItemKind::KeyframeOptions,
            Self::AnimationOption(_) => ItemKind::AnimationOption,
            Self::ScoreOption(_) => ItemKind::ScoreOption,
            Self::BackgroundColor(_) => ItemKind::BackgroundColor,
            Self::RootIndex(_) => ItemKind::RootIndex,
        }
    }

    /// The collection this item edits; `None` for document scalars.
    #[must_use]
    pub const fn address(&self) -> Option<Address> {
        match self {
            Self::Strokes {
                keyframe, layer, ..
            } => Some(Address::strokes(*keyframe, *layer)),
            Self::Regions {
                keyframe, layer, ..
            } => Some(Address::regions(*keyframe, *layer)),
            Self::Notes { layer, .. } => Some(Address::notes(*layer)),
            Self::Keyframes(_) | Self::KeyframeOptions(_) => {
                Some(Address::document(CollectionTag::Keyframes))
            }
            Self::Contents(_) => Some(Address::document(CollectionTag::Contents)),
            Self::Texts(_) => Some(Address::document(CollectionTag::Texts)),
            Self::Guides(_) => Some(Address::document(CollectionTag::Guides)),
            Self::AnimationOption(_)
            | Self::ScoreOption(_)
            | Self::BackgroundColor(_)
            | Self::RootIndex(_) => None,
        }
    }

    /// Name of the edit for collection items, `"set"` for scalars.
    #[must_use]
    pub fn edit_name(&self) -> &'static str {
        match self {
            Self::Strokes { edit, .. } => edit.name(),
            Self::Regions { edit, .. } => edit.name(),
            Self::Notes { edit, .. } => edit.name(),
            Self::Keyframes(edit) => edit.name(),
            Self::Contents(edit) => edit.name(),
            Self::Texts(edit) => edit.name(),
            Self::Guides(edit) => edit.name(),
            Self::KeyframeOptions(_) => "replace",
            Self::AnimationOption(_)
            | Self::ScoreOption(_)
            | Self::BackgroundColor(_)
            | Self::RootIndex(_) => "set",
        }
    }

    /// Whether applying the item can move the animation root index.
    #[must_use]
    pub const fn moves_root_index(&self) -> bool {
        matches!(
            self,
            Self::Keyframes(_) | Self::AnimationOption(_) | Self::RootIndex(_)
        )
    }
}

impl fmt::Display for UndoItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.address() {
            Some(address) => write!(f, "{} {}", self.edit_name(), address),
            None => write!(f, "{} {:?}", self.edit_name(), self.kind()),
        }
    }
}
