#![forbid(unsafe_code)]

//! The document and explicit addressing of its collections.
//!
//! Every ordered collection of a [`Document`] is named by an [`Address`]: a
//! [`Scope`] (the document itself, or one keyframe) plus a [`CollectionTag`].
//! [`Element`] resolves an address to the typed `Vec` it names, so a single
//! dispatch covers every collection the undo engine edits.
//!
//! ```text
//! Document ─┬─ animation.keyframes[k] ─┬─ picture.strokes        Keyframe(k) / Strokes
//!           │                          ├─ picture.regions        Keyframe(k) / Regions
//!           │                          ├─ draft_picture.strokes  Keyframe(k) / DraftStrokes
//!           │                          └─ draft_picture.regions  Keyframe(k) / DraftRegions
//!           ├─ animation.keyframes                               Document / Keyframes
//!           ├─ score.notes / score.draft_notes                   Document / Notes, DraftNotes
//!           ├─ contents, texts, guides                           Document / Contents, ...
//!           └─ background_color (scalar)
//! ```

use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::animation::Animation;
use crate::color::Color;
use crate::geometry::Rect;
use crate::id::{DocumentId, ElementId};
use crate::keyframe::Keyframe;
use crate::media::{Content, Guide, Text};
use crate::picture::{FilledRegion, Stroke};
use crate::score::{Note, Score};

/// Where a collection lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Document,
    Keyframe(usize),
}

/// Main or draft layer of a picture or score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Layer {
    #[default]
    Main,
    Draft,
}

/// Which collection inside a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionTag {
    Keyframes,
    Strokes,
    Regions,
    DraftStrokes,
    DraftRegions,
    Notes,
    DraftNotes,
    Contents,
    Texts,
    Guides,
}

/// A collection inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub scope: Scope,
    pub tag: CollectionTag,
}

impl Address {
    #[must_use]
    pub const fn document(tag: CollectionTag) -> Self {
        Self {
            scope: Scope::Document,
            tag,
        }
    }

    #[must_use]
    pub const fn keyframe(index: usize, tag: CollectionTag) -> Self {
        Self {
            scope: Scope::Keyframe(index),
            tag,
        }
    }

    /// Stroke collection of a keyframe layer.
    #[must_use]
    pub const fn strokes(keyframe: usize, layer: Layer) -> Self {
        match layer {
            Layer::Main => Self::keyframe(keyframe, CollectionTag::Strokes),
            Layer::Draft => Self::keyframe(keyframe, CollectionTag::DraftStrokes),
        }
    }

    /// Region collection of a keyframe layer.
    #[must_use]
    pub const fn regions(keyframe: usize, layer: Layer) -> Self {
        match layer {
            Layer::Main => Self::keyframe(keyframe, CollectionTag::Regions),
            Layer::Draft => Self::keyframe(keyframe, CollectionTag::DraftRegions),
        }
    }

    /// Note collection of a score layer.
    #[must_use]
    pub const fn notes(layer: Layer) -> Self {
        match layer {
            Layer::Main => Self::document(CollectionTag::Notes),
            Layer::Draft => Self::document(CollectionTag::DraftNotes),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Document => write!(f, "{:?}", self.tag),
            Scope::Keyframe(i) => write!(f, "keyframe[{i}].{:?}", self.tag),
        }
    }
}

/// An item stored in an addressable document collection.
pub trait Element: Clone + PartialEq + fmt::Debug {
    /// Resolve `address` to the collection it names, if it holds `Self`.
    fn collection(document: &Document, address: Address) -> Option<&Vec<Self>>;

    /// Mutable form of [`collection`](Self::collection).
    fn collection_mut(document: &mut Document, address: Address) -> Option<&mut Vec<Self>>;

    /// Stable element id, for kinds that carry one.
    fn element_id(&self) -> Option<ElementId> {
        None
    }

    /// Replace the stable element id. No-op for kinds without ids.
    fn set_element_id(&mut self, _id: ElementId) {}

    /// Extent on the canvas, for invalidation.
    fn bounds(&self) -> Option<Rect> {
        None
    }
}

impl Element for Stroke {
    fn collection(document: &Document, address: Address) -> Option<&Vec<Self>> {
        let Scope::Keyframe(k) = address.scope else {
            return None;
        };
        let keyframe = document.animation.keyframes.get(k)?;
        match address.tag {
            CollectionTag::Strokes => Some(&keyframe.picture.strokes),
            CollectionTag::DraftStrokes => Some(&keyframe.draft_picture.strokes),
            _ => None,
        }
    }

    fn collection_mut(document: &mut Document, address: Address) -> Option<&mut Vec<Self>> {
        let Scope::Keyframe(k) = address.scope else {
            return None;
        };
        let keyframe = document.animation.keyframes.get_mut(k)?;
        match address.tag {
            CollectionTag::Strokes => Some(&mut keyframe.picture.strokes),
            CollectionTag::DraftStrokes => Some(&mut keyframe.draft_picture.strokes),
            _ => None,
        }
    }

    fn element_id(&self) -> Option<ElementId> {
        Some(self.id)
    }

    fn set_element_id(&mut self, id: ElementId) {
        self.id = id;
    }

    fn bounds(&self) -> Option<Rect> {
        Stroke::bounds(self)
    }
}

impl Element for FilledRegion {
    fn collection(document: &Document, address: Address) -> Option<&Vec<Self>> {
        let Scope::Keyframe(k) = address.scope else {
            return None;
        };
        let keyframe = document.animation.keyframes.get(k)?;
        match address.tag {
            CollectionTag::Regions => Some(&keyframe.picture.regions),
            CollectionTag::DraftRegions => Some(&keyframe.draft_picture.regions),
            _ => None,
        }
    }

    fn collection_mut(document: &mut Document, address: Address) -> Option<&mut Vec<Self>> {
        let Scope::Keyframe(k) = address.scope else {
            return None;
        };
        let keyframe = document.animation.keyframes.get_mut(k)?;
        match address.tag {
            CollectionTag::Regions => Some(&mut keyframe.picture.regions),
            CollectionTag::DraftRegions => Some(&mut keyframe.draft_picture.regions),
            _ => None,
        }
    }

    fn element_id(&self) -> Option<ElementId> {
        Some(self.id)
    }

    fn set_element_id(&mut self, id: ElementId) {
        self.id = id;
    }

    fn bounds(&self) -> Option<Rect> {
        FilledRegion::bounds(self)
    }
}

impl Element for Note {
    fn collection(document: &Document, address: Address) -> Option<&Vec<Self>> {
        match (address.scope, address.tag) {
            (Scope::Document, CollectionTag::Notes) => Some(&document.score.notes),
            (Scope::Document, CollectionTag::DraftNotes) => Some(&document.score.draft_notes),
            _ => None,
        }
    }

    fn collection_mut(document: &mut Document, address: Address) -> Option<&mut Vec<Self>> {
        match (address.scope, address.tag) {
            (Scope::Document, CollectionTag::Notes) => Some(&mut document.score.notes),
            (Scope::Document, CollectionTag::DraftNotes) => Some(&mut document.score.draft_notes),
            _ => None,
        }
    }

    fn element_id(&self) -> Option<ElementId> {
        Some(self.id)
    }

    fn set_element_id(&mut self, id: ElementId) {
        self.id = id;
    }
}

impl Element for Keyframe {
    fn collection(document: &Document, address: Address) -> Option<&Vec<Self>> {
        match (address.scope, address.tag) {
            (Scope::Document, CollectionTag::Keyframes) => Some(&document.animation.keyframes),
            _ => None,
        }
    }

    fn collection_mut(document: &mut Document, address: Address) -> Option<&mut Vec<Self>> {
        match (address.scope, address.tag) {
            (Scope::Document, CollectionTag::Keyframes) => Some(&mut document.animation.keyframes),
            _ => None,
        }
    }

    fn bounds(&self) -> Option<Rect> {
        Keyframe::bounds(self)
    }
}

macro_rules! document_collection {
    ($ty:ty, $tag:path, $field:ident) => {
        impl Element for $ty {
            fn collection(document: &Document, address: Address) -> Option<&Vec<Self>> {
                (address == Address::document($tag)).then_some(&document.$field)
            }

            fn collection_mut(
                document: &mut Document,
                address: Address,
            ) -> Option<&mut Vec<Self>> {
                (address == Address::document($tag)).then_some(&mut document.$field)
            }
        }
    };
}

document_collection!(Content, CollectionTag::Contents, contents);
document_collection!(Guide, CollectionTag::Guides, guides);

impl Element for Text {
    fn collection(document: &Document, address: Address) -> Option<&Vec<Self>> {
        (address == Address::document(CollectionTag::Texts)).then_some(&document.texts)
    }

    fn collection_mut(document: &mut Document, address: Address) -> Option<&mut Vec<Self>> {
        (address == Address::document(CollectionTag::Texts)).then_some(&mut document.texts)
    }

    fn bounds(&self) -> Option<Rect> {
        Some(Text::bounds(self))
    }
}

/// One editable unit.
///
/// Mutated only through structural operations; the undo engine relies on
/// that to keep recorded indices meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub animation: Animation,
    pub score: Score,
    pub contents: Vec<Content>,
    pub texts: Vec<Text>,
    pub guides: Vec<Guide>,
    pub background_color: Color,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document with a fresh id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: DocumentId::allocate(),
            animation: Animation::default(),
            score: Score::default(),
            contents: Vec::new(),
            texts: Vec::new(),
            guides: Vec::new(),
            background_color: Color::WHITE,
        }
    }

    /// Create a document with `count` empty keyframes, one beat apart.
    #[must_use]
    pub fn with_keyframes(count: usize) -> Self {
        let mut document = Self::new();
        document.animation = Animation::new(
            (0..count)
                .map(|i| Keyframe::new(crate::keyframe::KeyframeOption::at_beat(i as i64 * 480)))
                .collect(),
        );
        document
    }

    /// Resolve an address to its typed collection.
    #[must_use]
    pub fn collection<T: Element>(&self, address: Address) -> Option<&Vec<T>> {
        T::collection(self, address)
    }

    /// Resolve an address to its typed collection, mutably.
    pub fn collection_mut<T: Element>(&mut self, address: Address) -> Option<&mut Vec<T>> {
        T::collection_mut(self, address)
    }

    /// Whether `address` names an existing collection of any kind.
    #[must_use]
    pub fn resolves(&self, address: Address) -> bool {
        match address.tag {
            CollectionTag::Keyframes => self.collection::<Keyframe>(address).is_some(),
            CollectionTag::Strokes | CollectionTag::DraftStrokes => {
                self.collection::<Stroke>(address).is_some()
            }
            CollectionTag::Regions | CollectionTag::DraftRegions => {
                self.collection::<FilledRegion>(address).is_some()
            }
            CollectionTag::Notes | CollectionTag::DraftNotes => {
                self.collection::<Note>(address).is_some()
            }
            CollectionTag::Contents => self.collection::<Content>(address).is_some(),
            CollectionTag::Texts => self.collection::<Text>(address).is_some(),
            CollectionTag::Guides => self.collection::<Guide>(address).is_some(),
        }
    }

    /// An element id not used anywhere in the document.
    ///
    /// Derived from current state only, so replaying the same edits on the
    /// same state always hands out the same ids.
    #[must_use]
    pub fn fresh_element_id(&self) -> ElementId {
        let keyframes = self
            .animation
            .keyframes
            .iter()
            .filter_map(Keyframe::max_element_id);
        keyframes
            .chain(self.score.max_element_id())
            .max()
            .map_or(ElementId(1), ElementId::next)
    }
}

/// Set of the ids carried by `items`.
#[must_use]
pub fn element_ids<T: Element>(items: &[T]) -> AHashSet<ElementId> {
    items.iter().filter_map(Element::element_id).collect()
}
