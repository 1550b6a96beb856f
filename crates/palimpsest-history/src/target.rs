#![forbid(unsafe_code)]

//! Typed handles naming one document collection.
//!
//! A [`Target`] ties an [`Address`] to the element type stored there and to
//! the [`UndoItem`] variant that edits it, so capture helpers can build both
//! sides of a pair without matching on addresses.

use palimpsest_core::{
    Address, CollectionTag, Content, Element, FilledRegion, Guide, Keyframe, Layer, Note, Stroke,
    Text,
};

use crate::item::{Edit, UndoItem};

pub trait Target: Copy {
    type Element: Element;

    fn address(self) -> Address;

    /// Wrap `edit` into the item variant for this collection.
    fn item(self, edit: Edit<Self::Element>) -> UndoItem;
}

/// Strokes of one keyframe layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strokes {
    pub keyframe: usize,
    pub layer: Layer,
}

impl Strokes {
    #[must_use]
    pub const fn new(keyframe: usize, layer: Layer) -> Self {
        Self { keyframe, layer }
    }
}

impl Target for Strokes {
    type Element = Stroke;

    fn address(self) -> Address {
        Address::strokes(self.keyframe, self.layer)
    }

    fn item(self, edit: Edit<Stroke>) -> UndoItem {
        UndoItem::Strokes {
            keyframe: self.keyframe,
            layer: self.layer,
            edit,
        }
    }
}

/// Filled regions of one keyframe layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub keyframe: usize,
    pub layer: Layer,
}

impl Regions {
    #[must_use]
    pub const fn new(keyframe: usize, layer: Layer) -> Self {
        Self { keyframe, layer }
    }
}

impl Target for Regions {
    type Element = FilledRegion;

    fn address(self) -> Address {
        Address::regions(self.keyframe, self.layer)
    }

    fn item(self, edit: Edit<FilledRegion>) -> UndoItem {
        UndoItem::Regions {
            keyframe: self.keyframe,
            layer: self.layer,
            edit,
        }
    }
}

/// Score notes of one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notes(pub Layer);

impl Target for Notes {
    type Element = Note;

    fn address(self) -> Address {
        Address::notes(self.0)
    }

    fn item(self, edit: Edit<Note>) -> UndoItem {
        UndoItem::Notes {
            layer: self.0,
            edit,
        }
    }
}

macro_rules! document_target {
    ($name:ident, $element:ty, $tag:ident, $variant:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl Target for $name {
            type Element = $element;

            fn address(self) -> Address {
                Address::document(CollectionTag::$tag)
            }

            fn item(self, edit: Edit<$element>) -> UndoItem {
                UndoItem::$variant(edit)
            }
        }
    };
}

document_target!(Keyframes, Keyframe, Keyframes, Keyframes);
document_target!(Contents, Content, Contents, Contents);
document_target!(Texts, Text, Texts, Texts);
document_target!(Guides, Guide, Guides, Guides);
