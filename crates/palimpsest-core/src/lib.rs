#![forbid(unsafe_code)]

//! Core: the keyframed document model and its addressing.
//!
//! # Role in palimpsest
//! `palimpsest-core` owns the data the undo engine mutates. It has no notion
//! of history; `palimpsest-history` builds reversible operations on top of the
//! addressing defined here.
//!
//! # Primary responsibilities
//! - **Document**: animation, score, media contents, texts, guides.
//! - **Addressing**: [`Address`] = [`Scope`] + [`CollectionTag`], resolved by
//!   the [`Element`] trait.
//! - **Root index**: keyframe/loop/inter coordinate conversions and the shift
//!   rules applied when keyframes are inserted or removed.

pub mod animation;
pub mod color;
pub mod document;
#[cfg(feature = "test-helpers")]
pub mod fixtures;
pub mod geometry;
pub mod id;
pub mod keyframe;
pub mod media;
pub mod picture;
pub mod score;

pub use animation::{Animation, AnimationOption};
pub use color::{Color, Composition};
pub use document::{Address, CollectionTag, Document, Element, Layer, Scope, element_ids};
pub use geometry::{Point, Rect};
pub use id::{ColorId, DocumentId, ElementId};
pub use keyframe::{Keyframe, KeyframeOption, PreviousNext};
pub use media::{Content, Guide, Orientation, Text};
pub use picture::{FilledRegion, Picture, Stroke};
pub use score::{Note, Pit, Score, ScoreOption};
