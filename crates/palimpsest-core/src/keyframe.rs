#![forbid(unsafe_code)]

//! Keyframes: one discrete animation frame with its own picture content.

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::id::ElementId;
use crate::picture::Picture;

/// Which neighbours a keyframe is linked to for interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PreviousNext {
    #[default]
    None,
    Previous,
    Next,
    PreviousAndNext,
}

impl PreviousNext {
    #[must_use]
    pub const fn has_previous(self) -> bool {
        matches!(self, Self::Previous | Self::PreviousAndNext)
    }

    #[must_use]
    pub const fn has_next(self) -> bool {
        matches!(self, Self::Next | Self::PreviousAndNext)
    }
}

/// Timing options of a keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyframeOption {
    /// Start position in beat ticks.
    pub beat: i64,
    /// Key frame (`true`) or interpolated frame (`false`).
    pub is_key: bool,
    pub previous_next: PreviousNext,
}

impl KeyframeOption {
    #[must_use]
    pub const fn at_beat(beat: i64) -> Self {
        Self {
            beat,
            is_key: true,
            previous_next: PreviousNext::None,
        }
    }
}

/// A picture plus its draft layer and timing options.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Keyframe {
    pub picture: Picture,
    /// Non-final sketch layer, same shape as `picture`.
    pub draft_picture: Picture,
    pub option: KeyframeOption,
}

impl Keyframe {
    #[must_use]
    pub fn new(option: KeyframeOption) -> Self {
        Self {
            picture: Picture::default(),
            draft_picture: Picture::default(),
            option,
        }
    }

    #[must_use]
    pub fn with_picture(mut self, picture: Picture) -> Self {
        self.picture = picture;
        self
    }

    /// Bounds of both layers.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::union_opt(self.picture.bounds(), self.draft_picture.bounds())
    }

    #[must_use]
    pub fn max_element_id(&self) -> Option<ElementId> {
        self.picture
            .max_element_id()
            .max(self.draft_picture.max_element_id())
    }
}
