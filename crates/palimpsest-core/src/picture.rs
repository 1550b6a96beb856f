#![forbid(unsafe_code)]

//! Drawn content of a keyframe: strokes and filled regions.

use serde::{Deserialize, Serialize};

use crate::color::Composition;
use crate::geometry::{Point, Rect};
use crate::id::ElementId;

/// A drawn line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: ElementId,
    pub composition: Composition,
    pub points: Vec<Point>,
    /// Line width in canvas units.
    pub width: f64,
}

impl Stroke {
    #[must_use]
    pub fn new(id: ElementId, composition: Composition, points: Vec<Point>, width: f64) -> Self {
        Self {
            id,
            composition,
            points,
            width,
        }
    }

    /// Bounds of the stroke including half the line width.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(&self.points).map(|r| r.outset(self.width / 2.0))
    }
}

/// A closed polygon filled with a single color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilledRegion {
    pub id: ElementId,
    pub composition: Composition,
    pub polygon: Vec<Point>,
}

impl FilledRegion {
    #[must_use]
    pub fn new(id: ElementId, composition: Composition, polygon: Vec<Point>) -> Self {
        Self {
            id,
            composition,
            polygon,
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        Rect::bounding(&self.polygon)
    }
}

/// Ordered strokes and filled regions of one keyframe layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Picture {
    pub strokes: Vec<Stroke>,
    pub regions: Vec<FilledRegion>,
}

impl Picture {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty() && self.regions.is_empty()
    }

    /// Union of the bounds of every element.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        let strokes = self.strokes.iter().filter_map(Stroke::bounds);
        let regions = self.regions.iter().filter_map(FilledRegion::bounds);
        strokes
            .chain(regions)
            .fold(None, |acc, r| Rect::union_opt(acc, Some(r)))
    }

    /// Largest element id in the picture.
    #[must_use]
    pub fn max_element_id(&self) -> Option<ElementId> {
        let strokes = self.strokes.iter().map(|s| s.id);
        let regions = self.regions.iter().map(|r| r.id);
        strokes.chain(regions).max()
    }
}
