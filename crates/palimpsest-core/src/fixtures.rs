#![forbid(unsafe_code)]

//! Small element builders for tests in this and dependent crates.
//!
//! Only compiled with the `test-helpers` feature.

use crate::color::{Color, Composition};
use crate::geometry::Point;
use crate::id::{ColorId, ElementId};
use crate::media::{Guide, Orientation};
use crate::picture::{FilledRegion, Stroke};
use crate::score::Note;

/// A one-segment stroke whose geometry is derived from `id`.
#[must_use]
pub fn stroke(id: u64) -> Stroke {
    let x = id as f64 * 10.0;
    Stroke::new(
        ElementId(id),
        Composition::new(ColorId(1), Color::BLACK),
        vec![Point::new(x, 0.0), Point::new(x + 5.0, 5.0)],
        2.0,
    )
}

/// A triangle region whose geometry is derived from `id`.
#[must_use]
pub fn region(id: u64) -> FilledRegion {
    let x = id as f64 * 10.0;
    FilledRegion::new(
        ElementId(id),
        Composition::new(ColorId(2), Color::rgb(1.0, 0.0, 0.0)),
        vec![
            Point::new(x, 0.0),
            Point::new(x + 4.0, 0.0),
            Point::new(x, 4.0),
        ],
    )
}

/// A quarter note starting at `id` beats.
#[must_use]
pub fn note(id: u64) -> Note {
    Note::new(ElementId(id), id as i64 * 480, 480, 60.0)
}

#[must_use]
pub fn guide(position: f64) -> Guide {
    Guide::new(Orientation::Horizontal, position)
}
