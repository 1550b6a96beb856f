#![forbid(unsafe_code)]

//! Document-level media references, text blocks and alignment guides.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// A timed reference to an external media item (audio, movie, image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Name of the referenced media item.
    pub name: String,
    /// Start position in beat ticks.
    pub beat: i64,
    /// Duration in beat ticks.
    pub length: i64,
    pub volume: f64,
}

impl Content {
    #[must_use]
    pub fn new(name: impl Into<String>, beat: i64, length: i64) -> Self {
        Self {
            name: name.into(),
            beat,
            length,
            volume: 1.0,
        }
    }
}

/// A block of text placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub string: String,
    pub origin: Point,
    /// Font size in canvas units.
    pub size: f64,
}

impl Text {
    #[must_use]
    pub fn new(string: impl Into<String>, origin: Point, size: f64) -> Self {
        Self {
            string: string.into(),
            origin,
            size,
        }
    }

    /// Rough layout box; real text layout belongs to the rendering layer.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let columns = self.string.lines().map(|l| l.chars().count()).max().unwrap_or(0);
        let rows = self.string.lines().count().max(1);
        Rect::new(
            self.origin.x,
            self.origin.y,
            columns as f64 * self.size * 0.6,
            rows as f64 * self.size * 1.2,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// An alignment border.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guide {
    pub orientation: Orientation,
    /// Offset along the axis perpendicular to the orientation.
    pub position: f64,
}

impl Guide {
    #[must_use]
    pub const fn new(orientation: Orientation, position: f64) -> Self {
        Self {
            orientation,
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_bounds_scale_with_lines() {
        let t = Text::new("ab\nabcd", Point::new(1.0, 2.0), 10.0);
        let b = t.bounds();
        assert_eq!(b.x, 1.0);
        assert!((b.width - 24.0).abs() < 1e-9);
        assert!((b.height - 24.0).abs() < 1e-9);
    }

    #[test]
    fn content_defaults_to_unit_volume() {
        assert_eq!(Content::new("voice", 0, 480).volume, 1.0);
    }
}
