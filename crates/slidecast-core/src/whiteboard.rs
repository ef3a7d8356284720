//! Whiteboard strokes.
//!
//! Points are fractions of the canvas size so a stroke drawn on a 4K
//! projector replays correctly on a phone.

use serde::{Deserialize, Serialize};

use crate::errors::SyncError;

/// Strokes with fewer points are never stored or broadcast.
pub const MIN_STROKE_POINTS: usize = 2;

/// Color used when a stroke carries none.
pub const DEFAULT_STROKE_COLOR: &str = "#FFFFFF";

/// Width used when a stroke carries none.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

const MAX_COLOR_LEN: usize = 32;

/// A canvas-relative `(x, y)` coordinate, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point(pub f64, pub f64);

/// One continuous pointer drag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    /// Polyline vertices, nominally in `[0,1] x [0,1]`. A drag that leaves
    /// the canvas reports points outside it and they are kept as sent.
    pub points: Vec<Point>,
    /// CSS color.
    pub color: String,
    /// Line width in CSS pixels.
    pub width: f64,
}

/// Stroke as received from a client, before normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct WireStroke {
    /// Raw points.
    pub points: Vec<[f64; 2]>,
    /// Optional color.
    #[serde(default)]
    pub color: Option<String>,
    /// Optional width.
    #[serde(default)]
    pub width: Option<f64>,
}

impl Stroke {
    /// Normalize a client stroke.
    ///
    /// Coordinates must be finite and are otherwise kept exactly as drawn.
    /// A missing or oversized color and a non-positive width fall back to the
    /// defaults. The point count is not checked here; see [`Stroke::is_drawable`].
    pub fn from_wire(wire: WireStroke) -> Result<Self, SyncError> {
        let mut points = Vec::with_capacity(wire.points.len());
        for [x, y] in wire.points {
            if !x.is_finite() || !y.is_finite() {
                return Err(SyncError::Validation("stroke point is not finite".into()));
            }
            points.push(Point(x, y));
        }

        let color = wire
            .color
            .filter(|c| !c.is_empty() && c.len() <= MAX_COLOR_LEN)
            .unwrap_or_else(|| DEFAULT_STROKE_COLOR.to_owned());
        let width = wire
            .width
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(DEFAULT_STROKE_WIDTH);

        Ok(Self {
            points,
            color,
            width,
        })
    }

    /// Whether the stroke has enough points to be drawn as a line.
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= MIN_STROKE_POINTS
    }
}

/// Whiteboard state as seen by a joining connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhiteboardSnapshot {
    /// Whether the presenter has the board open.
    pub enabled: bool,
    /// Strokes since the board was last enabled or cleared, in draw order.
    pub strokes: Vec<Stroke>,
}
