// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for floor-plan extraction and rendering

use serde::{Deserialize, Serialize};
use wayfinder_core::Rect2;

/// Open polyline on the X/Z plane
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<[f64; 2]>,
}

impl Polyline {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn length(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1][0] - w[0][0]).hypot(w[1][1] - w[0][1]))
            .sum()
    }

    /// Consecutive point pairs
    pub fn segments(&self) -> impl Iterator<Item = ([f64; 2], [f64; 2])> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// Bounds of a set of polylines; `None` when there are no points.
pub fn polyline_bounds<'a>(polylines: impl IntoIterator<Item = &'a Polyline>) -> Option<Rect2> {
    let mut rect = Rect2::empty();
    for p in polylines.into_iter().flat_map(|l| l.points.iter()) {
        rect.include(p[0], p[1]);
    }
    (!rect.is_empty()).then_some(rect)
}

/// Point of interest drawn on top of the plan (device position, etc.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub x: f64,
    pub z: f64,
    /// Any SVG color
    pub color: String,
    pub label: Option<String>,
}

impl Marker {
    pub fn new(x: f64, z: f64, color: impl Into<String>) -> Self {
        Self {
            x,
            z,
            color: color.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Rendering parameters
#[derive(Debug, Clone)]
pub struct FloorPlanConfig {
    /// Output units (px) per meter
    pub scale: f64,
    /// Border around the plan, in px
    pub margin: f64,
    pub stroke: String,
    pub stroke_width: f64,
    pub background: String,
    /// Marker circle radius in px
    pub marker_radius: f64,
}

impl Default for FloorPlanConfig {
    fn default() -> Self {
        Self {
            scale: 50.0,
            margin: 20.0,
            stroke: "#1f2933".into(),
            stroke_width: 2.0,
            background: "white".into(),
            marker_radius: 6.0,
        }
    }
}

/// Maps world X/Z into image coordinates with +Z pointing up
#[derive(Debug, Clone, Copy)]
pub struct PlanFrame {
    pub bounds: Rect2,
    pub scale: f64,
    pub margin: f64,
}

impl PlanFrame {
    pub fn new(bounds: Rect2, config: &FloorPlanConfig) -> Self {
        Self {
            bounds,
            scale: config.scale,
            margin: config.margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.bounds.width() * self.scale + 2.0 * self.margin
    }

    pub fn height(&self) -> f64 {
        self.bounds.depth() * self.scale + 2.0 * self.margin
    }

    /// Image position of a world point (Y axis flipped)
    #[inline]
    pub fn project(&self, x: f64, z: f64) -> (f64, f64) {
        (
            (x - self.bounds.min_x) * self.scale + self.margin,
            (self.bounds.max_z - z) * self.scale + self.margin,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn polyline_length_and_bounds() {
        let a = Polyline::new(vec![[0.0, 0.0], [3.0, 4.0]]);
        let b = Polyline::new(vec![[-1.0, 2.0], [5.0, 2.0], [5.0, -1.0]]);
        assert_relative_eq!(a.length(), 5.0);
        assert_eq!(b.segments().count(), 2);
        assert_eq!(polyline_bounds([&a, &b]), Some(Rect2::new(-1.0, -1.0, 5.0, 4.0)));
        assert_eq!(polyline_bounds(std::iter::empty()), None);
    }

    #[test]
    fn frame_flips_z() {
        let frame = PlanFrame {
            bounds: Rect2::new(0.0, 0.0, 10.0, 5.0),
            scale: 10.0,
            margin: 5.0,
        };
        assert_eq!(frame.project(0.0, 5.0), (5.0, 5.0));
        assert_eq!(frame.project(10.0, 0.0), (105.0, 55.0));
        assert_relative_eq!(frame.height(), 60.0);
    }
}
