// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static SVG line art
//!
//! Layers, bottom to top: background, wall polylines, device markers.
//! World +Z maps to image up.

use std::path::Path;

use svg::node::element::{Circle, Group, Polyline as SvgPolyline, Rectangle, Text};
use svg::Document;
use wayfinder_core::Rect2;

use crate::error::{Error, Result};
use crate::types::{polyline_bounds, FloorPlanConfig, Marker, PlanFrame, Polyline};

/// Marker label offset from the circle, in px
const LABEL_OFFSET: f64 = 4.0;

/// Renders polylines and markers as an SVG document.
///
/// `boundary` fixes the drawn area; when `None` it is derived from the
/// polylines and markers (1 m square around the origin if both are empty).
pub fn render_svg(
    polylines: &[Polyline],
    boundary: Option<Rect2>,
    markers: &[Marker],
    config: &FloorPlanConfig,
) -> String {
    let bounds = boundary.unwrap_or_else(|| content_bounds(polylines, markers));
    let frame = PlanFrame::new(bounds, config);
    let (width, height) = (frame.width(), frame.height());

    let doc = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0.0, 0.0, width, height))
        .add(
            Rectangle::new()
                .set("x", 0)
                .set("y", 0)
                .set("width", width)
                .set("height", height)
                .set("fill", config.background.as_str()),
        )
        .add(render_walls(polylines, &frame, config))
        .add(render_markers(markers, &frame, config));

    doc.to_string()
}

/// Renders and writes the SVG, creating parent directories.
pub fn write_svg(
    path: &Path,
    polylines: &[Polyline],
    boundary: Option<Rect2>,
    markers: &[Marker],
    config: &FloorPlanConfig,
) -> Result<()> {
    if polylines.is_empty() && markers.is_empty() {
        return Err(Error::EmptyPlan(path.display().to_string()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_svg(polylines, boundary, markers, config))?;
    tracing::debug!(path = %path.display(), polylines = polylines.len(), "Wrote floor plan SVG");
    Ok(())
}

fn content_bounds(polylines: &[Polyline], markers: &[Marker]) -> Rect2 {
    let mut rect = polyline_bounds(polylines).unwrap_or_else(Rect2::empty);
    for m in markers {
        rect.include(m.x, m.z);
    }
    if rect.is_empty() {
        Rect2::centered(0.5)
    } else {
        rect
    }
}

fn render_walls(polylines: &[Polyline], frame: &PlanFrame, config: &FloorPlanConfig) -> Group {
    let mut group = Group::new()
        .set("id", "walls")
        .set("fill", "none")
        .set("stroke", config.stroke.as_str())
        .set("stroke-width", config.stroke_width)
        .set("stroke-linecap", "round")
        .set("stroke-linejoin", "round");

    for line in polylines.iter().filter(|l| l.len() >= 2) {
        let points: String = line
            .points
            .iter()
            .map(|p| {
                let (x, y) = frame.project(p[0], p[1]);
                format!("{:.2},{:.2}", x, y)
            })
            .collect::<Vec<_>>()
            .join(" ");
        group = group.add(SvgPolyline::new().set("points", points));
    }
    group
}

fn render_markers(markers: &[Marker], frame: &PlanFrame, config: &FloorPlanConfig) -> Group {
    let mut group = Group::new().set("id", "markers");
    for marker in markers {
        let (cx, cy) = frame.project(marker.x, marker.z);
        group = group.add(
            Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", config.marker_radius)
                .set("fill", marker.color.as_str())
                .set("stroke", "black")
                .set("stroke-width", 1),
        );
        if let Some(label) = &marker.label {
            group = group.add(
                Text::new(label.as_str())
                    .set("x", cx + config.marker_radius + LABEL_OFFSET)
                    .set("y", cy)
                    .set("font-family", "sans-serif")
                    .set("font-size", 12),
            );
        }
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_contains_walls_and_markers() {
        let lines = vec![Polyline::new(vec![[0.0, 0.0], [2.0, 0.0], [2.0, 1.0]])];
        let markers = vec![Marker::new(1.0, 0.5, "#E69F00").with_label("hl2-7")];
        let svg = render_svg(&lines, None, &markers, &FloorPlanConfig::default());

        assert!(svg.contains("<svg"));
        assert!(svg.contains("<polyline"));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("hl2-7"));
        assert!(svg.contains("#E69F00"));
    }

    #[test]
    fn plus_z_is_drawn_upwards() {
        let config = FloorPlanConfig {
            scale: 10.0,
            margin: 0.0,
            ..Default::default()
        };
        let lines = vec![Polyline::new(vec![[0.0, 0.0], [0.0, 2.0]])];
        let svg = render_svg(&lines, Some(Rect2::new(0.0, 0.0, 1.0, 2.0)), &[], &config);
        // z = 0 lands at the bottom edge (y = 20), z = 2 at the top (y = 0)
        assert!(svg.contains("0.00,20.00 0.00,0.00"), "{}", svg);
    }

    #[test]
    fn write_svg_refuses_empty_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.svg");
        assert!(matches!(
            write_svg(&path, &[], None, &[], &FloorPlanConfig::default()),
            Err(Error::EmptyPlan(_))
        ));
        assert!(!path.exists());
    }
}
