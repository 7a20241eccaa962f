// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! PNG previews of the line art

use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use wayfinder_core::Rect2;

use crate::error::{Error, Result};
use crate::types::{polyline_bounds, FloorPlanConfig, Marker, PlanFrame, Polyline};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const WALL: Rgba<u8> = Rgba([31, 41, 51, 255]);
const MARKER: Rgba<u8> = Rgba([230, 159, 0, 255]);

/// Largest preview side, in px
const MAX_SIDE: f64 = 4096.0;

/// Draws the polylines (and optional markers) into an RGBA image.
///
/// The image scale is reduced when the plan would exceed the maximum
/// preview size.
pub fn render_preview(
    polylines: &[Polyline],
    boundary: Option<Rect2>,
    markers: &[Marker],
    config: &FloorPlanConfig,
) -> Result<RgbaImage> {
    let bounds = boundary
        .or_else(|| polyline_bounds(polylines))
        .ok_or_else(|| Error::EmptyPlan("no polylines to preview".into()))?;

    let mut frame = PlanFrame::new(bounds, config);
    let longest = frame.width().max(frame.height());
    if longest > MAX_SIDE {
        frame.scale *= (MAX_SIDE - 2.0 * frame.margin) / (longest - 2.0 * frame.margin);
    }

    let (width, height) = (frame.width().ceil() as u32, frame.height().ceil() as u32);
    let mut image = RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND);

    for line in polylines {
        for (a, b) in line.segments() {
            let (x0, y0) = frame.project(a[0], a[1]);
            let (x1, y1) = frame.project(b[0], b[1]);
            draw_line_segment_mut(&mut image, (x0 as f32, y0 as f32), (x1 as f32, y1 as f32), WALL);
        }
    }

    let radius = config.marker_radius.round().max(1.0) as i32;
    for marker in markers {
        let (x, y) = frame.project(marker.x, marker.z);
        draw_filled_circle_mut(&mut image, (x.round() as i32, y.round() as i32), radius, MARKER);
    }

    Ok(image)
}

/// Renders and saves the preview as PNG.
pub fn save_preview(
    path: &Path,
    polylines: &[Polyline],
    boundary: Option<Rect2>,
    markers: &[Marker],
    config: &FloorPlanConfig,
) -> Result<()> {
    let image = render_preview(polylines, boundary, markers, config)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    image.save(path)?;
    Ok(())
}
