// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polyline simplification

/// Douglas-Peucker simplification on X/Z points.
///
/// Keeps both endpoints; interior points closer than `epsilon` to the
/// chord of their span are dropped.
pub fn simplify(points: &[[f64; 2]], epsilon: f64) -> Vec<[f64; 2]> {
    if points.len() < 3 {
        return points.to_vec();
    }

    // Find the point with maximum distance from line between first and last
    let first = &points[0];
    let last = &points[points.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;

    for (i, point) in points.iter().enumerate().skip(1).take(points.len() - 2) {
        let dist = perpendicular_distance(point, first, last);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        let left = simplify(&points[..=max_idx], epsilon);
        let right = simplify(&points[max_idx..], epsilon);

        // Combine results (excluding duplicate point at max_idx)
        let mut result = left;
        result.extend_from_slice(&right[1..]);
        result
    } else {
        vec![*first, *last]
    }
}

/// Distance from `point` to the segment `start → end`
fn perpendicular_distance(point: &[f64; 2], start: &[f64; 2], end: &[f64; 2]) -> f64 {
    let dx = end[0] - start[0];
    let dz = end[1] - start[1];
    let length_sq = dx * dx + dz * dz;

    if length_sq < 1e-18 {
        return (point[0] - start[0]).hypot(point[1] - start[1]);
    }

    let t = (((point[0] - start[0]) * dx + (point[1] - start[1]) * dz) / length_sq).clamp(0.0, 1.0);
    let px = start[0] + t * dx;
    let pz = start[1] + t * dz;
    (point[0] - px).hypot(point[1] - pz)
}
