// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Segment rasterization with an uncertainty band.

use nalgebra::Point3;

use crate::grid::OccupancyGrid;

impl OccupancyGrid {
    /// Marks the cells along `a → b` with weight 1 and a tent-shaped band
    /// `vspread` cells wide on either side.
    pub fn add_segment(&mut self, a: &Point3<f64>, b: &Point3<f64>, vspread: usize) {
        self.add_weighted_segment(a, b, 1.0, vspread);
    }

    /// Rasterizes `a → b` (X/Z only) into the grid.
    ///
    /// Steps one cell at a time along the major axis (axes swapped when the
    /// segment is steeper than 45°, endpoints swapped when it runs
    /// backwards). At each step the band perpendicular to the major axis
    /// receives `weight * (1 - |offset| / (vspread + 1))`. Cells only ever
    /// take the maximum of their current and new weight.
    pub fn add_weighted_segment(
        &mut self,
        a: &Point3<f64>,
        b: &Point3<f64>,
        weight: f32,
        vspread: usize,
    ) {
        // Continuous cell coordinates: cell centers at integers
        let to_cell = |p: &Point3<f64>| {
            (
                (p.x - self.left()) / self.step() - 0.5,
                (p.z - self.top()) / self.step() - 0.5,
            )
        };
        let (ax, ay) = to_cell(a);
        let (bx, by) = to_cell(b);

        let steep = (by - ay).abs() > (bx - ax).abs();
        let (mut x0, mut y0, mut x1, mut y1) = if steep {
            (ay, ax, by, bx)
        } else {
            (ax, ay, bx, by)
        };
        if x0 > x1 {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }

        let run = x1 - x0;
        let slope = if run.abs() < 1e-12 { 0.0 } else { (y1 - y0) / run };
        let spread = vspread as i64;
        let falloff = vspread as f32 + 1.0;

        for major in x0.round() as i64..=x1.round() as i64 {
            let t = (major as f64).clamp(x0, x1);
            let minor = (y0 + (t - x0) * slope).round() as i64;

            for offset in -spread..=spread {
                let w = weight * (1.0 - offset.unsigned_abs() as f32 / falloff);
                let (col, row) = if steep {
                    (minor + offset, major)
                } else {
                    (major, minor + offset)
                };
                self.raise(col, row, w);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wayfinder_core::Rect2;

    fn grid() -> OccupancyGrid {
        OccupancyGrid::new(Rect2::centered(5.0), 0.5).unwrap()
    }

    #[test]
    fn horizontal_segment_marks_a_row() {
        let mut g = grid();
        g.add_segment(&Point3::new(-2.0, 0.0, 0.0), &Point3::new(2.0, 0.0, 0.0), 0);
        // 4 m at 0.5 m cells: 9 centers from -2 to 2
        assert_eq!(g.count_above(0.99), 9);
        assert_eq!(g.value_at(1.0, 0.0), Some(1.0));
        assert_eq!(g.value_at(1.0, 0.5), Some(0.0));
    }

    #[test]
    fn band_is_tent_weighted() {
        let mut g = grid();
        g.add_segment(&Point3::new(-2.0, 0.0, 0.0), &Point3::new(2.0, 0.0, 0.0), 2);
        assert_relative_eq!(g.value_at(0.0, 0.0).unwrap(), 1.0);
        assert_relative_eq!(g.value_at(0.0, 0.5).unwrap(), 2.0 / 3.0, epsilon = 1e-6);
        assert_relative_eq!(g.value_at(0.0, -1.0).unwrap(), 1.0 / 3.0, epsilon = 1e-6);
        assert_eq!(g.value_at(0.0, 1.5), Some(0.0));
    }

    #[test]
    fn steep_and_reversed_segments_are_continuous() {
        let mut g = grid();
        // Steep, drawn top to bottom
        g.add_segment(&Point3::new(0.5, 0.0, 3.0), &Point3::new(0.0, 0.0, -3.0), 0);
        for i in -6..=6 {
            let z = i as f64 * 0.5;
            let row_hit = (-3..=3)
                .map(|c| g.value_at(c as f64 * 0.5, z).unwrap())
                .any(|w| w >= 1.0);
            assert!(row_hit, "gap at z = {}", z);
        }
    }

    #[test]
    fn degenerate_segment_marks_one_cell() {
        let mut g = grid();
        let p = Point3::new(1.1, 0.0, -0.9);
        g.add_segment(&p, &p, 0);
        assert_eq!(g.count_above(0.0), 1);
        assert_eq!(g.value_at(1.1, -0.9), Some(1.0));
    }

    #[test]
    fn weights_never_decrease() {
        let mut g = grid();
        let a = Point3::new(-1.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        g.add_segment(&a, &b, 1);
        let before = g.cells().to_vec();
        g.add_weighted_segment(&a, &b, 0.2, 3);
        for (old, new) in before.iter().zip(g.cells()) {
            assert!(new >= old);
        }
    }

    #[test]
    fn segments_outside_are_clipped() {
        let mut g = grid();
        g.add_segment(&Point3::new(4.0, 0.0, 0.0), &Point3::new(40.0, 0.0, 0.0), 1);
        assert!(g.count_above(0.99) > 0);
        assert_eq!(g.value_at(4.0, 0.0), Some(1.0));
    }
}
