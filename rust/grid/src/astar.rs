// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 8-connected A* over occupancy grids.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use nalgebra::Point3;

use crate::grid::OccupancyGrid;
use crate::simplify::simplify;

const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// (dcol, drow, step length); cardinals first so they win cost ties
const NEIGHBORS: [(i64, i64, f64); 8] = [
    (1, 0, 1.0),
    (-1, 0, 1.0),
    (0, 1, 1.0),
    (0, -1, 1.0),
    (1, 1, SQRT_2),
    (1, -1, SQRT_2),
    (-1, 1, SQRT_2),
    (-1, -1, SQRT_2),
];

/// How a grid's weights translate into passability and step cost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridKind {
    /// Walked cells: passable iff weight > 0.75
    Floor,
    /// Wall raster: passable iff weight < 0.25
    Wall,
    /// `wall - floor`: passable iff weight < 0.25, walked cells cheaper
    Combined,
}

impl GridKind {
    #[inline]
    pub fn passable(self, weight: f32) -> bool {
        match self {
            GridKind::Floor => weight > 0.75,
            GridKind::Wall | GridKind::Combined => weight < 0.25,
        }
    }

    /// Per-cell cost multiplier, never below 1 so the octile heuristic stays admissible
    #[inline]
    pub fn cost(self, weight: f32) -> f64 {
        let w = weight as f64;
        match self {
            GridKind::Floor => 1.0 + (1.0 - w).max(0.0),
            GridKind::Wall => 1.0 + w.max(0.0),
            GridKind::Combined => 1.0 + 0.5 * (w + 1.0).max(0.0),
        }
    }
}

/// Octile distance between two cells
#[inline]
fn octile(a: (usize, usize), b: (usize, usize)) -> f64 {
    let dx = a.0.abs_diff(b.0) as f64;
    let dy = a.1.abs_diff(b.1) as f64;
    dx.max(dy) + (SQRT_2 - 1.0) * dx.min(dy)
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    estimate: f64,
    sequence: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap; earlier insertion wins ties
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl OccupancyGrid {
    /// A* between two cells.
    ///
    /// Moving into a cell costs `step_length * cost(weight)`; `cost` must be
    /// at least 1. A diagonal move is only allowed when both cardinal cells
    /// it brushes are passable, so paths never cut wall corners.
    pub fn a_star<C, P>(
        &self,
        start: (usize, usize),
        goal: (usize, usize),
        cost: C,
        passable: P,
    ) -> Option<Vec<(usize, usize)>>
    where
        C: Fn(f32) -> f64,
        P: Fn(f32) -> bool,
    {
        let (w, h) = (self.width(), self.height());
        if start.0 >= w || start.1 >= h || goal.0 >= w || goal.1 >= h {
            return None;
        }
        let open_cell = |col: i64, row: i64| {
            self.in_bounds(col, row) && passable(self.get(col as usize, row as usize))
        };
        if !open_cell(start.0 as i64, start.1 as i64) || !open_cell(goal.0 as i64, goal.1 as i64) {
            return None;
        }

        let idx = |c: usize, r: usize| r * w + c;
        let mut g_score = vec![f64::INFINITY; w * h];
        let mut came_from = vec![usize::MAX; w * h];
        let mut closed = vec![false; w * h];
        let mut heap = BinaryHeap::new();
        let mut sequence = 0u64;

        let start_idx = idx(start.0, start.1);
        let goal_idx = idx(goal.0, goal.1);
        g_score[start_idx] = 0.0;
        heap.push(OpenEntry {
            estimate: octile(start, goal),
            sequence,
            index: start_idx,
        });

        while let Some(OpenEntry { index, .. }) = heap.pop() {
            if closed[index] {
                continue;
            }
            if index == goal_idx {
                return Some(reconstruct(&came_from, w, start_idx, goal_idx));
            }
            closed[index] = true;

            let (col, row) = ((index % w) as i64, (index / w) as i64);
            for &(dc, dr, length) in &NEIGHBORS {
                let (nc, nr) = (col + dc, row + dr);
                if !open_cell(nc, nr) {
                    continue;
                }
                if dc != 0 && dr != 0 && !(open_cell(col + dc, row) && open_cell(col, row + dr)) {
                    continue;
                }
                let n_idx = idx(nc as usize, nr as usize);
                if closed[n_idx] {
                    continue;
                }
                let tentative = g_score[index] + length * cost(self.get(nc as usize, nr as usize));
                if tentative < g_score[n_idx] {
                    g_score[n_idx] = tentative;
                    came_from[n_idx] = index;
                    sequence += 1;
                    heap.push(OpenEntry {
                        estimate: tentative + octile((nc as usize, nr as usize), goal),
                        sequence,
                        index: n_idx,
                    });
                }
            }
        }

        None
    }

    /// World-space path from `a` to `b` using the preset for `kind`.
    ///
    /// The cell path is simplified with `epsilon` (meters) and its first and
    /// last points are replaced by the exact query points; heights are
    /// interpolated along the path. `None` when either point lies outside
    /// the grid or no passable route exists.
    pub fn find_path(
        &self,
        a: &Point3<f64>,
        b: &Point3<f64>,
        kind: GridKind,
        epsilon: f64,
    ) -> Option<Vec<Point3<f64>>> {
        let start = self.xz_to_index(a.x, a.z)?;
        let goal = self.xz_to_index(b.x, b.z)?;
        let cells = self.a_star(start, goal, |w| kind.cost(w), |w| kind.passable(w))?;

        let mut xz: Vec<[f64; 2]> = cells
            .iter()
            .map(|&(c, r)| {
                let (x, z) = self.index_to_xz(c, r);
                [x, z]
            })
            .collect();
        if xz.len() == 1 {
            xz.push(xz[0]);
        }
        let n = xz.len();
        xz[0] = [a.x, a.z];
        xz[n - 1] = [b.x, b.z];

        let simplified = simplify(&xz, epsilon);
        Some(lift_heights(&simplified, a.y, b.y))
    }
}

/// Points with heights interpolated by distance along the polyline
fn lift_heights(xz: &[[f64; 2]], y0: f64, y1: f64) -> Vec<Point3<f64>> {
    let mut lengths = Vec::with_capacity(xz.len());
    let mut total = 0.0;
    lengths.push(0.0);
    for pair in xz.windows(2) {
        total += (pair[1][0] - pair[0][0]).hypot(pair[1][1] - pair[0][1]);
        lengths.push(total);
    }

    let last = xz.len() - 1;
    xz.iter()
        .zip(lengths)
        .enumerate()
        .map(|(i, (p, s))| {
            let y = if i == last {
                y1
            } else if total > 0.0 {
                y0 + (y1 - y0) * (s / total)
            } else {
                y0
            };
            Point3::new(p[0], y, p[1])
        })
        .collect()
}

fn reconstruct(came_from: &[usize], width: usize, start: usize, goal: usize) -> Vec<(usize, usize)> {
    let mut path = vec![(goal % width, goal / width)];
    let mut current = goal;
    while current != start {
        current = came_from[current];
        path.push((current % width, current / width));
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wayfinder_core::Rect2;

    /// 10x10 cells of 1 m, origin cell at (0, 0)
    fn open_grid(fill: f32) -> OccupancyGrid {
        let mut g = OccupancyGrid::new(Rect2::new(0.0, 0.0, 9.0, 9.0), 1.0).unwrap();
        for r in 0..g.height() {
            for c in 0..g.width() {
                g.set(c, r, fill);
            }
        }
        g
    }

    #[test]
    fn presets_match_thresholds() {
        assert!(GridKind::Floor.passable(0.8));
        assert!(!GridKind::Floor.passable(0.75));
        assert!(GridKind::Wall.passable(0.2));
        assert!(!GridKind::Wall.passable(0.25));
        assert!(GridKind::Combined.passable(-1.0));
        for w in [-1.0f32, -0.5, 0.0, 0.2, 0.8, 1.0] {
            assert!(GridKind::Floor.cost(w) >= 1.0);
            assert!(GridKind::Wall.cost(w) >= 1.0);
            assert!(GridKind::Combined.cost(w) >= 1.0);
        }
    }

    #[test]
    fn straight_line_in_open_floor() {
        let g = open_grid(1.0);
        let path = g.a_star((0, 5), (9, 5), |w| GridKind::Floor.cost(w), |w| GridKind::Floor.passable(w)).unwrap();
        assert_eq!(path.len(), 10);
        assert!(path.iter().all(|&(_, r)| r == 5));
    }

    #[test]
    fn diagonal_when_unobstructed() {
        let g = open_grid(0.0);
        let path = g.a_star((0, 0), (4, 4), |w| GridKind::Wall.cost(w), |w| GridKind::Wall.passable(w)).unwrap();
        assert_eq!(path.len(), 5);
    }

    #[test]
    fn no_corner_cutting() {
        // Wall cells at (1,0) and (0,1): the diagonal (0,0)->(1,1) is blocked.
        let mut g = open_grid(0.0);
        g.set(1, 0, 1.0);
        g.set(0, 1, 1.0);
        let path = g.a_star((0, 0), (1, 1), |w| GridKind::Wall.cost(w), |w| GridKind::Wall.passable(w));
        assert!(path.is_none());

        // One flank open: still no diagonal, goes around through it
        g.set(0, 1, 0.0);
        let path = g
            .a_star((0, 0), (1, 1), |w| GridKind::Wall.cost(w), |w| GridKind::Wall.passable(w))
            .unwrap();
        assert_eq!(path, vec![(0, 0), (0, 1), (1, 1)]);
    }

    #[test]
    fn blocked_endpoints_yield_none() {
        let mut g = open_grid(0.0);
        g.set(3, 3, 1.0);
        assert!(g
            .a_star((3, 3), (5, 5), |w| GridKind::Wall.cost(w), |w| GridKind::Wall.passable(w))
            .is_none());
        assert!(g
            .a_star((0, 0), (50, 5), |w| GridKind::Wall.cost(w), |w| GridKind::Wall.passable(w))
            .is_none());
    }

    #[test]
    fn detours_around_wall_with_gap() {
        // Vertical wall at column 5 with a gap at row 8
        let mut g = open_grid(0.0);
        for r in 0..10 {
            if r != 8 {
                g.set(5, r, 1.0);
            }
        }
        let path = g
            .a_star((2, 2), (8, 2), |w| GridKind::Wall.cost(w), |w| GridKind::Wall.passable(w))
            .unwrap();
        assert!(path.contains(&(5, 8)));
    }

    #[test]
    fn find_path_replaces_endpoints_and_simplifies() {
        let g = open_grid(1.0);
        let a = Point3::new(0.2, 1.0, 5.1);
        let b = Point3::new(8.9, 1.5, 5.2);
        let path = g.find_path(&a, &b, GridKind::Floor, 0.5).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0], a);
        assert_eq!(path[1], b);
    }

    #[test]
    fn find_path_same_cell() {
        let g = open_grid(1.0);
        let a = Point3::new(3.1, 0.0, 3.1);
        let b = Point3::new(3.3, 0.0, 2.8);
        let path = g.find_path(&a, &b, GridKind::Floor, 0.5).unwrap();
        assert_eq!(path, vec![a, b]);
    }

    #[test]
    fn heights_are_interpolated() {
        let pts = lift_heights(&[[0.0, 0.0], [1.0, 0.0], [2.0, 0.0]], 0.0, 2.0);
        assert_relative_eq!(pts[1].y, 1.0);
        assert_relative_eq!(pts[2].y, 2.0);
    }
}
