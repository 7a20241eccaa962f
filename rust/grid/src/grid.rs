// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Occupancy grid geometry, alignment and persistence.
//!
//! Cells are `step`-sized squares on the X/Z plane. Column index grows
//! with X, row index grows with Z. `left`/`top` are chosen so the world
//! origin sits at the exact center of one cell; any two grids built with
//! the same step are therefore aligned and can be resized onto each other
//! without resampling.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wayfinder_core::Rect2;

use crate::error::{Error, Result};

/// Dense weight grid (0 = unknown/impassable, 1 = confirmed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    left: f64,
    top: f64,
    step: f64,
    width: usize,
    height: usize,
    cells: Vec<f32>,
}

/// Lower edge of the cell containing `min`, origin-centered alignment
fn aligned_origin(min: f64, step: f64) -> f64 {
    ((min / step + 0.5).floor() - 0.5) * step
}

impl OccupancyGrid {
    /// Zero grid covering `bounds`.
    pub fn new(bounds: Rect2, step: f64) -> Result<Self> {
        if !(step.is_finite() && step > 0.0) {
            return Err(Error::InvalidGeometry(format!("step must be positive, got {}", step)));
        }
        if bounds.is_empty() || !bounds.width().is_finite() || !bounds.depth().is_finite() {
            return Err(Error::InvalidGeometry(format!("empty bounds {:?}", bounds)));
        }

        let left = aligned_origin(bounds.min_x, step);
        let top = aligned_origin(bounds.min_z, step);
        let width = ((bounds.max_x - left) / step).floor() as usize + 1;
        let height = ((bounds.max_z - top) / step).floor() as usize + 1;

        Ok(Self {
            left,
            top,
            step,
            width,
            height,
            cells: vec![0.0; width * height],
        })
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn left(&self) -> f64 {
        self.left
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.top
    }

    /// World-space rectangle covered by the grid
    pub fn bounds(&self) -> Rect2 {
        Rect2::new(
            self.left,
            self.top,
            self.left + self.width as f64 * self.step,
            self.top + self.height as f64 * self.step,
        )
    }

    /// Unbounded cell coordinates of a world position
    #[inline]
    pub fn cell_of(&self, x: f64, z: f64) -> (i64, i64) {
        (
            ((x - self.left) / self.step).floor() as i64,
            ((z - self.top) / self.step).floor() as i64,
        )
    }

    /// Cell containing `(x, z)`, or `None` outside the grid.
    pub fn xz_to_index(&self, x: f64, z: f64) -> Option<(usize, usize)> {
        let (col, row) = self.cell_of(x, z);
        self.in_bounds(col, row).then(|| (col as usize, row as usize))
    }

    /// World position of a cell center.
    #[inline]
    pub fn index_to_xz(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.left + (col as f64 + 0.5) * self.step,
            self.top + (row as f64 + 0.5) * self.step,
        )
    }

    #[inline]
    pub fn in_bounds(&self, col: i64, row: i64) -> bool {
        col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height
    }

    // ========================================================================
    // Cell access
    // ========================================================================

    #[inline]
    pub fn get(&self, col: usize, row: usize) -> f32 {
        self.cells[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, col: usize, row: usize, weight: f32) {
        self.cells[row * self.width + col] = weight;
    }

    /// Weight at a world position (`None` outside)
    pub fn value_at(&self, x: f64, z: f64) -> Option<f32> {
        self.xz_to_index(x, z).map(|(c, r)| self.get(c, r))
    }

    /// Raises a cell to at least `weight`; out-of-range cells are ignored.
    #[inline]
    pub fn raise(&mut self, col: i64, row: i64, weight: f32) {
        if self.in_bounds(col, row) {
            let cell = &mut self.cells[row as usize * self.width + col as usize];
            if weight > *cell {
                *cell = weight;
            }
        }
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    /// Number of cells with weight above `threshold`
    pub fn count_above(&self, threshold: f32) -> usize {
        self.cells.iter().filter(|&&w| w > threshold).count()
    }

    // ========================================================================
    // Alignment
    // ========================================================================

    fn check_step(&self, other: &OccupancyGrid) -> Result<()> {
        if (self.step - other.step).abs() > 1e-9 {
            return Err(Error::StepMismatch {
                expected: other.step,
                found: self.step,
            });
        }
        Ok(())
    }

    /// Copy of this grid re-framed onto `other`'s extents.
    ///
    /// Overlapping cells keep their weights; cells outside this grid are 0.
    pub fn resize_to(&self, other: &OccupancyGrid) -> Result<OccupancyGrid> {
        self.check_step(other)?;

        let mut out = OccupancyGrid {
            left: other.left,
            top: other.top,
            step: other.step,
            width: other.width,
            height: other.height,
            cells: vec![0.0; other.width * other.height],
        };

        let dc = ((self.left - other.left) / self.step).round() as i64;
        let dr = ((self.top - other.top) / self.step).round() as i64;

        for row in 0..self.height {
            let target_row = row as i64 + dr;
            if target_row < 0 || target_row >= out.height as i64 {
                continue;
            }
            let col_start = (-dc).max(0);
            let col_end = (self.width as i64).min(out.width as i64 - dc);
            if col_start >= col_end {
                continue;
            }
            let src = row * self.width;
            let dst = target_row as usize * out.width;
            let (cs, ce) = (col_start as usize, col_end as usize);
            let (ds, de) = ((col_start + dc) as usize, (col_end + dc) as usize);
            out.cells[dst + ds..dst + de].copy_from_slice(&self.cells[src + cs..src + ce]);
        }

        Ok(out)
    }

    /// Extends the grid so `(x, z)` lies at least `margin` inside it.
    ///
    /// Returns `true` when the grid was resized.
    pub fn grow_to_include(&mut self, x: f64, z: f64, margin: f64) -> Result<bool> {
        let bounds = self.bounds();
        if bounds.expanded(-margin).contains(x, z) {
            return Ok(false);
        }
        let mut wanted = bounds;
        wanted.include(x - margin, z - margin);
        wanted.include(x + margin, z + margin);
        let frame = OccupancyGrid::new(wanted, self.step)?;
        *self = self.resize_to(&frame)?;
        Ok(true)
    }

    /// Cell-wise `self - other`; both grids must share one frame.
    pub fn subtract(&self, other: &OccupancyGrid) -> Result<OccupancyGrid> {
        self.check_step(other)?;
        if self.width != other.width
            || self.height != other.height
            || (self.left - other.left).abs() > 1e-9
            || (self.top - other.top).abs() > 1e-9
        {
            return Err(Error::ShapeMismatch(format!(
                "{}x{} at ({}, {}) vs {}x{} at ({}, {})",
                self.width, self.height, self.left, self.top, other.width, other.height, other.left, other.top
            )));
        }

        let mut out = self.clone();
        for (a, b) in out.cells.iter_mut().zip(&other.cells) {
            *a -= *b;
        }
        Ok(out)
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Writes the grid as a JSON side-car (write-then-rename).
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Loads a grid written by [`OccupancyGrid::save_json`].
    pub fn load_json(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let grid: OccupancyGrid = serde_json::from_slice(&bytes)?;
        if grid.cells.len() != grid.width * grid.height {
            return Err(Error::ShapeMismatch(format!(
                "{} cells for {}x{}",
                grid.cells.len(),
                grid.width,
                grid.height
            )));
        }
        Ok(grid)
    }
}
