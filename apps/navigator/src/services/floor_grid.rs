// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-location floor grid fed by live device positions.

use std::path::Path;
use std::time::Instant;

use rustc_hash::FxHashMap;
use wayfinder_core::{Point3, Rect2};
use wayfinder_grid::OccupancyGrid;

use crate::config::NavigatorConfig;
use crate::error::Result;

/// What one [`FloorGrid::record`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    /// A segment (or the first point of a device) was drawn.
    pub drawn: bool,
    /// The grid was extended to fit the new position.
    pub grew: bool,
    /// The position lay outside `max_floor_extent` and was dropped.
    pub rejected: bool,
}

/// Floor grid plus the last position of every device
#[derive(Debug, Default)]
pub struct FloorGrid {
    grid: Option<OccupancyGrid>,
    last_positions: FxHashMap<String, Point3<f64>>,
    last_snapshot: Option<Instant>,
}

impl FloorGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> Option<&OccupancyGrid> {
        self.grid.as_ref()
    }

    pub fn last_positions(&self) -> impl Iterator<Item = (&str, &Point3<f64>)> {
        self.last_positions.iter().map(|(d, p)| (d.as_str(), p))
    }

    /// Loads the grid from its side-car, if the grid is not in memory yet.
    ///
    /// A side-car that fails to load, or was written with another step,
    /// is ignored.
    pub fn load(&mut self, json: &Path, step: f64) {
        if self.grid.is_some() || !json.exists() {
            return;
        }
        match OccupancyGrid::load_json(json) {
            Ok(grid) if (grid.step() - step).abs() < 1e-9 => {
                tracing::debug!(
                    path = %json.display(),
                    width = grid.width(),
                    height = grid.height(),
                    "Reloaded floor grid"
                );
                self.grid = Some(grid);
            }
            Ok(grid) => {
                tracing::warn!(path = %json.display(), step = grid.step(), "Ignoring floor grid with another step");
            }
            Err(e) => {
                tracing::warn!(path = %json.display(), error = %e, "Ignoring unreadable floor grid");
            }
        }
    }

    /// Draws the move of `device` to `position` into the grid.
    ///
    /// The grid is created with the default box on first use and grown
    /// when the position falls near or outside its edge. Moves longer than
    /// `max_segment` only update the device's last position. Positions
    /// beyond `max_floor_extent` are dropped without touching the grid.
    pub fn record(&mut self, device: &str, position: Point3<f64>, config: &NavigatorConfig) -> Result<RecordOutcome> {
        let limit = config.max_floor_extent;
        if !(position.x.abs() <= limit && position.z.abs() <= limit) {
            tracing::warn!(device, x = position.x, z = position.z, limit, "Position outside floor extent, dropped");
            return Ok(RecordOutcome {
                rejected: true,
                ..RecordOutcome::default()
            });
        }

        let step = config.grid_step;
        let spread = config.position_spread;
        let grid = match self.grid.as_mut() {
            Some(grid) => grid,
            None => self
                .grid
                .insert(OccupancyGrid::new(Rect2::centered(config.floor_extent), step)?),
        };

        let margin = step * (spread as f64 + 2.0);
        let grew = grid.grow_to_include(position.x, position.z, margin)?;

        let drawn = match self.last_positions.insert(device.to_string(), position) {
            Some(previous) => {
                let jump = (position.x - previous.x).hypot(position.z - previous.z);
                if jump <= config.max_segment {
                    grid.add_segment(&previous, &position, spread);
                    true
                } else {
                    tracing::debug!(device, jump, "Position jump too long, not drawn");
                    false
                }
            }
            None => {
                grid.add_segment(&position, &position, spread);
                true
            }
        };

        Ok(RecordOutcome {
            drawn,
            grew,
            rejected: false,
        })
    }

    /// A copy of the grid when a snapshot is due, marking it taken.
    pub fn take_snapshot(&mut self, now: Instant, config: &NavigatorConfig) -> Option<OccupancyGrid> {
        let due = self
            .last_snapshot
            .map_or(true, |last| now.duration_since(last) >= config.snapshot_interval);
        if !due {
            return None;
        }
        let grid = self.grid.clone()?;
        self.last_snapshot = Some(now);
        Some(grid)
    }
}

/// Writes the grid side-car and its diagnostic PNG.
pub fn persist(grid: &OccupancyGrid, json: &Path, png: &Path) -> Result<()> {
    grid.save_json(json)?;
    grid.save_png(png)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> NavigatorConfig {
        let mut config = NavigatorConfig::with_data_dir("unused");
        config.grid_step = 0.5;
        config.floor_extent = 5.0;
        config.position_spread = 0;
        config
    }

    #[test]
    fn first_position_creates_default_grid() {
        let config = config();
        let mut floor = FloorGrid::new();
        assert!(floor.grid().is_none());

        let outcome = floor.record("a", Point3::new(1.0, 1.6, 1.0), &config).unwrap();
        assert!(outcome.drawn);
        assert!(!outcome.grew);
        let grid = floor.grid().unwrap();
        assert_eq!(grid.value_at(1.0, 1.0), Some(1.0));
        assert!(grid.bounds().contains(-5.0, -5.0));
    }

    #[test]
    fn segments_are_per_device() {
        let config = config();
        let mut floor = FloorGrid::new();
        floor.record("a", Point3::new(0.0, 1.6, 0.0), &config).unwrap();
        floor.record("b", Point3::new(0.0, 1.6, 3.0), &config).unwrap();
        floor.record("a", Point3::new(2.0, 1.6, 0.0), &config).unwrap();

        let grid = floor.grid().unwrap();
        assert_eq!(grid.value_at(1.0, 0.0), Some(1.0));
        // No segment between the two devices
        assert_eq!(grid.value_at(0.0, 1.5), Some(0.0));
        assert_eq!(floor.last_positions().count(), 2);
    }

    #[test]
    fn long_jumps_are_not_drawn_and_far_points_grow_the_grid() {
        let config = config();
        let mut floor = FloorGrid::new();
        floor.record("a", Point3::new(0.0, 1.6, 0.0), &config).unwrap();
        let outcome = floor.record("a", Point3::new(12.0, 1.6, 0.0), &config).unwrap();
        assert!(!outcome.drawn);
        assert!(outcome.grew);

        let grid = floor.grid().unwrap();
        assert_eq!(grid.value_at(12.0, 0.0), Some(0.0));
        assert_eq!(grid.value_at(6.0, 0.0), Some(0.0));
        assert_eq!(grid.value_at(0.0, 0.0), Some(1.0));
    }

    #[test]
    fn outliers_beyond_the_extent_limit_are_dropped() {
        let mut config = config();
        config.max_floor_extent = 20.0;
        let mut floor = FloorGrid::new();
        floor.record("a", Point3::new(1.0, 1.6, 1.0), &config).unwrap();
        let (width, height) = {
            let grid = floor.grid().unwrap();
            (grid.width(), grid.height())
        };

        for outlier in [
            Point3::new(1e5, 1.6, 1e5),
            Point3::new(0.0, 1.6, -20.5),
            Point3::new(f64::NAN, 1.6, 0.0),
        ] {
            let outcome = floor.record("a", outlier, &config).unwrap();
            assert!(outcome.rejected);
            assert!(!outcome.drawn && !outcome.grew);
        }
        let grid = floor.grid().unwrap();
        assert_eq!((grid.width(), grid.height()), (width, height));
        // The last accepted position still anchors the next segment
        let outcome = floor.record("a", Point3::new(2.0, 1.6, 1.0), &config).unwrap();
        assert!(outcome.drawn);
        assert_eq!(grid_value(&floor, 1.5, 1.0), Some(1.0));

        // Up to the limit the grid still grows
        let outcome = floor.record("b", Point3::new(19.0, 1.6, 0.0), &config).unwrap();
        assert!(outcome.grew && !outcome.rejected);
    }

    fn grid_value(floor: &FloorGrid, x: f64, z: f64) -> Option<f32> {
        floor.grid().and_then(|g| g.value_at(x, z))
    }

    #[test]
    fn snapshots_are_rate_limited() {
        let config = config();
        let mut floor = FloorGrid::new();
        let t0 = Instant::now();
        assert!(floor.take_snapshot(t0, &config).is_none(), "nothing to save yet");

        floor.record("a", Point3::new(0.0, 1.6, 0.0), &config).unwrap();
        assert!(floor.take_snapshot(t0, &config).is_some());
        assert!(floor.take_snapshot(t0 + Duration::from_secs(10), &config).is_none());
        assert!(floor.take_snapshot(t0 + config.snapshot_interval, &config).is_some());
    }

    #[test]
    fn grid_reloads_from_side_car() {
        let dir = tempfile::tempdir().unwrap();
        let (json, png) = (dir.path().join("g.json"), dir.path().join("g.png"));
        let config = config();

        let mut floor = FloorGrid::new();
        floor.record("a", Point3::new(-1.0, 1.6, 2.0), &config).unwrap();
        persist(floor.grid().unwrap(), &json, &png).unwrap();
        assert!(png.exists());

        let mut reloaded = FloorGrid::new();
        reloaded.load(&json, config.grid_step);
        assert_eq!(reloaded.grid(), floor.grid());

        let mut other_step = FloorGrid::new();
        other_step.load(&json, 0.25);
        assert!(other_step.grid().is_none());
    }
}
