// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Navigator configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use wayfinder_floorplan::FloorPlanConfig;
use wayfinder_navmesh::NavMeshConfig;

/// Navigator configuration.
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    /// Root of the per-location data directories.
    pub data_dir: PathBuf,
    /// Maximum number of rebuilds running at once.
    pub workers: usize,
    /// Cell size of floor and wall grids, in meters.
    pub grid_step: f64,
    /// Half-width of the box a new floor grid starts with.
    pub floor_extent: f64,
    /// Positions farther than this from the origin (on X or Z) are dropped.
    pub max_floor_extent: f64,
    /// Uncertainty band (in cells) around recorded position segments.
    pub position_spread: usize,
    /// Minimum time between floor-grid snapshots on disk.
    pub snapshot_interval: Duration,
    /// Cutting height of the layer created for locations without one.
    pub cutting_height: f64,
    /// Position jumps longer than this are not drawn into the floor grid.
    pub max_segment: f64,
    /// Mesh engine tunables.
    pub navmesh: NavMeshConfig,
    /// Floor-plan rendering.
    pub floorplan: FloorPlanConfig,
}

/// Reads `key`, falling back to `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl NavigatorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("WAYFINDER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    std::env::current_dir()
                        .map(|dir| dir.join(".wayfinder"))
                        .unwrap_or_else(|_| PathBuf::from("./.wayfinder"))
                }),
            workers: env_or("WAYFINDER_WORKERS", num_cpus::get()).max(1),
            grid_step: env_or("WAYFINDER_GRID_STEP", 0.25),
            floor_extent: env_or("WAYFINDER_FLOOR_EXTENT", 25.0),
            max_floor_extent: env_or("WAYFINDER_MAX_FLOOR_EXTENT", 500.0),
            position_spread: env_or("WAYFINDER_POSITION_SPREAD", 1),
            snapshot_interval: Duration::from_secs(env_or("WAYFINDER_SNAPSHOT_INTERVAL_SECS", 60)),
            cutting_height: env_or("WAYFINDER_CUTTING_HEIGHT", 1.0),
            max_segment: env_or("WAYFINDER_MAX_SEGMENT", 5.0),
            navmesh: NavMeshConfig::default(),
            floorplan: FloorPlanConfig::default(),
        }
    }

    /// Defaults rooted at `data_dir`, ignoring the environment.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            workers: num_cpus::get().max(1),
            grid_step: 0.25,
            floor_extent: 25.0,
            max_floor_extent: 500.0,
            position_spread: 1,
            snapshot_interval: Duration::from_secs(60),
            cutting_height: 1.0,
            max_segment: 5.0,
            navmesh: NavMeshConfig::default(),
            floorplan: FloorPlanConfig::default(),
        }
    }
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
