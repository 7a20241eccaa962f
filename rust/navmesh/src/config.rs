// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use wayfinder_geometry::{Vector3, DEFAULT_BIN_SIZE};

/// Engine tunables (meters unless noted)
#[derive(Debug, Clone, PartialEq)]
pub struct NavMeshConfig {
    /// Minimum Y component of a walkable face's unit normal (0.8 ≈ 37°)
    pub min_walkable_normal_y: f64,
    /// Free height required above a walkable face
    pub min_clearance: f64,
    /// Consecutive trace hits farther apart than this are not connected
    pub max_connection_distance: f64,
    /// Radius of the downward probe ring around trace points
    pub probe_radius: f64,
    /// Number of rays in the probe ring
    pub probe_rays: usize,
    /// Ray origins are lifted by this much above the query point
    pub ray_origin_lift: f64,
    /// Horizontal bin size of the ray caster
    pub bin_size: f64,
    /// Sample spacing of line-of-sight checks when smoothing paths
    pub los_step: f64,
}

impl Default for NavMeshConfig {
    fn default() -> Self {
        Self {
            min_walkable_normal_y: 0.8,
            min_clearance: 1.8,
            max_connection_distance: 1.0,
            probe_radius: 0.3,
            probe_rays: 8,
            ray_origin_lift: 0.1,
            bin_size: DEFAULT_BIN_SIZE,
            los_step: 0.1,
        }
    }
}

impl NavMeshConfig {
    /// Slope test on a unit face normal
    #[inline]
    pub fn slope_ok(&self, normal: &Vector3<f64>) -> bool {
        normal.y >= self.min_walkable_normal_y
    }

    /// Vertical lift applied to ray origins
    #[inline]
    pub fn lift(&self) -> Vector3<f64> {
        Vector3::new(0.0, self.ray_origin_lift, 0.0)
    }
}
