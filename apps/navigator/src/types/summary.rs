// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use wayfinder_core::Rect2;

/// Result of one completed map rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildSummary {
    /// Union of all layer boundaries, `None` while nothing was sliced.
    pub boundary: Option<Rect2>,
    /// Scan files re-sliced or dropped, summed over layers.
    pub changes: usize,
    /// Scan files that loaded as surface chunks.
    pub chunks: usize,
    /// Walkable faces after replaying stored traces.
    pub walkable_faces: usize,
    /// Wall-clock time of the rebuild (ms).
    pub elapsed_ms: u64,
}

/// Mesh engine counters for one location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub faces: usize,
    pub bodies: usize,
    pub visited: usize,
    pub touched: usize,
    pub walkable: usize,
    pub observed_transitions: usize,
    pub boundary_transitions: usize,
    pub inferred_transitions: usize,
}

impl From<wayfinder_navmesh::NavStats> for MeshStats {
    fn from(stats: wayfinder_navmesh::NavStats) -> Self {
        Self {
            faces: stats.faces,
            bodies: stats.bodies,
            visited: stats.visited,
            touched: stats.touched,
            walkable: stats.walkable,
            observed_transitions: stats.transitions.observed,
            boundary_transitions: stats.transitions.boundary,
            inferred_transitions: stats.transitions.inferred,
        }
    }
}
