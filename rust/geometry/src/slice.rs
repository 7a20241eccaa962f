// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Horizontal plane slicing.
//!
//! A triangle whose corners straddle the plane has exactly two crossing
//! edges and contributes one segment. Each segment remembers which mesh
//! edges it joins, so neighbouring triangles produce segments that meet at
//! a shared edge key and can be chained into polylines.

use nalgebra::Point3;

use crate::adjacency::{edge_key, EdgeKey};
use crate::mesh::SurfaceMesh;
use crate::primitives::Plane;

/// Cut segment on the horizontal plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceSegment {
    /// Mesh edges crossed at each end
    pub edges: [EdgeKey; 2],
    /// Crossing points as (x, z)
    pub points: [[f64; 2]; 2],
}

/// Slices every face of `mesh` with the plane `y = height`.
///
/// Corners lying exactly on the plane count as above it, so a plane
/// through a vertex never yields one-ended segments.
pub fn slice_faces(mesh: &SurfaceMesh, height: f64) -> Vec<SliceSegment> {
    let plane = Plane::horizontal(height);
    let mut segments = Vec::new();

    for face in &mesh.faces {
        let corners: [Point3<f64>; 3] = [
            mesh.vertices[face[0] as usize],
            mesh.vertices[face[1] as usize],
            mesh.vertices[face[2] as usize],
        ];
        let dist = corners.map(|p| plane.signed_distance(&p));

        let mut hits: [([f64; 2], EdgeKey); 2] = [([0.0; 2], (0, 0)); 2];
        let mut count = 0;
        for (i, j) in [(0usize, 1usize), (1, 2), (2, 0)] {
            let (da, db) = (dist[i], dist[j]);
            if (da >= 0.0) == (db >= 0.0) {
                continue;
            }
            let t = da / (da - db);
            let p = corners[i] + (corners[j] - corners[i]) * t;
            if count < 2 {
                hits[count] = ([p.x, p.z], edge_key(face[i], face[j]));
            }
            count += 1;
        }

        if count == 2 {
            segments.push(SliceSegment {
                edges: [hits[0].1, hits[1].1],
                points: [hits[0].0, hits[1].0],
            });
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Vertical wall quad in the x = 0 plane, 2 m wide (z) and 2 m tall
    fn wall() -> SurfaceMesh {
        SurfaceMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 2.0),
                Point3::new(0.0, 2.0, 2.0),
                Point3::new(0.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn wall_slices_into_connected_segments() {
        let segments = slice_faces(&wall(), 1.0);
        assert_eq!(segments.len(), 2);

        // Both segments meet at the diagonal edge (0, 2)
        let diagonal = edge_key(0, 2);
        assert!(segments.iter().all(|s| s.edges.contains(&diagonal)));

        let zs: Vec<f64> = segments
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p[1]))
            .collect();
        assert_relative_eq!(zs.iter().cloned().fold(f64::INFINITY, f64::min), 0.0);
        assert_relative_eq!(zs.iter().cloned().fold(f64::NEG_INFINITY, f64::max), 2.0);
    }

    #[test]
    fn floor_is_never_cut() {
        let floor = SurfaceMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 0.0),
            ],
            vec![[0, 1, 2]],
        )
        .unwrap();
        assert!(slice_faces(&floor, 1.0).is_empty());
        // A plane exactly through the floor treats it as above
        assert!(slice_faces(&floor, 0.0).is_empty());
    }

    #[test]
    fn plane_above_wall_yields_nothing() {
        assert!(slice_faces(&wall(), 3.0).is_empty());
    }
}
