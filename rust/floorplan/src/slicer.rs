// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh slicing into wall polylines.
//!
//! Slice segments are joined through the mesh edges they cross: every
//! crossed edge becomes a graph node (placed at its crossing point) and
//! every segment an edge between two such nodes. On a manifold scan each
//! connected component is a chain or a loop; its diameter walk is emitted
//! as one polyline.

use rustc_hash::FxHashMap;
use wayfinder_geometry::{slice_faces, EdgeKey, SurfaceMesh};
use wayfinder_graph::Graph;

use crate::types::Polyline;

/// Polylines where the plane `y = height` cuts `mesh`.
pub fn slice_mesh(mesh: &SurfaceMesh, height: f64) -> Vec<Polyline> {
    let segments = slice_faces(mesh, height);
    if segments.is_empty() {
        return Vec::new();
    }

    let mut node_of: FxHashMap<EdgeKey, usize> = FxHashMap::default();
    let mut positions: Vec<[f64; 2]> = Vec::new();
    let mut graph = Graph::new();

    let mut node = |key: EdgeKey, point: [f64; 2], graph: &mut Graph| -> usize {
        *node_of.entry(key).or_insert_with(|| {
            positions.push(point);
            graph.add_node()
        })
    };

    for segment in &segments {
        let a = node(segment.edges[0], segment.points[0], &mut graph);
        let b = node(segment.edges[1], segment.points[1], &mut graph);
        if a != b {
            graph.add_edge(a, b, 1.0);
        }
    }

    graph
        .connected_components()
        .into_iter()
        .filter(|component| component.len() >= 2)
        .map(|component| {
            let walk = graph.diameter_path(component[0]);
            Polyline::new(walk.into_iter().map(|n| positions[n]).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wayfinder_geometry::Point3;

    /// Open box: four 2 m tall walls around [0,4]x[0,3], no floor
    fn four_walls() -> SurfaceMesh {
        let corners = [[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 3.0]];
        let mut vertices = Vec::new();
        for c in corners {
            vertices.push(Point3::new(c[0], 0.0, c[1]));
            vertices.push(Point3::new(c[0], 2.0, c[1]));
        }
        let mut faces = Vec::new();
        for i in 0..4u32 {
            let j = (i + 1) % 4;
            let (b0, t0, b1, t1) = (2 * i, 2 * i + 1, 2 * j, 2 * j + 1);
            faces.push([b0, b1, t1]);
            faces.push([b0, t1, t0]);
        }
        SurfaceMesh::new(vertices, faces).unwrap()
    }

    #[test]
    fn single_wall_is_one_polyline() {
        let mesh = SurfaceMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(3.0, 2.5, 0.0),
                Point3::new(0.0, 2.5, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();
        let lines = slice_mesh(&mesh, 1.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 3);
        assert_relative_eq!(lines[0].length(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn closed_room_walks_nearly_all_of_the_loop() {
        let lines = slice_mesh(&four_walls(), 1.0);
        assert_eq!(lines.len(), 1);
        // A loop's diameter walk covers half the cycle by hops
        assert!(lines[0].len() >= 5);
        assert!(lines[0].length() > 5.0);
    }

    #[test]
    fn separate_walls_give_separate_polylines() {
        let mut mesh = four_walls();
        let other = SurfaceMesh::new(
            vec![
                Point3::new(10.0, 0.0, 0.0),
                Point3::new(12.0, 0.0, 0.0),
                Point3::new(12.0, 2.0, 0.0),
                Point3::new(10.0, 2.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap();
        mesh.merge(&other);
        assert_eq!(slice_mesh(&mesh, 1.0).len(), 2);
    }

    #[test]
    fn plane_above_geometry_is_empty() {
        assert!(slice_mesh(&four_walls(), 5.0).is_empty());
    }
}
