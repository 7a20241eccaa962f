// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge-to-face incidence and face neighbourhoods.
//!
//! Two faces are neighbours when they share an undirected mesh edge,
//! i.e. the same pair of (welded) vertex indices.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Undirected mesh edge: vertex indices with `0 <= 1`
pub type EdgeKey = (u32, u32);

/// Canonical key for the edge between two vertices.
#[inline]
pub fn edge_key(a: u32, b: u32) -> EdgeKey {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// The three edges of a triangle, in winding order.
#[inline]
pub fn face_edges(face: &[u32; 3]) -> [EdgeKey; 3] {
    [
        edge_key(face[0], face[1]),
        edge_key(face[1], face[2]),
        edge_key(face[2], face[0]),
    ]
}

/// Incidence from each edge to the faces that use it
#[derive(Debug, Clone, Default)]
pub struct EdgeMap {
    edges: FxHashMap<EdgeKey, SmallVec<[u32; 2]>>,
}

impl EdgeMap {
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let mut edges: FxHashMap<EdgeKey, SmallVec<[u32; 2]>> = FxHashMap::default();
        edges.reserve(faces.len() * 3 / 2);
        for (f, face) in faces.iter().enumerate() {
            for key in face_edges(face) {
                edges.entry(key).or_default().push(f as u32);
            }
        }
        Self { edges }
    }

    /// Faces incident to an edge (empty for unknown edges)
    pub fn faces_on(&self, key: EdgeKey) -> &[u32] {
        self.edges.get(&key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges used by exactly one face
    pub fn boundary_edges(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        self.edges
            .iter()
            .filter(|(_, faces)| faces.len() == 1)
            .map(|(&key, _)| key)
    }

    /// Neighbour lists per face, deduplicated, in edge order
    pub fn face_neighbors(&self, faces: &[[u32; 3]]) -> Vec<SmallVec<[u32; 3]>> {
        faces
            .iter()
            .enumerate()
            .map(|(f, face)| {
                let mut out: SmallVec<[u32; 3]> = SmallVec::new();
                for key in face_edges(face) {
                    for &other in self.faces_on(key) {
                        if other != f as u32 && !out.contains(&other) {
                            out.push(other);
                        }
                    }
                }
                out
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0---1---2
    // | \ | \ |
    // 3---4---5
    fn strip() -> Vec<[u32; 3]> {
        vec![[0, 4, 1], [0, 3, 4], [1, 5, 2], [1, 4, 5]]
    }

    #[test]
    fn edge_key_is_symmetric() {
        assert_eq!(edge_key(7, 3), edge_key(3, 7));
    }

    #[test]
    fn shared_edges_link_faces() {
        let faces = strip();
        let map = EdgeMap::build(&faces);
        assert_eq!(map.faces_on(edge_key(0, 4)).len(), 2);
        assert_eq!(map.faces_on(edge_key(1, 4)).len(), 2);
        assert!(map.faces_on(edge_key(0, 5)).is_empty());

        let neighbors = map.face_neighbors(&faces);
        assert_eq!(neighbors[0].as_slice(), &[1, 3]);
        assert_eq!(neighbors[2].as_slice(), &[3]);
    }

    #[test]
    fn boundary_edges_of_strip() {
        let map = EdgeMap::build(&strip());
        // 9 edges total, 3 interior
        assert_eq!(map.edge_count(), 9);
        assert_eq!(map.boundary_edges().count(), 6);
    }
}
