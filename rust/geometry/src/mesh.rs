// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface mesh data structures

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;
use wayfinder_core::ScanMesh;

use crate::error::{Error, Result};
use crate::primitives::Triangle;

/// Default tolerance (meters) for merging coincident scan vertices
pub const DEFAULT_WELD_TOLERANCE: f64 = 1e-6;

/// Indexed triangle mesh with cached per-face normals and centers
#[derive(Debug, Clone, Default)]
pub struct SurfaceMesh {
    /// Vertex positions
    pub vertices: Vec<Point3<f64>>,
    /// Triangle indices (i0, i1, i2)
    pub faces: Vec<[u32; 3]>,
    normals: Vec<Vector3<f64>>,
    centers: Vec<Point3<f64>>,
}

impl SurfaceMesh {
    /// Create a mesh, validating indices and caching per-face data
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> Result<Self> {
        let vertex_count = vertices.len() as u32;
        if let Some(bad) = faces.iter().flatten().find(|&&i| i >= vertex_count) {
            return Err(Error::InvalidMesh(format!(
                "face index {} out of range ({} vertices)",
                bad, vertex_count
            )));
        }

        let mut mesh = Self {
            vertices,
            faces,
            normals: Vec::new(),
            centers: Vec::new(),
        };
        mesh.refresh_face_data();
        Ok(mesh)
    }

    /// Build from a parsed scan, welding coincident vertices first
    pub fn from_scan(scan: &ScanMesh, weld_tolerance: f64) -> Result<Self> {
        if scan.faces.is_empty() {
            return Err(Error::EmptyMesh("scan has no faces".into()));
        }
        let (vertices, faces) = weld_vertices(&scan.vertices, &scan.faces, weld_tolerance);
        if faces.is_empty() {
            return Err(Error::EmptyMesh("all faces degenerate after welding".into()));
        }
        Self::new(vertices, faces)
    }

    fn refresh_face_data(&mut self) {
        self.normals.clear();
        self.centers.clear();
        self.normals.reserve(self.faces.len());
        self.centers.reserve(self.faces.len());
        for f in 0..self.faces.len() {
            let tri = self.triangle(f);
            self.normals.push(tri.normal());
            self.centers.push(tri.center());
        }
    }

    /// Create empty mesh
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Corners of face `f`
    #[inline]
    pub fn triangle(&self, f: usize) -> Triangle {
        let [a, b, c] = self.faces[f];
        Triangle::new(
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        )
    }

    /// Unit normal of face `f`
    #[inline]
    pub fn normal(&self, f: usize) -> Vector3<f64> {
        self.normals[f]
    }

    /// Centroid of face `f`
    #[inline]
    pub fn center(&self, f: usize) -> Point3<f64> {
        self.centers[f]
    }

    /// Axis-aligned bounds (min, max); `None` for an empty mesh
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        let mut min = first;
        let mut max = first;
        for v in &self.vertices[1..] {
            min = min.inf(v);
            max = max.sup(v);
        }
        Some((min, max))
    }

    /// Merge another mesh into this one; returns the face offset of `other`
    pub fn merge(&mut self, other: &SurfaceMesh) -> usize {
        let vertex_offset = self.vertices.len() as u32;
        let face_offset = self.faces.len();

        self.vertices.extend_from_slice(&other.vertices);
        self.faces.extend(
            other
                .faces
                .iter()
                .map(|f| [f[0] + vertex_offset, f[1] + vertex_offset, f[2] + vertex_offset]),
        );
        self.normals.extend_from_slice(&other.normals);
        self.centers.extend_from_slice(&other.centers);
        face_offset
    }
}

/// Merge vertices closer than `tolerance`; faces that collapse are dropped.
///
/// Uses a grid hash with cell size = tolerance and a 3x3x3 neighborhood
/// search, so the first vertex inserted in a cluster wins.
pub fn weld_vertices(
    vertices: &[Point3<f64>],
    faces: &[[u32; 3]],
    tolerance: f64,
) -> (Vec<Point3<f64>>, Vec<[u32; 3]>) {
    let cell = tolerance.max(1e-12);
    let tol_sq = tolerance * tolerance;
    let key = |p: &Point3<f64>| {
        (
            (p.x / cell).floor() as i64,
            (p.y / cell).floor() as i64,
            (p.z / cell).floor() as i64,
        )
    };

    let mut grid: FxHashMap<(i64, i64, i64), Vec<u32>> = FxHashMap::default();
    let mut welded: Vec<Point3<f64>> = Vec::with_capacity(vertices.len());
    let mut remap: Vec<u32> = Vec::with_capacity(vertices.len());

    for v in vertices {
        let (cx, cy, cz) = key(v);
        let mut found = None;
        'search: for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(candidates) = grid.get(&(cx + dx, cy + dy, cz + dz)) {
                        for &idx in candidates {
                            if (welded[idx as usize] - v).norm_squared() <= tol_sq {
                                found = Some(idx);
                                break 'search;
                            }
                        }
                    }
                }
            }
        }

        let idx = match found {
            Some(idx) => idx,
            None => {
                let idx = welded.len() as u32;
                welded.push(*v);
                grid.entry((cx, cy, cz)).or_default().push(idx);
                idx
            }
        };
        remap.push(idx);
    }

    let faces = faces
        .iter()
        .map(|f| {
            [
                remap[f[0] as usize],
                remap[f[1] as usize],
                remap[f[2] as usize],
            ]
        })
        .filter(|[a, b, c]| a != b && b != c && a != c)
        .collect();

    (welded, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit square on y = 0 split into two up-facing triangles, unshared corners
    fn split_square() -> ScanMesh {
        ScanMesh {
            vertices: vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 0.0),
            ],
            faces: vec![[0, 1, 2], [3, 4, 5]],
            ..Default::default()
        }
    }

    #[test]
    fn welding_merges_duplicates() {
        let mesh = SurfaceMesh::from_scan(&split_square(), DEFAULT_WELD_TOLERANCE).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn face_data_is_cached() {
        let mesh = SurfaceMesh::from_scan(&split_square(), DEFAULT_WELD_TOLERANCE).unwrap();
        assert_relative_eq!(mesh.normal(0), Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(mesh.normal(1), Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(mesh.center(0).z, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_scan_is_rejected() {
        let err = SurfaceMesh::from_scan(&ScanMesh::default(), DEFAULT_WELD_TOLERANCE);
        assert!(matches!(err, Err(Error::EmptyMesh(_))));
    }

    #[test]
    fn out_of_range_faces_are_rejected() {
        let err = SurfaceMesh::new(vec![Point3::origin()], vec![[0, 1, 2]]);
        assert!(matches!(err, Err(Error::InvalidMesh(_))));
    }

    #[test]
    fn merge_offsets_indices() {
        let a = SurfaceMesh::from_scan(&split_square(), DEFAULT_WELD_TOLERANCE).unwrap();
        let mut combined = a.clone();
        let offset = combined.merge(&a);
        assert_eq!(offset, 2);
        assert_eq!(combined.face_count(), 4);
        assert_eq!(combined.faces[2], [4, 5, 6]);
        assert_relative_eq!(combined.normal(3), Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let mesh = SurfaceMesh::from_scan(&split_square(), DEFAULT_WELD_TOLERANCE).unwrap();
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(1.0, 0.0, 1.0));
        assert!(SurfaceMesh::empty().bounds().is_none());
    }
}
