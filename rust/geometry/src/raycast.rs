// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ray casting against surface meshes.
//!
//! Navigation only ever casts straight up or straight down, so faces are
//! binned by their horizontal (X/Z) footprint and a vertical ray only tests
//! the faces in its bin. Arbitrary directions fall back to a linear scan.

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashMap;

use crate::mesh::SurfaceMesh;
use crate::primitives::Triangle;

/// Default horizontal bin size in meters
pub const DEFAULT_BIN_SIZE: f64 = 0.5;

/// Barycentric slack so rays along a shared edge hit at least one face
const EDGE_TOLERANCE: f64 = 1e-9;

/// Upper bound on bins a single face may occupy; larger faces go to the overflow list
const MAX_BINS_PER_FACE: i64 = 4096;

/// Closest intersection along a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub face: usize,
    /// Distance along the (unit) ray direction
    pub distance: f64,
    pub point: Point3<f64>,
}

/// Möller–Trumbore intersection; returns the ray parameter `t > 0`.
pub fn intersect_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    tri: &Triangle,
) -> Option<f64> {
    let edge1 = tri.v1 - tri.v0;
    let edge2 = tri.v2 - tri.v0;

    let h = dir.cross(&edge2);
    let a = edge1.dot(&h);

    if a.abs() < 1e-12 {
        return None; // ray parallel to triangle
    }

    let f = 1.0 / a;
    let s = origin - tri.v0;
    let u = f * s.dot(&h);

    if !(-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * dir.dot(&q);

    if v < -EDGE_TOLERANCE || u + v > 1.0 + EDGE_TOLERANCE {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > 1e-12).then_some(t)
}

/// Vertical-ray accelerator over one mesh
#[derive(Debug, Clone, Default)]
pub struct RayCaster {
    bin_size: f64,
    bins: FxHashMap<(i64, i64), Vec<u32>>,
    /// Faces whose footprint is too large to bin
    overflow: Vec<u32>,
}

impl RayCaster {
    /// Bins every face of `mesh` by its X/Z bounding box.
    pub fn build(mesh: &SurfaceMesh, bin_size: f64) -> Self {
        let bin_size = if bin_size > 0.0 { bin_size } else { DEFAULT_BIN_SIZE };
        let mut bins: FxHashMap<(i64, i64), Vec<u32>> = FxHashMap::default();
        let mut overflow = Vec::new();

        for f in 0..mesh.face_count() {
            let [a, b, c] = mesh.triangle(f).corners();
            let min_x = a.x.min(b.x).min(c.x);
            let max_x = a.x.max(b.x).max(c.x);
            let min_z = a.z.min(b.z).min(c.z);
            let max_z = a.z.max(b.z).max(c.z);

            let (x0, x1) = ((min_x / bin_size).floor() as i64, (max_x / bin_size).floor() as i64);
            let (z0, z1) = ((min_z / bin_size).floor() as i64, (max_z / bin_size).floor() as i64);
            if (x1 - x0 + 1) * (z1 - z0 + 1) > MAX_BINS_PER_FACE {
                overflow.push(f as u32);
                continue;
            }
            for bx in x0..=x1 {
                for bz in z0..=z1 {
                    bins.entry((bx, bz)).or_default().push(f as u32);
                }
            }
        }

        Self {
            bin_size,
            bins,
            overflow,
        }
    }

    fn candidates(&self, x: f64, z: f64) -> impl Iterator<Item = u32> + '_ {
        let key = (
            (x / self.bin_size).floor() as i64,
            (z / self.bin_size).floor() as i64,
        );
        self.bins
            .get(&key)
            .into_iter()
            .flatten()
            .chain(self.overflow.iter())
            .copied()
    }

    /// First face hit straight below `origin`.
    pub fn cast_down(&self, mesh: &SurfaceMesh, origin: &Point3<f64>) -> Option<RayHit> {
        self.cast_vertical(mesh, origin, -Vector3::y())
    }

    /// First face hit straight above `origin`.
    pub fn cast_up(&self, mesh: &SurfaceMesh, origin: &Point3<f64>) -> Option<RayHit> {
        self.cast_vertical(mesh, origin, Vector3::y())
    }

    fn cast_vertical(
        &self,
        mesh: &SurfaceMesh,
        origin: &Point3<f64>,
        dir: Vector3<f64>,
    ) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for f in self.candidates(origin.x, origin.z) {
            let f = f as usize;
            if let Some(t) = intersect_triangle(origin, &dir, &mesh.triangle(f)) {
                if best.map_or(true, |b| t < b.distance) {
                    best = Some(RayHit {
                        face: f,
                        distance: t,
                        point: origin + dir * t,
                    });
                }
            }
        }
        best
    }

    /// Closest hit along an arbitrary direction (linear scan unless vertical).
    pub fn cast(
        &self,
        mesh: &SurfaceMesh,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize(1e-15)?;
        if dir.x.abs() < 1e-12 && dir.z.abs() < 1e-12 {
            return self.cast_vertical(mesh, origin, dir);
        }

        let mut best: Option<RayHit> = None;
        for f in 0..mesh.face_count() {
            if let Some(t) = intersect_triangle(origin, &dir, &mesh.triangle(f)) {
                if best.map_or(true, |b| t < b.distance) {
                    best = Some(RayHit {
                        face: f,
                        distance: t,
                        point: origin + dir * t,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Floor square at y=0 and a ceiling square at y=2, both 2x2 meters
    fn floor_and_ceiling() -> SurfaceMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(2.0, 0.0, 2.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 2.0),
            Point3::new(2.0, 2.0, 2.0),
            Point3::new(2.0, 2.0, 0.0),
        ];
        let faces = vec![[0, 1, 2], [0, 2, 3], [4, 6, 5], [4, 7, 6]];
        SurfaceMesh::new(vertices, faces).unwrap()
    }

    #[test]
    fn moller_trumbore_hits_and_misses() {
        let tri = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 0.0),
        );
        let down = -Vector3::y();
        let t = intersect_triangle(&Point3::new(0.2, 1.5, 0.2), &down, &tri).unwrap();
        assert_relative_eq!(t, 1.5);
        assert!(intersect_triangle(&Point3::new(0.9, 1.5, 0.9), &down, &tri).is_none());
        // Behind the origin
        assert!(intersect_triangle(&Point3::new(0.2, -1.0, 0.2), &down, &tri).is_none());
        // Parallel
        assert!(intersect_triangle(&Point3::new(0.2, 0.0, -1.0), &Vector3::z(), &tri).is_none());
    }

    #[test]
    fn cast_down_finds_floor_below_ceiling() {
        let mesh = floor_and_ceiling();
        let caster = RayCaster::build(&mesh, 0.5);

        let hit = caster.cast_down(&mesh, &Point3::new(1.5, 1.0, 0.5)).unwrap();
        assert!(hit.face < 2);
        assert_relative_eq!(hit.distance, 1.0);
        assert_relative_eq!(hit.point.y, 0.0);

        let up = caster.cast_up(&mesh, &Point3::new(1.5, 1.0, 0.5)).unwrap();
        assert!(up.face >= 2);
        assert_relative_eq!(up.distance, 1.0);
    }

    #[test]
    fn cast_outside_footprint_misses() {
        let mesh = floor_and_ceiling();
        let caster = RayCaster::build(&mesh, 0.5);
        assert!(caster.cast_down(&mesh, &Point3::new(5.0, 1.0, 5.0)).is_none());
    }

    #[test]
    fn general_cast_matches_vertical_cast() {
        let mesh = floor_and_ceiling();
        let caster = RayCaster::build(&mesh, 0.5);
        let origin = Point3::new(0.3, 1.0, 1.7);
        let a = caster.cast(&mesh, &origin, &Vector3::new(0.0, -3.0, 0.0)).unwrap();
        let b = caster.cast_down(&mesh, &origin).unwrap();
        assert_eq!(a.face, b.face);

        let slanted = caster
            .cast(&mesh, &origin, &Vector3::new(0.5, -1.0, 0.0))
            .unwrap();
        assert!(slanted.face < 2);
        assert_relative_eq!(slanted.point.x, 0.8, epsilon = 1e-9);
    }
}
