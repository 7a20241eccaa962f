// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Triangle and plane primitives

use nalgebra::{Point3, Vector3};

/// Plane for slicing
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Point on the plane
    pub point: Point3<f64>,
    /// Normal vector (normalized)
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Create a new plane
    pub fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            point,
            normal: normal.normalize(),
        }
    }

    /// Horizontal plane at the given height (normal +Y)
    pub fn horizontal(height: f64) -> Self {
        Self {
            point: Point3::new(0.0, height, 0.0),
            normal: Vector3::y(),
        }
    }

    /// Signed distance from point to plane
    /// Positive = above/in front, Negative = below/behind
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.point).dot(&self.normal)
    }
}

/// Triangle with owned corners
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Unit normal following counter-clockwise winding; zero for degenerate triangles
    #[inline]
    pub fn normal(&self) -> Vector3<f64> {
        let n = (self.v1 - self.v0).cross(&(self.v2 - self.v0));
        let len = n.norm();
        if len > 1e-15 {
            n / len
        } else {
            Vector3::zeros()
        }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0)).norm() * 0.5
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Corners as an array
    #[inline]
    pub fn corners(&self) -> [Point3<f64>; 3] {
        [self.v0, self.v1, self.v2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ccw_floor_triangle_faces_up() {
        let t = Triangle::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 0.0),
        );
        assert_relative_eq!(t.normal(), Vector3::y(), epsilon = 1e-12);
        assert_relative_eq!(t.area(), 0.5);
        assert_relative_eq!(t.center().x, 1.0 / 3.0);
    }

    #[test]
    fn degenerate_triangle_has_zero_normal() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert_eq!(Triangle::new(p, p, p).normal(), Vector3::zeros());
    }

    #[test]
    fn horizontal_plane_distance() {
        let plane = Plane::horizontal(1.5);
        assert_relative_eq!(plane.signed_distance(&Point3::new(3.0, 2.0, -4.0)), 0.5);
        assert_relative_eq!(plane.signed_distance(&Point3::new(0.0, 1.0, 0.0)), -0.5);
    }
}
