//! # Wayfinder Geometry
//!
//! Triangle-mesh primitives used by the navigation engine and the
//! floor-plan extractor.
//!
//! ## Overview
//!
//! - [`SurfaceMesh`]: indexed mesh with welded vertices and cached per-face
//!   normals/centers
//! - [`EdgeMap`]: edge→face incidence, face neighbourhoods, boundary edges
//! - [`RayCaster`]: Möller–Trumbore ray casting with a horizontal bin grid
//!   for the vertical rays navigation needs
//! - [`slice_faces`]: horizontal plane slicing into edge-keyed segments

pub mod adjacency;
pub mod error;
pub mod mesh;
pub mod primitives;
pub mod raycast;
pub mod slice;

pub use adjacency::{edge_key, face_edges, EdgeKey, EdgeMap};
pub use error::{Error, Result};
pub use mesh::{weld_vertices, SurfaceMesh, DEFAULT_WELD_TOLERANCE};
pub use nalgebra::{Point3, Vector3};
pub use primitives::{Plane, Triangle};
pub use raycast::{intersect_triangle, RayCaster, RayHit, DEFAULT_BIN_SIZE};
pub use slice::{slice_faces, SliceSegment};
