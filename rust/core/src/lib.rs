// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Wayfinder Core
//!
//! Shared value types and input parsers for the Wayfinder navigation
//! engine.
//!
//! - **Value records**: [`Quat`], [`PositionSample`], [`Rect2`] plus
//!   conversion functions from loosely-typed JSON payloads
//! - **Scan parsing**: OBJ-subset surface scans built with
//!   [nom](https://docs.rs/nom), line splitting via
//!   [memchr](https://docs.rs/memchr) and float parsing via fast-float
//! - **Trace parsing**: CSV position traces
//!
//! ```rust,ignore
//! use wayfinder_core::parse_scan;
//!
//! let mesh = parse_scan(b"v 0 0 0\nv 1 0 0\nv 0 0 1\nf 1 3 2\n")?;
//! assert_eq!(mesh.face_count(), 1);
//! ```

pub mod error;
pub mod scan;
pub mod trace;
pub mod types;

pub use error::{Error, Result};
pub use nalgebra::{Point3, Vector3};
pub use scan::{parse_scan, read_scan, write_obj, Handedness, ScanMesh};
pub use trace::{format_sample, parse_sample, parse_trace};
pub use types::{quat_from_json, sample_from_json, vec3_from_json, PositionSample, Quat, Rect2};
