// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Wayfinder NavMesh
//!
//! Walkable-surface inference over raw surface scans.
//!
//! Each scan file becomes a [`SurfaceChunk`]; all chunks of a location are
//! merged into a [`CombinedSoup`]. A [`MeshNavEngine`] over that soup
//! learns from position traces which faces people actually walk on,
//! stitches separate chunks together where traces cross between them, and
//! answers shortest-path queries.
//!
//! ```rust,ignore
//! use wayfinder_navmesh::{load_chunks, MeshNavEngine, NavMeshConfig};
//!
//! let config = NavMeshConfig::default();
//! let chunks = load_chunks(&scan_paths, &config);
//! let mut engine = MeshNavEngine::build(&chunks, config)?;
//! engine.add_trace(&trace, true);
//! engine.infer_walkable();
//! let path = engine.find_path(&start, &target)?;
//! ```

pub mod chunk;
pub mod config;
pub mod engine;
pub mod error;
pub mod navigation_mesh;
pub mod soup;
pub mod transitions;

pub use chunk::{load_chunks, SurfaceChunk};
pub use config::NavMeshConfig;
pub use engine::{FaceSet, MeshNavEngine, NavStats, TraceReport};
pub use error::{Endpoint, NavError, Result};
pub use navigation_mesh::NavigationMesh;
pub use soup::CombinedSoup;
pub use transitions::{TagCounts, TransitionGraph, TransitionTag};
