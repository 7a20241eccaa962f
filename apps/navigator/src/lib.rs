// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Wayfinder Navigator
//!
//! Answers `find_path(location, start, end)` with the best data a location
//! has: a mesh engine learned from surface scans and traces, else wall and
//! floor occupancy grids, else the straight line. Also keeps floor plans
//! and floor grids up to date as scans and positions arrive.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wayfinder_navigator::{MemoryCatalog, Navigator, NavigatorConfig};
//!
//! let navigator = Navigator::new(NavigatorConfig::from_env(), Arc::new(MemoryCatalog::new()));
//! navigator.ingest_surface("lab", "scan-1", obj_bytes).await?;
//! navigator.ingest_trace("lab", "phone", &samples).await?;
//! let path = navigator.find_path("lab", start, end);
//! ```

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::NavigatorConfig;
pub use error::{NavigatorError, Result};
pub use services::{FileCatalog, LayerCatalog, MemoryCatalog, Navigator, SurfaceStore};
pub use types::{LayerGeometry, MeshStats, RebuildSummary};
