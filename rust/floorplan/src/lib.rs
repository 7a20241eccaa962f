// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor-plan line art from surface scans
//!
//! This crate provides the map-generation half of the engine:
//! 1. Slicing scan meshes with a horizontal plane into wall polylines
//! 2. Keeping a per-layer side-file cache so only new or modified scans
//!    are re-sliced
//! 3. Rendering the result as static SVG and PNG previews
//!
//! # Usage
//!
//! ```rust,ignore
//! use wayfinder_floorplan::{render_svg, FloorPlanConfig, FloorPlanExtractor};
//!
//! let extractor = FloorPlanExtractor::new(cache_dir.join("layer-1.json"));
//! let summary = extractor.update(&scan_files, 1.0)?;
//! let svg = render_svg(&summary.polylines, summary.boundary, &[], &FloorPlanConfig::default());
//! ```

pub mod cache;
pub mod error;
pub mod extractor;
pub mod raster;
pub mod slicer;
pub mod svg_render;
pub mod types;

pub use cache::{cache_key, FloorPlanCache};
pub use error::{Error, Result};
pub use extractor::{slice_file, ExtractionSummary, FloorPlanExtractor};
pub use raster::{render_preview, save_preview};
pub use slicer::slice_mesh;
pub use svg_render::{render_svg, write_svg};
pub use types::{polyline_bounds, FloorPlanConfig, Marker, PlanFrame, Polyline};
