// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service modules for storage, rebuilding and routing.

pub mod catalog;
pub mod floor_grid;
pub mod navigator;
pub mod rebuild;
pub mod routing;
pub mod store;

pub use catalog::{FileCatalog, LayerCatalog, MemoryCatalog};
pub use floor_grid::FloorGrid;
pub use navigator::{Navigator, DEFAULT_LAYER};
pub use rebuild::{run_rebuild, RebuildInput, RebuildOutput};
pub use routing::{grid_route, wall_grid};
pub use store::SurfaceStore;
