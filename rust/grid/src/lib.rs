// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Wayfinder Grid
//!
//! Occupancy-grid path finding for locations that have position traces
//! and floor-plan walls but no usable surface scans.
//!
//! - [`OccupancyGrid`]: origin-centered dense grid with `resize_to`,
//!   `subtract` and JSON side-car persistence
//! - segment rasterization with a tent-weighted uncertainty band
//!   ([`OccupancyGrid::add_segment`])
//! - 8-connected A* without corner cutting ([`OccupancyGrid::a_star`]) and
//!   Douglas-Peucker simplification ([`simplify`])
//! - [`GridKind`] presets for floor, wall and combined grids
//!
//! ```rust,ignore
//! use wayfinder_grid::{GridKind, OccupancyGrid};
//!
//! let mut floor = OccupancyGrid::new(Rect2::centered(25.0), 0.25)?;
//! floor.add_segment(&a, &b, 1);
//! let path = floor.find_path(&a, &b, GridKind::Floor, 0.25);
//! ```

pub mod astar;
pub mod error;
pub mod grid;
pub mod raster;
pub mod render;
pub mod simplify;

pub use astar::GridKind;
pub use error::{Error, Result};
pub use grid::OccupancyGrid;
pub use simplify::simplify;
