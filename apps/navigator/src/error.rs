// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the navigator.

use thiserror::Error;

/// Result type for navigator operations.
pub type Result<T> = std::result::Result<T, NavigatorError>;

/// Navigator error types.
#[derive(Debug, Error)]
pub enum NavigatorError {
    #[error("Invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("Scan error: {0}")]
    Scan(#[from] wayfinder_core::Error),

    #[error("Grid error: {0}")]
    Grid(#[from] wayfinder_grid::Error),

    #[error("Navigation error: {0}")]
    Mesh(#[from] wayfinder_navmesh::NavError),

    #[error("Floor plan error: {0}")]
    FloorPlan(#[from] wayfinder_floorplan::Error),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Join error")]
    Join(#[from] tokio::task::JoinError),

    #[error("Rebuild coordinator has shut down")]
    Shutdown,
}
