// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for grid operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by occupancy-grid construction, alignment and persistence
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid grid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Grid step mismatch: expected {expected}, found {found}")]
    StepMismatch { expected: f64, found: f64 },

    #[error("Grid shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Grid cache error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
