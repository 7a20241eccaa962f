// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for floor-plan operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Slice cache error: {0}")]
    Cache(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Scan error: {0}")]
    Scan(#[from] wayfinder_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] wayfinder_geometry::Error),

    #[error("Nothing to render: {0}")]
    EmptyPlan(String),
}
