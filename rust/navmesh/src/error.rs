// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use thiserror::Error;

/// Result type for navigation operations
pub type Result<T> = std::result::Result<T, NavError>;

/// Which query point a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => f.write_str("start"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

#[derive(Error, Debug)]
pub enum NavError {
    #[error("No surface below the {0} point")]
    NoFaceFound(Endpoint),

    #[error("No surface chunks to build from")]
    EmptySoup,

    #[error("Scan error: {0}")]
    Scan(#[from] wayfinder_core::Error),

    #[error("Geometry error: {0}")]
    Geometry(#[from] wayfinder_geometry::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chunk cache error: {0}")]
    Cache(#[from] serde_json::Error),
}
