// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use wayfinder_core::Rect2;

/// One floor-plan layer of a location.
///
/// The cutting height is owned by whoever created the layer; the navigator
/// only ever writes `boundary` and `ready`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGeometry {
    pub id: String,
    pub location: String,
    /// Slice height above the scan origin, in meters.
    pub cutting_height: f64,
    /// Extent of the extracted line art, once there is any.
    pub boundary: Option<Rect2>,
    /// Set once a rebuild has produced line art for this layer.
    pub ready: bool,
}

impl LayerGeometry {
    pub fn new(location: impl Into<String>, id: impl Into<String>, cutting_height: f64) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
            cutting_height,
            boundary: None,
            ready: false,
        }
    }
}
