// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Records exchanged with callers and collaborators.

mod layer;
mod summary;

pub use layer::LayerGeometry;
pub use summary::{MeshStats, RebuildSummary};
