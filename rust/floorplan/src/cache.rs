// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-layer slice cache.
//!
//! One JSON side file per floor-plan layer records, for every scan file,
//! the modification time it was sliced at and the polylines it produced.
//! Deleting the file only forces a full re-slice.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::types::Polyline;

/// Slices of one scan file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSlices {
    pub mtime_ns: u128,
    pub polylines: Vec<Polyline>,
}

/// Side file contents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorPlanCache {
    pub cutting_height: f64,
    /// Keyed by scan path (lossy UTF-8)
    pub files: BTreeMap<String, CachedSlices>,
}

impl FloorPlanCache {
    pub fn new(cutting_height: f64) -> Self {
        Self {
            cutting_height,
            files: BTreeMap::new(),
        }
    }

    /// Loads the cache; a missing or unreadable file yields `None`.
    pub fn load(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt slice cache");
                None
            }
        }
    }

    /// Writes the cache (write-then-rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(self)?)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), files = self.files.len(), "Saved slice cache");
        Ok(())
    }

    /// All cached polylines, in path order
    pub fn polylines(&self) -> impl Iterator<Item = &Polyline> {
        self.files.values().flat_map(|f| f.polylines.iter())
    }
}

/// Stable file stem for a (location, layer) side file.
pub fn cache_key(location: &str, layer: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(location.as_bytes());
    hasher.update([0u8]);
    hasher.update(layer.as_bytes());
    hex::encode(&hasher.finalize()[..12])
}

/// Modification time in nanoseconds since the epoch.
pub fn modified_ns(path: &Path) -> std::io::Result<u128> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0))
}
