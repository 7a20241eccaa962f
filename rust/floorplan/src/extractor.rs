// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Incremental floor-plan extraction over a set of scan files

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use wayfinder_core::{read_scan, Rect2};
use wayfinder_geometry::{SurfaceMesh, DEFAULT_WELD_TOLERANCE};

use crate::cache::{modified_ns, CachedSlices, FloorPlanCache};
use crate::error::Result;
use crate::slicer::slice_mesh;
use crate::types::{polyline_bounds, Polyline};

/// Outcome of one [`FloorPlanExtractor::update`] call
#[derive(Debug, Clone, Default)]
pub struct ExtractionSummary {
    /// Files re-sliced plus files dropped from the cache
    pub changes: usize,
    /// Bounds of all polylines, `None` when there are none
    pub boundary: Option<Rect2>,
    pub polylines: Vec<Polyline>,
}

/// Slices one scan file at `height`.
pub fn slice_file(path: &Path, height: f64) -> Result<Vec<Polyline>> {
    let scan = read_scan(path)?;
    let mesh = SurfaceMesh::from_scan(&scan, DEFAULT_WELD_TOLERANCE)?;
    Ok(slice_mesh(&mesh, height))
}

/// Keeps one layer's slice cache in step with its scan files
#[derive(Debug, Clone)]
pub struct FloorPlanExtractor {
    cache_path: PathBuf,
}

impl FloorPlanExtractor {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Re-slices new or modified files, forgets deleted ones and returns
    /// the merged line art.
    ///
    /// A changed `cutting_height` invalidates every cached entry. Files
    /// that fail to parse are logged and cached with no polylines so an
    /// unchanged bad file does not count as a change on the next call.
    pub fn update(&self, files: &[PathBuf], cutting_height: f64) -> Result<ExtractionSummary> {
        let started = Instant::now();
        let mut cache = match FloorPlanCache::load(&self.cache_path) {
            Some(cache) if (cache.cutting_height - cutting_height).abs() < 1e-9 => cache,
            Some(cache) => {
                tracing::info!(
                    old = cache.cutting_height,
                    new = cutting_height,
                    "Cutting height changed, rebuilding floor plan"
                );
                FloorPlanCache::new(cutting_height)
            }
            None => FloorPlanCache::new(cutting_height),
        };
        let mut dirty = !self.cache_path.exists();

        let wanted: BTreeSet<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();

        let before = cache.files.len();
        cache.files.retain(|key, _| wanted.contains(key));
        let mut changes = before - cache.files.len();

        let stale: Vec<(String, u128)> = wanted
            .iter()
            .filter_map(|key| match modified_ns(Path::new(key)) {
                Ok(mtime) => match cache.files.get(key) {
                    Some(entry) if entry.mtime_ns >= mtime => None,
                    _ => Some((key.clone(), mtime)),
                },
                Err(e) => {
                    tracing::warn!(path = %key, error = %e, "Scan file unreadable, skipping");
                    None
                }
            })
            .collect();

        let sliced: Vec<(String, CachedSlices)> = stale
            .into_par_iter()
            .map(|(key, mtime_ns)| {
                let polylines = match slice_file(Path::new(&key), cutting_height) {
                    Ok(polylines) => polylines,
                    Err(e) => {
                        tracing::warn!(path = %key, error = %e, "Malformed scan, skipping");
                        Vec::new()
                    }
                };
                (key, CachedSlices { mtime_ns, polylines })
            })
            .collect();

        changes += sliced.len();
        cache.files.extend(sliced);
        dirty |= changes > 0;

        if dirty {
            cache.save(&self.cache_path)?;
        }

        let polylines: Vec<Polyline> = cache.polylines().cloned().collect();
        let boundary = polyline_bounds(&polylines);

        tracing::debug!(
            files = cache.files.len(),
            changes,
            polylines = polylines.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Floor plan updated"
        );

        Ok(ExtractionSummary {
            changes,
            boundary,
            polylines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALL: &str = "\
v 0 0 0
v 3 0 0
v 3 2.5 0
v 0 2.5 0
f 1 2 3
f 1 3 4
";

    #[test]
    fn slice_file_rejects_empty_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.obj");
        std::fs::write(&path, "# nothing\n").unwrap();
        assert!(slice_file(&path, 1.0).is_err());
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let wall = dir.path().join("wall.obj");
        std::fs::write(&wall, WALL).unwrap();
        let extractor = FloorPlanExtractor::new(dir.path().join("cache.json"));

        let summary = extractor
            .update(&[wall, dir.path().join("gone.obj")], 1.0)
            .unwrap();
        assert_eq!(summary.changes, 1);
        assert_eq!(summary.polylines.len(), 1);
    }
}
