// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Directory-backed store for scans, traces and side-car files.
//!
//! ```text
//! <root>/<location>/surfaces/<surface>.obj
//! <root>/<location>/traces/<device>.csv
//! <root>/<location>/floor_grid.json
//! <root>/<location>/floor_grid.png
//! <root>/<location>/floorplans/<key>.{json,svg,png}
//! ```
//!
//! Scans and traces are source data. Everything else can be deleted and is
//! recomputed on demand.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use wayfinder_core::{format_sample, parse_trace, PositionSample};
use wayfinder_floorplan::cache_key;

use crate::error::{NavigatorError, Result};

const SURFACE_EXT: &str = "obj";
const TRACE_EXT: &str = "csv";

/// Location, surface and device IDs become path components.
pub fn validate_id(id: &str) -> Result<&str> {
    let ok = !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if ok {
        Ok(id)
    } else {
        Err(NavigatorError::InvalidId(id.to_string()))
    }
}

/// Sorted files in `dir` with extension `ext`; a missing directory is empty.
fn files_with_ext(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == ext) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[derive(Debug, Clone)]
pub struct SurfaceStore {
    root: PathBuf,
}

impl SurfaceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locations with a data directory, sorted.
    pub fn locations(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut locations = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_id(name).is_ok() {
                    locations.push(name.to_string());
                }
            }
        }
        locations.sort();
        Ok(locations)
    }

    fn location_dir(&self, location: &str) -> Result<PathBuf> {
        Ok(self.root.join(validate_id(location)?))
    }

    // ========================================================================
    // Surface scans
    // ========================================================================

    pub fn surface_path(&self, location: &str, surface_id: &str) -> Result<PathBuf> {
        Ok(self
            .location_dir(location)?
            .join("surfaces")
            .join(format!("{}.{}", validate_id(surface_id)?, SURFACE_EXT)))
    }

    pub fn surface_files(&self, location: &str) -> Result<Vec<PathBuf>> {
        files_with_ext(&self.location_dir(location)?.join("surfaces"), SURFACE_EXT)
    }

    /// Writes a scan (write-then-rename).
    ///
    /// Returns `false` without touching the file when it already holds
    /// exactly `bytes`, so an unchanged re-upload keeps its mtime.
    pub fn write_surface(&self, location: &str, surface_id: &str, bytes: &[u8]) -> Result<bool> {
        let path = self.surface_path(location, surface_id)?;
        if std::fs::read(&path).is_ok_and(|existing| existing == bytes) {
            tracing::debug!(location, surface = surface_id, "Surface unchanged");
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("obj.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!(location, surface = surface_id, size = bytes.len(), "Stored surface");
        Ok(true)
    }

    /// Removes a scan; `false` if it did not exist.
    pub fn remove_surface(&self, location: &str, surface_id: &str) -> Result<bool> {
        match std::fs::remove_file(self.surface_path(location, surface_id)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Position traces
    // ========================================================================

    pub fn trace_path(&self, location: &str, device: &str) -> Result<PathBuf> {
        Ok(self
            .location_dir(location)?
            .join("traces")
            .join(format!("{}.{}", validate_id(device)?, TRACE_EXT)))
    }

    pub fn append_samples(&self, location: &str, device: &str, samples: &[PositionSample]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let path = self.trace_path(location, device)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut text = String::with_capacity(samples.len() * 64);
        for sample in samples {
            text.push_str(&format_sample(sample));
            text.push('\n');
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }

    /// Every stored trace of the location as `(device, samples)`.
    ///
    /// Unreadable or malformed trace files are logged and skipped.
    pub fn read_traces(&self, location: &str) -> Result<Vec<(String, Vec<PositionSample>)>> {
        let files = files_with_ext(&self.location_dir(location)?.join("traces"), TRACE_EXT)?;
        let mut traces = Vec::with_capacity(files.len());
        for path in files {
            let device = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let parsed = std::fs::read_to_string(&path)
                .map_err(NavigatorError::from)
                .and_then(|text| parse_trace(&text).map_err(NavigatorError::from));
            match parsed {
                Ok(samples) => traces.push((device, samples)),
                Err(e) => {
                    tracing::warn!(location, path = %path.display(), error = %e, "Skipping unreadable trace");
                }
            }
        }
        Ok(traces)
    }

    // ========================================================================
    // Side-car files
    // ========================================================================

    pub fn floor_grid_path(&self, location: &str) -> Result<PathBuf> {
        Ok(self.location_dir(location)?.join("floor_grid.json"))
    }

    pub fn floor_grid_image(&self, location: &str) -> Result<PathBuf> {
        Ok(self.location_dir(location)?.join("floor_grid.png"))
    }

    fn floorplan_file(&self, location: &str, layer: &str, ext: &str) -> Result<PathBuf> {
        Ok(self
            .location_dir(location)?
            .join("floorplans")
            .join(format!("{}.{}", cache_key(location, layer), ext)))
    }

    /// Slice cache of one layer.
    pub fn floorplan_cache(&self, location: &str, layer: &str) -> Result<PathBuf> {
        self.floorplan_file(location, layer, "json")
    }

    pub fn floorplan_svg(&self, location: &str, layer: &str) -> Result<PathBuf> {
        self.floorplan_file(location, layer, "svg")
    }

    pub fn floorplan_preview(&self, location: &str, layer: &str) -> Result<PathBuf> {
        self.floorplan_file(location, layer, "png")
    }
}
