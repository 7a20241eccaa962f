// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Map rebuild worker.
//!
//! Runs on the blocking pool and touches no shared navigator state: it
//! reads scans, replays the traces it was handed, writes floor-plan side
//! files, and returns a [`RebuildOutput`] for the coordinator to apply.

use std::path::PathBuf;
use std::time::Instant;

use wayfinder_core::{PositionSample, Rect2};
use wayfinder_floorplan::{save_preview, write_svg, FloorPlanConfig, FloorPlanExtractor, Marker};
use wayfinder_navmesh::{load_chunks, MeshNavEngine, NavError, NavMeshConfig, TraceReport};

use crate::error::Result;
use crate::services::store::SurfaceStore;
use crate::types::{LayerGeometry, RebuildSummary};

/// Everything a rebuild reads.
///
/// `traces` and `trace_mark` are filled in on the blocking side, together,
/// so that traces fed live after the read can be told apart.
#[derive(Debug, Clone)]
pub struct RebuildInput {
    pub location: String,
    pub surfaces: Vec<PathBuf>,
    /// Stored traces per device
    pub traces: Vec<(String, Vec<PositionSample>)>,
    /// Journal position covered by `traces`
    pub trace_mark: u64,
    /// Existing layers, or a single new default layer
    pub layers: Vec<LayerGeometry>,
    /// `true` when `layers` holds a layer the catalog does not know yet
    pub new_layer: bool,
    pub markers: Vec<Marker>,
    pub store: SurfaceStore,
    pub navmesh: NavMeshConfig,
    pub floorplan: FloorPlanConfig,
}

#[derive(Debug, Clone)]
pub struct LayerOutput {
    /// The layer with its new boundary and ready flag
    pub layer: LayerGeometry,
    pub changes: usize,
}

pub struct RebuildOutput {
    pub location: String,
    /// `None` when the location has no loadable surfaces
    pub engine: Option<MeshNavEngine>,
    pub layers: Vec<LayerOutput>,
    pub new_layer: bool,
    pub chunks: usize,
    pub trace_mark: u64,
    pub elapsed_ms: u64,
}

impl RebuildOutput {
    pub fn summary(&self) -> RebuildSummary {
        let boundary = self
            .layers
            .iter()
            .filter_map(|l| l.layer.boundary)
            .reduce(|a, b| a.union(&b));
        RebuildSummary {
            boundary,
            changes: self.layers.iter().map(|l| l.changes).sum(),
            chunks: self.chunks,
            walkable_faces: self.engine.as_ref().map_or(0, |e| e.stats().walkable),
            elapsed_ms: self.elapsed_ms,
        }
    }
}

/// Rebuilds the mesh engine and every floor-plan layer of a location.
pub fn run_rebuild(input: RebuildInput) -> Result<RebuildOutput> {
    let started = Instant::now();
    let location = input.location.as_str();
    tracing::info!(location, surfaces = input.surfaces.len(), "Rebuilding map");

    let chunks = load_chunks(&input.surfaces, &input.navmesh);
    let mut engine = match MeshNavEngine::build(&chunks, input.navmesh.clone()) {
        Ok(engine) => Some(engine),
        Err(NavError::EmptySoup) => None,
        Err(e) => return Err(e.into()),
    };

    if let Some(engine) = engine.as_mut() {
        let mut replayed = TraceReport::default();
        for (device, samples) in &input.traces {
            let points: Vec<_> = samples.iter().map(|s| s.position).collect();
            let report = engine.add_trace(&points, true);
            tracing::trace!(location, device = %device, hits = report.hits, "Replayed trace");
            replayed += report;
        }
        let walkable = engine.infer_walkable();
        tracing::debug!(
            location,
            hits = replayed.hits,
            misses = replayed.misses,
            walkable,
            "Replayed stored traces"
        );
    }

    let mut layers = Vec::with_capacity(input.layers.len());
    for layer in &input.layers {
        layers.push(extract_layer(&input, layer)?);
    }

    let output = RebuildOutput {
        location: input.location.clone(),
        engine,
        layers,
        new_layer: input.new_layer,
        chunks: chunks.len(),
        trace_mark: input.trace_mark,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    tracing::info!(
        location,
        chunks = output.chunks,
        changes = output.layers.iter().map(|l| l.changes).sum::<usize>(),
        elapsed_ms = output.elapsed_ms,
        "Map rebuilt"
    );
    Ok(output)
}

fn extract_layer(input: &RebuildInput, layer: &LayerGeometry) -> Result<LayerOutput> {
    let location = input.location.as_str();
    let cache = input.store.floorplan_cache(location, &layer.id)?;
    let svg = input.store.floorplan_svg(location, &layer.id)?;
    let summary = FloorPlanExtractor::new(cache).update(&input.surfaces, layer.cutting_height)?;

    let boundary: Option<Rect2> = summary.boundary;
    if summary.polylines.is_empty() {
        tracing::debug!(location, layer = %layer.id, "No line art at this cutting height");
    } else if summary.changes > 0 || !svg.exists() {
        write_svg(&svg, &summary.polylines, boundary, &input.markers, &input.floorplan)?;
        let preview = input.store.floorplan_preview(location, &layer.id)?;
        if let Err(e) = save_preview(&preview, &summary.polylines, boundary, &input.markers, &input.floorplan) {
            tracing::warn!(location, layer = %layer.id, error = %e, "Floor plan preview failed");
        }
    }

    let mut layer = layer.clone();
    layer.ready = boundary.is_some();
    layer.boundary = boundary;
    Ok(LayerOutput {
        layer,
        changes: summary.changes,
    })
}
