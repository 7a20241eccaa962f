// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-location orchestration of mesh, grid and floor-plan data.
//!
//! Each location owns its mesh snapshot, floor grid and cached wall grid.
//! Rebuilds run on the blocking pool (bounded by a semaphore, at most one
//! per location) and hand their output to a single coordinator task, which
//! is the only place snapshots are swapped and the catalog is written.
//!
//! A location whose data directory already holds surfaces is rebuilt in
//! the background the first time it is touched, so knowledge survives a
//! restart. Traces fed while a rebuild is in flight are journaled and
//! replayed onto the rebuilt engine before it is installed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot, Semaphore};
use wayfinder_core::{Point3, PositionSample};
use wayfinder_floorplan::{FloorPlanCache, Marker, Polyline};
use wayfinder_grid::OccupancyGrid;
use wayfinder_navmesh::{MeshNavEngine, NavError, TraceReport};

use crate::config::NavigatorConfig;
use crate::error::{NavigatorError, Result};
use crate::services::catalog::LayerCatalog;
use crate::services::floor_grid::{self, FloorGrid};
use crate::services::rebuild::{run_rebuild, RebuildInput, RebuildOutput};
use crate::services::routing::{grid_route, wall_grid};
use crate::services::store::{validate_id, SurfaceStore};
use crate::types::{LayerGeometry, MeshStats, RebuildSummary};

/// Layer created for locations whose catalog has none
pub const DEFAULT_LAYER: &str = "ground";

/// Live positions are fed to the mesh engine in batches of this size
const POSITION_BATCH: usize = 16;

const MARKER_COLOR: &str = "#d7263d";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Current mesh engine; `generation` changes on every swap
#[derive(Default)]
struct MeshSlot {
    generation: u64,
    engine: Option<Arc<MeshNavEngine>>,
}

#[derive(Default)]
enum WallCache {
    #[default]
    Unknown,
    Absent,
    Ready(Arc<OccupancyGrid>),
}

#[derive(Default)]
struct WallSlot {
    epoch: u64,
    cache: WallCache,
}

/// Traces fed to the live engine while a rebuild was in flight
#[derive(Default)]
struct TraceJournal {
    next: u64,
    traces: Vec<(u64, Vec<Point3<f64>>)>,
}

type RebuildReply = oneshot::Receiver<Result<RebuildSummary>>;

#[derive(Default)]
struct LocationState {
    mesh: RwLock<MeshSlot>,
    floor: Mutex<FloorGrid>,
    walls: Mutex<WallSlot>,
    /// Live positions not yet handed to the mesh engine, per device
    pending: Mutex<FxHashMap<String, Vec<Point3<f64>>>>,
    journal: Mutex<TraceJournal>,
    /// Rebuild scheduled when the location was opened with stored surfaces
    initial_load: Mutex<Option<RebuildReply>>,
}

impl LocationState {
    fn engine(&self) -> Option<Arc<MeshNavEngine>> {
        self.mesh
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .engine
            .clone()
    }

    fn swap_engine(&self, engine: Option<MeshNavEngine>) {
        let mut slot = self.mesh.write().unwrap_or_else(PoisonError::into_inner);
        slot.engine = engine.map(Arc::new);
        slot.generation += 1;
    }

    /// Stored traces of `location` and the journal position they cover.
    fn read_traces(&self, store: &SurfaceStore, location: &str) -> Result<(Vec<(String, Vec<PositionSample>)>, u64)> {
        let journal = lock(&self.journal);
        let traces = store.read_traces(location)?;
        Ok((traces, journal.next))
    }

    fn journal_trace(&self, points: &[Point3<f64>]) {
        let mut journal = lock(&self.journal);
        let seq = journal.next;
        journal.next += 1;
        journal.traces.push((seq, points.to_vec()));
    }

    /// Installs a rebuilt engine, replaying journaled traces from `mark` on.
    ///
    /// Returns the number of replayed traces.
    fn install_engine(&self, engine: Option<MeshNavEngine>, mark: u64) -> usize {
        let mut journal = lock(&self.journal);
        let missed: Vec<Vec<Point3<f64>>> = journal
            .traces
            .drain(..)
            .filter(|(seq, _)| *seq >= mark)
            .map(|(_, points)| points)
            .collect();
        let engine = engine.map(|mut engine| {
            for points in &missed {
                engine.add_trace(points, true);
            }
            if !missed.is_empty() {
                engine.infer_walkable();
            }
            engine
        });
        self.swap_engine(engine);
        missed.len()
    }

    /// Adds a trace to the current engine without blocking readers.
    ///
    /// The engine is cloned, extended and swapped back in; if a rebuild
    /// swapped the engine meanwhile, the trace is applied again on top of
    /// the new one. `None` when the location has no engine.
    fn apply_trace(&self, points: &[Point3<f64>]) -> Option<TraceReport> {
        loop {
            let (generation, current) = {
                let slot = self.mesh.read().unwrap_or_else(PoisonError::into_inner);
                (slot.generation, slot.engine.clone()?)
            };
            let mut next = MeshNavEngine::clone(&current);
            let report = next.add_trace(points, true);
            next.infer_walkable();

            let mut slot = self.mesh.write().unwrap_or_else(PoisonError::into_inner);
            if slot.generation == generation {
                slot.engine = Some(Arc::new(next));
                slot.generation += 1;
                return Some(report);
            }
        }
    }

    fn invalidate_walls(&self) {
        let mut walls = lock(&self.walls);
        walls.epoch += 1;
        walls.cache = WallCache::Unknown;
    }

    fn markers(&self) -> Vec<Marker> {
        let floor = lock(&self.floor);
        let mut markers: Vec<Marker> = floor
            .last_positions()
            .map(|(device, p)| Marker::new(p.x, p.z, MARKER_COLOR).with_label(device))
            .collect();
        markers.sort_by(|a, b| a.label.cmp(&b.label));
        markers
    }
}

struct Shared {
    config: NavigatorConfig,
    store: SurfaceStore,
    catalog: Arc<dyn LayerCatalog>,
    locations: Mutex<FxHashMap<String, Arc<LocationState>>>,
    /// Locations with a rebuild in flight
    in_flight: Mutex<FxHashSet<String>>,
}

struct Completion {
    location: String,
    output: Result<RebuildOutput>,
    reply: oneshot::Sender<Result<RebuildSummary>>,
}

impl Shared {
    fn location(&self, location: &str) -> Result<Arc<LocationState>> {
        self.open(location).map(|(state, _)| state)
    }

    /// State of `location`, created (and its floor grid reloaded) on first
    /// use; the flag is `true` for the call that created it.
    fn open(&self, location: &str) -> Result<(Arc<LocationState>, bool)> {
        validate_id(location)?;
        let mut locations = lock(&self.locations);
        if let Some(state) = locations.get(location) {
            return Ok((Arc::clone(state), false));
        }
        let state = Arc::new(LocationState::default());
        lock(&state.floor).load(&self.store.floor_grid_path(location)?, self.config.grid_step);
        locations.insert(location.to_string(), Arc::clone(&state));
        Ok((state, true))
    }

    fn release(&self, location: &str) {
        lock(&self.in_flight).remove(location);
    }

    fn rebuild_input(&self, location: &str) -> Result<RebuildInput> {
        let state = self.location(location)?;
        let mut layers = self.catalog.layers(location)?;
        let new_layer = layers.is_empty();
        if new_layer {
            layers.push(LayerGeometry::new(location, DEFAULT_LAYER, self.config.cutting_height));
        }
        Ok(RebuildInput {
            location: location.to_string(),
            surfaces: self.store.surface_files(location)?,
            traces: Vec::new(),
            trace_mark: 0,
            layers,
            new_layer,
            markers: state.markers(),
            store: self.store.clone(),
            navmesh: self.config.navmesh.clone(),
            floorplan: self.config.floorplan.clone(),
        })
    }

    async fn run_worker(&self, location: &str, permits: Arc<Semaphore>) -> Result<RebuildOutput> {
        let mut input = self.rebuild_input(location)?;
        let state = self.location(location)?;
        let _permit = permits
            .acquire_owned()
            .await
            .map_err(|_| NavigatorError::Shutdown)?;
        tokio::task::spawn_blocking(move || {
            let (traces, mark) = state.read_traces(&input.store, &input.location)?;
            input.traces = traces;
            input.trace_mark = mark;
            run_rebuild(input)
        })
        .await?
    }

    /// Applies a finished rebuild; runs on the coordinator only.
    fn apply(&self, output: RebuildOutput) -> Result<RebuildSummary> {
        let summary = output.summary();
        let state = self.location(&output.location)?;

        for layer in &output.layers {
            let l = &layer.layer;
            if output.new_layer {
                self.catalog.upsert(l.clone())?;
            } else {
                self.catalog.publish(&l.location, &l.id, l.boundary, l.ready)?;
            }
        }
        let replayed = state.install_engine(output.engine, output.trace_mark);
        if replayed > 0 {
            tracing::debug!(location = %output.location, replayed, "Replayed traces fed during rebuild");
        }
        state.invalidate_walls();
        Ok(summary)
    }

    /// Wall grid from the first ready layer with line art, cached per location.
    fn wall_grid(&self, location: &str, state: &LocationState) -> Result<Option<Arc<OccupancyGrid>>> {
        let epoch = {
            let walls = lock(&state.walls);
            match &walls.cache {
                WallCache::Ready(grid) => return Ok(Some(Arc::clone(grid))),
                WallCache::Absent => return Ok(None),
                WallCache::Unknown => walls.epoch,
            }
        };

        let mut built = None;
        for layer in self.catalog.layers(location)? {
            let Some(boundary) = layer.boundary.filter(|_| layer.ready) else {
                continue;
            };
            let Some(cache) = FloorPlanCache::load(&self.store.floorplan_cache(location, &layer.id)?) else {
                continue;
            };
            let polylines: Vec<Polyline> = cache.polylines().cloned().collect();
            if polylines.is_empty() {
                continue;
            }
            tracing::debug!(location, layer = %layer.id, polylines = polylines.len(), "Built wall grid");
            built = Some(Arc::new(wall_grid(&polylines, boundary, self.config.grid_step)?));
            break;
        }

        let mut walls = lock(&state.walls);
        if walls.epoch == epoch {
            walls.cache = match &built {
                Some(grid) => WallCache::Ready(Arc::clone(grid)),
                None => WallCache::Absent,
            };
        }
        Ok(built)
    }
}

async fn coordinate(shared: Arc<Shared>, mut completions: mpsc::UnboundedReceiver<Completion>) {
    while let Some(Completion {
        location,
        output,
        reply,
    }) = completions.recv().await
    {
        let result = output.and_then(|output| shared.apply(output));
        if let Err(e) = &result {
            tracing::error!(location = %location, error = %e, "Map rebuild failed, keeping previous snapshot");
        }
        shared.release(&location);
        let _ = reply.send(result);
    }
    tracing::debug!("Rebuild coordinator stopped");
}

/// Path finding and map maintenance for any number of locations.
///
/// Must be created inside a Tokio runtime; it spawns the rebuild
/// coordinator, which stops when the navigator is dropped.
pub struct Navigator {
    shared: Arc<Shared>,
    permits: Arc<Semaphore>,
    completions: mpsc::UnboundedSender<Completion>,
    runtime: Handle,
}

impl Navigator {
    pub fn new(config: NavigatorConfig, catalog: Arc<dyn LayerCatalog>) -> Self {
        tracing::info!(
            data_dir = %config.data_dir.display(),
            workers = config.workers,
            grid_step = config.grid_step,
            "Starting navigator"
        );
        let permits = Arc::new(Semaphore::new(config.workers.max(1)));
        let shared = Arc::new(Shared {
            store: SurfaceStore::new(config.data_dir.clone()),
            config,
            catalog,
            locations: Mutex::new(FxHashMap::default()),
            in_flight: Mutex::new(FxHashSet::default()),
        });
        let (completions, receiver) = mpsc::unbounded_channel();
        let runtime = Handle::current();
        runtime.spawn(coordinate(Arc::clone(&shared), receiver));
        Self {
            shared,
            permits,
            completions,
            runtime,
        }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &SurfaceStore {
        &self.shared.store
    }

    pub fn catalog(&self) -> &dyn LayerCatalog {
        self.shared.catalog.as_ref()
    }

    /// Locations with a data directory.
    pub fn locations(&self) -> Result<Vec<String>> {
        self.shared.store.locations()
    }

    /// State of `location`.
    ///
    /// Opening a location whose store already holds surfaces schedules a
    /// rebuild, see [`Navigator::wait_loaded`].
    fn state(&self, location: &str) -> Result<Arc<LocationState>> {
        let (state, created) = self.shared.open(location)?;
        if created && !self.shared.store.surface_files(location)?.is_empty() {
            if let Some(reply) = self.submit(location) {
                tracing::info!(location, "Loading stored surfaces");
                *lock(&state.initial_load) = Some(reply);
            }
        }
        Ok(state)
    }

    /// Waits for the rebuild scheduled when `location` was first opened.
    ///
    /// `None` when there was nothing to load or it was already awaited.
    pub async fn wait_loaded(&self, location: &str) -> Result<Option<RebuildSummary>> {
        let state = self.state(location)?;
        let reply = lock(&state.initial_load).take();
        match reply {
            Some(reply) => reply.await.map_err(|_| NavigatorError::Shutdown)?.map(Some),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Waypoints from `start` to `end`; never fails.
    ///
    /// Tries the mesh engine, then the wall/floor grids, and otherwise
    /// returns the straight line `[start, end]`.
    pub fn find_path(&self, location: &str, start: Point3<f64>, end: Point3<f64>) -> Vec<Point3<f64>> {
        match self.route(location, &start, &end) {
            Ok(Some(path)) => path,
            Ok(None) => vec![start, end],
            Err(e) => {
                tracing::warn!(location, error = %e, "Path query failed, using straight line");
                vec![start, end]
            }
        }
    }

    fn route(&self, location: &str, start: &Point3<f64>, end: &Point3<f64>) -> Result<Option<Vec<Point3<f64>>>> {
        let state = self.state(location)?;
        let step = self.shared.config.grid_step;

        if let Some(engine) = state.engine().filter(|e| e.walkable_faces().next().is_some()) {
            match engine.find_path(start, end) {
                Ok(Some(raw)) => {
                    tracing::debug!(location, waypoints = raw.len(), "Mesh path found");
                    return Ok(Some(engine.smooth_path(&raw)));
                }
                Ok(None) => tracing::debug!(location, "No mesh route, trying grids"),
                Err(NavError::NoFaceFound(endpoint)) => {
                    tracing::debug!(location, %endpoint, "Query point off the mesh, trying grids")
                }
                Err(e) => return Err(e.into()),
            }
        }

        let walls = self.shared.wall_grid(location, &state)?;
        let floor = lock(&state.floor).grid().cloned();
        grid_route(walls.as_deref(), floor.as_ref(), start, end, step)
    }

    pub fn mesh_stats(&self, location: &str) -> Result<Option<MeshStats>> {
        let state = self.state(location)?;
        Ok(state.engine().map(|e| MeshStats::from(e.stats())))
    }

    // ========================================================================
    // Live positions and traces
    // ========================================================================

    /// Feeds one device position into the floor grid and the trace store.
    ///
    /// Positions reach the mesh engine in batches, and at the latest with
    /// the next rebuild (which replays stored traces).
    pub async fn record_position(&self, location: &str, device: &str, sample: PositionSample) -> Result<()> {
        validate_id(device)?;
        let state = self.state(location)?;
        self.shared.store.append_samples(location, device, &[sample])?;
        self.update_floor_grid(location, &state, device, &[sample]).await?;

        let batch = {
            let mut pending = lock(&state.pending);
            let points = pending.entry(device.to_string()).or_default();
            points.push(sample.position);
            if points.len() >= POSITION_BATCH {
                let batch = std::mem::take(points);
                // Overlap batches so the transition between them is kept
                points.extend(batch.last().copied());
                Some(batch)
            } else {
                None
            }
        };
        if let Some(batch) = batch {
            self.feed_engine(location, state, batch).await?;
        }
        Ok(())
    }

    /// Stores a recorded trace and feeds it to the floor grid and mesh engine.
    pub async fn ingest_trace(
        &self,
        location: &str,
        device: &str,
        samples: &[PositionSample],
    ) -> Result<Option<TraceReport>> {
        validate_id(device)?;
        let state = self.state(location)?;
        self.shared.store.append_samples(location, device, samples)?;
        self.update_floor_grid(location, &state, device, samples).await?;

        let points: Vec<Point3<f64>> = samples.iter().map(|s| s.position).collect();
        let report = self.feed_engine(location, state, points).await?;
        if let Some(report) = &report {
            tracing::debug!(
                location,
                device,
                hits = report.hits,
                misses = report.misses,
                transitions = report.transitions,
                "Trace ingested"
            );
        }
        Ok(report)
    }

    async fn feed_engine(
        &self,
        location: &str,
        state: Arc<LocationState>,
        points: Vec<Point3<f64>>,
    ) -> Result<Option<TraceReport>> {
        if points.is_empty() {
            return Ok(None);
        }
        let rebuilding = lock(&self.shared.in_flight).contains(location);
        if rebuilding {
            state.journal_trace(&points);
        }
        Ok(tokio::task::spawn_blocking(move || state.apply_trace(&points)).await?)
    }

    async fn update_floor_grid(
        &self,
        location: &str,
        state: &LocationState,
        device: &str,
        samples: &[PositionSample],
    ) -> Result<()> {
        let config = &self.shared.config;
        let snapshot = {
            let mut floor = lock(&state.floor);
            for sample in samples {
                floor.record(device, sample.position, config)?;
            }
            floor.take_snapshot(Instant::now(), config)
        };

        if let Some(grid) = snapshot {
            let json = self.shared.store.floor_grid_path(location)?;
            let png = self.shared.store.floor_grid_image(location)?;
            let location = location.to_string();
            tokio::task::spawn_blocking(move || {
                if let Err(e) = floor_grid::persist(&grid, &json, &png) {
                    tracing::warn!(location = %location, error = %e, "Failed to persist floor grid");
                }
            })
            .await?;
        }
        Ok(())
    }

    /// Writes every in-memory floor grid to disk now.
    pub fn persist_floor_grids(&self) -> Result<usize> {
        let locations: Vec<(String, Arc<LocationState>)> = lock(&self.shared.locations)
            .iter()
            .map(|(id, state)| (id.clone(), Arc::clone(state)))
            .collect();
        let mut written = 0;
        for (location, state) in locations {
            let Some(grid) = lock(&state.floor).grid().cloned() else {
                continue;
            };
            floor_grid::persist(
                &grid,
                &self.shared.store.floor_grid_path(&location)?,
                &self.shared.store.floor_grid_image(&location)?,
            )?;
            written += 1;
        }
        Ok(written)
    }

    // ========================================================================
    // Surfaces and rebuilds
    // ========================================================================

    /// Stores a surface scan and rebuilds the location.
    ///
    /// Returns `None` when a rebuild of the location was already running;
    /// that rebuild, or the next one, picks the new scan up.
    pub async fn ingest_surface(&self, location: &str, surface_id: &str, bytes: Vec<u8>) -> Result<Option<RebuildSummary>> {
        let store = self.shared.store.clone();
        let (loc, id) = (location.to_string(), surface_id.to_string());
        let written = tokio::task::spawn_blocking(move || store.write_surface(&loc, &id, &bytes)).await??;
        tracing::info!(location, surface = surface_id, written, "Surface ingested");
        self.rebuild_map(location).await
    }

    /// Deletes a surface scan and rebuilds the location.
    ///
    /// `Ok(None)` when the scan did not exist or a rebuild was in flight.
    pub async fn remove_surface(&self, location: &str, surface_id: &str) -> Result<Option<RebuildSummary>> {
        let store = self.shared.store.clone();
        let (loc, id) = (location.to_string(), surface_id.to_string());
        let removed = tokio::task::spawn_blocking(move || store.remove_surface(&loc, &id)).await??;
        if !removed {
            tracing::debug!(location, surface = surface_id, "No such surface");
            return Ok(None);
        }
        tracing::info!(location, surface = surface_id, "Surface removed");
        self.rebuild_map(location).await
    }

    /// Rebuilds the mesh engine and floor plans of `location`.
    ///
    /// `None` when a rebuild of the same location is already in flight.
    pub async fn rebuild_map(&self, location: &str) -> Result<Option<RebuildSummary>> {
        validate_id(location)?;
        let Some(response) = self.submit(location) else {
            tracing::debug!(location, "Rebuild already in flight, dropping request");
            return Ok(None);
        };
        match response.await {
            Ok(result) => result.map(Some),
            Err(_) => Err(NavigatorError::Shutdown),
        }
    }

    /// Starts a rebuild of `location` unless one is in flight.
    fn submit(&self, location: &str) -> Option<RebuildReply> {
        if !lock(&self.shared.in_flight).insert(location.to_string()) {
            return None;
        }

        let (reply, response) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let permits = Arc::clone(&self.permits);
        let completions = self.completions.clone();
        let location = location.to_string();
        self.runtime.spawn(async move {
            let output = shared.run_worker(&location, permits).await;
            if let Err(mpsc::error::SendError(lost)) = completions.send(Completion {
                location,
                output,
                reply,
            }) {
                shared.release(&lost.location);
            }
        });
        Some(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use wayfinder_navmesh::{load_chunks, NavMeshConfig};

    /// 4x4 floor of unit squares at y = 0
    fn floor_engine(dir: &Path) -> MeshNavEngine {
        let mut obj = String::new();
        for z in 0..=4 {
            for x in 0..=4 {
                obj.push_str(&format!("v {} 0 {}\n", x, z));
            }
        }
        for z in 0..4u32 {
            for x in 0..4u32 {
                let a = z * 5 + x + 1;
                obj.push_str(&format!("f {} {} {}\nf {} {} {}\n", a, a + 5, a + 6, a, a + 6, a + 1));
            }
        }
        let path = dir.join("floor.obj");
        std::fs::write(&path, obj).unwrap();
        let config = NavMeshConfig::default();
        MeshNavEngine::build(&load_chunks(&[path], &config), config).unwrap()
    }

    fn trace() -> Vec<Point3<f64>> {
        vec![Point3::new(1.3, 1.5, 1.6), Point3::new(2.4, 1.5, 1.7)]
    }

    #[test]
    fn trace_fed_during_rebuild_survives_the_swap() {
        let dir = tempfile::tempdir().unwrap();
        let store = SurfaceStore::new(dir.path().join("data"));
        let engine = floor_engine(dir.path());
        let state = LocationState::default();
        state.swap_engine(Some(engine.clone()));

        // The rebuild reads its inputs before the trace is stored
        let (traces, mark) = state.read_traces(&store, "lab").unwrap();
        assert!(traces.is_empty());

        state.journal_trace(&trace());
        assert_eq!(state.apply_trace(&trace()).unwrap().hits, 2);

        // The rebuilt engine never saw the trace
        assert_eq!(state.install_engine(Some(engine), mark), 1);
        let stats = state.engine().unwrap().stats();
        assert!(stats.visited >= 2);
        assert!(stats.walkable > 0);
    }

    #[test]
    fn traces_read_by_the_rebuild_are_not_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let store = SurfaceStore::new(dir.path().join("data"));
        let engine = floor_engine(dir.path());
        let state = LocationState::default();

        state.journal_trace(&trace());
        let (_, mark) = state.read_traces(&store, "lab").unwrap();
        assert_eq!(mark, 1);
        assert_eq!(state.install_engine(Some(engine), mark), 0);
        assert_eq!(state.engine().unwrap().stats().visited, 0);

        // Installing drains the journal
        assert_eq!(state.install_engine(None, 0), 0);
        assert!(state.engine().is_none());
    }
}
