// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface chunks: one scan file each, with cached local topology
//!
//! Building face adjacency and bodies is the expensive part of loading a
//! scan, so it is stored next to the scan in `<scan>.navcache.json` and
//! reused while the scan's modification time and face count match.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use wayfinder_core::read_scan;
use wayfinder_floorplan::cache::modified_ns;
use wayfinder_geometry::{face_edges, EdgeMap, SurfaceMesh, DEFAULT_WELD_TOLERANCE};
use wayfinder_graph::Graph;

use crate::config::NavMeshConfig;
use crate::error::Result;

const CACHE_SUFFIX: &str = ".navcache.json";

/// Immutable mesh from one scan file
#[derive(Debug, Clone)]
pub struct SurfaceChunk {
    /// File stem of the scan
    pub id: String,
    pub device: Option<String>,
    pub mesh: SurfaceMesh,
    /// Neighbours per face; only pairs where both faces pass the slope test
    pub neighbors: Vec<SmallVec<[u32; 3]>>,
    /// Body label per face
    pub bodies: Vec<u32>,
    pub body_count: usize,
    /// Faces owning an edge no other face of their body shares
    pub boundary: Vec<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChunkCache {
    mtime_ns: u128,
    face_count: usize,
    min_walkable_normal_y: f64,
    neighbors: Vec<Vec<u32>>,
    bodies: Vec<u32>,
    body_count: usize,
    boundary: Vec<u32>,
}

impl SurfaceChunk {
    /// Builds a chunk and its topology from an in-memory mesh.
    pub fn from_mesh(
        id: impl Into<String>,
        mesh: SurfaceMesh,
        device: Option<String>,
        config: &NavMeshConfig,
    ) -> Self {
        let (neighbors, bodies, body_count) = walkable_topology(&mesh, config);
        let boundary = boundary_faces(&mesh, &bodies);
        Self {
            id: id.into(),
            device,
            mesh,
            neighbors,
            bodies,
            body_count,
            boundary,
        }
    }

    /// Loads a scan file, reusing its side-car topology cache when fresh.
    pub fn load(path: &Path, config: &NavMeshConfig) -> Result<Self> {
        let scan = read_scan(path)?;
        let mesh = SurfaceMesh::from_scan(&scan, DEFAULT_WELD_TOLERANCE)?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mtime_ns = modified_ns(path)?;
        let side_car = cache_path(path);

        if let Some(cache) = read_cache(&side_car) {
            if cache.mtime_ns == mtime_ns
                && cache.face_count == mesh.face_count()
                && cache.min_walkable_normal_y == config.min_walkable_normal_y
                && cache.neighbors.len() == mesh.face_count()
                && cache.bodies.len() == mesh.face_count()
            {
                tracing::trace!(chunk = %id, "Chunk topology cache hit");
                return Ok(Self {
                    id,
                    device: scan.device,
                    mesh,
                    neighbors: cache.neighbors.into_iter().map(SmallVec::from_vec).collect(),
                    bodies: cache.bodies,
                    body_count: cache.body_count,
                    boundary: cache.boundary,
                });
            }
        }

        let chunk = Self::from_mesh(id, mesh, scan.device, config);
        let cache = ChunkCache {
            mtime_ns,
            face_count: chunk.mesh.face_count(),
            min_walkable_normal_y: config.min_walkable_normal_y,
            neighbors: chunk.neighbors.iter().map(|n| n.to_vec()).collect(),
            bodies: chunk.bodies.clone(),
            body_count: chunk.body_count,
            boundary: chunk.boundary.clone(),
        };
        if let Err(e) = write_cache(&side_car, &cache) {
            tracing::warn!(path = %side_car.display(), error = %e, "Could not write chunk cache");
        }
        Ok(chunk)
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }
}

/// Side-car cache location for a scan file
pub fn cache_path(scan: &Path) -> PathBuf {
    let mut name = scan.file_name().unwrap_or_default().to_os_string();
    name.push(CACHE_SUFFIX);
    scan.with_file_name(name)
}

/// Loads scans in parallel; unreadable or malformed files are logged and
/// skipped. Output order follows `paths`.
pub fn load_chunks(paths: &[PathBuf], config: &NavMeshConfig) -> Vec<SurfaceChunk> {
    paths
        .par_iter()
        .filter_map(|path| match SurfaceChunk::load(path, config) {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping malformed scan");
                None
            }
        })
        .collect()
}

fn read_cache(path: &Path) -> Option<ChunkCache> {
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn write_cache(path: &Path, cache: &ChunkCache) -> Result<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec(cache)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Slope-filtered neighbours and body labels
fn walkable_topology(
    mesh: &SurfaceMesh,
    config: &NavMeshConfig,
) -> (Vec<SmallVec<[u32; 3]>>, Vec<u32>, usize) {
    let n = mesh.face_count();
    let slope_ok: Vec<bool> = (0..n).map(|f| config.slope_ok(&mesh.normal(f))).collect();

    let mut neighbors = EdgeMap::build(&mesh.faces).face_neighbors(&mesh.faces);
    for (f, list) in neighbors.iter_mut().enumerate() {
        if slope_ok[f] {
            list.retain(|nb| slope_ok[*nb as usize]);
        } else {
            list.clear();
        }
    }

    let mut graph = Graph::with_nodes(n);
    for (f, list) in neighbors.iter().enumerate() {
        for &nb in list.iter().filter(|&&nb| nb as usize > f) {
            graph.add_edge(f, nb as usize, 1.0);
        }
    }
    let (labels, count) = graph.component_labels();
    (neighbors, labels.into_iter().map(|l| l as u32).collect(), count)
}

fn boundary_faces(mesh: &SurfaceMesh, bodies: &[u32]) -> Vec<u32> {
    let edges = EdgeMap::build(&mesh.faces);
    (0..mesh.face_count())
        .filter(|&f| {
            face_edges(&mesh.faces[f]).iter().any(|&key| {
                !edges
                    .faces_on(key)
                    .iter()
                    .any(|&other| other as usize != f && bodies[other as usize] == bodies[f])
            })
        })
        .map(|f| f as u32)
        .collect()
}
