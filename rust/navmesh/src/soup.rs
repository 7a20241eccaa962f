// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The combined soup: every chunk of a location in one face index space

use std::time::Instant;

use rayon::prelude::*;
use wayfinder_geometry::{Point3, RayCaster, RayHit, SurfaceMesh};
use wayfinder_graph::Graph;

use crate::chunk::SurfaceChunk;
use crate::config::NavMeshConfig;
use crate::error::{NavError, Result};

/// Concatenated chunks with per-face provenance and a global adjacency graph
#[derive(Debug)]
pub struct CombinedSoup {
    pub mesh: SurfaceMesh,
    pub chunk_ids: Vec<String>,
    /// Origin chunk per face (index into `chunk_ids`)
    pub face_chunk: Vec<u32>,
    /// Face index inside its origin chunk
    pub face_local: Vec<u32>,
    /// Global body id per face
    pub face_body: Vec<u32>,
    pub body_count: usize,
    /// Nodes are faces; edges join slope-passing faces sharing a mesh edge
    pub adjacency: Graph,
    /// Boundary faces per body
    pub body_boundary: Vec<Vec<u32>>,
    /// Face passes the slope test
    pub slope_ok: Vec<bool>,
    /// Face passes slope and clearance tests
    pub walkable_ok: Vec<bool>,
    caster: RayCaster,
}

impl CombinedSoup {
    /// Merges chunks in the given order.
    pub fn build(chunks: &[SurfaceChunk], config: &NavMeshConfig) -> Result<Self> {
        let started = Instant::now();
        let total: usize = chunks.iter().map(SurfaceChunk::face_count).sum();
        if total == 0 {
            return Err(NavError::EmptySoup);
        }

        let mut mesh = SurfaceMesh::empty();
        let mut chunk_ids = Vec::with_capacity(chunks.len());
        let mut face_chunk = Vec::with_capacity(total);
        let mut face_local = Vec::with_capacity(total);
        let mut face_body = Vec::with_capacity(total);
        let mut body_boundary: Vec<Vec<u32>> = Vec::new();
        let mut adjacency = Graph::with_nodes(total);

        for (c, chunk) in chunks.iter().enumerate() {
            let face_offset = mesh.merge(&chunk.mesh) as u32;
            let body_offset = body_boundary.len() as u32;
            chunk_ids.push(chunk.id.clone());
            body_boundary.resize(body_boundary.len() + chunk.body_count, Vec::new());

            for local in 0..chunk.face_count() as u32 {
                face_chunk.push(c as u32);
                face_local.push(local);
                face_body.push(body_offset + chunk.bodies[local as usize]);
            }
            for &local in &chunk.boundary {
                let body = body_offset + chunk.bodies[local as usize];
                body_boundary[body as usize].push(face_offset + local);
            }
            for (local, list) in chunk.neighbors.iter().enumerate() {
                let f = face_offset as usize + local;
                for &nb in list.iter().filter(|&&nb| nb as usize > local) {
                    let g = face_offset as usize + nb as usize;
                    adjacency.add_edge(f, g, (mesh.center(f) - mesh.center(g)).norm());
                }
            }
        }

        let slope_ok: Vec<bool> = (0..total).map(|f| config.slope_ok(&mesh.normal(f))).collect();
        let caster = RayCaster::build(&mesh, config.bin_size);
        let walkable_ok: Vec<bool> = (0..total)
            .into_par_iter()
            .map(|f| slope_ok[f] && has_clearance(&caster, &mesh, f, config))
            .collect();

        let body_count = body_boundary.len();
        tracing::debug!(
            chunks = chunks.len(),
            faces = total,
            bodies = body_count,
            adjacency_edges = adjacency.edge_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Combined soup built"
        );

        Ok(Self {
            mesh,
            chunk_ids,
            face_chunk,
            face_local,
            face_body,
            body_count,
            adjacency,
            body_boundary,
            slope_ok,
            walkable_ok,
            caster,
        })
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.mesh.face_count()
    }

    #[inline]
    pub fn center(&self, face: usize) -> Point3<f64> {
        self.mesh.center(face)
    }

    #[inline]
    pub fn body_of(&self, face: usize) -> usize {
        self.face_body[face] as usize
    }

    /// Chunk id and local face index of a soup face
    pub fn origin(&self, face: usize) -> (&str, u32) {
        (
            &self.chunk_ids[self.face_chunk[face] as usize],
            self.face_local[face],
        )
    }

    /// Face straight below `point` (after lifting the origin).
    pub fn face_below(&self, point: &Point3<f64>, config: &NavMeshConfig) -> Option<RayHit> {
        self.caster.cast_down(&self.mesh, &(point + config.lift()))
    }

    /// Boundary face of `body` closest to `target`; `None` if the body has none.
    pub fn nearest_boundary(&self, body: usize, target: &Point3<f64>) -> Option<usize> {
        self.body_boundary[body]
            .iter()
            .map(|&f| (f as usize, (self.center(f as usize) - target).norm_squared()))
            .fold(None, |best: Option<(usize, f64)>, (f, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((f, d)),
            })
            .map(|(f, _)| f)
    }
}

/// Upward ray from the lifted face center hits nothing within `min_clearance`.
fn has_clearance(caster: &RayCaster, mesh: &SurfaceMesh, face: usize, config: &NavMeshConfig) -> bool {
    let origin = mesh.center(face) + config.lift();
    caster
        .cast_up(mesh, &origin)
        .map_or(true, |hit| hit.distance > config.min_clearance)
}
