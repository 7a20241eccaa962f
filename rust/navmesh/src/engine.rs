// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh navigation engine
//!
//! Learns which faces of the combined soup are walkable from position
//! traces, then answers shortest-path queries over the transitions it has
//! observed or inferred.
//!
//! Walkability rule: a face is walkable only if its own normal passes the
//! slope test. Faces a trace stood on (`visited`) or probed (`touched`)
//! skip the clearance test; every other face must also have free space
//! above it.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::sync::{Arc, OnceLock};

use wayfinder_floorplan::{slice_mesh, Polyline};
use wayfinder_geometry::{Point3, RayHit, Vector3};

use crate::chunk::SurfaceChunk;
use crate::config::NavMeshConfig;
use crate::error::{Endpoint, NavError, Result};
use crate::navigation_mesh::NavigationMesh;
use crate::soup::CombinedSoup;
use crate::transitions::{TagCounts, TransitionGraph, TransitionTag};

/// Dense set of soup faces
#[derive(Debug, Clone, Default)]
pub struct FaceSet {
    bits: Vec<bool>,
    len: usize,
}

impl FaceSet {
    pub fn new(face_count: usize) -> Self {
        Self {
            bits: vec![false; face_count],
            len: 0,
        }
    }

    /// Returns `true` if the face was not yet present.
    pub fn insert(&mut self, face: usize) -> bool {
        if self.bits[face] {
            return false;
        }
        self.bits[face] = true;
        self.len += 1;
        true
    }

    #[inline]
    pub fn contains(&self, face: usize) -> bool {
        self.bits.get(face).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits
            .iter()
            .enumerate()
            .filter(|(_, &set)| set)
            .map(|(f, _)| f)
    }
}

/// What one [`MeshNavEngine::add_trace`] call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceReport {
    pub hits: usize,
    pub misses: usize,
    /// Consecutive hit pairs handed to `observed_transition`
    pub transitions: usize,
    /// Consecutive hit pairs too far apart to connect
    pub skipped_jumps: usize,
    /// Faces newly touched by probe rings
    pub touched: usize,
}

impl std::ops::AddAssign for TraceReport {
    fn add_assign(&mut self, other: Self) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.transitions += other.transitions;
        self.skipped_jumps += other.skipped_jumps;
        self.touched += other.touched;
    }
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavStats {
    pub faces: usize,
    pub bodies: usize,
    pub visited: usize,
    pub touched: usize,
    pub walkable: usize,
    pub transitions: TagCounts,
}

/// Navigation state over one combined soup.
///
/// Cheap to clone apart from the face sets and transitions; the soup is
/// shared.
#[derive(Debug, Clone)]
pub struct MeshNavEngine {
    soup: Arc<CombinedSoup>,
    config: NavMeshConfig,
    visited: FaceSet,
    touched: FaceSet,
    walkable: FaceSet,
    transitions: TransitionGraph,
    navigation: OnceLock<NavigationMesh>,
}

impl MeshNavEngine {
    /// Builds the combined soup from `chunks` and an empty engine over it.
    pub fn build(chunks: &[SurfaceChunk], config: NavMeshConfig) -> Result<Self> {
        let soup = CombinedSoup::build(chunks, &config)?;
        Ok(Self::from_soup(Arc::new(soup), config))
    }

    pub fn from_soup(soup: Arc<CombinedSoup>, config: NavMeshConfig) -> Self {
        let n = soup.face_count();
        Self {
            soup,
            config,
            visited: FaceSet::new(n),
            touched: FaceSet::new(n),
            walkable: FaceSet::new(n),
            transitions: TransitionGraph::new(n),
            navigation: OnceLock::new(),
        }
    }

    pub fn soup(&self) -> &CombinedSoup {
        &self.soup
    }

    pub fn config(&self) -> &NavMeshConfig {
        &self.config
    }

    pub fn transitions(&self) -> &TransitionGraph {
        &self.transitions
    }

    // =========================================================================
    // Learning from traces
    // =========================================================================

    /// Projects trace points onto the soup and records the transitions
    /// between consecutive hit faces.
    pub fn add_trace(&mut self, points: &[Point3<f64>], apply_cylinder: bool) -> TraceReport {
        let soup = Arc::clone(&self.soup);
        let max_jump = self.config.max_connection_distance;
        let mut report = TraceReport::default();
        let mut previous: Option<RayHit> = None;

        for point in points {
            if apply_cylinder {
                for origin in self.probe_ring(point) {
                    if let Some(hit) = soup.face_below(&origin, &self.config) {
                        report.touched += usize::from(self.touched.insert(hit.face));
                    }
                }
            }

            let Some(hit) = soup.face_below(point, &self.config) else {
                report.misses += 1;
                continue;
            };
            report.hits += 1;
            self.visited.insert(hit.face);

            if let Some(last) = previous {
                if last.face != hit.face {
                    if (hit.point - last.point).norm() <= max_jump {
                        self.observed_transition(last.face, hit.face);
                        report.transitions += 1;
                    } else {
                        report.skipped_jumps += 1;
                    }
                }
            }
            previous = Some(hit);
        }

        tracing::trace!(
            points = points.len(),
            hits = report.hits,
            transitions = report.transitions,
            "Trace added"
        );
        report
    }

    fn probe_ring(&self, center: &Point3<f64>) -> Vec<Point3<f64>> {
        let n = self.config.probe_rays.max(1);
        let r = self.config.probe_radius;
        (0..n)
            .map(|k| {
                let angle = TAU * k as f64 / n as f64;
                center + Vector3::new(r * angle.cos(), 0.0, r * angle.sin())
            })
            .collect()
    }

    /// Records that someone walked from `face1` to `face2`.
    pub fn observed_transition(&mut self, face1: usize, face2: usize) {
        if face1 == face2 {
            return;
        }
        let soup = Arc::clone(&self.soup);

        if let Some(edge) = soup.adjacency.find_edge(face1, face2) {
            let weight = soup.adjacency.edges[edge].weight;
            self.record(face1, face2, TransitionTag::Observed, weight);
            return;
        }

        let (body1, body2) = (soup.body_of(face1), soup.body_of(face2));
        if body1 == body2 {
            self.observe_within_body(face1, face2);
            return;
        }

        let exit1 = soup
            .nearest_boundary(body1, &soup.center(face2))
            .unwrap_or(face1);
        self.observe_within_body(face1, exit1);
        let exit2 = soup
            .nearest_boundary(body2, &soup.center(exit1))
            .unwrap_or(face2);
        self.observe_within_body(exit2, face2);

        let weight = (soup.center(exit1) - soup.center(exit2)).norm();
        self.record(exit1, exit2, TransitionTag::Boundary, weight);
    }

    /// Tags the adjacency path between two faces of one body as observed.
    fn observe_within_body(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let soup = Arc::clone(&self.soup);
        let goal = soup.center(to);
        let Some((_, path)) = soup
            .adjacency
            .astar(from, to, |f| (soup.center(f) - goal).norm(), |_| true)
        else {
            return;
        };
        for pair in path.windows(2) {
            let weight = (soup.center(pair[0]) - soup.center(pair[1])).norm();
            self.record(pair[0], pair[1], TransitionTag::Observed, weight);
        }
    }

    fn record(&mut self, a: usize, b: usize, tag: TransitionTag, weight: f64) {
        let before = self.transitions.edge_count();
        self.transitions.record(a, b, tag, weight);
        if self.transitions.edge_count() != before {
            self.navigation = OnceLock::new();
        }
    }

    /// Flood-fills walkable faces from everything the traces reached.
    ///
    /// Returns the number of faces that became walkable.
    pub fn infer_walkable(&mut self) -> usize {
        let soup = Arc::clone(&self.soup);
        let mut queued = vec![false; soup.face_count()];
        let mut queue = VecDeque::new();
        let mut newly = 0;

        let seeds: Vec<usize> = self.visited.iter().chain(self.touched.iter()).collect();
        for seed in seeds {
            if !soup.slope_ok[seed] || queued[seed] {
                continue;
            }
            newly += usize::from(self.walkable.insert(seed));
            queued[seed] = true;
            queue.push_back(seed);
        }

        while let Some(face) = queue.pop_front() {
            for &(neighbor, edge) in soup.adjacency.incident(face) {
                if !(self.touched.contains(neighbor) || soup.walkable_ok[neighbor]) {
                    continue;
                }
                let weight = soup.adjacency.edges[edge].weight;
                self.record(face, neighbor, TransitionTag::Inferred, weight);
                newly += usize::from(self.walkable.insert(neighbor));
                if !queued[neighbor] {
                    queued[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        tracing::debug!(newly, walkable = self.walkable.len(), "Walkable faces inferred");
        newly
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Shortest path between two points over walkable faces.
    ///
    /// `Ok(None)` means both points are on the soup but no learned route
    /// joins them.
    pub fn find_path(
        &self,
        start: &Point3<f64>,
        target: &Point3<f64>,
    ) -> Result<Option<Vec<Point3<f64>>>> {
        let start_hit = self
            .soup
            .face_below(start, &self.config)
            .ok_or(NavError::NoFaceFound(Endpoint::Start))?;
        let target_hit = self
            .soup
            .face_below(target, &self.config)
            .ok_or(NavError::NoFaceFound(Endpoint::Target))?;
        let (s, t) = (start_hit.face, target_hit.face);
        if s == t {
            return Ok(Some(vec![*start, *target]));
        }

        let Some(route) = self
            .navigation_mesh()
            .route(self.soup.body_of(s), self.soup.body_of(t))
        else {
            return Ok(None);
        };
        let mut on_route = vec![false; self.soup.body_count];
        for body in route {
            on_route[body] = true;
        }

        let faces = self
            .search(s, t, |f| on_route[self.soup.body_of(f)])
            .or_else(|| {
                tracing::trace!("Body route too narrow, searching all walkable faces");
                self.search(s, t, |_| true)
            });

        Ok(faces.map(|faces| {
            let last = faces.len() - 1;
            faces
                .iter()
                .enumerate()
                .map(|(i, &f)| match i {
                    0 => *start,
                    i if i == last => *target,
                    _ => self.soup.center(f),
                })
                .collect()
        }))
    }

    fn search<F>(&self, s: usize, t: usize, in_scope: F) -> Option<Vec<usize>>
    where
        F: Fn(usize) -> bool,
    {
        let goal = self.soup.center(t);
        self.transitions
            .graph()
            .astar(
                s,
                t,
                |f| (self.soup.center(f) - goal).norm(),
                |f| (f == s || f == t || self.walkable.contains(f)) && in_scope(f),
            )
            .map(|(_, path)| path)
    }

    /// Line-of-sight shortcutting of a path returned by [`Self::find_path`].
    ///
    /// From each kept waypoint, jumps to the furthest later waypoint whose
    /// straight connection stays over walkable faces (the endpoint faces
    /// count as walkable).
    pub fn smooth_path(&self, path: &[Point3<f64>]) -> Vec<Point3<f64>> {
        if path.len() <= 2 {
            return path.to_vec();
        }
        let end_faces = [path[0], path[path.len() - 1]]
            .map(|p| self.soup.face_below(&p, &self.config).map(|hit| hit.face));
        let walkable = |face: usize| self.walkable.contains(face) || end_faces.contains(&Some(face));

        let mut smoothed = vec![path[0]];
        let mut i = 0;
        while i < path.len() - 1 {
            let furthest = ((i + 2)..path.len())
                .rev()
                .find(|&j| self.line_of_sight(&path[i], &path[j], &walkable))
                .unwrap_or(i + 1);
            smoothed.push(path[furthest]);
            i = furthest;
        }
        smoothed
    }

    fn line_of_sight<W>(&self, a: &Point3<f64>, b: &Point3<f64>, walkable: W) -> bool
    where
        W: Fn(usize) -> bool,
    {
        let delta = b - a;
        let step = self.config.los_step.max(1e-3);
        let samples = (delta.x.hypot(delta.z) / step).ceil().max(1.0) as usize;
        (0..=samples).all(|k| {
            let p = a + delta * (k as f64 / samples as f64);
            self.soup
                .face_below(&p, &self.config)
                .is_some_and(|hit| walkable(hit.face))
        })
    }

    /// Wall outlines of the soup at each height.
    pub fn infer_walls(&self, heights: &[f64]) -> Vec<(f64, Vec<Polyline>)> {
        heights
            .iter()
            .map(|&h| (h, slice_mesh(&self.soup.mesh, h)))
            .collect()
    }

    pub fn navigation_mesh(&self) -> &NavigationMesh {
        self.navigation
            .get_or_init(|| NavigationMesh::build(&self.soup, &self.transitions))
    }

    pub fn walkable_faces(&self) -> impl Iterator<Item = usize> + '_ {
        self.walkable.iter()
    }

    pub fn is_walkable(&self, face: usize) -> bool {
        self.walkable.contains(face)
    }

    pub fn is_visited(&self, face: usize) -> bool {
        self.visited.contains(face)
    }

    pub fn face_center(&self, face: usize) -> Point3<f64> {
        self.soup.center(face)
    }

    pub fn stats(&self) -> NavStats {
        NavStats {
            faces: self.soup.face_count(),
            bodies: self.soup.body_count,
            visited: self.visited.len(),
            touched: self.touched.len(),
            walkable: self.walkable.len(),
            transitions: self.transitions.counts(),
        }
    }
}
