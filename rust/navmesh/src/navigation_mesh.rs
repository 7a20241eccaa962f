// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Body-level navigation mesh
//!
//! One node per soup body, one edge per pair of bodies joined by any
//! transition. Face-level searches use a route through this graph to
//! decide which bodies are worth expanding.

use rustc_hash::FxHashSet;
use wayfinder_geometry::{Point3, Vector3};
use wayfinder_graph::Graph;

use crate::soup::CombinedSoup;
use crate::transitions::TransitionGraph;

#[derive(Debug, Clone, Default)]
pub struct NavigationMesh {
    /// Mean face center per body
    pub centers: Vec<Point3<f64>>,
    graph: Graph,
}

impl NavigationMesh {
    pub fn build(soup: &CombinedSoup, transitions: &TransitionGraph) -> Self {
        let mut sums = vec![(Vector3::<f64>::zeros(), 0usize); soup.body_count];
        for f in 0..soup.face_count() {
            let entry = &mut sums[soup.body_of(f)];
            entry.0 += soup.center(f).coords;
            entry.1 += 1;
        }
        let centers: Vec<Point3<f64>> = sums
            .into_iter()
            .map(|(sum, n)| Point3::from(sum / n.max(1) as f64))
            .collect();

        let mut graph = Graph::with_nodes(centers.len());
        let mut linked: FxHashSet<(usize, usize)> = FxHashSet::default();
        for (a, b, _) in transitions.iter() {
            let (ba, bb) = (soup.body_of(a), soup.body_of(b));
            if ba == bb {
                continue;
            }
            let key = (ba.min(bb), ba.max(bb));
            if linked.insert(key) {
                graph.add_edge(ba, bb, (centers[ba] - centers[bb]).norm());
            }
        }

        Self { centers, graph }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Bodies on the shortest body-level route, endpoints included.
    pub fn route(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        if from == to {
            return Some(vec![from]);
        }
        let goal = self.centers[to];
        self.graph
            .astar(from, to, |n| (self.centers[n] - goal).norm(), |_| true)
            .map(|(_, path)| path)
    }
}
