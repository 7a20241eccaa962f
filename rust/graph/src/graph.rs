// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Weighted undirected graph for navigation queries.
//!
//! Nodes are dense indices (mesh faces, soup components, slice edges);
//! edges carry a weight and are stored once with a two-way adjacency
//! list. Callers keep per-node or per-edge payloads in parallel vectors
//! indexed by the ids this graph hands out.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// An edge in the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEdge {
    /// Source node index.
    pub source: usize,
    /// Target node index.
    pub target: usize,
    /// Traversal cost (distance between node anchors).
    pub weight: f64,
}

impl GraphEdge {
    /// The endpoint opposite `node`.
    #[inline]
    pub fn other(&self, node: usize) -> usize {
        if self.source == node {
            self.target
        } else {
            self.source
        }
    }
}

/// Undirected weighted graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub edges: Vec<GraphEdge>,
    /// Adjacency list: node index → list of (neighbor index, edge index).
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph with `n` isolated nodes.
    pub fn with_nodes(n: usize) -> Self {
        Self {
            edges: Vec::new(),
            adjacency: vec![Vec::new(); n],
        }
    }

    // =========================================================================
    // Graph mutation
    // =========================================================================

    /// Adds a node to the graph. Returns its index.
    pub fn add_node(&mut self) -> usize {
        self.adjacency.push(Vec::new());
        self.adjacency.len() - 1
    }

    /// Adds an undirected edge between two nodes. Returns its index.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) -> usize {
        let idx = self.edges.len();
        self.edges.push(GraphEdge {
            source,
            target,
            weight,
        });
        self.adjacency[source].push((target, idx));
        self.adjacency[target].push((source, idx));
        idx
    }

    // =========================================================================
    // Graph accessors
    // =========================================================================

    /// Returns the number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns the number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Returns the (neighbor index, edge index) pairs of a node.
    #[inline]
    pub fn incident(&self, node: usize) -> &[(usize, usize)] {
        &self.adjacency[node]
    }

    /// Returns the neighbors of a node as (neighbor_index, edge_weight) pairs.
    pub fn neighbors(&self, node: usize) -> Vec<(usize, f64)> {
        self.adjacency[node]
            .iter()
            .map(|&(neighbor, edge_idx)| (neighbor, self.edges[edge_idx].weight))
            .collect()
    }

    /// Returns the degree (number of connections) of a node.
    #[inline]
    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    /// Index of the edge joining `a` and `b`, if any.
    pub fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        let (from, to) = if self.degree(a) <= self.degree(b) {
            (a, b)
        } else {
            (b, a)
        };
        self.adjacency[from]
            .iter()
            .find(|&&(neighbor, _)| neighbor == to)
            .map(|&(_, edge)| edge)
    }

    // =========================================================================
    // Path finding
    // =========================================================================

    /// A* from `source` to `target`.
    ///
    /// `heuristic(n)` must not overestimate the remaining cost. Only nodes
    /// for which `allow(n)` holds are entered (the endpoints included).
    /// Entries with equal estimated cost are expanded in insertion order, so
    /// results are deterministic for a given graph.
    ///
    /// Returns `(total_cost, path_node_indices)` or `None` if no path exists.
    pub fn astar<H, A>(
        &self,
        source: usize,
        target: usize,
        heuristic: H,
        allow: A,
    ) -> Option<(f64, Vec<usize>)>
    where
        H: Fn(usize) -> f64,
        A: Fn(usize) -> bool,
    {
        let n = self.node_count();
        if source >= n || target >= n || !allow(source) || !allow(target) {
            return None;
        }

        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut heap = BinaryHeap::new();
        let mut sequence = 0u64;

        dist[source] = 0.0;
        heap.push(SearchState {
            estimate: heuristic(source),
            cost: 0.0,
            node: source,
            sequence,
        });

        while let Some(SearchState { cost, node, .. }) = heap.pop() {
            if closed[node] {
                continue;
            }
            if node == target {
                return Some((cost, reconstruct(&prev, source, target)));
            }
            closed[node] = true;

            for &(neighbor, edge_idx) in &self.adjacency[node] {
                if closed[neighbor] || !allow(neighbor) {
                    continue;
                }
                let next_cost = cost + self.edges[edge_idx].weight;
                if next_cost < dist[neighbor] {
                    dist[neighbor] = next_cost;
                    prev[neighbor] = Some(node);
                    sequence += 1;
                    heap.push(SearchState {
                        estimate: next_cost + heuristic(neighbor),
                        cost: next_cost,
                        node: neighbor,
                        sequence,
                    });
                }
            }
        }

        None
    }

    /// Dijkstra's shortest path from source to target.
    pub fn shortest_path(&self, source: usize, target: usize) -> Option<(f64, Vec<usize>)> {
        self.astar(source, target, |_| 0.0, |_| true)
    }

    // =========================================================================
    // Connected components
    // =========================================================================

    /// Returns connected components as lists of node indices.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let n = self.node_count();
        let mut visited = vec![false; n];
        let mut components = Vec::new();

        for start in 0..n {
            if visited[start] {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            visited[start] = true;
            queue.push_back(start);

            while let Some(node) = queue.pop_front() {
                component.push(node);
                for &(neighbor, _) in &self.adjacency[node] {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }

            components.push(component);
        }

        components
    }

    /// Component id per node, numbered in order of lowest member index.
    pub fn component_labels(&self) -> (Vec<usize>, usize) {
        let mut labels = vec![usize::MAX; self.node_count()];
        let components = self.connected_components();
        for (label, members) in components.iter().enumerate() {
            for &node in members {
                labels[node] = label;
            }
        }
        (labels, components.len())
    }

    // =========================================================================
    // Diameter walks
    // =========================================================================

    /// Longest shortest (hop-count) path inside the component of `start`.
    ///
    /// Two BFS sweeps: the farthest node from `start`, then the farthest
    /// node from that one. Exact on trees and chains, which is what slice
    /// graphs are.
    pub fn diameter_path(&self, start: usize) -> Vec<usize> {
        let (first_sweep, _) = self.bfs(start);
        let a = farthest(&first_sweep).unwrap_or(start);
        let (second_sweep, prev) = self.bfs(a);
        let b = farthest(&second_sweep).unwrap_or(a);
        reconstruct(&prev, a, b)
    }

    /// BFS distance from a source to all other nodes (`usize::MAX` when unreachable).
    pub fn bfs_distances(&self, source: usize) -> Vec<usize> {
        self.bfs(source).0
    }

    fn bfs(&self, source: usize) -> (Vec<usize>, Vec<Option<usize>>) {
        let n = self.node_count();
        let mut dist = vec![usize::MAX; n];
        let mut prev = vec![None; n];
        let mut queue = VecDeque::new();

        dist[source] = 0;
        queue.push_back(source);

        while let Some(node) = queue.pop_front() {
            for &(neighbor, _) in &self.adjacency[node] {
                if dist[neighbor] == usize::MAX {
                    dist[neighbor] = dist[node] + 1;
                    prev[neighbor] = Some(node);
                    queue.push_back(neighbor);
                }
            }
        }

        (dist, prev)
    }
}

/// Reachable node with the largest distance; lowest index wins ties.
fn farthest(dist: &[usize]) -> Option<usize> {
    dist.iter()
        .enumerate()
        .filter(|&(_, &d)| d != usize::MAX)
        .fold(None, |best: Option<(usize, usize)>, (node, &d)| match best {
            Some((_, best_dist)) if best_dist >= d => best,
            _ => Some((node, d)),
        })
        .map(|(node, _)| node)
}

fn reconstruct(prev: &[Option<usize>], source: usize, target: usize) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = target;
    while current != source {
        path.push(current);
        match prev[current] {
            Some(p) => current = p,
            None => break,
        }
    }
    path.push(source);
    path.reverse();
    path
}

/// Internal state for the A* priority queue (min-heap by estimate, then insertion order).
#[derive(Debug, Clone, Copy)]
struct SearchState {
    estimate: f64,
    cost: f64,
    node: usize,
    sequence: u64,
}

impl PartialEq for SearchState {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchState {}

impl PartialOrd for SearchState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchState {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
