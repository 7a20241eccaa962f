// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Face-to-face transitions with provenance

use wayfinder_graph::Graph;

/// How a transition edge came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionTag {
    /// A trace walked across it
    Observed,
    /// Stitches two bodies (scan chunks or disconnected parts)
    Boundary,
    /// Added by walkable-surface flood fill
    Inferred,
}

/// Per-tag edge counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TagCounts {
    pub observed: usize,
    pub boundary: usize,
    pub inferred: usize,
}

/// Undirected transition graph over soup faces
#[derive(Debug, Clone, Default)]
pub struct TransitionGraph {
    graph: Graph,
    tags: Vec<TransitionTag>,
    hits: Vec<u32>,
}

impl TransitionGraph {
    pub fn new(face_count: usize) -> Self {
        Self {
            graph: Graph::with_nodes(face_count),
            tags: Vec::new(),
            hits: Vec::new(),
        }
    }

    /// Records a transition; returns `true` if the edge is new.
    ///
    /// An existing edge keeps its tag unless the new tag is `Observed`,
    /// which always wins. Every `Observed` record adds one hit.
    pub fn record(&mut self, a: usize, b: usize, tag: TransitionTag, weight: f64) -> bool {
        if a == b {
            return false;
        }
        let bump = u32::from(tag == TransitionTag::Observed);
        match self.graph.find_edge(a, b) {
            Some(edge) => {
                if tag == TransitionTag::Observed {
                    self.tags[edge] = tag;
                }
                self.hits[edge] += bump;
                false
            }
            None => {
                self.graph.add_edge(a, b, weight);
                self.tags.push(tag);
                self.hits.push(bump);
                true
            }
        }
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.graph.find_edge(a, b).is_some()
    }

    /// Tag and hit count of the edge between `a` and `b`
    pub fn edge(&self, a: usize, b: usize) -> Option<(TransitionTag, u32)> {
        self.graph
            .find_edge(a, b)
            .map(|e| (self.tags[e], self.hits[e]))
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Edges as `(a, b, tag)`
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, TransitionTag)> + '_ {
        self.graph
            .edges
            .iter()
            .zip(&self.tags)
            .map(|(e, &tag)| (e.source, e.target, tag))
    }

    pub fn counts(&self) -> TagCounts {
        self.tags.iter().fold(TagCounts::default(), |mut acc, tag| {
            match tag {
                TransitionTag::Observed => acc.observed += 1,
                TransitionTag::Boundary => acc.boundary += 1,
                TransitionTag::Inferred => acc.inferred += 1,
            }
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_upgrades_and_counts_hits() {
        let mut t = TransitionGraph::new(4);
        assert!(t.record(0, 1, TransitionTag::Inferred, 1.0));
        assert!(!t.record(1, 0, TransitionTag::Observed, 1.0));
        assert!(!t.record(0, 1, TransitionTag::Observed, 1.0));
        assert!(!t.record(0, 1, TransitionTag::Inferred, 1.0));
        assert_eq!(t.edge(0, 1), Some((TransitionTag::Observed, 2)));

        assert!(t.record(2, 3, TransitionTag::Boundary, 0.5));
        assert!(!t.record(2, 2, TransitionTag::Observed, 0.0));
        assert_eq!(
            t.counts(),
            TagCounts {
                observed: 1,
                boundary: 1,
                inferred: 0
            }
        );
        assert_eq!(t.iter().count(), 2);
    }
}
