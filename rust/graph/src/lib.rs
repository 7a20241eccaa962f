// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Wayfinder Graph
//!
//! Weighted undirected graph with the algorithms the navigation engine
//! and floor-plan extractor share:
//!
//! - A* with a caller-supplied heuristic, node filter and insertion-order
//!   tie-break
//! - connected components and component labels
//! - BFS distances and two-sweep diameter walks

pub mod graph;

pub use graph::{Graph, GraphEdge};
