//! Structured queries: breadth-first reads over the store contract
//! (`spec.md` §4.4, "Structured queries").
//!
//! This is the simpler of the two read surfaces — the five graph algorithms
//! live in [`crate::algorithms`] and share the neighbor-walking helpers
//! defined here.

use std::collections::{HashSet, VecDeque};

use crate::backend::{Backend, EdgeFilter};
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::model::{Id, Node};
use crate::value::DataMap;

/// Which edges to follow from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Follow edges where the node is `source`.
    #[default]
    Outgoing,
    /// Follow edges where the node is `target`.
    Incoming,
    /// Follow both, ignoring direction (the undirected projection).
    Both,
}

/// A structured breadth-first read (`spec.md` §4.4).
#[derive(Debug, Clone)]
pub struct Query {
    /// The node to start the walk from.
    pub start_node_id: Id,
    /// Which edges to follow. Defaults to [`Direction::Outgoing`].
    pub direction: Direction,
    /// Restrict the walk to edges with this key/label.
    pub edge_key: Option<String>,
    /// Keep only visited nodes whose `data` contains every entry here.
    pub data: DataMap,
    /// Maximum BFS depth from the start node. Defaults to `1`.
    pub depth: usize,
    /// Maximum number of nodes to return. Defaults to `100`.
    pub limit: usize,
}

impl Query {
    /// Builds a query starting from `start_node_id`, with the documented defaults.
    pub fn new(start_node_id: Id) -> Self {
        Self {
            start_node_id,
            direction: Direction::Outgoing,
            edge_key: None,
            data: DataMap::new(),
            depth: 1,
            limit: 100,
        }
    }
}

/// Returns the neighbor ids reachable from `node` in `direction`, restricted
/// to `edge_key` if set, ordered by edge id.
///
/// Ordering by edge id is the backend's documented tie-breaker
/// (`spec.md` §4.4, "Result guarantees"); for auto-generated ids this
/// coincides with insertion order, since ids are UUIDv7.
pub(crate) fn neighbors(
    backend: &dyn Backend,
    node: &Id,
    direction: Direction,
    edge_key: Option<&str>,
) -> Result<Vec<(Id, crate::model::Edge)>> {
    let mut out = Vec::new();
    if matches!(direction, Direction::Outgoing | Direction::Both) {
        let filter = EdgeFilter {
            source: Some(node.clone()),
            target: None,
            key: edge_key.map(str::to_string),
        };
        for edge in backend.iterate_edges(&filter)? {
            let target = edge.target.clone();
            out.push((target, edge));
        }
    }
    if matches!(direction, Direction::Incoming | Direction::Both) {
        let filter = EdgeFilter {
            source: None,
            target: Some(node.clone()),
            key: edge_key.map(str::to_string),
        };
        for edge in backend.iterate_edges(&filter)? {
            let source = edge.source.clone();
            out.push((source, edge));
        }
    }
    out.sort_by(|a, b| a.1.id.cmp(&b.1.id));
    Ok(out)
}

/// Executes a structured BFS query against the backend.
///
/// Visits nodes breadth-first from `query.start_node_id`, filters by
/// `query.data`, and truncates to `query.limit`. An unknown start node
/// surfaces [`crate::error::Error::NotFound`].
pub fn execute(backend: &dyn Backend, query: &Query, cancel: &CancellationToken) -> Result<Vec<Node>> {
    let start = backend.get_node(&query.start_node_id)?;

    let mut visited: HashSet<Id> = HashSet::new();
    visited.insert(start.id.clone());

    let mut results = Vec::new();
    if matches_filter(&start, &query.data) {
        results.push(start.clone());
    }

    let mut frontier: VecDeque<(Id, usize)> = VecDeque::new();
    frontier.push_back((start.id.clone(), 0));

    while let Some((current, depth)) = frontier.pop_front() {
        cancel.check()?;
        if results.len() >= query.limit {
            break;
        }
        if depth >= query.depth {
            continue;
        }
        for (neighbor_id, edge) in neighbors(backend, &current, query.direction, query.edge_key.as_deref())? {
            let _ = &edge;
            if visited.contains(&neighbor_id) {
                continue;
            }
            visited.insert(neighbor_id.clone());
            let Ok(neighbor) = backend.get_node(&neighbor_id) else {
                continue;
            };
            if matches_filter(&neighbor, &query.data) {
                results.push(neighbor.clone());
                if results.len() >= query.limit {
                    break;
                }
            }
            frontier.push_back((neighbor_id, depth + 1));
        }
    }

    results.truncate(query.limit);
    Ok(results)
}

fn matches_filter(node: &Node, filter: &DataMap) -> bool {
    filter.iter().all(|(k, v)| node.data.get(k) == Some(v))
}
