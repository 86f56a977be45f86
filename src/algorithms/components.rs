//! Algorithm 3: connected components over the undirected projection
//! (`spec.md` §4.4.3).

use std::collections::{HashSet, VecDeque};

use crate::access::visible_nodes;
use crate::backend::Backend;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::model::Node;
use crate::query::{neighbors, Direction};

/// Partitions the graph's nodes into connected components, ignoring edge
/// direction (`direction` is forced to [`Direction::Both`] regardless of
/// caller options, per `spec.md`). Component ordering reflects the
/// discovery order of each component's first node, which in turn follows
/// the backend's id-ordered `all_nodes()`. The reserved access-control
/// subgraph is excluded, since it never shares an edge with ordinary data.
pub fn run(backend: &dyn Backend, edge_key: Option<&str>, cancel: &CancellationToken) -> Result<Vec<Vec<Node>>> {
    let all_nodes = visible_nodes(backend)?;
    let mut seen: HashSet<_> = HashSet::new();
    let mut components = Vec::new();

    for node in &all_nodes {
        if seen.contains(&node.id) {
            continue;
        }
        let mut component = Vec::new();
        let mut frontier = VecDeque::new();
        frontier.push_back(node.id.clone());
        seen.insert(node.id.clone());

        while let Some(current) = frontier.pop_front() {
            cancel.check()?;
            let Ok(current_node) = backend.get_node(&current) else {
                continue;
            };
            component.push(current_node);
            for (neighbor_id, _) in neighbors(backend, &current, Direction::Both, edge_key)? {
                if seen.insert(neighbor_id.clone()) {
                    frontier.push_back(neighbor_id);
                }
            }
        }
        components.push(component);
    }

    Ok(components)
}
