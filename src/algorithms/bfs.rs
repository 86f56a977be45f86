//! Algorithm 1: bounded-depth BFS from a source (`spec.md` §4.4.1).

use std::collections::{HashSet, VecDeque};

use super::weight::extract as extract_weight;
use super::AlgorithmOptions;
use crate::backend::Backend;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::model::{Id, Node};
use crate::query::neighbors;

/// Runs a bounded-depth BFS from `source`.
///
/// Neighbor ordering within a level follows edge id (the backend's
/// documented deterministic tie-break) unless `weighted` is set, in which
/// case neighbors at each level are stably sorted by edge weight ascending
/// (descending if `opts.prefer_lower_weights` is `false`).
pub fn run(
    backend: &dyn Backend,
    source: &Id,
    depth: usize,
    weighted: bool,
    opts: &AlgorithmOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Node>> {
    let start = backend.get_node(source)?;

    let mut visited: HashSet<Id> = HashSet::new();
    visited.insert(start.id.clone());
    let mut order = vec![start.clone()];

    let mut frontier: VecDeque<(Id, usize)> = VecDeque::new();
    frontier.push_back((start.id.clone(), 0));

    while let Some((current, level)) = frontier.pop_front() {
        cancel.check()?;
        if level >= depth {
            continue;
        }
        let mut level_neighbors = neighbors(backend, &current, opts.direction, opts.edge_key.as_deref())?;
        level_neighbors.retain(|(id, _)| !visited.contains(id));

        if weighted {
            let mut weighted_neighbors = Vec::with_capacity(level_neighbors.len());
            for (id, edge) in level_neighbors {
                let w = extract_weight(&edge, &opts.weight_property, opts.default_weight)?;
                weighted_neighbors.push((id, w));
            }
            weighted_neighbors.sort_by(|a, b| {
                if opts.prefer_lower_weights {
                    a.1.partial_cmp(&b.1).unwrap()
                } else {
                    b.1.partial_cmp(&a.1).unwrap()
                }
            });
            for (id, _) in weighted_neighbors {
                if visited.insert(id.clone()) {
                    if let Ok(node) = backend.get_node(&id) {
                        order.push(node);
                    }
                    frontier.push_back((id, level + 1));
                }
            }
        } else {
            for (id, _) in level_neighbors {
                if visited.insert(id.clone()) {
                    if let Ok(node) = backend.get_node(&id) {
                        order.push(node);
                    }
                    frontier.push_back((id, level + 1));
                }
            }
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::ConflictPolicy;
    use crate::model::{Edge, Node};
    use crate::value::DataMap;

    fn fixture() -> MemoryBackend {
        let mut backend = MemoryBackend::new();
        for id in ["1", "2", "3"] {
            backend
                .insert_node(Node::new(Some(Id::from(id)), None, DataMap::new()), ConflictPolicy::Error)
                .unwrap();
        }
        backend
            .insert_edge(
                Edge::new(None, None, Id::from("1"), Id::from("2"), 5.0, DataMap::new()),
                ConflictPolicy::Error,
            )
            .unwrap();
        backend
            .insert_edge(
                Edge::new(None, None, Id::from("1"), Id::from("3"), 1.0, DataMap::new()),
                ConflictPolicy::Error,
            )
            .unwrap();
        backend
    }

    #[test]
    fn weighted_bfs_orders_by_ascending_weight() {
        let backend = fixture();
        let opts = AlgorithmOptions::default();
        let result = run(&backend, &Id::from("1"), 1, true, &opts, &CancellationToken::none()).unwrap();
        let ids: Vec<String> = result.iter().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
    }

    #[test]
    fn depth_zero_returns_only_source() {
        let backend = fixture();
        let opts = AlgorithmOptions::default();
        let result = run(&backend, &Id::from("1"), 0, false, &opts, &CancellationToken::none()).unwrap();
        assert_eq!(result.len(), 1);
    }
}
