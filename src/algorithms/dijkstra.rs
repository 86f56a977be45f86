//! Algorithm 2: single-pair shortest path via Dijkstra (`spec.md` §4.4.2).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use ordered_float::OrderedFloat;

use super::weight::extract as extract_weight;
use super::AlgorithmOptions;
use crate::backend::Backend;
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::model::{Id, Node};
use crate::query::neighbors;

/// The result of a successful shortest-path query.
#[derive(Debug, Clone)]
pub struct ShortestPath {
    /// The nodes on the path, source first, target last.
    pub path: Vec<Node>,
    /// The sum of the edge weights along the path.
    pub distance: f64,
}

/// Finds the shortest path from `source` to `target` by Dijkstra's
/// algorithm. Negative weights are rejected with [`Error::InvalidWeight`];
/// an unreachable target surfaces [`Error::NoPath`]. Ties are broken by
/// whichever node was first discovered (the heap key orders by distance
/// then by id, so equal-distance candidates pop in a fixed, deterministic
/// order and the first one to relax a neighbor keeps its predecessor).
pub fn run(
    backend: &dyn Backend,
    source: &Id,
    target: &Id,
    opts: &AlgorithmOptions,
    cancel: &CancellationToken,
) -> Result<ShortestPath> {
    backend.get_node(source)?;
    backend.get_node(target)?;

    let mut dist: HashMap<Id, f64> = HashMap::new();
    let mut prev: HashMap<Id, Id> = HashMap::new();
    let mut visited: HashMap<Id, bool> = HashMap::new();
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, Id)>> = BinaryHeap::new();

    dist.insert(source.clone(), 0.0);
    heap.push(Reverse((OrderedFloat(0.0), source.clone())));

    while let Some(Reverse((OrderedFloat(d), node))) = heap.pop() {
        cancel.check()?;
        if *visited.get(&node).unwrap_or(&false) {
            continue;
        }
        visited.insert(node.clone(), true);

        if node == *target {
            return Ok(ShortestPath {
                path: reconstruct_path(backend, source, target, &prev)?,
                distance: d,
            });
        }

        for (neighbor, edge) in neighbors(backend, &node, opts.direction, opts.edge_key.as_deref())? {
            if *visited.get(&neighbor).unwrap_or(&false) {
                continue;
            }
            let weight = extract_weight(&edge, &opts.weight_property, opts.default_weight)?;
            if weight < 0.0 {
                return Err(Error::InvalidWeight);
            }
            let candidate = d + weight;
            let better = match dist.get(&neighbor) {
                Some(existing) => candidate < *existing,
                None => true,
            };
            if better {
                dist.insert(neighbor.clone(), candidate);
                prev.insert(neighbor.clone(), node.clone());
                heap.push(Reverse((OrderedFloat(candidate), neighbor)));
            }
        }
    }

    Err(Error::NoPath)
}

fn reconstruct_path(
    backend: &dyn Backend,
    source: &Id,
    target: &Id,
    prev: &HashMap<Id, Id>,
) -> Result<Vec<Node>> {
    let mut chain = vec![target.clone()];
    let mut current = target.clone();
    while current != *source {
        let Some(p) = prev.get(&current) else {
            break;
        };
        chain.push(p.clone());
        current = p.clone();
    }
    chain.reverse();
    chain.into_iter().map(|id| backend.get_node(&id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::ConflictPolicy;
    use crate::model::{Edge, Node};
    use crate::value::DataMap;

    fn insert_edge(backend: &mut MemoryBackend, key: Option<&str>, from: &str, to: &str, w: f64) {
        backend
            .insert_edge(
                Edge::new(None, key.map(str::to_string), Id::from(from), Id::from(to), w, DataMap::new()),
                ConflictPolicy::Error,
            )
            .unwrap();
    }

    fn fixture() -> MemoryBackend {
        let mut backend = MemoryBackend::new();
        for id in ["1", "2", "3", "4", "5"] {
            backend
                .insert_node(Node::new(Some(Id::from(id)), None, DataMap::new()), ConflictPolicy::Error)
                .unwrap();
        }
        insert_edge(&mut backend, Some("connection"), "1", "2", 1.0);
        insert_edge(&mut backend, Some("connection"), "2", "3", 2.0);
        insert_edge(&mut backend, Some("connection"), "3", "5", 3.0);
        insert_edge(&mut backend, Some("connection"), "1", "5", 10.0);
        backend
    }

    #[test]
    fn scenario_shortest_path() {
        let mut backend = fixture();
        let opts = AlgorithmOptions::default();
        let result = run(&backend, &Id::from("1"), &Id::from("5"), &opts, &CancellationToken::none()).unwrap();
        let ids: Vec<String> = result.path.iter().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "5"]);
        assert_eq!(result.distance, 6.0);

        insert_edge(&mut backend, None, "1", "5", 0.5);
        let result = run(&backend, &Id::from("1"), &Id::from("5"), &opts, &CancellationToken::none()).unwrap();
        let ids: Vec<String> = result.path.iter().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "5"]);
        assert_eq!(result.distance, 0.5);

        let mut restricted = opts.clone();
        restricted.edge_key = Some("connection".to_string());
        let result = run(&backend, &Id::from("1"), &Id::from("5"), &restricted, &CancellationToken::none()).unwrap();
        let ids: Vec<String> = result.path.iter().map(|n| n.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "5"]);
        assert_eq!(result.distance, 6.0);
    }

    #[test]
    fn unreachable_target_is_no_path() {
        let mut backend = fixture();
        backend
            .insert_node(Node::new(Some(Id::from("6")), None, DataMap::new()), ConflictPolicy::Error)
            .unwrap();
        let opts = AlgorithmOptions::default();
        let err = run(&backend, &Id::from("1"), &Id::from("6"), &opts, &CancellationToken::none()).unwrap_err();
        assert!(matches!(err, Error::NoPath));
    }
}
