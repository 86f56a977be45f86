//! Algorithm 4: minimum spanning tree via Kruskal (`spec.md` §4.4.4).

use std::collections::HashMap;

use super::weight::extract as extract_weight;
use super::AlgorithmOptions;
use crate::access::{visible_edges, visible_nodes};
use crate::backend::Backend;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::model::{Edge, Id};

/// A disjoint-set union with path compression and union-by-rank, used to
/// decide whether Kruskal's next cheapest edge connects two previously
/// separate components (`spec.md` §9, "no stack recursion over graph size").
struct DisjointSet {
    parent: HashMap<Id, Id>,
    rank: HashMap<Id, u32>,
}

impl DisjointSet {
    fn new(ids: impl IntoIterator<Item = Id>) -> Self {
        let mut parent = HashMap::new();
        let mut rank = HashMap::new();
        for id in ids {
            rank.insert(id.clone(), 0);
            parent.insert(id.clone(), id);
        }
        Self { parent, rank }
    }

    fn find(&mut self, id: &Id) -> Id {
        let mut root = id.clone();
        while self.parent[&root] != root {
            root = self.parent[&root].clone();
        }
        // Path compression: point every visited node directly at the root.
        let mut current = id.clone();
        while current != root {
            let next = self.parent[&current].clone();
            self.parent.insert(current, root.clone());
            current = next;
        }
        root
    }

    /// Unions the sets containing `a` and `b`. Returns `true` if they were
    /// in different sets (and are now joined).
    fn union(&mut self, a: &Id, b: &Id) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let rank_a = self.rank[&ra];
        let rank_b = self.rank[&rb];
        if rank_a < rank_b {
            self.parent.insert(ra, rb);
        } else if rank_a > rank_b {
            self.parent.insert(rb, ra);
        } else {
            self.parent.insert(rb, ra.clone());
            self.rank.insert(ra, rank_a + 1);
        }
        true
    }
}

/// The minimum spanning forest across the graph's connected components.
#[derive(Debug, Clone)]
pub struct SpanningTree {
    /// The edges chosen for the tree, in the order they were accepted.
    pub edges: Vec<Edge>,
    /// The sum of the chosen edges' weights.
    pub total_weight: f64,
}

/// Builds a minimum spanning forest by Kruskal's algorithm over the
/// undirected projection (direction is irrelevant: an edge connects its
/// two endpoints regardless of which is `source`). The reserved
/// access-control subgraph is excluded, both its nodes (or `DisjointSet`
/// would never have seeded a slot for them) and its edges.
pub fn run(backend: &dyn Backend, opts: &AlgorithmOptions, cancel: &CancellationToken) -> Result<SpanningTree> {
    let nodes = visible_nodes(backend)?;
    let mut dsu = DisjointSet::new(nodes.iter().map(|n| n.id.clone()));

    let mut candidates = Vec::new();
    for edge in visible_edges(backend)? {
        if let Some(key) = &opts.edge_key {
            if edge.key.as_deref() != Some(key.as_str()) {
                continue;
            }
        }
        let weight = extract_weight(&edge, &opts.weight_property, opts.default_weight)?;
        candidates.push((weight, edge));
    }
    candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then_with(|| a.1.id.cmp(&b.1.id)));

    let mut tree = SpanningTree {
        edges: Vec::new(),
        total_weight: 0.0,
    };

    for (weight, edge) in candidates {
        cancel.check()?;
        if edge.source == edge.target {
            continue;
        }
        if dsu.union(&edge.source, &edge.target) {
            tree.total_weight += weight;
            tree.edges.push(edge);
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::ConflictPolicy;
    use crate::model::Node;
    use crate::value::DataMap;

    fn node(backend: &mut MemoryBackend, id: &str) {
        backend
            .insert_node(Node::new(Some(Id::from(id)), None, DataMap::new()), ConflictPolicy::Error)
            .unwrap();
    }

    fn edge(backend: &mut MemoryBackend, from: &str, to: &str, w: f64) {
        backend
            .insert_edge(
                Edge::new(None, None, Id::from(from), Id::from(to), w, DataMap::new()),
                ConflictPolicy::Error,
            )
            .unwrap();
    }

    #[test]
    fn mst_is_a_tree_with_minimum_weight() {
        let mut backend = MemoryBackend::new();
        for id in ["a", "b", "c", "d"] {
            node(&mut backend, id);
        }
        edge(&mut backend, "a", "b", 1.0);
        edge(&mut backend, "b", "c", 2.0);
        edge(&mut backend, "c", "d", 3.0);
        edge(&mut backend, "a", "d", 10.0);
        edge(&mut backend, "a", "c", 10.0);

        let opts = AlgorithmOptions::default();
        let tree = run(&backend, &opts, &CancellationToken::none()).unwrap();
        assert_eq!(tree.edges.len(), 3);
        assert_eq!(tree.total_weight, 6.0);
    }
}
