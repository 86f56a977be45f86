//! Algorithm 5: PageRank by power iteration (`spec.md` §4.4.5).

use std::collections::BTreeMap;

use super::weight::{extract as extract_weight, normalize};
use crate::access::{visible_edges, visible_nodes};
use crate::backend::Backend;
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::model::Id;

/// PageRank-specific options; distinct from [`super::AlgorithmOptions`]
/// because the algorithm's link structure is always the outgoing-edge
/// graph (rank flows along `source -> target`, representing a vote), so
/// `direction`/`prefer_lower_weights` don't apply here.
#[derive(Debug, Clone)]
pub struct PageRankOptions {
    /// Restrict the link graph to edges with this key/label.
    pub edge_key: Option<String>,
    /// Power-iteration round count. Defaults to `20`.
    pub iterations: u32,
    /// Damping factor. Defaults to `0.85`.
    pub damping: f64,
    /// `data` key consulted for a weight when `edge.weight` is unset.
    pub weight_property: String,
    /// Weight used when neither `edge.weight` nor `data[weight_property]` apply.
    pub default_weight: f64,
    /// When `true`, a node's rank is distributed across its out-edges in
    /// proportion to their min-max normalized weight rather than uniformly.
    pub weighted: bool,
}

impl Default for PageRankOptions {
    fn default() -> Self {
        Self {
            edge_key: None,
            iterations: 20,
            damping: 0.85,
            weight_property: "weight".to_string(),
            default_weight: 1.0,
            weighted: false,
        }
    }
}

/// Computes PageRank for every node in the graph. An empty graph yields an
/// empty mapping. Deterministic for a fixed committed state and options.
/// The reserved access-control subgraph never receives or contributes rank.
pub fn run(
    backend: &dyn Backend,
    opts: &PageRankOptions,
    cancel: &CancellationToken,
) -> Result<BTreeMap<Id, f64>> {
    let nodes = visible_nodes(backend)?;
    if nodes.is_empty() {
        return Ok(BTreeMap::new());
    }
    let n = nodes.len() as f64;

    let mut out_links: BTreeMap<Id, Vec<(Id, f64)>> = nodes.iter().map(|node| (node.id.clone(), Vec::new())).collect();

    let mut edges = Vec::new();
    for edge in visible_edges(backend)? {
        if let Some(key) = &opts.edge_key {
            if edge.key.as_deref() != Some(key.as_str()) {
                continue;
            }
        }
        if !out_links.contains_key(&edge.source) || !out_links.contains_key(&edge.target) {
            continue;
        }
        let weight = extract_weight(&edge, &opts.weight_property, opts.default_weight)?;
        edges.push((edge.source, edge.target, weight));
    }

    if opts.weighted {
        let raw: Vec<f64> = edges.iter().map(|(_, _, w)| *w).collect();
        let normalized = normalize(&raw);
        for ((source, target, _), weight) in edges.into_iter().zip(normalized) {
            out_links.get_mut(&source).unwrap().push((target, weight));
        }
    } else {
        for (source, target, _) in edges {
            out_links.get_mut(&source).unwrap().push((target, 1.0));
        }
    }

    let mut rank: BTreeMap<Id, f64> = nodes.iter().map(|node| (node.id.clone(), 1.0 / n)).collect();

    for _ in 0..opts.iterations {
        cancel.check()?;
        let mut next: BTreeMap<Id, f64> = nodes.iter().map(|node| (node.id.clone(), (1.0 - opts.damping) / n)).collect();
        let mut dangling_mass = 0.0;

        for node in &nodes {
            let source_rank = rank[&node.id];
            let links = &out_links[&node.id];
            let total_weight: f64 = links.iter().map(|(_, w)| *w).sum();

            if links.is_empty() {
                dangling_mass += source_rank;
                continue;
            }

            for (target, weight) in links {
                let share = if total_weight > 0.0 {
                    weight / total_weight
                } else {
                    1.0 / links.len() as f64
                };
                *next.get_mut(target).unwrap() += opts.damping * source_rank * share;
            }
        }

        if dangling_mass > 0.0 {
            let per_node = opts.damping * dangling_mass / n;
            for value in next.values_mut() {
                *value += per_node;
            }
        }

        rank = next;
    }

    Ok(rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::backend::ConflictPolicy;
    use crate::model::{Edge, Node};
    use crate::value::DataMap;

    #[test]
    fn empty_graph_yields_empty_mapping() {
        let backend = MemoryBackend::new();
        let ranks = run(&backend, &PageRankOptions::default(), &CancellationToken::none()).unwrap();
        assert!(ranks.is_empty());
    }

    #[test]
    fn rank_sums_to_approximately_one() {
        let mut backend = MemoryBackend::new();
        for id in ["a", "b", "c"] {
            backend
                .insert_node(Node::new(Some(Id::from(id)), None, DataMap::new()), ConflictPolicy::Error)
                .unwrap();
        }
        for (from, to) in [("a", "b"), ("b", "c"), ("c", "a")] {
            backend
                .insert_edge(
                    Edge::new(None, None, Id::from(from), Id::from(to), 1.0, DataMap::new()),
                    ConflictPolicy::Error,
                )
                .unwrap();
        }
        let ranks = run(&backend, &PageRankOptions::default(), &CancellationToken::none()).unwrap();
        let total: f64 = ranks.values().sum();
        assert!((total - 1.0).abs() < 1e-6);
        // A symmetric 3-cycle converges to equal rank for every node.
        for r in ranks.values() {
            assert!((r - 1.0 / 3.0).abs() < 1e-6);
        }
    }
}
