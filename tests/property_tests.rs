use graphos_core::access::scope_matches;
use graphos_core::algorithms::{components, mst, AlgorithmOptions};
use graphos_core::backend::memory::MemoryBackend;
use graphos_core::backend::ConflictPolicy;
use graphos_core::cancel::CancellationToken;
use graphos_core::model::{Edge, Id, Node};
use graphos_core::value::DataMap;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

fn random_graph(seed: u64, node_count: usize, extra_edges: usize) -> MemoryBackend {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut backend = MemoryBackend::new();
    let ids: Vec<Id> = (0..node_count).map(|i| Id::from(format!("n{i}"))).collect();
    for id in &ids {
        backend
            .insert_node(Node::new(Some(id.clone()), None, DataMap::new()), ConflictPolicy::Error)
            .unwrap();
    }
    let mut edge_count = 0usize;
    for i in 1..node_count {
        let parent = rng.gen_range(0..i);
        let weight = rng.gen_range(1..50) as f64;
        backend
            .insert_edge(
                Edge::new(None, None, ids[parent].clone(), ids[i].clone(), weight, DataMap::new()),
                ConflictPolicy::Error,
            )
            .unwrap();
        edge_count += 1;
    }
    for _ in 0..extra_edges {
        let a = rng.gen_range(0..node_count);
        let b = rng.gen_range(0..node_count);
        if a == b {
            continue;
        }
        let weight = rng.gen_range(1..50) as f64;
        backend
            .insert_edge(
                Edge::new(None, None, ids[a].clone(), ids[b].clone(), weight, DataMap::new()),
                ConflictPolicy::Error,
            )
            .unwrap();
        edge_count += 1;
    }
    let _ = edge_count;
    backend
}

/// Builds a random connected graph (a random spanning structure plus extra
/// chords) for several seeds, and checks the two universal properties
/// `spec.md` §8 names: components partition the vertex set exactly, and an
/// MST over a connected graph is a tree with exactly `|V| - 1` edges.
#[test]
fn random_connected_graphs_satisfy_components_and_mst_invariants() {
    for seed in 0..20u64 {
        let backend = random_graph(seed, 12, 8);

        let parts = components::run(&backend, None, &CancellationToken::none()).unwrap();
        assert_eq!(parts.len(), 1, "seed {seed}: spanning-structure graph must be one component");
        let mut seen = HashSet::new();
        for node in parts.into_iter().flatten() {
            assert!(seen.insert(node.id), "seed {seed}: node appeared in more than one component");
        }
        assert_eq!(seen.len(), 12);

        let tree = mst::run(&backend, &AlgorithmOptions::default(), &CancellationToken::none()).unwrap();
        assert_eq!(tree.edges.len(), 11, "seed {seed}: MST of a connected 12-node graph has 11 edges");
        let recomputed: f64 = tree.edges.iter().map(|e| e.weight).sum();
        assert!((recomputed - tree.total_weight).abs() < 1e-9);
    }
}

proptest! {
    #[test]
    fn normalize_output_always_within_unit_range(values in prop::collection::vec(-1e6f64..1e6, 1..30)) {
        let normalized = graphos_core::algorithms::weight::normalize(&values);
        prop_assert_eq!(normalized.len(), values.len());
        for v in normalized {
            prop_assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn scope_matches_is_reflexive(scope in "[a-z]{1,8}(:[a-z0-9]{1,8})?") {
        prop_assert!(scope_matches(&scope, &scope));
    }

    #[test]
    fn wildcard_scope_matches_prefixed_resource(prefix in "[a-z]{1,8}", suffix in "[a-z0-9/_.]{0,12}") {
        let pattern = format!("{prefix}:*");
        let resource = format!("{prefix}:{suffix}");
        prop_assert!(scope_matches(&pattern, &resource));
    }

    #[test]
    fn star_matches_anything(resource in "[a-zA-Z0-9:/_.-]{0,20}") {
        prop_assert!(scope_matches("*", &resource));
    }
}
