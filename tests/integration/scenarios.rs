//! End-to-end façade tests covering the store's literal test scenarios,
//! run against the public API only (no internal module access).

use graphos_core::access::{AccessContext, Permission};
use graphos_core::cancel::CancellationToken;
use graphos_core::config::{GraphOptions, StoreOptions};
use graphos_core::error::Error;
use graphos_core::model::Id;
use graphos_core::store::{Algorithm, AlgorithmResult, Store};
use graphos_core::transaction::{Operation, OperationData};
use graphos_core::value::DataMap;

fn create_node(id: &str) -> Operation {
    Operation::new(OperationData::CreateNode {
        id: Some(Id::from(id)),
        key: None,
        data: DataMap::new(),
        schema: None,
    })
}

fn create_edge(id: &str, source: &str, target: &str, weight: f64) -> Operation {
    Operation::new(OperationData::CreateEdge {
        id: Some(Id::from(id)),
        key: None,
        source: Id::from(source),
        target: Id::from(target),
        weight,
        data: DataMap::new(),
    })
}

#[test]
fn transaction_commits_atomically_or_not_at_all() {
    let store = Store::default();
    let graph = store.init(GraphOptions::named("commits")).unwrap();

    let ops = vec![
        create_node("a"),
        create_node("b"),
        create_edge("e1", "a", "b", 1.0),
        Operation::new(OperationData::DeleteNode { id: Id::from("a") }),
    ];
    let err = store
        .execute(&graph, ops, None, &CancellationToken::none())
        .unwrap_err();
    assert!(matches!(err, Error::DanglingReference { .. }));

    assert!(store.get_node(&graph, &Id::from("a"), None).is_err());
    assert!(store.get_node(&graph, &Id::from("b"), None).is_err());
}

#[test]
fn committed_transaction_can_be_rolled_back_and_rollback_is_idempotent() {
    let store = Store::default();
    let graph = store.init(GraphOptions::named("rollback")).unwrap();

    let (tx_id, results) = store
        .execute(&graph, vec![create_node("n1")], None, &CancellationToken::none())
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(store.get_node(&graph, &Id::from("n1"), None).is_ok());

    store.rollback(&graph, tx_id).unwrap();
    assert!(store.get_node(&graph, &Id::from("n1"), None).is_err());

    // Repeating the rollback must not error and must not resurrect anything.
    store.rollback(&graph, tx_id).unwrap();
    assert!(store.get_node(&graph, &Id::from("n1"), None).is_err());
}

#[test]
fn access_control_grants_scoped_permission_and_rejects_the_rest() {
    let store = Store::default();
    let graph = store.init(GraphOptions::with_id("acl", "acl")).unwrap();

    store
        .define_actor(&graph, Id::from("user:alice"), DataMap::new())
        .unwrap();
    store
        .define_scope(&graph, Id::from("filesystem:*"), DataMap::new())
        .unwrap();
    store
        .grant_permission(&graph, &Id::from("user:alice"), &Id::from("filesystem:*"), &["read", "write"])
        .unwrap();

    assert!(store
        .can(&graph, &Id::from("user:alice"), "filesystem:/tmp/x", Permission::Read)
        .unwrap());
    assert!(!store
        .can(&graph, &Id::from("user:alice"), "network:http", Permission::Read)
        .unwrap());
}

#[test]
fn protected_entities_require_admin_on_the_enclosing_graph() {
    let store = Store::new(StoreOptions {
        access_control_default: true,
        ..StoreOptions::default()
    });
    let graph = store.init(GraphOptions::with_id("protected", "protected")).unwrap();

    store
        .define_actor(&graph, Id::from("user:alice"), DataMap::new())
        .unwrap();
    store
        .grant_permission(&graph, &Id::from("user:alice"), &Id::from("graph:protected"), &["write"])
        .unwrap();
    let ctx = AccessContext::new("user:alice", "protected");

    let ops = vec![Operation::new(OperationData::UpdateNode {
        id: Id::from("access:root"),
        patch: DataMap::new(),
    })];
    let err = store
        .execute(&graph, ops, Some(&ctx), &CancellationToken::none())
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));

    store
        .grant_permission(&graph, &Id::from("user:alice"), &Id::from("graph:protected"), &["admin"])
        .unwrap();
    let ops = vec![Operation::new(OperationData::UpdateNode {
        id: Id::from("access:root"),
        patch: DataMap::new(),
    })];
    store
        .execute(&graph, ops, Some(&ctx), &CancellationToken::none())
        .unwrap();
}

#[test]
fn shortest_path_respects_an_edge_key_restriction() {
    let store = Store::default();
    let graph = store.init(GraphOptions::named("paths")).unwrap();

    let ops = vec![
        create_node("1"),
        create_node("2"),
        create_node("3"),
        create_node("4"),
        create_node("5"),
        Operation::new(OperationData::CreateEdge {
            id: Some(Id::from("e12")),
            key: Some("connection".into()),
            source: Id::from("1"),
            target: Id::from("2"),
            weight: 1.0,
            data: DataMap::new(),
        }),
        Operation::new(OperationData::CreateEdge {
            id: Some(Id::from("e23")),
            key: Some("connection".into()),
            source: Id::from("2"),
            target: Id::from("3"),
            weight: 1.0,
            data: DataMap::new(),
        }),
        Operation::new(OperationData::CreateEdge {
            id: Some(Id::from("e34")),
            key: Some("connection".into()),
            source: Id::from("3"),
            target: Id::from("4"),
            weight: 1.0,
            data: DataMap::new(),
        }),
        Operation::new(OperationData::CreateEdge {
            id: Some(Id::from("e45")),
            key: Some("connection".into()),
            source: Id::from("4"),
            target: Id::from("5"),
            weight: 1.0,
            data: DataMap::new(),
        }),
        Operation::new(OperationData::CreateEdge {
            id: Some(Id::from("shortcut")),
            key: Some("detour".into()),
            source: Id::from("1"),
            target: Id::from("5"),
            weight: 0.5,
            data: DataMap::new(),
        }),
    ];
    store.execute(&graph, ops, None, &CancellationToken::none()).unwrap();

    let mut opts = graphos_core::algorithms::AlgorithmOptions::default();
    opts.edge_key = Some("connection".into());
    let result = store
        .traverse(
            &graph,
            Algorithm::ShortestPath {
                source: Id::from("1"),
                target: Id::from("5"),
            },
            &opts,
            None,
            &CancellationToken::none(),
        )
        .unwrap();
    match result {
        AlgorithmResult::Path(path) => {
            let ids: Vec<String> = path.path.iter().map(|n| n.id.to_string()).collect();
            assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        }
        _ => panic!("expected a Path result"),
    }
}

#[test]
fn disconnected_subgraphs_report_as_separate_components() {
    let store = Store::default();
    let graph = store.init(GraphOptions::named("components")).unwrap();

    let ops = vec![
        create_node("a"),
        create_node("b"),
        create_edge("ab", "a", "b", 1.0),
        create_node("x"),
        create_node("y"),
        create_edge("xy", "x", "y", 1.0),
    ];
    store.execute(&graph, ops, None, &CancellationToken::none()).unwrap();

    let result = store
        .traverse(
            &graph,
            Algorithm::ConnectedComponents,
            &graphos_core::algorithms::AlgorithmOptions::default(),
            None,
            &CancellationToken::none(),
        )
        .unwrap();
    match result {
        AlgorithmResult::Components(mut components) => {
            components.sort_by_key(|c| c.len());
            assert_eq!(components.len(), 2);
            assert_eq!(components[0].len(), 2);
        }
        _ => panic!("expected a Components result"),
    }
}

#[test]
fn wire_message_decodes_into_an_executable_operation() {
    use serde_json::json;

    let store = Store::default();
    let graph = store.init(GraphOptions::named("wire")).unwrap();

    let tuple = vec![json!("create"), json!("node"), json!({"id": "wired", "data": {"ok": true}})];
    let op = graphos_core::message::decode(&tuple).unwrap();
    let (_tx_id, results) = store
        .execute(&graph, vec![op], None, &CancellationToken::none())
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(store.get_node(&graph, &Id::from("wired"), None).is_ok());
}
