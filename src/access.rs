//! The access-control policy: a reserved subgraph plus the authorizer that
//! mediates every transaction, query, and result set (`spec.md` §4.6).
//!
//! The policy is itself ordinary entities in the `access:*` key namespace —
//! this module is the only code in the crate permitted to construct a
//! protected [`Node`]/[`Edge`] (`spec.md` §9, "Policy graph as ordinary
//! entities"). Everything here operates directly against a [`Backend`]; the
//! higher-level locking and idempotent-init behavior live in
//! [`crate::store`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, ConflictPolicy, EdgeFilter};
use crate::error::{Error, Result};
use crate::model::{Edge, Id, Node};
use crate::value::{DataMap, Value};

/// Id of the access-control root node.
pub const ROOT_ID: &str = "access:root";
const ACTOR_KEY: &str = "access:actor";
const SCOPE_KEY: &str = "access:scope";
const ACTOR_DEF_KEY: &str = "access:actor_def";
const SCOPE_DEF_KEY: &str = "access:scope_def";
const PERMISSION_KEY: &str = "access:permission";
const OPERATIONS_FIELD: &str = "operations";

/// One of the four operation kinds a permission edge may grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    /// Read access.
    Read,
    /// Write (create/update/delete) access.
    Write,
    /// Execute access, for collaborators that model invocation as a graph operation.
    Execute,
    /// Administrative access; supersedes the protected-entity rule.
    Admin,
}

impl Permission {
    fn as_str(self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
            Permission::Execute => "execute",
            Permission::Admin => "admin",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Permission::Read),
            "write" => Some(Permission::Write),
            "execute" => Some(Permission::Execute),
            "admin" => Some(Permission::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who is asking, and in which graph. Both fields are required by
/// construction: the Rust type system resolves `spec.md`'s
/// `missing_actor_or_graph` case to "the façade was not given a context at
/// all", rather than a context with a hole in it (see `DESIGN.md`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    /// The actor performing the operation.
    pub actor_id: Id,
    /// The graph the operation targets.
    pub graph_id: Id,
}

impl AccessContext {
    /// Builds a context for `actor_id` acting within `graph_id`.
    pub fn new(actor_id: impl Into<Id>, graph_id: impl Into<Id>) -> Self {
        Self {
            actor_id: actor_id.into(),
            graph_id: graph_id.into(),
        }
    }

    fn graph_scope(&self) -> String {
        format!("graph:{}", self.graph_id)
    }
}

/// Creates the root node (`access:root`, `protected: true`) if absent.
/// Idempotent: returns the existing root unchanged if one is already there.
pub fn init(backend: &mut dyn Backend) -> Result<Node> {
    let root_id = Id::from(ROOT_ID);
    if let Ok(existing) = backend.get_node(&root_id) {
        return Ok(existing);
    }
    let root = Node::new_protected(root_id, ROOT_ID, DataMap::new());
    backend.insert_node(root, ConflictPolicy::Error)
}

/// Creates an actor node and joins it to the root by an `access:actor_def` edge.
pub fn define_actor(backend: &mut dyn Backend, actor_id: Id, attributes: DataMap) -> Result<Node> {
    define_principal(backend, actor_id, attributes, ACTOR_KEY, ACTOR_DEF_KEY)
}

/// Creates a scope node and joins it to the root by an `access:scope_def` edge.
pub fn define_scope(backend: &mut dyn Backend, scope_id: Id, attributes: DataMap) -> Result<Node> {
    define_principal(backend, scope_id, attributes, SCOPE_KEY, SCOPE_DEF_KEY)
}

fn define_principal(
    backend: &mut dyn Backend,
    id: Id,
    attributes: DataMap,
    key: &str,
    def_edge_key: &str,
) -> Result<Node> {
    let node = Node::new_protected(id.clone(), key, attributes);
    let inserted = backend.insert_node(node, ConflictPolicy::Error)?;

    let def_edge = Edge::new_protected(
        Id::generate(),
        def_edge_key,
        Id::from(ROOT_ID),
        id,
        DataMap::new(),
    );
    if let Err(err) = backend.insert_edge(def_edge, ConflictPolicy::Error) {
        // Roll the node back out so a failed definition leaves no trace.
        let _ = backend.remove_node_raw(&inserted.id);
        return Err(err);
    }
    Ok(inserted)
}

/// Grants `actor_id` the given operations on `scope_id`.
///
/// `operations` is parsed against `{read, write, execute, admin}`; any
/// unrecognized entry fails the whole grant with
/// [`Error::InvalidOperations`] rather than silently dropping it.
pub fn grant_permission(
    backend: &mut dyn Backend,
    actor_id: &Id,
    scope_id: &Id,
    operations: &[&str],
) -> Result<Edge> {
    let mut parsed = BTreeSet::new();
    let mut invalid = Vec::new();
    for op in operations {
        match Permission::parse(op) {
            Some(p) => {
                parsed.insert(p);
            }
            None => invalid.push((*op).to_string()),
        }
    }
    if !invalid.is_empty() {
        return Err(Error::InvalidOperations(invalid));
    }

    let mut data = DataMap::new();
    data.insert(
        OPERATIONS_FIELD.into(),
        Value::List(parsed.iter().map(|p| Value::String(p.as_str().into())).collect()),
    );

    let edge = Edge::new_protected(
        Id::generate(),
        PERMISSION_KEY,
        actor_id.clone(),
        scope_id.clone(),
        data,
    );
    backend.insert_edge(edge, ConflictPolicy::Error)
}

fn edge_operations(edge: &Edge) -> BTreeSet<Permission> {
    match edge.data.get(OPERATIONS_FIELD) {
        Some(Value::List(items)) => items
            .iter()
            .filter_map(|v| v.as_str().and_then(Permission::parse))
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Matches a scope pattern against a resource scope id (`spec.md` §3
/// invariant 6): exact equality, the single literal `*`, or a `prefix:*`
/// matching by prefix.
pub fn scope_matches(pattern: &str, resource: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return resource.starts_with(prefix);
    }
    pattern == resource
}

/// True iff some permission edge from `actor_id` grants `operation` on a
/// scope matching `scope_id`.
pub fn can(backend: &dyn Backend, actor_id: &Id, scope_id: &str, operation: Permission) -> bool {
    let filter = EdgeFilter {
        source: Some(actor_id.clone()),
        target: None,
        key: Some(PERMISSION_KEY.to_string()),
    };
    let Ok(edges) = backend.iterate_edges(&filter) else {
        return false;
    };
    edges.iter().any(|edge| {
        scope_matches(&edge.target.to_string(), scope_id) && edge_operations(edge).contains(&operation)
    })
}

/// Every node outside the reserved `access:*` subgraph. Whole-graph reads
/// (structured queries, the five graph algorithms) run over this rather
/// than `Backend::all_nodes` directly, so the policy graph itself never
/// surfaces as traversable data (`spec.md` §3, "reserved key namespace").
pub fn visible_nodes(backend: &dyn Backend) -> Result<Vec<Node>> {
    Ok(backend.all_nodes()?.into_iter().filter(|n| !n.is_protected()).collect())
}

/// The edge-side counterpart of [`visible_nodes`].
pub fn visible_edges(backend: &dyn Backend) -> Result<Vec<Edge>> {
    Ok(backend.all_edges()?.into_iter().filter(|e| !e.is_protected()).collect())
}

fn protected_node(backend: &dyn Backend, id: &Id) -> bool {
    backend.get_node(id).map(|n| n.is_protected()).unwrap_or(false)
}

fn protected_edge(backend: &dyn Backend, id: &Id) -> bool {
    backend.get_edge(id).map(|e| e.is_protected()).unwrap_or(false)
}

fn require(ok: bool, op_label: impl Into<String>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(Error::Unauthorized(op_label.into()))
    }
}

/// Maps a transaction operation to the permission check `spec.md` §4.6
/// describes, and evaluates it against the current backend state.
///
/// Mutating an entity with `protected: true` additionally requires `admin`
/// on the enclosing graph's scope (`graph:<graph_id>`), per invariant 4 —
/// this supersedes the ordinary write check for that one operation.
pub fn authorize_operation(
    op: &crate::transaction::Operation,
    ctx: &AccessContext,
    backend: &dyn Backend,
) -> Result<()> {
    use crate::transaction::OperationData::*;

    match &op.data {
        CreateNode { .. } => require(
            can(backend, &ctx.actor_id, &ctx.graph_scope(), Permission::Write),
            "create node",
        ),
        CreateEdge { source, target, .. } => {
            require(
                can(backend, &ctx.actor_id, &source.to_string(), Permission::Write),
                "create edge: write on source",
            )?;
            require(
                can(backend, &ctx.actor_id, &target.to_string(), Permission::Read),
                "create edge: read on target",
            )
        }
        UpdateNode { id, .. } | DeleteNode { id } => authorize_mutation(backend, ctx, id, protected_node(backend, id), "node"),
        UpdateEdge { id, .. } | DeleteEdge { id } => authorize_mutation(backend, ctx, id, protected_edge(backend, id), "edge"),
        Noop => Ok(()),
        // Rollback-only variants never pass through the authorizer: `commit`
        // authorizes the user-supplied op list, and `rollback` replays the
        // inverse log directly without an authorization pass.
        RestoreNode(_) | RestoreEdge(_) | RestoreNodeCascade(..) => Ok(()),
    }
}

fn authorize_mutation(
    backend: &dyn Backend,
    ctx: &AccessContext,
    id: &Id,
    protected: bool,
    kind: &str,
) -> Result<()> {
    if protected {
        return require(
            can(backend, &ctx.actor_id, &ctx.graph_scope(), Permission::Admin),
            format!("mutate protected {kind}"),
        );
    }
    require(
        can(backend, &ctx.actor_id, &id.to_string(), Permission::Write),
        format!("mutate {kind}"),
    )
}

/// One element of a result set to be filtered by read permission.
#[derive(Debug, Clone)]
pub enum Readable {
    /// A node result.
    Node(Node),
    /// An edge result.
    Edge(Edge),
    /// Anything else, passed through unfiltered (the policy only scopes
    /// nodes and edges).
    Other,
}

/// Keeps only the elements of `results` the actor may read, preserving
/// their relative order (`spec.md` §4.6).
pub fn filter_results(results: Vec<Readable>, ctx: &AccessContext, backend: &dyn Backend) -> Vec<Readable> {
    results
        .into_iter()
        .filter(|item| match item {
            Readable::Node(n) => can(backend, &ctx.actor_id, &n.id.to_string(), Permission::Read),
            Readable::Edge(e) => can(backend, &ctx.actor_id, &e.id.to_string(), Permission::Read),
            Readable::Other => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;

    #[test]
    fn scope_pattern_matching() {
        assert!(scope_matches("*", "network:http"));
        assert!(scope_matches("filesystem:*", "filesystem:/tmp/x"));
        assert!(!scope_matches("filesystem:*", "network:http"));
        assert!(scope_matches("filesystem:/tmp/x", "filesystem:/tmp/x"));
    }

    #[test]
    fn scenario_grant_and_check() {
        let mut backend = MemoryBackend::new();
        init(&mut backend).unwrap();
        define_actor(&mut backend, Id::from("user:alice"), DataMap::new()).unwrap();
        define_scope(&mut backend, Id::from("filesystem:*"), DataMap::new()).unwrap();
        grant_permission(
            &mut backend,
            &Id::from("user:alice"),
            &Id::from("filesystem:*"),
            &["read", "write"],
        )
        .unwrap();

        assert!(can(&backend, &Id::from("user:alice"), "filesystem:/tmp/x", Permission::Read));
        assert!(!can(&backend, &Id::from("user:alice"), "network:http", Permission::Read));
    }

    #[test]
    fn invalid_operation_name_rejected() {
        let mut backend = MemoryBackend::new();
        init(&mut backend).unwrap();
        define_actor(&mut backend, Id::from("user:bob"), DataMap::new()).unwrap();
        define_scope(&mut backend, Id::from("net:*"), DataMap::new()).unwrap();
        let err = grant_permission(&mut backend, &Id::from("user:bob"), &Id::from("net:*"), &["teleport"])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperations(_)));
    }

    #[test]
    fn protected_root_requires_admin() {
        let mut backend = MemoryBackend::new();
        init(&mut backend).unwrap();
        define_actor(&mut backend, Id::from("user:alice"), DataMap::new()).unwrap();
        define_scope(&mut backend, Id::from("g1"), DataMap::new()).unwrap();
        grant_permission(&mut backend, &Id::from("user:alice"), &Id::from("g1"), &["write"]).unwrap();

        let ctx = AccessContext::new("user:alice", "g1");
        let op = crate::transaction::Operation::new(crate::transaction::OperationData::UpdateNode {
            id: Id::from(ROOT_ID),
            patch: DataMap::new(),
        });
        let err = authorize_operation(&op, &ctx, &backend).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));

        grant_permission(&mut backend, &Id::from("user:alice"), &Id::from("graph:g1"), &["admin"]).unwrap();
        authorize_operation(&op, &ctx, &backend).unwrap();
    }
}
