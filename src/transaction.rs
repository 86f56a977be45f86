//! The transaction engine: ordered, all-or-nothing batches of operations.
//!
//! Commit proceeds exactly as `spec.md` §4.3 describes: authorize every
//! operation against list order (first denial aborts with no mutation),
//! stage-and-apply each operation against the backend while recording its
//! inverse, and roll back every applied operation in reverse order the
//! moment one fails. The inverse log produced by a successful commit is
//! itself a list of [`Operation`]s, so a later `rollback` call is literally
//! "commit the inverse list" — which is also what makes rolling back an
//! already-rolled-back transaction a no-op (`spec.md` §8 scenario 6): the
//! second rollback finds an inverse log of [`Action::Noop`] entries.

use uuid::Uuid;

use crate::backend::{Backend, ConflictPolicy};
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::model::{Edge, EntityKind, Id, Node};
use crate::value::DataMap;

/// Identifies a transaction for the purpose of a later `rollback` call.
pub type TxId = Uuid;

/// What an [`Operation`] does to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create a new entity.
    Create,
    /// Update an existing entity's data map.
    Update,
    /// Remove an entity.
    Delete,
    /// Do nothing; always succeeds. Used as the inverse of an already-undone operation.
    Noop,
}

/// Per-operation options. Only `conflict` is meaningful today (for `create`).
#[derive(Debug, Clone, Default)]
pub struct OperationOptions {
    /// Conflict policy applied when the create targets an id that already exists.
    pub conflict: ConflictPolicy,
}

/// The payload of a single transaction operation.
///
/// The `Restore*` variants are not part of the public transaction message
/// grammar (`spec.md` §6) — they exist only inside inverse logs, produced by
/// the engine itself to undo a `create`/`update`/`delete`.
#[derive(Debug, Clone)]
pub enum OperationData {
    /// Create a node. `id` defaults to a fresh id when `None`.
    CreateNode {
        /// Caller-supplied id, or `None` to auto-generate.
        id: Option<Id>,
        /// Optional label.
        key: Option<String>,
        /// Initial properties.
        data: DataMap,
        /// Optional schema reference.
        schema: Option<String>,
    },
    /// Create an edge. `id` defaults to a fresh id when `None`.
    CreateEdge {
        /// Caller-supplied id, or `None` to auto-generate.
        id: Option<Id>,
        /// Optional label.
        key: Option<String>,
        /// Source node id.
        source: Id,
        /// Target node id.
        target: Id,
        /// Edge weight.
        weight: f64,
        /// Initial properties.
        data: DataMap,
    },
    /// Merge `patch` into an existing node's data map.
    UpdateNode {
        /// The node to update.
        id: Id,
        /// Properties to merge in.
        patch: DataMap,
    },
    /// Merge `patch` into an existing edge's data map.
    UpdateEdge {
        /// The edge to update.
        id: Id,
        /// Properties to merge in.
        patch: DataMap,
    },
    /// Remove a node (and any edge now dangling because of it).
    DeleteNode {
        /// The node to remove.
        id: Id,
    },
    /// Remove an edge.
    DeleteEdge {
        /// The edge to remove.
        id: Id,
    },
    /// Do nothing.
    Noop,
    /// Internal: re-inserts a node verbatim (inverse of `create`/`update`/`delete node`).
    RestoreNode(Box<Node>),
    /// Internal: re-inserts an edge verbatim (inverse of `create`/`update`/`delete edge`).
    RestoreEdge(Box<Edge>),
    /// Internal: re-inserts a node and the edges that were cascade-removed with it
    /// (inverse of `delete node`).
    RestoreNodeCascade(Box<Node>, Vec<Edge>),
}

/// A single buffered transaction operation: `{action, entity_kind, data, options}`.
#[derive(Debug, Clone)]
pub struct Operation {
    /// The operation payload.
    pub data: OperationData,
    /// Per-operation options.
    pub options: OperationOptions,
}

impl Operation {
    /// Builds an operation with default options.
    pub fn new(data: OperationData) -> Self {
        Self {
            data,
            options: OperationOptions::default(),
        }
    }

    /// Builds an operation with explicit options (e.g. a non-default conflict policy).
    pub fn with_options(data: OperationData, options: OperationOptions) -> Self {
        Self { data, options }
    }

    /// The action this operation performs.
    pub fn action(&self) -> Action {
        match &self.data {
            OperationData::CreateNode { .. } | OperationData::CreateEdge { .. } => Action::Create,
            OperationData::UpdateNode { .. } | OperationData::UpdateEdge { .. } => Action::Update,
            OperationData::DeleteNode { .. } | OperationData::DeleteEdge { .. } => Action::Delete,
            OperationData::Noop => Action::Noop,
            OperationData::RestoreNode(_)
            | OperationData::RestoreEdge(_)
            | OperationData::RestoreNodeCascade(..) => Action::Create,
        }
    }

    /// The entity kind this operation targets.
    pub fn kind(&self) -> EntityKind {
        match &self.data {
            OperationData::CreateNode { .. }
            | OperationData::UpdateNode { .. }
            | OperationData::DeleteNode { .. }
            | OperationData::RestoreNode(_)
            | OperationData::RestoreNodeCascade(..) => EntityKind::Node,
            OperationData::CreateEdge { .. }
            | OperationData::UpdateEdge { .. }
            | OperationData::DeleteEdge { .. }
            | OperationData::RestoreEdge(_) => EntityKind::Edge,
            OperationData::Noop => EntityKind::Node,
        }
    }
}

/// The outcome of a single operation: the entity produced, or the id affected.
#[derive(Debug, Clone)]
pub enum OperationResult {
    /// A node was created or updated.
    Node(Node),
    /// An edge was created or updated.
    Edge(Edge),
    /// A node or edge was deleted; its id is returned.
    Deleted(Id),
    /// A no-op always succeeds with no result.
    Noop,
}

/// An ordered batch of operations to apply atomically.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TxId,
    /// The operations to apply, in order.
    pub operations: Vec<Operation>,
}

impl Transaction {
    /// Builds a new transaction from an ordered operation list.
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            id: Uuid::new_v4(),
            operations,
        }
    }

    /// The id used to correlate a later `rollback` call with this commit.
    pub fn id(&self) -> TxId {
        self.id
    }
}

/// Checks the one engine-level pre-condition `spec.md` §3 calls out
/// explicitly: no operation list may create an edge to a node the same list
/// also deletes. Detected before any mutation, regardless of op order,
/// since the backend's own cascade-on-delete would otherwise silently
/// absorb the conflict.
fn check_no_self_dangling(ops: &[Operation]) -> Result<()> {
    use std::collections::HashSet;

    let deleted_nodes: HashSet<&Id> = ops
        .iter()
        .filter_map(|op| match &op.data {
            OperationData::DeleteNode { id } => Some(id),
            _ => None,
        })
        .collect();

    for op in ops {
        if let OperationData::CreateEdge {
            id, source, target, ..
        } = &op.data
        {
            let conflict = if deleted_nodes.contains(source) {
                Some(source)
            } else if deleted_nodes.contains(target) {
                Some(target)
            } else {
                None
            };
            if let Some(node) = conflict {
                return Err(Error::DanglingReference {
                    edge: id.clone().unwrap_or_else(|| Id::String("<pending>".into())),
                    node: node.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Applies one operation against the backend, returning its result and the
/// operation that would undo it.
fn apply_one(backend: &mut dyn Backend, op: &Operation) -> Result<(OperationResult, Operation)> {
    match &op.data {
        OperationData::CreateNode {
            id,
            key,
            data,
            schema,
        } => {
            let target_id = id.clone().unwrap_or_else(Id::generate);
            let existed = backend.node_exists(&target_id);
            let mut node = Node::new(Some(target_id.clone()), key.clone(), data.clone());
            node.schema = schema.clone();
            let inserted = backend.insert_node(node, op.options.conflict)?;
            let inverse = if existed && op.options.conflict == ConflictPolicy::Ignore {
                Operation::new(OperationData::Noop)
            } else {
                Operation::new(OperationData::DeleteNode {
                    id: inserted.id.clone(),
                })
            };
            Ok((OperationResult::Node(inserted), inverse))
        }
        OperationData::CreateEdge {
            id,
            key,
            source,
            target,
            weight,
            data,
        } => {
            let target_id = id.clone().unwrap_or_else(Id::generate);
            let existed = backend.edge_exists(&target_id);
            let edge = Edge::new(
                Some(target_id.clone()),
                key.clone(),
                source.clone(),
                target.clone(),
                *weight,
                data.clone(),
            );
            let inserted = backend.insert_edge(edge, op.options.conflict)?;
            let inverse = if existed && op.options.conflict == ConflictPolicy::Ignore {
                Operation::new(OperationData::Noop)
            } else {
                Operation::new(OperationData::DeleteEdge {
                    id: inserted.id.clone(),
                })
            };
            Ok((OperationResult::Edge(inserted), inverse))
        }
        OperationData::UpdateNode { id, patch } => {
            let before = backend.get_node(id)?;
            let after = backend.update_node(id, patch.clone())?;
            let inverse = Operation::new(OperationData::RestoreNode(Box::new(before)));
            Ok((OperationResult::Node(after), inverse))
        }
        OperationData::UpdateEdge { id, patch } => {
            let before = backend.get_edge(id)?;
            let after = backend.update_edge(id, patch.clone())?;
            let inverse = Operation::new(OperationData::RestoreEdge(Box::new(before)));
            Ok((OperationResult::Edge(after), inverse))
        }
        OperationData::DeleteNode { id } => {
            let (node, cascaded) = backend.delete_node(id)?;
            let inverse = Operation::new(OperationData::RestoreNodeCascade(
                Box::new(node),
                cascaded,
            ));
            Ok((OperationResult::Deleted(id.clone()), inverse))
        }
        OperationData::DeleteEdge { id } => {
            let edge = backend.delete_edge(id)?;
            let inverse = Operation::new(OperationData::RestoreEdge(Box::new(edge)));
            Ok((OperationResult::Deleted(id.clone()), inverse))
        }
        OperationData::Noop => Ok((OperationResult::Noop, Operation::new(OperationData::Noop))),
        OperationData::RestoreNode(node) => {
            backend.restore_node((**node).clone())?;
            let inverse = Operation::new(OperationData::DeleteNode {
                id: node.id.clone(),
            });
            Ok((OperationResult::Node((**node).clone()), inverse))
        }
        OperationData::RestoreEdge(edge) => {
            backend.restore_edge((**edge).clone())?;
            let inverse = Operation::new(OperationData::DeleteEdge {
                id: edge.id.clone(),
            });
            Ok((OperationResult::Edge((**edge).clone()), inverse))
        }
        OperationData::RestoreNodeCascade(node, edges) => {
            backend.restore_node((**node).clone())?;
            for edge in edges {
                backend.restore_edge(edge.clone())?;
            }
            let inverse = Operation::new(OperationData::DeleteNode {
                id: node.id.clone(),
            });
            Ok((OperationResult::Node((**node).clone()), inverse))
        }
    }
}

/// Applies `inverse_ops` against the backend, ignoring nothing: every
/// inverse is expected to succeed, since it only ever undoes a change this
/// same engine just made under the same lock.
fn apply_inverses(backend: &mut dyn Backend, inverse_ops: &[Operation]) {
    for op in inverse_ops {
        if let Err(err) = apply_one(backend, op) {
            tracing::error!(?err, "rollback step failed; backend state may be inconsistent");
        }
    }
}

/// Commits an ordered operation list against `backend`.
///
/// `authorize` is called once per operation, in list order, before any
/// mutation; the first `Err` aborts the whole transaction. On success,
/// returns the per-operation results alongside the inverse log (already in
/// undo order) for a later [`rollback`] call.
pub fn commit(
    backend: &mut dyn Backend,
    ops: &[Operation],
    mut authorize: impl FnMut(&Operation) -> Result<()>,
    cancel: &CancellationToken,
) -> Result<(Vec<OperationResult>, Vec<Operation>)> {
    for op in ops {
        authorize(op)?;
    }

    check_no_self_dangling(ops)?;

    let mut results = Vec::with_capacity(ops.len());
    let mut inverse_log = Vec::with_capacity(ops.len());

    for op in ops {
        cancel.check()?;
        match apply_one(backend, op) {
            Ok((result, inverse)) => {
                results.push(result);
                inverse_log.push(inverse);
            }
            Err(err) => {
                let mut undo = inverse_log;
                undo.reverse();
                apply_inverses(backend, &undo);
                return Err(err);
            }
        }
    }

    inverse_log.reverse();
    Ok((results, inverse_log))
}

/// Applies a previously-produced inverse log, undoing a committed
/// transaction. Returns the (empty-effect) inverse-of-the-inverse, which
/// becomes the new log: rolling back twice is safe because the second
/// rollback finds only `Noop`s.
pub fn rollback(backend: &mut dyn Backend, inverse_log: &[Operation]) -> Vec<Operation> {
    let mut next_log = Vec::with_capacity(inverse_log.len());
    for op in inverse_log {
        match apply_one(backend, op) {
            Ok((_, undo_of_undo)) => next_log.push(undo_of_undo),
            Err(err) => {
                tracing::error!(?err, "rollback step failed");
                next_log.push(Operation::new(OperationData::Noop));
            }
        }
    }
    next_log.reverse();
    next_log
}
