//! The backend contract: the single point of physical storage for one graph.
//!
//! Concrete storage lives behind [`Backend`], a small trait object (the
//! "behaviours → interface abstraction with tagged variants" redesign
//! strategy for dynamic dispatch, `spec.md` §9). The only implementation in
//! this crate is [`memory::MemoryBackend`]; the trait is object-safe so a
//! disk-backed implementation could be added later without touching any
//! caller (`spec.md` §1, §4.2).
//!
//! Callers are expected to hold the graph-level lock (`spec.md` §5) for the
//! duration of a transaction or query: mutating methods take `&mut self`,
//! read methods take `&self`, and [`crate::store::Store`] wraps each graph's
//! backend in a `parking_lot::RwLock` so the borrow checker enforces the
//! locking discipline at compile time.

pub mod memory;

use crate::error::Result;
use crate::model::{Edge, Node};
use crate::model::Id;
use crate::value::DataMap;

/// What to do when inserting an entity whose id already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail with [`crate::error::Error::Conflict`] (the default).
    Error,
    /// Silently keep the existing entity and return it unchanged.
    Ignore,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        ConflictPolicy::Error
    }
}

/// An index-backed filter for [`Backend::iterate_edges`].
#[derive(Debug, Clone, Default)]
pub struct EdgeFilter {
    /// Restrict to edges with this source node id.
    pub source: Option<Id>,
    /// Restrict to edges with this target node id.
    pub target: Option<Id>,
    /// Restrict to edges with this key/label.
    pub key: Option<String>,
}

/// The physical storage contract for one graph's nodes and edges.
///
/// Required indices (`spec.md` §4.2): primary by id for both kinds,
/// secondary by `source`, by `target`, and by `key` for edges.
pub trait Backend: Send {
    /// Inserts a node. Conflict policy governs behavior when `node.id` exists.
    fn insert_node(&mut self, node: Node, policy: ConflictPolicy) -> Result<Node>;

    /// Inserts an edge. Both endpoints must already exist.
    fn insert_edge(&mut self, edge: Edge, policy: ConflictPolicy) -> Result<Edge>;

    /// Fetches a node by id.
    fn get_node(&self, id: &Id) -> Result<Node>;

    /// Fetches an edge by id.
    fn get_edge(&self, id: &Id) -> Result<Edge>;

    /// Merges `patch` into the node's data map, bumps version, refreshes `updated_at`.
    fn update_node(&mut self, id: &Id, patch: DataMap) -> Result<Node>;

    /// Merges `patch` into the edge's data map, bumps version, refreshes `updated_at`.
    fn update_edge(&mut self, id: &Id, patch: DataMap) -> Result<Edge>;

    /// Removes a node. Any edge whose source or target is this node is
    /// removed in the same atomic step; the pre-images of the node and of
    /// every cascade-removed edge are returned for the caller's inverse log.
    fn delete_node(&mut self, id: &Id) -> Result<(Node, Vec<Edge>)>;

    /// Removes an edge, returning its pre-image.
    fn delete_edge(&mut self, id: &Id) -> Result<Edge>;

    /// Returns all nodes whose data map contains every entry of `filter`.
    fn find_nodes_by_data(&self, filter: &DataMap) -> Result<Vec<Node>>;

    /// Returns edges matching an index-backed filter.
    fn iterate_edges(&self, filter: &EdgeFilter) -> Result<Vec<Edge>>;

    /// Returns every node currently stored, in id-index order.
    fn all_nodes(&self) -> Result<Vec<Node>>;

    /// Returns every edge currently stored, in id-index order.
    fn all_edges(&self) -> Result<Vec<Edge>>;

    /// True if a node with this id exists.
    fn node_exists(&self, id: &Id) -> bool;

    /// True if an edge with this id exists.
    fn edge_exists(&self, id: &Id) -> bool;

    /// Writes a node back verbatim, bypassing conflict/version bookkeeping.
    ///
    /// Used only by the transaction engine's rollback path to restore a
    /// captured pre-image (the inverse of `create` and `update`).
    fn restore_node(&mut self, node: Node) -> Result<()>;

    /// Writes an edge back verbatim, bypassing conflict/version bookkeeping.
    fn restore_edge(&mut self, edge: Edge) -> Result<()>;

    /// Removes a node without cascading, used to undo a rollback-time restore.
    fn remove_node_raw(&mut self, id: &Id) -> Result<()>;

    /// Removes an edge without cascading, used to undo a rollback-time restore.
    fn remove_edge_raw(&mut self, id: &Id) -> Result<()>;
}
