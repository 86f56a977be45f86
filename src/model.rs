//! Entity model for the property graph: [`Id`], [`Meta`], [`Node`], [`Edge`], [`Graph`].
//!
//! Identity, equality, and serialization for the core entity kinds. Entities
//! are immutable in shape (fields are public for in-crate construction) but
//! are only ever created, updated, or deleted through a [`crate::transaction`]
//! operation — the entity constructors here never touch backend state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::DataMap;

/// An entity identifier: either a caller-assigned string or integer.
///
/// Ids are compared and hashed by value, so a `String("1")` and an `Int(1)`
/// are distinct ids, matching the source system's dynamic-typing semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    /// A caller-assigned or auto-generated string id (the common case).
    String(String),
    /// A caller-assigned integer id.
    Int(i64),
}

impl Id {
    /// Generates a fresh, lexicographically-sortable id (UUIDv7).
    ///
    /// UUIDv7 embeds a millisecond timestamp in its high bits, so ids
    /// generated in creation order also sort in creation order — the
    /// property `spec.md` §4.1 requires of auto-generated ids.
    pub fn generate() -> Self {
        Id::String(Uuid::now_v7().to_string())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::String(s) => write!(f, "{s}"),
            Id::Int(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::String(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::String(s)
    }
}

impl From<i64> for Id {
    fn from(i: i64) -> Self {
        Id::Int(i)
    }
}

/// Tags which kind of entity a [`Meta`] record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A [`Graph`].
    Graph,
    /// A [`Node`].
    Node,
    /// An [`Edge`].
    Edge,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Graph => write!(f, "graph"),
            EntityKind::Node => write!(f, "node"),
            EntityKind::Edge => write!(f, "edge"),
        }
    }
}

/// Bookkeeping carried by every entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    /// When the entity was first created.
    pub created_at: DateTime<Utc>,
    /// When the entity was last updated.
    pub updated_at: DateTime<Utc>,
    /// Monotonically increasing version, starting at 0, bumped on each update.
    pub version: u64,
    /// Soft-deletion tombstone flag, used for rollback pre-image slots.
    pub deleted: bool,
    /// The entity kind this record belongs to.
    pub entity_type: EntityKind,
}

impl Meta {
    /// Builds a fresh `Meta` for a newly created entity of the given kind.
    pub fn new(entity_type: EntityKind) -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            version: 0,
            deleted: false,
            entity_type,
        }
    }

    /// Bumps `version` and refreshes `updated_at`, as every successful update does.
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Projects the public-field representation: `{created_at, updated_at,
    /// version}` (`spec.md` §6). `deleted` and `entity_type` are internal
    /// bookkeeping and never appear on the wire.
    pub fn to_public(&self) -> PublicMeta {
        PublicMeta {
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }
}

/// The public serialization shape of a [`Meta`]: `{created_at, updated_at, version}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PublicMeta {
    /// When the entity was first created.
    pub created_at: DateTime<Utc>,
    /// When the entity was last updated.
    pub updated_at: DateTime<Utc>,
    /// Monotonically increasing version.
    pub version: u64,
}

/// A node in the property graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, unique within its graph across nodes and edges.
    pub id: Id,
    /// Optional type/label used for secondary indexing.
    pub key: Option<String>,
    /// Free-form properties.
    pub data: DataMap,
    /// Creation/update bookkeeping.
    pub meta: Meta,
    /// An optional schema reference consulted at commit time.
    pub schema: Option<String>,
    /// Whether this node belongs to the reserved `access:*` namespace and
    /// cannot be mutated except by an actor holding `admin`.
    ///
    /// Only [`crate::access`] constructs protected entities; this field is
    /// not exposed through any public constructor.
    pub(crate) protected: bool,
}

impl Node {
    /// Creates a well-formed node. `id` defaults to a fresh UUIDv7 if `None`.
    pub fn new(id: Option<Id>, key: Option<String>, data: DataMap) -> Self {
        Self {
            id: id.unwrap_or_else(Id::generate),
            key,
            data,
            meta: Meta::new(EntityKind::Node),
            schema: None,
            protected: false,
        }
    }

    pub(crate) fn new_protected(id: Id, key: &str, data: DataMap) -> Self {
        let mut node = Self::new(Some(id), Some(key.to_string()), data);
        node.protected = true;
        node
    }

    /// Whether this node is protected (part of the access-control subgraph).
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Serializes the entity to its public-field representation (`spec.md` §6).
    pub fn to_public(&self) -> PublicNode<'_> {
        PublicNode {
            id: &self.id,
            key: self.key.as_deref(),
            data: &self.data,
            meta: self.meta.to_public(),
        }
    }
}

/// Compares by id only (`spec.md` §4.1: "Equality compares by id within an
/// entity kind"), not by the full structural content of `data`/`meta`.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

/// The public serialization shape of a [`Node`]: `{id, key, data, meta}`.
#[derive(Debug, Serialize)]
pub struct PublicNode<'a> {
    /// Entity identifier.
    pub id: &'a Id,
    /// Optional label.
    pub key: Option<&'a str>,
    /// Free-form properties.
    pub data: &'a DataMap,
    /// Creation/update bookkeeping.
    pub meta: PublicMeta,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier, unique within its graph across nodes and edges.
    pub id: Id,
    /// Optional semantic label, e.g. `"access:permission"`.
    pub key: Option<String>,
    /// Edge weight, used by the weighted algorithms. Defaults to `0.0`.
    pub weight: f64,
    /// Id of the source node.
    pub source: Id,
    /// Id of the target node.
    pub target: Id,
    /// Free-form properties.
    pub data: DataMap,
    /// Creation/update bookkeeping.
    pub meta: Meta,
    pub(crate) protected: bool,
}

impl Edge {
    /// Creates a well-formed edge. `id` defaults to a fresh UUIDv7 if `None`.
    pub fn new(
        id: Option<Id>,
        key: Option<String>,
        source: Id,
        target: Id,
        weight: f64,
        data: DataMap,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(Id::generate),
            key,
            weight,
            source,
            target,
            data,
            meta: Meta::new(EntityKind::Edge),
            protected: false,
        }
    }

    pub(crate) fn new_protected(
        id: Id,
        key: &str,
        source: Id,
        target: Id,
        data: DataMap,
    ) -> Self {
        let mut edge = Self::new(Some(id), Some(key.to_string()), source, target, 0.0, data);
        edge.protected = true;
        edge
    }

    /// Whether this edge is protected (part of the access-control subgraph).
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Serializes the entity to its public-field representation (`spec.md` §6).
    pub fn to_public(&self) -> PublicEdge<'_> {
        PublicEdge {
            id: &self.id,
            key: self.key.as_deref(),
            source: &self.source,
            target: &self.target,
            weight: self.weight,
            meta: self.meta.to_public(),
        }
    }
}

/// Compares by id only, per the same rule as [`Node`]'s `PartialEq`.
impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Edge {}

/// The public serialization shape of an [`Edge`]: `{id, key, source, target, weight, meta}`.
#[derive(Debug, Serialize)]
pub struct PublicEdge<'a> {
    /// Entity identifier.
    pub id: &'a Id,
    /// Optional label.
    pub key: Option<&'a str>,
    /// Source node id.
    pub source: &'a Id,
    /// Target node id.
    pub target: &'a Id,
    /// Edge weight.
    pub weight: f64,
    /// Creation/update bookkeeping.
    pub meta: PublicMeta,
}

/// A named container holding a population of nodes and edges.
///
/// A graph is the unit of access-control scoping; one process may host many
/// graphs concurrently (`spec.md` §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInfo {
    /// Identifier of this graph.
    pub id: Id,
    /// Human-readable name.
    pub name: String,
    /// When the graph was initialized.
    pub created_at: DateTime<Utc>,
}

impl GraphInfo {
    /// Creates a new graph descriptor.
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_sort_in_creation_order() {
        let a = Id::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = Id::generate();
        assert!(a < b, "uuidv7 ids should sort by creation order");
    }

    #[test]
    fn meta_touch_bumps_version_and_updated_at() {
        let mut meta = Meta::new(EntityKind::Node);
        let created = meta.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(2));
        meta.touch();
        assert_eq!(meta.version, 1);
        assert!(meta.updated_at >= created);
    }

    #[test]
    fn node_equality_is_by_id() {
        let id = Id::from("n1");
        let a = Node::new(Some(id.clone()), None, DataMap::new());
        let mut b = Node::new(Some(id), Some("other".into()), DataMap::new());
        b.data.insert("x".into(), crate::value::Value::Int(1));
        assert_eq!(a, b, "nodes with the same id are equal despite differing key/data");

        let c = Node::new(Some(Id::from("n2")), None, DataMap::new());
        assert_ne!(a, c);
    }
}
