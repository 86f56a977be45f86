//! The in-memory reference backend.
//!
//! Indexed `HashMap`s for nodes and edges, plus secondary indices on
//! `source`, `target`, and `key` for edges, mirroring the teacher's
//! `label_index` / `outgoing_adjacency` / `incoming_adjacency` maps in
//! `GraphDB`. Insertion order is tracked separately and used as the
//! deterministic tie-breaker the algorithms rely on (`spec.md` §4.4).

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::backend::{Backend, ConflictPolicy, EdgeFilter};
use crate::error::{Error, Result};
use crate::model::{Edge, Id, Node};
use crate::value::DataMap;

/// The in-memory reference [`Backend`] implementation.
#[derive(Default)]
pub struct MemoryBackend {
    nodes: HashMap<Id, Node>,
    edges: HashMap<Id, Edge>,
    by_source: HashMap<Id, BTreeSet<Id>>,
    by_target: HashMap<Id, BTreeSet<Id>>,
    by_key: HashMap<String, BTreeSet<Id>>,
    node_order: Vec<Id>,
    edge_order: Vec<Id>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn index_edge(&mut self, edge: &Edge) {
        self.by_source
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.id.clone());
        self.by_target
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.id.clone());
        if let Some(key) = &edge.key {
            self.by_key
                .entry(key.clone())
                .or_default()
                .insert(edge.id.clone());
        }
    }

    fn unindex_edge(&mut self, edge: &Edge) {
        if let Some(set) = self.by_source.get_mut(&edge.source) {
            set.remove(&edge.id);
        }
        if let Some(set) = self.by_target.get_mut(&edge.target) {
            set.remove(&edge.id);
        }
        if let Some(key) = &edge.key {
            if let Some(set) = self.by_key.get_mut(key) {
                set.remove(&edge.id);
            }
        }
    }

    fn any_id_taken(&self, id: &Id) -> bool {
        self.nodes.contains_key(id) || self.edges.contains_key(id)
    }
}

impl Backend for MemoryBackend {
    fn insert_node(&mut self, node: Node, policy: ConflictPolicy) -> Result<Node> {
        if self.any_id_taken(&node.id) {
            return match policy {
                ConflictPolicy::Error => Err(Error::Conflict(node.id.clone())),
                ConflictPolicy::Ignore => Ok(self.nodes.get(&node.id).cloned().unwrap_or(node)),
            };
        }
        trace!(id = %node.id, "insert_node");
        self.node_order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node.clone());
        Ok(node)
    }

    fn insert_edge(&mut self, edge: Edge, policy: ConflictPolicy) -> Result<Edge> {
        if self.any_id_taken(&edge.id) {
            return match policy {
                ConflictPolicy::Error => Err(Error::Conflict(edge.id.clone())),
                ConflictPolicy::Ignore => Ok(self.edges.get(&edge.id).cloned().unwrap_or(edge)),
            };
        }
        if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
            return Err(Error::MissingSourceOrTarget);
        }
        trace!(id = %edge.id, source = %edge.source, target = %edge.target, "insert_edge");
        self.edge_order.push(edge.id.clone());
        self.index_edge(&edge);
        self.edges.insert(edge.id.clone(), edge.clone());
        Ok(edge)
    }

    fn get_node(&self, id: &Id) -> Result<Node> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn get_edge(&self, id: &Id) -> Result<Edge> {
        self.edges
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.clone()))
    }

    fn update_node(&mut self, id: &Id, patch: DataMap) -> Result<Node> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        node.data.extend(patch);
        node.meta.touch();
        Ok(node.clone())
    }

    fn update_edge(&mut self, id: &Id, patch: DataMap) -> Result<Edge> {
        let edge = self
            .edges
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        edge.data.extend(patch);
        edge.meta.touch();
        Ok(edge.clone())
    }

    fn delete_node(&mut self, id: &Id) -> Result<(Node, Vec<Edge>)> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        self.node_order.retain(|n| n != id);

        let mut dangling: BTreeSet<Id> = BTreeSet::new();
        if let Some(ids) = self.by_source.get(id) {
            dangling.extend(ids.iter().cloned());
        }
        if let Some(ids) = self.by_target.get(id) {
            dangling.extend(ids.iter().cloned());
        }

        let mut removed = Vec::with_capacity(dangling.len());
        for edge_id in dangling {
            if let Some(edge) = self.edges.remove(&edge_id) {
                self.unindex_edge(&edge);
                self.edge_order.retain(|e| e != &edge_id);
                removed.push(edge);
            }
        }
        Ok((node, removed))
    }

    fn delete_edge(&mut self, id: &Id) -> Result<Edge> {
        let edge = self
            .edges
            .remove(id)
            .ok_or_else(|| Error::NotFound(id.clone()))?;
        self.unindex_edge(&edge);
        self.edge_order.retain(|e| e != id);
        Ok(edge)
    }

    fn find_nodes_by_data(&self, filter: &DataMap) -> Result<Vec<Node>> {
        Ok(self
            .node_order
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .filter(|node| filter.iter().all(|(k, v)| node.data.get(k) == Some(v)))
            .cloned()
            .collect())
    }

    fn iterate_edges(&self, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        let candidates: Option<BTreeSet<Id>> = match (&filter.source, &filter.target, &filter.key)
        {
            (Some(s), _, _) => Some(self.by_source.get(s).cloned().unwrap_or_default()),
            (_, Some(t), _) => Some(self.by_target.get(t).cloned().unwrap_or_default()),
            (_, _, Some(k)) => Some(self.by_key.get(k).cloned().unwrap_or_default()),
            (None, None, None) => None,
        };

        let matches = |edge: &Edge| -> bool {
            filter.source.as_ref().map_or(true, |s| &edge.source == s)
                && filter.target.as_ref().map_or(true, |t| &edge.target == t)
                && filter
                    .key
                    .as_ref()
                    .map_or(true, |k| edge.key.as_deref() == Some(k.as_str()))
        };

        let ids: Vec<Id> = match candidates {
            Some(set) => set.into_iter().collect(),
            None => self.edge_order.clone(),
        };

        Ok(ids
            .into_iter()
            .filter_map(|id| self.edges.get(&id).cloned())
            .filter(matches)
            .collect())
    }

    fn all_nodes(&self) -> Result<Vec<Node>> {
        Ok(self
            .node_order
            .iter()
            .filter_map(|id| self.nodes.get(id).cloned())
            .collect())
    }

    fn all_edges(&self) -> Result<Vec<Edge>> {
        Ok(self
            .edge_order
            .iter()
            .filter_map(|id| self.edges.get(id).cloned())
            .collect())
    }

    fn node_exists(&self, id: &Id) -> bool {
        self.nodes.contains_key(id)
    }

    fn edge_exists(&self, id: &Id) -> bool {
        self.edges.contains_key(id)
    }

    fn restore_node(&mut self, node: Node) -> Result<()> {
        if !self.nodes.contains_key(&node.id) {
            self.node_order.push(node.id.clone());
        }
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    fn restore_edge(&mut self, edge: Edge) -> Result<()> {
        if !self.edges.contains_key(&edge.id) {
            self.edge_order.push(edge.id.clone());
        }
        self.index_edge(&edge);
        self.edges.insert(edge.id.clone(), edge);
        Ok(())
    }

    fn remove_node_raw(&mut self, id: &Id) -> Result<()> {
        self.nodes.remove(id);
        self.node_order.retain(|n| n != id);
        Ok(())
    }

    fn remove_edge_raw(&mut self, id: &Id) -> Result<()> {
        if let Some(edge) = self.edges.remove(id) {
            self.unindex_edge(&edge);
        }
        self.edge_order.retain(|e| e != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityKind;
    use crate::value::Value;

    fn node(id: &str) -> Node {
        Node::new(Some(Id::from(id)), None, DataMap::new())
    }

    #[test]
    fn insert_edge_requires_both_endpoints() {
        let mut backend = MemoryBackend::new();
        backend.insert_node(node("a"), ConflictPolicy::Error).unwrap();
        let edge = Edge::new(
            Some(Id::from("e1")),
            None,
            Id::from("a"),
            Id::from("missing"),
            0.0,
            DataMap::new(),
        );
        let err = backend.insert_edge(edge, ConflictPolicy::Error).unwrap_err();
        assert!(matches!(err, Error::MissingSourceOrTarget));
    }

    #[test]
    fn delete_node_cascades_dangling_edges() {
        let mut backend = MemoryBackend::new();
        backend.insert_node(node("a"), ConflictPolicy::Error).unwrap();
        backend.insert_node(node("b"), ConflictPolicy::Error).unwrap();
        let edge = Edge::new(
            Some(Id::from("e1")),
            None,
            Id::from("a"),
            Id::from("b"),
            1.0,
            DataMap::new(),
        );
        backend.insert_edge(edge, ConflictPolicy::Error).unwrap();

        let (_, removed) = backend.delete_node(&Id::from("a")).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!backend.edge_exists(&Id::from("e1")));
    }

    #[test]
    fn conflict_policy_ignore_keeps_existing() {
        let mut backend = MemoryBackend::new();
        let mut first = node("a");
        first.data.insert("v".into(), Value::Int(1));
        backend.insert_node(first, ConflictPolicy::Error).unwrap();

        let mut second = node("a");
        second.data.insert("v".into(), Value::Int(2));
        let kept = backend.insert_node(second, ConflictPolicy::Ignore).unwrap();
        assert_eq!(kept.data.get("v"), Some(&Value::Int(1)));
    }

    #[test]
    fn update_node_bumps_version() {
        let mut backend = MemoryBackend::new();
        backend.insert_node(node("a"), ConflictPolicy::Error).unwrap();
        let mut patch = DataMap::new();
        patch.insert("v".into(), Value::Int(1));
        let updated = backend.update_node(&Id::from("a"), patch).unwrap();
        assert_eq!(updated.meta.version, 1);
        assert_eq!(updated.meta.entity_type, EntityKind::Node);
    }

    #[test]
    fn iterate_edges_filters_by_key() {
        let mut backend = MemoryBackend::new();
        backend.insert_node(node("a"), ConflictPolicy::Error).unwrap();
        backend.insert_node(node("b"), ConflictPolicy::Error).unwrap();
        let mut edge = Edge::new(
            Some(Id::from("e1")),
            Some("knows".into()),
            Id::from("a"),
            Id::from("b"),
            1.0,
            DataMap::new(),
        );
        backend.insert_edge(edge.clone(), ConflictPolicy::Error).unwrap();
        edge.id = Id::from("e2");
        edge.key = Some("likes".into());
        backend.insert_edge(edge, ConflictPolicy::Error).unwrap();

        let filter = EdgeFilter {
            source: None,
            target: None,
            key: Some("knows".into()),
        };
        let found = backend.iterate_edges(&filter).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, Id::from("e1"));
    }
}
