//! The store façade (`spec.md` §6): the single public entry point,
//! composing the entity model, backend, transaction engine, query/algorithm
//! layer, and access control behind one `parking_lot::RwLock` per graph
//! (`spec.md` §5).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument};

use crate::access::{self, AccessContext, Readable};
use crate::algorithms::{bfs, components, dijkstra, mst, pagerank, AlgorithmOptions};
use crate::backend::memory::MemoryBackend;
use crate::backend::Backend;
use crate::cancel::CancellationToken;
use crate::config::{GraphOptions, LockWaitPolicy, StoreOptions};
use crate::error::{Error, Result};
use crate::model::{EntityKind, GraphInfo, Id, Node};
use crate::query::{self, Query};
use crate::schema::SchemaRegistry;
use crate::subscription::{Event, NoopSubscriber, Subscriber};
use crate::transaction::{self, Action, Operation, OperationData, OperationResult, Transaction, TxId};
use crate::value::DataMap;

/// Which graph algorithm to run, and with what parameters
/// (`spec.md` §4.4). Passed to [`Store::traverse`].
#[derive(Debug, Clone)]
pub enum Algorithm {
    /// Bounded-depth BFS from a source node.
    Bfs {
        /// Node to start from.
        source: Id,
        /// Maximum depth. Defaults to `1`.
        depth: usize,
        /// Whether to order each level's neighbors by weight rather than edge id.
        weighted: bool,
    },
    /// Single-pair shortest path by Dijkstra.
    ShortestPath {
        /// Source node.
        source: Id,
        /// Target node.
        target: Id,
    },
    /// Connected components over the undirected projection.
    ConnectedComponents,
    /// Minimum spanning forest by Kruskal.
    MinimumSpanningTree,
    /// PageRank.
    PageRank(pagerank::PageRankOptions),
}

/// The result of [`Store::traverse`], one variant per [`Algorithm`].
#[derive(Debug, Clone)]
pub enum AlgorithmResult {
    /// [`Algorithm::Bfs`]'s visited nodes, in discovery order.
    Nodes(Vec<Node>),
    /// [`Algorithm::ShortestPath`]'s result.
    Path(dijkstra::ShortestPath),
    /// [`Algorithm::ConnectedComponents`]'s partition.
    Components(Vec<Vec<Node>>),
    /// [`Algorithm::MinimumSpanningTree`]'s forest.
    SpanningTree(mst::SpanningTree),
    /// [`Algorithm::PageRank`]'s ranking.
    Ranks(std::collections::BTreeMap<Id, f64>),
}

struct GraphEntry {
    info: GraphInfo,
    access_control: bool,
    backend: RwLock<Box<dyn Backend>>,
    inverse_logs: Mutex<HashMap<TxId, Vec<Operation>>>,
}

/// The in-process store: owns every graph's backend state, one
/// `RwLock<Box<dyn Backend>>` per graph so writes serialize and reads see a
/// consistent snapshot (`spec.md` §5). One process may host many graphs
/// concurrently; cross-graph calls never contend with one another.
pub struct Store {
    options: StoreOptions,
    graphs: RwLock<HashMap<Id, Arc<GraphEntry>>>,
    subscriber: Arc<dyn Subscriber>,
    schemas: SchemaRegistry,
}

impl Store {
    /// Builds an empty store with the given defaults.
    pub fn new(options: StoreOptions) -> Self {
        Self {
            options,
            graphs: RwLock::new(HashMap::new()),
            subscriber: Arc::new(NoopSubscriber),
            schemas: SchemaRegistry::new(),
        }
    }

    /// Replaces the store's event subscriber (defaults to [`NoopSubscriber`]).
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscriber>) -> Self {
        self.subscriber = subscriber;
        self
    }

    /// Replaces the store's schema registry (defaults to an empty one).
    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = schemas;
        self
    }

    /// Initializes a graph, planting the access-control root node.
    /// Idempotent: if a graph with this id already exists, returns its id
    /// unchanged rather than re-initializing it.
    #[instrument(skip(self, options))]
    pub fn init(&self, options: GraphOptions) -> Result<Id> {
        let id = options.id.clone().unwrap_or_else(Id::generate);
        {
            let graphs = self.graphs.read();
            if graphs.contains_key(&id) {
                return Ok(id);
            }
        }

        let mut backend: Box<dyn Backend> = Box::new(MemoryBackend::new());
        access::init(&mut *backend)?;

        let entry = Arc::new(GraphEntry {
            info: GraphInfo::new(id.clone(), options.name),
            access_control: options.access_control.unwrap_or(self.options.access_control_default),
            backend: RwLock::new(backend),
            inverse_logs: Mutex::new(HashMap::new()),
        });

        let mut graphs = self.graphs.write();
        let id = graphs.entry(id).or_insert(entry).info.id.clone();
        debug!(graph = %id, "graph initialized");
        Ok(id)
    }

    /// Tears down a graph's backend state. Idempotent on an unknown id.
    pub fn close(&self, graph_id: &Id) -> Result<()> {
        self.graphs.write().remove(graph_id);
        Ok(())
    }

    fn graph(&self, graph_id: &Id) -> Result<Arc<GraphEntry>> {
        self.graphs
            .read()
            .get(graph_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(graph_id.clone()))
    }

    fn require_context<'a>(&self, entry: &GraphEntry, ctx: Option<&'a AccessContext>) -> Result<Option<&'a AccessContext>> {
        if entry.access_control && ctx.is_none() {
            return Err(Error::MissingActorOrGraph);
        }
        Ok(ctx)
    }

    /// Acquires a graph's write lock per [`crate::config::LockWaitPolicy`]:
    /// blocks under [`LockWaitPolicy::Block`], or fails immediately under
    /// [`LockWaitPolicy::TryOnce`] rather than queuing behind a contended
    /// writer (`spec.md` §5, "transactions may suspend while awaiting the
    /// write lock").
    fn acquire_write<'a>(&self, entry: &'a GraphEntry) -> Result<parking_lot::RwLockWriteGuard<'a, Box<dyn Backend>>> {
        match self.options.lock_wait {
            LockWaitPolicy::Block => Ok(entry.backend.write()),
            LockWaitPolicy::TryOnce => entry
                .backend
                .try_write()
                .ok_or_else(|| Error::backend_internal("graph write lock contended")),
        }
    }

    /// Commits an ordered batch of operations atomically (`spec.md` §4.3).
    #[instrument(skip(self, ops, ctx, cancel))]
    pub fn execute(
        &self,
        graph_id: &Id,
        ops: Vec<Operation>,
        ctx: Option<&AccessContext>,
        cancel: &CancellationToken,
    ) -> Result<(TxId, Vec<OperationResult>)> {
        let entry = self.graph(graph_id)?;
        let ctx = self.require_context(&entry, ctx)?;

        let tx = Transaction::new(ops);
        let mut backend = self.acquire_write(&entry)?;

        if let Some(ctx) = ctx {
            for op in &tx.operations {
                access::authorize_operation(op, ctx, &**backend)?;
            }
        }
        self.validate_schemas(&**backend, &tx.operations)?;

        let (results, inverse) = transaction::commit(&mut **backend, &tx.operations, |_| Ok(()), cancel)?;
        entry.inverse_logs.lock().insert(tx.id(), inverse);
        drop(backend);

        self.emit_events(&entry, &tx.operations, &results);
        Ok((tx.id(), results))
    }

    /// Rolls back a previously committed transaction. Repeating the call is
    /// a no-op: the stored inverse log is replaced by its own (empty-effect)
    /// inverse each time, per the engine's rollback-idempotence guarantee.
    pub fn rollback(&self, graph_id: &Id, tx_id: TxId) -> Result<()> {
        let entry = self.graph(graph_id)?;
        let mut logs = entry.inverse_logs.lock();
        let Some(inverse) = logs.get(&tx_id) else {
            return Err(Error::NotFound(Id::String(tx_id.to_string())));
        };
        let mut backend = self.acquire_write(&entry)?;
        let next_log = transaction::rollback(&mut **backend, inverse);
        drop(backend);
        logs.insert(tx_id, next_log);
        Ok(())
    }

    fn validate_schemas(&self, backend: &dyn Backend, ops: &[Operation]) -> Result<()> {
        for op in ops {
            match &op.data {
                OperationData::CreateNode { schema: Some(name), data, .. } => {
                    self.schemas.validate(name, data)?;
                }
                OperationData::UpdateNode { id, patch } => {
                    if let Ok(existing) = backend.get_node(id) {
                        if let Some(name) = &existing.schema {
                            let mut merged = existing.data.clone();
                            merged.extend(patch.clone());
                            self.schemas.validate(name, &merged)?;
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn emit_events(&self, entry: &GraphEntry, ops: &[Operation], results: &[OperationResult]) {
        for (op, result) in ops.iter().zip(results) {
            let (kind, id) = match result {
                OperationResult::Node(n) => (EntityKind::Node, n.id.clone()),
                OperationResult::Edge(e) => (EntityKind::Edge, e.id.clone()),
                OperationResult::Deleted(id) => (op.kind(), id.clone()),
                OperationResult::Noop => continue,
            };
            let event = match op.action() {
                Action::Create => Event::Created { kind, id },
                Action::Update => Event::Updated { kind, id },
                Action::Delete => Event::Deleted { kind, id },
                Action::Noop => continue,
            };
            let _ = self
                .subscriber
                .broadcast(&format!("graph:{}", entry.info.id), event);
        }
    }

    /// Executes a structured BFS query (`spec.md` §4.4).
    pub fn query(&self, graph_id: &Id, params: &Query, ctx: Option<&AccessContext>, cancel: &CancellationToken) -> Result<Vec<Node>> {
        let entry = self.graph(graph_id)?;
        let ctx = self.require_context(&entry, ctx)?;
        let backend = entry.backend.read();
        let nodes = query::execute(&**backend, params, cancel)?;
        Ok(self.filter_nodes(&**backend, nodes, ctx))
    }

    /// Fetches a single node. Access-controlled graphs surface
    /// [`Error::Unauthorized`] rather than silently omitting it.
    pub fn get_node(&self, graph_id: &Id, id: &Id, ctx: Option<&AccessContext>) -> Result<Node> {
        let entry = self.graph(graph_id)?;
        let ctx = self.require_context(&entry, ctx)?;
        let backend = entry.backend.read();
        let node = backend.get_node(id)?;
        if let Some(ctx) = ctx {
            if !access::can(&**backend, &ctx.actor_id, &node.id.to_string(), access::Permission::Read) {
                return Err(Error::Unauthorized("get node".into()));
            }
        }
        Ok(node)
    }

    /// Fetches a single edge. Access-controlled graphs surface
    /// [`Error::Unauthorized`] rather than silently omitting it.
    pub fn get_edge(&self, graph_id: &Id, id: &Id, ctx: Option<&AccessContext>) -> Result<crate::model::Edge> {
        let entry = self.graph(graph_id)?;
        let ctx = self.require_context(&entry, ctx)?;
        let backend = entry.backend.read();
        let edge = backend.get_edge(id)?;
        if let Some(ctx) = ctx {
            if !access::can(&**backend, &ctx.actor_id, &edge.id.to_string(), access::Permission::Read) {
                return Err(Error::Unauthorized("get edge".into()));
            }
        }
        Ok(edge)
    }

    /// Returns every node whose `data` map contains each entry of `filter`.
    /// Never surfaces the reserved access-control subgraph.
    pub fn find_nodes_by_properties(&self, graph_id: &Id, filter: &DataMap, ctx: Option<&AccessContext>) -> Result<Vec<Node>> {
        let entry = self.graph(graph_id)?;
        let ctx = self.require_context(&entry, ctx)?;
        let backend = entry.backend.read();
        let nodes = backend
            .find_nodes_by_data(filter)?
            .into_iter()
            .filter(|n| !n.is_protected())
            .collect();
        Ok(self.filter_nodes(&**backend, nodes, ctx))
    }

    fn filter_nodes(&self, backend: &dyn Backend, nodes: Vec<Node>, ctx: Option<&AccessContext>) -> Vec<Node> {
        match ctx {
            None => nodes,
            Some(ctx) => access::filter_results(nodes.into_iter().map(Readable::Node).collect(), ctx, backend)
                .into_iter()
                .filter_map(|item| match item {
                    Readable::Node(n) => Some(n),
                    _ => None,
                })
                .collect(),
        }
    }

    /// Dispatches to one of the five graph algorithms (`spec.md` §4.4).
    #[instrument(skip(self, algorithm, ctx, cancel))]
    pub fn traverse(
        &self,
        graph_id: &Id,
        algorithm: Algorithm,
        opts: &AlgorithmOptions,
        ctx: Option<&AccessContext>,
        cancel: &CancellationToken,
    ) -> Result<AlgorithmResult> {
        let entry = self.graph(graph_id)?;
        let ctx = self.require_context(&entry, ctx)?;
        let backend = entry.backend.read();

        let result = match algorithm {
            Algorithm::Bfs { source, depth, weighted } => {
                let nodes = bfs::run(&**backend, &source, depth, weighted, opts, cancel)?;
                AlgorithmResult::Nodes(self.filter_nodes(&**backend, nodes, ctx))
            }
            Algorithm::ShortestPath { source, target } => {
                let mut path = dijkstra::run(&**backend, &source, &target, opts, cancel)?;
                path.path = self.filter_nodes(&**backend, path.path, ctx);
                AlgorithmResult::Path(path)
            }
            Algorithm::ConnectedComponents => {
                let components = components::run(&**backend, opts.edge_key.as_deref(), cancel)?;
                let filtered = components
                    .into_iter()
                    .map(|c| self.filter_nodes(&**backend, c, ctx))
                    .collect();
                AlgorithmResult::Components(filtered)
            }
            Algorithm::MinimumSpanningTree => {
                AlgorithmResult::SpanningTree(mst::run(&**backend, opts, cancel)?)
            }
            Algorithm::PageRank(pr_opts) => AlgorithmResult::Ranks(pagerank::run(&**backend, &pr_opts, cancel)?),
        };
        Ok(result)
    }

    // --- Access-control administration surface (`spec.md` §4.6) ---

    /// Registers an actor under the graph's access-control root.
    pub fn define_actor(&self, graph_id: &Id, actor_id: Id, attributes: DataMap) -> Result<Node> {
        let entry = self.graph(graph_id)?;
        let mut backend = self.acquire_write(&entry)?;
        access::define_actor(&mut **backend, actor_id, attributes)
    }

    /// Registers a scope under the graph's access-control root.
    pub fn define_scope(&self, graph_id: &Id, scope_id: Id, attributes: DataMap) -> Result<Node> {
        let entry = self.graph(graph_id)?;
        let mut backend = self.acquire_write(&entry)?;
        access::define_scope(&mut **backend, scope_id, attributes)
    }

    /// Grants `actor_id` the given operations on `scope_id`.
    pub fn grant_permission(&self, graph_id: &Id, actor_id: &Id, scope_id: &Id, operations: &[&str]) -> Result<crate::model::Edge> {
        let entry = self.graph(graph_id)?;
        let mut backend = self.acquire_write(&entry)?;
        access::grant_permission(&mut **backend, actor_id, scope_id, operations)
    }

    /// Checks whether `actor_id` holds `operation` on a scope matching `scope_id`.
    pub fn can(&self, graph_id: &Id, actor_id: &Id, scope_id: &str, operation: access::Permission) -> Result<bool> {
        let entry = self.graph(graph_id)?;
        let backend = entry.backend.read();
        Ok(access::can(&**backend, actor_id, scope_id, operation))
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreOptions::default())
    }
}
