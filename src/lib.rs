//! # GraphOS Core
//!
//! GraphOS is a runtime for programs expressed as a directed, typed
//! property graph. This crate is its core: an in-process transactional
//! property-graph store, a set of traversal and analysis algorithms, and a
//! graph-expressed access-control policy that mediates every operation.
//!
//! ## Quick start
//!
//! ```rust
//! use graphos_core::config::{GraphOptions, StoreOptions};
//! use graphos_core::store::Store;
//! use graphos_core::transaction::{Operation, OperationData};
//! use graphos_core::value::DataMap;
//! use graphos_core::cancel::CancellationToken;
//!
//! let store = Store::new(StoreOptions::default());
//! let graph = store.init(GraphOptions::named("demo")).unwrap();
//!
//! let ops = vec![Operation::new(OperationData::CreateNode {
//!     id: None,
//!     key: Some("person".into()),
//!     data: DataMap::new(),
//!     schema: None,
//! })];
//! let (_tx_id, results) = store.execute(&graph, ops, None, &CancellationToken::none()).unwrap();
//! assert_eq!(results.len(), 1);
//! ```
//!
//! ## Architecture
//!
//! Leaves-first dependency order, matching the module layout below:
//! - [`model`] / [`value`] — the entity model: `Graph`, `Node`, `Edge`, `Meta`, `Value`.
//! - [`backend`] — the physical storage contract and its in-memory reference implementation.
//! - [`transaction`] — ordered, all-or-nothing operation batches with inverse-log rollback.
//! - [`query`] / [`algorithms`] — structured reads and the five graph algorithms.
//! - [`access`] — the access-control subgraph and authorizer.
//! - [`store`] — the façade composing all of the above behind one lock per graph.
//!
//! Out of scope: wire adapters, MCP session state, code analysis, a
//! CLI/TUI client, filesystem watchers, disk persistence, distributed
//! replication, and a query language beyond the structured traversal/filter
//! API defined in [`query`] and [`algorithms`].

pub mod access;
pub mod algorithms;
pub mod backend;
pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod message;
pub mod model;
pub mod query;
pub mod schema;
pub mod store;
pub mod subscription;
pub mod transaction;
pub mod value;

pub use error::{Error, Result};
pub use model::{Edge, GraphInfo, Id, Meta, Node};
pub use store::Store;
pub use value::Value;
