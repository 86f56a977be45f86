//! Configuration surface, mirroring the teacher's builder-style `Config`
//! (`db/config.rs`): plain structs with a `Default` impl and named presets,
//! rather than a config-file parser — there is no persisted-state surface
//! in scope for this crate (`spec.md` §6).

/// How a write operation behaves when it cannot immediately acquire the
/// per-graph lock (`spec.md` §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockWaitPolicy {
    /// Block until the lock is available (or the caller's deadline elapses).
    Block,
    /// Attempt once; if the lock is contended, fail immediately rather than queue.
    TryOnce,
}

impl Default for LockWaitPolicy {
    fn default() -> Self {
        LockWaitPolicy::Block
    }
}

/// Crate-wide defaults consulted when a call doesn't specify its own.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Lock acquisition behavior for mutating operations (`spec.md` §5).
    pub lock_wait: LockWaitPolicy,
    /// Whether graphs enforce access control by default when [`GraphOptions::access_control`] is unset.
    pub access_control_default: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            lock_wait: LockWaitPolicy::Block,
            access_control_default: false,
        }
    }
}

/// Options passed to [`crate::store::Store::init`].
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Id of the graph to create or reopen. A fresh UUIDv7 is generated if `None`.
    pub id: Option<crate::model::Id>,
    /// Human-readable name.
    pub name: String,
    /// Whether this graph's façade calls require an [`crate::access::AccessContext`].
    pub access_control: Option<bool>,
}

impl GraphOptions {
    /// Builds options for a named graph with the store's default access-control setting.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            access_control: None,
        }
    }

    /// Builds options for a graph with an explicit id.
    pub fn with_id(id: impl Into<crate::model::Id>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: name.into(),
            access_control: None,
        }
    }

    /// Enables access-control enforcement for this graph regardless of the store default.
    pub fn with_access_control(mut self, enabled: bool) -> Self {
        self.access_control = Some(enabled);
        self
    }
}
