//! The subscription interface (`spec.md` §6): a collaborator-facing hook,
//! consumed by wire adapters, that the core notifies on every successful
//! transaction operation. Mirrors the teacher's pluggable-observer shape
//! (`db/metrics.rs`, `db/health.rs` sit behind narrow traits the engine
//! calls into without knowing the concrete observer).
//!
//! The reference implementation, [`NoopSubscriber`], is a no-op — wiring an
//! actual pub/sub transport is a wire-adapter concern, out of scope here.

use crate::error::Result;
use crate::model::{EntityKind, Id};

/// What happened to an entity, emitted in commit order for each successful
/// transaction operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// An entity was created.
    Created {
        /// The kind of entity created.
        kind: EntityKind,
        /// Its id.
        id: Id,
    },
    /// An entity was updated.
    Updated {
        /// The kind of entity updated.
        kind: EntityKind,
        /// Its id.
        id: Id,
    },
    /// An entity was deleted.
    Deleted {
        /// The kind of entity deleted.
        kind: EntityKind,
        /// Its id.
        id: Id,
    },
}

/// An opaque handle returned by [`Subscriber::subscribe`], used to later
/// [`Subscriber::unsubscribe`].
pub type SubscriptionId = u64;

/// A pluggable observer of store events. Adapters implement this (or wrap
/// their own transport behind it) to relay `created`/`updated`/`deleted`
/// events to external subscribers.
pub trait Subscriber: Send + Sync {
    /// Registers interest in `topic`, returning a handle for later removal.
    fn subscribe(&self, topic: &str) -> Result<SubscriptionId>;

    /// Removes a previously registered subscription.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<()>;

    /// Publishes `event` to every subscription whose topic matches `topic`
    /// (exact or via [`pattern_topic`]).
    fn broadcast(&self, topic: &str, event: Event) -> Result<()>;
}

/// Matches a subscription topic pattern against a concrete topic, using the
/// same `exact | prefix:* | *` language as access-control scopes
/// (`spec.md` §3 invariant 6), so adapters can reuse one mental model for both.
pub fn pattern_topic(pattern: &str, topic: &str) -> bool {
    crate::access::scope_matches(pattern, topic)
}

/// A [`Subscriber`] that accepts every call and delivers nothing, matching
/// `spec.md`'s "reference implementation is a no-op."
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSubscriber;

impl Subscriber for NoopSubscriber {
    fn subscribe(&self, _topic: &str) -> Result<SubscriptionId> {
        Ok(0)
    }

    fn unsubscribe(&self, _id: SubscriptionId) -> Result<()> {
        Ok(())
    }

    fn broadcast(&self, _topic: &str, _event: Event) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_topic_matches_prefix_wildcard() {
        assert!(pattern_topic("graph:*", "graph:g1"));
        assert!(!pattern_topic("graph:*", "actor:a1"));
    }

    #[test]
    fn noop_subscriber_accepts_every_call() {
        let sub = NoopSubscriber;
        let id = sub.subscribe("graph:*").unwrap();
        sub.broadcast("graph:g1", Event::Created { kind: EntityKind::Node, id: Id::from("n1") })
            .unwrap();
        sub.unsubscribe(id).unwrap();
    }
}
