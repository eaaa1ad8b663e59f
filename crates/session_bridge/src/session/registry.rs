//! The concurrency-safe map from connection id to session context.
//!
//! This is the central shared resource of the bridge: the network thread
//! adds and removes entries while the host thread looks them up once per
//! tick. A single readers-writer lock guards the whole map, and every lock
//! section covers only the map operation itself.

use super::SessionContext;
use crate::connection::ConnectionId;
use crate::error::BridgeError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Keyed collection of live sessions.
///
/// # Invariants
///
/// * At most one context per connection id.
/// * An id present in the registry belongs to an accepted, still-open connection.
///
/// The lock is never exposed. Multi-step updates go through
/// [`SessionRegistry::exclusive`], and contexts removed from the map are
/// dropped after the write lock is released.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: RwLock<HashMap<ConnectionId, Arc<SessionContext>>>,
}

/// Exclusive access to the registry map for the duration of a closure.
pub struct RegistryWriteScope<'a> {
    entries: &'a mut HashMap<ConnectionId, Arc<SessionContext>>,
}

impl RegistryWriteScope<'_> {
    /// Inserts a context, refusing to overwrite an existing entry.
    pub fn add(
        &mut self,
        connection_id: ConnectionId,
        context: Arc<SessionContext>,
    ) -> Result<(), BridgeError> {
        if self.entries.contains_key(&connection_id) {
            return Err(BridgeError::DuplicateConnection(connection_id));
        }
        self.entries.insert(connection_id, context);
        Ok(())
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<Arc<SessionContext>> {
        self.entries.remove(&connection_id)
    }

    pub fn contains_key(&self, connection_id: ConnectionId) -> bool {
        self.entries.contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `context` under `connection_id`.
    ///
    /// Fails with [`BridgeError::DuplicateConnection`] if the id is already
    /// present, leaving the existing entry untouched.
    pub fn add(
        &self,
        connection_id: ConnectionId,
        context: Arc<SessionContext>,
    ) -> Result<(), BridgeError> {
        self.exclusive(|scope| scope.add(connection_id, context))
    }

    /// Removes the entry for `connection_id`, if any.
    ///
    /// Removing an absent id is a no-op. The removed context is returned so
    /// that it is dropped by the caller, outside the lock.
    pub fn remove(&self, connection_id: ConnectionId) -> Option<Arc<SessionContext>> {
        self.entries.write().remove(&connection_id)
    }

    /// Returns the context registered for `connection_id`.
    pub fn lookup(&self, connection_id: ConnectionId) -> Option<Arc<SessionContext>> {
        self.entries.read().get(&connection_id).cloned()
    }

    pub fn contains_key(&self, connection_id: ConnectionId) -> bool {
        self.entries.read().contains_key(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Ids of every registered connection, in no particular order.
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.entries.read().keys().copied().collect()
    }

    /// References to every registered context, taken under one read lock.
    pub fn snapshot(&self) -> Vec<Arc<SessionContext>> {
        self.entries.read().values().cloned().collect()
    }

    /// Runs `f` with exclusive access to the map.
    ///
    /// `f` must only touch the map; it must not call back into collaborator code.
    pub fn exclusive<R>(&self, f: impl FnOnce(&mut RegistryWriteScope<'_>) -> R) -> R {
        let mut entries = self.entries.write();
        let mut scope = RegistryWriteScope {
            entries: &mut *entries,
        };
        f(&mut scope)
    }

    /// Removes and returns every entry. Used during teardown.
    pub fn drain(&self) -> Vec<Arc<SessionContext>> {
        let drained = std::mem::take(&mut *self.entries.write());
        drained.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context_for;
    use std::sync::Barrier;

    #[test]
    fn test_lookup_returns_same_context_until_removed() {
        let registry = SessionRegistry::new();
        let context = context_for(5);
        registry.add(5, context.clone()).expect("add should succeed");

        for _ in 0..3 {
            let found = registry.lookup(5).expect("context should be present");
            assert!(Arc::ptr_eq(&found, &context));
        }

        let from_other_thread = std::thread::scope(|s| {
            s.spawn(|| registry.lookup(5)).join().expect("lookup thread panicked")
        });
        assert!(Arc::ptr_eq(
            &from_other_thread.expect("visible from another thread"),
            &context
        ));

        registry.remove(5);
        assert!(registry.lookup(5).is_none());
    }

    #[test]
    fn test_duplicate_add_keeps_original() {
        let registry = SessionRegistry::new();
        let first = context_for(7);
        let second = context_for(7);

        registry.add(7, first.clone()).expect("first add should succeed");
        let result = registry.add(7, second);

        assert_eq!(result, Err(BridgeError::DuplicateConnection(7)));
        let found = registry.lookup(7).expect("original should remain");
        assert!(Arc::ptr_eq(&found, &first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SessionRegistry::new();
        registry.add(1, context_for(1)).expect("add 1");
        registry.add(2, context_for(2)).expect("add 2");

        assert!(registry.remove(1).is_some());
        assert!(registry.remove(1).is_none());
        assert!(registry.remove(99).is_none());

        assert_eq!(registry.connection_ids(), vec![2]);
        assert!(registry.contains_key(2));
    }

    #[test]
    fn test_concurrent_adds_of_distinct_ids() {
        let registry = Arc::new(SessionRegistry::new());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [7usize, 8]
            .into_iter()
            .map(|id| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.add(id, context_for(id))
                })
            })
            .collect();

        for handle in handles {
            handle
                .join()
                .expect("add thread panicked")
                .expect("distinct ids should both register");
        }

        assert!(registry.lookup(7).is_some());
        assert!(registry.lookup(8).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_exclusive_scope_is_atomic() {
        let registry = SessionRegistry::new();
        registry.add(1, context_for(1)).expect("add 1");

        let moved = registry.exclusive(|scope| {
            let context = scope.remove(1)?;
            scope.add(2, context).ok()
        });

        assert!(moved.is_some());
        assert!(!registry.contains_key(1));
        assert!(registry.contains_key(2));
    }

    #[test]
    fn test_drain_empties_registry() {
        let registry = SessionRegistry::new();
        for id in 1..=3 {
            registry.add(id, context_for(id)).expect("add");
        }

        let drained = registry.drain();
        assert_eq!(drained.len(), 3);
        assert!(registry.is_empty());
    }
}
