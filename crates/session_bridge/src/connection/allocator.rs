//! Connection id allocation.

use super::ConnectionId;
use crate::session::SessionRegistry;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out unique, non-zero connection ids.
///
/// Ids are drawn from a monotonically increasing atomic counter. After the
/// counter wraps around, zero is skipped and so is any id still present in
/// the registry, so an id is only reused once its previous holder has been
/// removed.
#[derive(Debug)]
pub struct ConnectionIdAllocator {
    next_id: AtomicUsize,
}

impl ConnectionIdAllocator {
    /// Creates an allocator whose first id is 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an allocator whose counter starts at `first`.
    pub fn starting_at(first: ConnectionId) -> Self {
        Self {
            next_id: AtomicUsize::new(first),
        }
    }

    /// Allocates an id that is non-zero and not currently registered.
    pub fn allocate(&self, registry: &SessionRegistry) -> ConnectionId {
        loop {
            // fetch_add wraps on overflow
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 && !registry.contains_key(id) {
                return id;
            }
        }
    }
}

impl Default for ConnectionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::context_for;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_first_id_is_one() {
        let registry = SessionRegistry::new();
        let allocator = ConnectionIdAllocator::new();
        assert_eq!(allocator.allocate(&registry), 1);
        assert_eq!(allocator.allocate(&registry), 2);
    }

    #[test]
    fn test_wraparound_skips_zero() {
        let registry = SessionRegistry::new();
        let allocator = ConnectionIdAllocator::starting_at(usize::MAX);
        assert_eq!(allocator.allocate(&registry), usize::MAX);
        assert_eq!(allocator.allocate(&registry), 1);
    }

    #[test]
    fn test_registered_ids_are_not_reused() {
        let registry = SessionRegistry::new();
        registry.add(1, context_for(1)).expect("add 1");
        registry.add(2, context_for(2)).expect("add 2");

        let allocator = ConnectionIdAllocator::starting_at(usize::MAX);
        assert_eq!(allocator.allocate(&registry), usize::MAX);
        assert_eq!(allocator.allocate(&registry), 3);

        registry.remove(1);
        let allocator = ConnectionIdAllocator::starting_at(1);
        assert_eq!(allocator.allocate(&registry), 1);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let registry = Arc::new(SessionRegistry::new());
        let allocator = Arc::new(ConnectionIdAllocator::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                let allocator = allocator.clone();
                std::thread::spawn(move || {
                    (0..250).map(|_| allocator.allocate(&registry)).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().expect("allocator thread panicked") {
                assert_ne!(id, 0);
                assert!(seen.insert(id), "id {id} allocated twice");
            }
        }
        assert_eq!(seen.len(), 1000);
    }
}
