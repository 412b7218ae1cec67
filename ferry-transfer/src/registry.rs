//! Handler registry for looking up handlers by transfer ID
//!
//! The registry is an intrusive doubly linked list: the links live inside
//! each handler's [`HandlerCore`](crate::handler::HandlerCore), so
//! registering a handler never allocates. Handlers are linked by reference
//! and are never copied or moved by the registry.
//!
//! The `'s` lifetime makes the borrow checker enforce that every registered
//! handler (and the stream it is bound to) outlives the registry. Dropping a
//! registry unlinks its members, so they can be registered again elsewhere.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::io::Cursor;
//!
//! use ferry_transfer::{Handler, HandlerRegistry, ReadOnlyHandler, TransferId};
//!
//! let firmware = RefCell::new(Cursor::new(b"image".to_vec()));
//! let handler = ReadOnlyHandler::with_reader(1, &firmware);
//!
//! let registry = HandlerRegistry::new();
//! registry.register(&handler).unwrap();
//!
//! let found = registry.find(TransferId::new(1)).unwrap();
//! assert!(found.prepare_read().is_ok());
//! found.finalize_read(Ok(()));
//! ```

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TransferError;
use crate::handler::{Handler, TransferId};

/// Source of unique registry identities
static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registry, stored in the links of its members
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RegistryId(u64);

impl RegistryId {
    fn next() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Intrusive list of handlers, keyed by transfer ID
///
/// - Registering appends in O(1) after a uniqueness scan over the IDs
/// - Unregistering a handler is O(1) given the handler itself
/// - Lookup by ID walks the list
///
/// Not synchronized: share it only within one thread.
pub struct HandlerRegistry<'s> {
    id: RegistryId,
    head: Cell<Option<&'s dyn Handler<'s>>>,
    tail: Cell<Option<&'s dyn Handler<'s>>>,
    len: Cell<usize>,
}

impl<'s> HandlerRegistry<'s> {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            id: RegistryId::next(),
            head: Cell::new(None),
            tail: Cell::new(None),
            len: Cell::new(0),
        }
    }

    /// Link a handler into the registry
    ///
    /// # Errors
    ///
    /// - [`TransferError::AlreadyLinked`] if the handler is in any registry
    /// - [`TransferError::AlreadyExists`] if another handler has the same ID
    pub fn register(&self, handler: &'s dyn Handler<'s>) -> Result<(), TransferError> {
        let id = handler.id();
        let link = &handler.core().link;

        if link.owner.get().is_some() {
            return Err(TransferError::AlreadyLinked(id));
        }
        if self.contains(id) {
            return Err(TransferError::AlreadyExists(id));
        }

        let tail = self.tail.get();
        link.prev.set(tail);
        link.next.set(None);
        link.owner.set(Some(self.id));

        match tail {
            Some(tail) => tail.core().link.next.set(Some(handler)),
            None => self.head.set(Some(handler)),
        }
        self.tail.set(Some(handler));
        self.len.set(self.len.get() + 1);

        tracing::debug!(id = %id, capability = %handler.capability(), "handler registered");
        Ok(())
    }

    /// Unlink a handler
    ///
    /// Returns `false` if the handler is not linked into this registry.
    pub fn unregister(&self, handler: &dyn Handler<'s>) -> bool {
        let link = &handler.core().link;
        if link.owner.get() != Some(self.id) {
            return false;
        }

        let prev = link.prev.take();
        let next = link.next.take();
        match prev {
            Some(prev) => prev.core().link.next.set(next),
            None => self.head.set(next),
        }
        match next {
            Some(next) => next.core().link.prev.set(prev),
            None => self.tail.set(prev),
        }
        link.owner.set(None);
        self.len.set(self.len.get() - 1);

        tracing::debug!(id = %handler.id(), "handler unregistered");
        true
    }

    /// Find the handler serving `id`
    pub fn find(&self, id: TransferId) -> Option<&'s dyn Handler<'s>> {
        self.iter().find(|handler| handler.id() == id)
    }

    /// Whether a handler with `id` is registered
    pub fn contains(&self, id: TransferId) -> bool {
        self.find(id).is_some()
    }

    /// Number of registered handlers
    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Whether no handlers are registered
    pub fn is_empty(&self) -> bool {
        self.len.get() == 0
    }

    /// Iterate handlers in registration order
    ///
    /// The successor is read when a handler is yielded, so unregistering the
    /// yielded handler does not end the iteration.
    pub fn iter(&self) -> Iter<'s> {
        Iter {
            next: self.head.get(),
        }
    }

    /// Unlink every handler
    pub fn clear(&self) {
        let mut cursor = self.head.take();
        while let Some(handler) = cursor {
            let link = &handler.core().link;
            cursor = link.next.take();
            link.prev.set(None);
            link.owner.set(None);
        }
        self.tail.set(None);
        self.len.set(0);
    }
}

impl Default for HandlerRegistry<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HandlerRegistry<'_> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for HandlerRegistry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|handler| handler.id()))
            .finish()
    }
}

/// Iterator over registered handlers
pub struct Iter<'s> {
    next: Option<&'s dyn Handler<'s>>,
}

impl<'s> Iterator for Iter<'s> {
    type Item = &'s dyn Handler<'s>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.core().link.next.get();
        Some(current)
    }
}

impl<'s> IntoIterator for &HandlerRegistry<'s> {
    type Item = &'s dyn Handler<'s>;
    type IntoIter = Iter<'s>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{ReadOnlyHandler, ReadWriteHandler, WriteOnlyHandler};
    use std::cell::RefCell;
    use std::io::Cursor;

    fn ids(registry: &HandlerRegistry<'_>) -> Vec<u32> {
        registry.iter().map(|h| h.id().as_u32()).collect()
    }

    #[test]
    fn test_register_and_find() {
        let reader = RefCell::new(Cursor::new(b"abc".to_vec()));
        let writer = RefCell::new(Vec::<u8>::new());
        let read_only = ReadOnlyHandler::with_reader(1, &reader);
        let write_only = WriteOnlyHandler::with_writer(2, &writer);
        let read_write = ReadWriteHandler::new(3);

        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        registry.register(&read_only).unwrap();
        registry.register(&write_only).unwrap();
        registry.register(&read_write).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(ids(&registry), vec![1, 2, 3]);

        let found = registry.find(TransferId::new(2)).unwrap();
        assert!(std::ptr::addr_eq(found, &write_only));
        assert_eq!(found.prepare_read(), Err(TransferError::Unimplemented));
        assert!(registry.find(TransferId::new(99)).is_none());
        assert!(read_only.core().is_linked());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let first = ReadOnlyHandler::new(5);
        let second = WriteOnlyHandler::new(5);

        let registry = HandlerRegistry::new();
        registry.register(&first).unwrap();
        assert_eq!(
            registry.register(&second),
            Err(TransferError::AlreadyExists(TransferId::new(5)))
        );
        assert_eq!(registry.len(), 1);
        assert!(!second.core().is_linked());
    }

    #[test]
    fn test_handler_cannot_join_two_registries() {
        let handler = ReadOnlyHandler::new(1);

        let a = HandlerRegistry::new();
        let b = HandlerRegistry::new();
        a.register(&handler).unwrap();
        assert_eq!(
            b.register(&handler),
            Err(TransferError::AlreadyLinked(TransferId::new(1)))
        );
        assert_eq!(
            a.register(&handler),
            Err(TransferError::AlreadyLinked(TransferId::new(1)))
        );
        assert!(!b.unregister(&handler));
        assert!(a.unregister(&handler));
        b.register(&handler).unwrap();
        assert_eq!(ids(&b), vec![1]);
    }

    #[test]
    fn test_unregister_head_middle_tail() {
        let h1 = ReadOnlyHandler::new(1);
        let h2 = ReadOnlyHandler::new(2);
        let h3 = ReadOnlyHandler::new(3);
        let h4 = ReadOnlyHandler::new(4);

        let registry = HandlerRegistry::new();
        for handler in [&h1, &h2, &h3, &h4] {
            registry.register(handler).unwrap();
        }

        assert!(registry.unregister(&h2));
        assert_eq!(ids(&registry), vec![1, 3, 4]);
        assert!(registry.unregister(&h1));
        assert_eq!(ids(&registry), vec![3, 4]);
        assert!(registry.unregister(&h4));
        assert_eq!(ids(&registry), vec![3]);
        assert!(!registry.unregister(&h4));

        registry.register(&h1).unwrap();
        assert_eq!(ids(&registry), vec![3, 1]);
        assert_eq!(registry.len(), 2);

        assert!(registry.unregister(&h3));
        assert!(registry.unregister(&h1));
        assert!(registry.is_empty());
        assert!(registry.iter().next().is_none());
    }

    #[test]
    fn test_unregister_while_iterating() {
        let h1 = ReadOnlyHandler::new(1);
        let h2 = ReadOnlyHandler::new(2);
        let h3 = ReadOnlyHandler::new(3);

        let registry = HandlerRegistry::new();
        registry.register(&h1).unwrap();
        registry.register(&h2).unwrap();
        registry.register(&h3).unwrap();

        let mut visited = Vec::new();
        for handler in &registry {
            visited.push(handler.id().as_u32());
            registry.unregister(handler);
        }
        assert_eq!(visited, vec![1, 2, 3]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_clear_unlinks_everything() {
        let h1 = ReadOnlyHandler::new(1);
        let h2 = WriteOnlyHandler::new(2);

        let registry = HandlerRegistry::new();
        registry.register(&h1).unwrap();
        registry.register(&h2).unwrap();
        registry.clear();

        assert!(registry.is_empty());
        assert!(!h1.core().is_linked());
        assert!(!h2.core().is_linked());
        registry.register(&h2).unwrap();
        assert_eq!(ids(&registry), vec![2]);
    }

    #[test]
    fn test_dropped_registry_releases_handlers() {
        let handler = ReadOnlyHandler::new(1);
        let other = WriteOnlyHandler::new(2);

        {
            let scoped = HandlerRegistry::new();
            scoped.register(&handler).unwrap();
            scoped.register(&other).unwrap();
            assert!(handler.core().is_linked());
        }
        assert!(!handler.core().is_linked());
        assert!(!other.core().is_linked());

        let fresh = HandlerRegistry::new();
        fresh.register(&handler).unwrap();
        fresh.register(&other).unwrap();
        assert_eq!(ids(&fresh), vec![1, 2]);
    }

    #[test]
    fn test_debug_lists_ids() {
        let h1 = ReadOnlyHandler::new(10);
        let h2 = ReadOnlyHandler::new(20);
        let registry = HandlerRegistry::new();
        registry.register(&h1).unwrap();
        registry.register(&h2).unwrap();
        assert_eq!(
            format!("{registry:?}"),
            "[TransferId(10), TransferId(20)]"
        );
    }
}
