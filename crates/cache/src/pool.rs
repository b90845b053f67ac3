use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// How many entries may hold an open connection at the same time, unless
/// configured otherwise.
pub const DEFAULT_CONNECTION_LIMIT: usize = 10;

/// Something that holds a resource the [`ConnectionPool`] can ask it to let go of.
#[async_trait]
pub trait Evict: Send + Sync {
    /// Human-readable name, used for logging only.
    fn label(&self) -> String;

    /// Release the held resource. The entry must be able to re-acquire it
    /// later on demand.
    async fn evict(&self) -> Result<()>;
}

/// Bounded registry of entries that currently hold an open connection.
///
/// This isn't an LRU: when the registry is full, slot 0 is always the one
/// evicted and the newcomer takes its place. Access to books is coarse
/// (whole books, not individual rows) so churn stays low and the simpler
/// policy is good enough.
///
/// Entries are held weakly. An entry that has been dropped elsewhere frees its
/// slot without needing to be evicted.
pub struct ConnectionPool<T> {
    capacity: usize,
    slots: Mutex<Vec<Weak<T>>>,
}

impl<T: Evict> ConnectionPool<T> {
    /// Create a registry with room for `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            slots: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record that `entry` is about to hold an open connection.
    ///
    /// Does nothing if the entry is already registered. When the registry is
    /// full, the entry in slot 0 is evicted and replaced. Eviction failures
    /// are logged and swallowed: they must never fail the caller, who is
    /// usually working on a completely different entry.
    #[instrument(level = "debug", skip_all, fields(entry = %entry.label()))]
    pub async fn register(&self, entry: &Arc<T>) {
        let mut slots = self.slots.lock().await;
        slots.retain(|slot| slot.strong_count() > 0);
        let candidate = Arc::downgrade(entry);
        if slots.iter().any(|slot| Weak::ptr_eq(slot, &candidate)) {
            return;
        }
        if slots.len() < self.capacity {
            debug!(open = slots.len() + 1, capacity = self.capacity, "Registered connection");
            slots.push(candidate);
            return;
        }
        let evicted = std::mem::replace(&mut slots[0], candidate);
        let Some(evicted) = evicted.upgrade() else {
            return;
        };
        debug!(evicted = %evicted.label(), "Connection limit reached; evicting");
        if let Err(err) = evicted.evict().await {
            let kind: &ErrorKind = &err;
            warn!(evicted = %evicted.label(), error = %kind, "Failed to close evicted connection");
        }
    }

    /// Number of live registered entries.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.iter().filter(|slot| slot.strong_count() > 0).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, entry: &Arc<T>) -> bool {
        let candidate = Arc::downgrade(entry);
        self.slots.lock().await.iter().any(|slot| Weak::ptr_eq(slot, &candidate))
    }
}

impl<T: Evict> Default for ConnectionPool<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_LIMIT)
    }
}

impl<T> fmt::Debug for ConnectionPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionPool").field("capacity", &self.capacity).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Entry {
        name: String,
        evictions: AtomicUsize,
        broken: bool,
    }

    impl Entry {
        fn new(name: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                evictions: AtomicUsize::new(0),
                broken: false,
            })
        }

        fn broken(name: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                name: name.into(),
                evictions: AtomicUsize::new(0),
                broken: true,
            })
        }

        fn evictions(&self) -> usize {
            self.evictions.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Evict for Entry {
        fn label(&self) -> String {
            self.name.clone()
        }

        async fn evict(&self) -> Result<()> {
            self.evictions.fetch_add(1, Ordering::SeqCst);
            if self.broken {
                exn::bail!(ErrorKind::Close(self.name.clone()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let pool = ConnectionPool::new(3);
        let entry = Entry::new("bofm");
        pool.register(&entry).await;
        pool.register(&entry).await;
        pool.register(&entry).await;
        assert_eq!(pool.len().await, 1);
        assert_eq!(entry.evictions(), 0);
    }

    #[rstest]
    #[case(1, 5)]
    #[case(3, 4)]
    #[case(10, 25)]
    #[tokio::test]
    async fn test_capacity_is_never_exceeded(#[case] capacity: usize, #[case] registrations: usize) {
        let pool = ConnectionPool::new(capacity);
        let entries: Vec<_> = (0..registrations).map(|i| Entry::new(format!("book-{i}"))).collect();
        for entry in &entries {
            pool.register(entry).await;
            assert!(pool.len().await <= capacity);
        }
        let evictions: usize = entries.iter().map(|e| e.evictions()).sum();
        assert_eq!(evictions, registrations.saturating_sub(capacity));
        assert!(entries.iter().all(|e| e.evictions() <= 1));
    }

    #[tokio::test]
    async fn test_slot_zero_is_evicted_once_per_eviction() {
        let pool = ConnectionPool::new(2);
        let (a, b, c, d) = (Entry::new("a"), Entry::new("b"), Entry::new("c"), Entry::new("d"));
        pool.register(&a).await;
        pool.register(&b).await;
        pool.register(&c).await;
        assert_eq!(a.evictions(), 1);
        assert!(!pool.contains(&a).await);
        assert!(pool.contains(&b).await);
        assert!(pool.contains(&c).await);
        // c replaced a in slot 0, so c is next in line.
        pool.register(&d).await;
        assert_eq!(c.evictions(), 1);
        assert_eq!(b.evictions(), 0);
        assert_eq!(a.evictions(), 1);
        assert!(pool.contains(&b).await);
        assert!(pool.contains(&d).await);
    }

    #[tokio::test]
    async fn test_eviction_failure_is_swallowed() {
        let pool = ConnectionPool::new(1);
        let broken = Entry::broken("broken");
        let fine = Entry::new("fine");
        pool.register(&broken).await;
        pool.register(&fine).await;
        assert_eq!(broken.evictions(), 1);
        assert!(pool.contains(&fine).await);
    }

    #[tokio::test]
    async fn test_dropped_entries_free_their_slot() {
        let pool = ConnectionPool::new(1);
        let gone = Entry::new("gone");
        pool.register(&gone).await;
        drop(gone);
        assert!(pool.is_empty().await);
        let next = Entry::new("next");
        pool.register(&next).await;
        assert_eq!(next.evictions(), 0);
        assert_eq!(pool.len().await, 1);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let pool: ConnectionPool<Entry> = ConnectionPool::new(0);
        assert_eq!(pool.capacity(), 1);
    }
}
