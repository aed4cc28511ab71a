//! CMap: the coordinator. Lock-free loads, serialized writes, resizing
//! deferred while iterations are in flight.

use crate::error::PolicyError;
use crate::hasher::{FoldedHasher, KeyHasher};
use crate::policy::{Resize, ResizePolicy};
use crate::suspend::SuspendResize;
use crate::table::{Table, TableStats};
use core::borrow::Borrow;
use core::hash::Hash;
use core::sync::atomic::{AtomicU64, Ordering};
use crossbeam_epoch::{Atomic, Collector, Guard, Owned};
use parking_lot::Mutex;

/// A concurrent map whose backing table is replaced wholesale when it grows
/// or fills up with tombstones.
///
/// Loads never take the write lock. Stores and deletes serialize on it and
/// re-evaluate the [`ResizePolicy`] after every mutation. [`range`] holds
/// the lock only long enough to suspend resizing, so writers keep running
/// while a walk is in progress.
///
/// [`range`]: CMap::range
pub struct CMap<K, V, H = FoldedHasher> {
    current: Atomic<Table<K, V>>,
    write_lock: Mutex<()>,
    suspend: SuspendResize,
    hasher: H,
    policy: ResizePolicy,
    resizes: AtomicU64,
    // Per-map collector: retired tables are freed no later than the map
    // itself, so `K` and `V` need not be `'static`.
    collector: Collector,
}

impl<K, V> CMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_hasher(FoldedHasher::default())
    }
}

impl<K, V> Default for CMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> CMap<K, V, H>
where
    K: Eq + Clone,
    V: Clone,
    H: KeyHasher<K>,
{
    /// An empty map hashing keys with `hasher` under the default policy.
    pub fn with_hasher(hasher: H) -> Self {
        Self::build(hasher, ResizePolicy::default())
    }

    pub fn with_hasher_and_policy(hasher: H, policy: ResizePolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self::build(hasher, policy))
    }

    fn build(hasher: H, policy: ResizePolicy) -> Self {
        Self {
            current: Atomic::new(Table::new(policy.initial_capacity)),
            write_lock: Mutex::new(()),
            suspend: SuspendResize::new(),
            hasher,
            policy,
            resizes: AtomicU64::new(0),
            collector: Collector::new(),
        }
    }

    #[inline]
    fn pin(&self) -> Guard {
        self.collector.register().pin()
    }

    #[inline]
    fn current_table<'g>(&'g self, guard: &'g Guard) -> &'g Table<K, V> {
        let shared = self.current.load(Ordering::Acquire, guard);
        // SAFETY: `current` is non-null from construction until drop, and a
        // replaced table is only destroyed once every guard pinned before
        // the swap is gone.
        unsafe { shared.deref() }
    }

    /// Look up `key` without taking the write lock.
    pub fn load<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let hash = self.hasher.hash32(key);
        let guard = self.pin();
        self.current_table(&guard).get(hash, key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let hash = self.hasher.hash32(key);
        let guard = self.pin();
        self.current_table(&guard).contains_key(hash, key)
    }

    /// Insert or overwrite `key`. May replace the backing table.
    pub fn store(&self, key: K, value: V) {
        let hash = self.hasher.hash32(&key);
        let _w = self.write_lock.lock();
        let guard = self.pin();
        let table = self.current_table(&guard);
        table.put(hash, key, value);
        self.resize_if_needed(table, &guard);
    }

    /// Tombstone `key`, returning the value it held. May replace the backing
    /// table, also when `key` was absent.
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        H: KeyHasher<Q>,
    {
        let hash = self.hasher.hash32(key);
        let _w = self.write_lock.lock();
        let guard = self.pin();
        let table = self.current_table(&guard);
        let old = table.delete(hash, key);
        self.resize_if_needed(table, &guard);
        old
    }

    /// Call `f` on every live entry until it returns false.
    ///
    /// Resizing is suspended for the duration of the walk, so every entry
    /// comes from one table. Stores and deletes are not blocked and may or
    /// may not be observed. `f` may itself store into or delete from the
    /// map.
    pub fn range<F>(&self, f: F)
    where
        F: FnMut(&K, &V) -> bool,
    {
        let _suspended = {
            let _w = self.write_lock.lock();
            self.suspend.suspend()
        };
        let guard = self.pin();
        self.current_table(&guard).for_each(f);
    }

    // Caller holds `write_lock`; `table` is the current table.
    fn resize_if_needed(&self, table: &Table<K, V>, guard: &Guard) {
        let stats = table.stats();
        let Some(Resize { kind, capacity }) = self.policy.decide(&stats) else {
            return;
        };
        if self.suspend.is_suspended() {
            tracing::trace!(
                ?kind,
                capacity,
                iterations = self.suspend.active(),
                "Resize deferred by in-flight iteration"
            );
            return;
        }

        let fresh = Table::new(capacity);
        table.copy_live_into(&fresh);
        let old = self.current.swap(Owned::new(fresh), Ordering::AcqRel, guard);
        // SAFETY: `old` is no longer reachable through `current`; readers
        // that loaded it are pinned and keep it alive until they unpin.
        unsafe { guard.defer_destroy(old) };
        self.resizes.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            ?kind,
            old_buckets = stats.buckets,
            new_buckets = capacity,
            entries = stats.entries,
            purged = stats.deleted,
            "Resized table"
        );
    }

    /// Live entries in the current table.
    pub fn len(&self) -> usize {
        let guard = self.pin();
        self.current_table(&guard).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics of the current table.
    pub fn stats(&self) -> TableStats {
        let guard = self.pin();
        self.current_table(&guard).stats()
    }

    /// Number of table replacements since construction.
    pub fn resize_count(&self) -> u64 {
        self.resizes.load(Ordering::Relaxed)
    }

    pub fn is_resize_suspended(&self) -> bool {
        self.suspend.is_suspended()
    }

    pub fn policy(&self) -> &ResizePolicy {
        &self.policy
    }
}

impl<K, V, H> core::fmt::Debug for CMap<K, V, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let guard = self.collector.register().pin();
        // SAFETY: see `current_table`.
        let table = unsafe { self.current.load(Ordering::Acquire, &guard).deref() };
        f.debug_struct("CMap")
            .field("stats", &table.stats())
            .field("resizes", &self.resizes.load(Ordering::Relaxed))
            .field("suspended", &self.suspend.active())
            .finish()
    }
}

impl<K, V, H> Drop for CMap<K, V, H> {
    fn drop(&mut self) {
        // SAFETY: `&mut self` rules out live guards on this collector; tables
        // retired earlier are freed when `collector` drops.
        unsafe {
            let guard = crossbeam_epoch::unprotected();
            let table = self.current.load(Ordering::Relaxed, guard);
            if !table.is_null() {
                drop(table.into_owned());
            }
        }
    }
}
