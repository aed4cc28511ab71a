//! Table: fixed-capacity bucket array with tombstone deletion.
//!
//! A table never changes its bucket count. Entries are stored, overwritten
//! and tombstoned in place under per-bucket locks, so lookups and walks may
//! run concurrently with writes to the same instance. Capacity changes are
//! made by the owner building a fresh table and copying live entries into it
//! (`copy_live_into`), which also drops every tombstone.
//!
//! All key-taking methods receive the precomputed 32-bit hash; the table does
//! not know how keys are hashed.

use core::borrow::Borrow;
use core::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::RwLock;

#[derive(Debug)]
struct Slot<K, V> {
    hash: u32,
    key: K,
    // `None` marks a tombstone.
    value: Option<V>,
}

impl<K, V> Slot<K, V> {
    #[inline]
    fn matches<Q>(&self, hash: u32, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.hash == hash && self.key.borrow() == q
    }
}

/// Coarse statistics used by the resize policy.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TableStats {
    /// Live entries.
    pub entries: usize,
    /// Tombstoned entries.
    pub deleted: usize,
    /// Bucket count (the table's capacity).
    pub buckets: usize,
    /// Longest chain, live and tombstoned slots included.
    pub largest: usize,
    /// Longest chain holding at least two distinct hashes. Only such chains
    /// can get shorter in a table with a different bucket count.
    pub largest_mixed: usize,
}

impl TableStats {
    /// Live entries per bucket.
    pub fn load_factor(&self) -> f64 {
        self.entries as f64 / self.buckets as f64
    }
}

pub struct Table<K, V> {
    buckets: Box<[RwLock<Vec<Slot<K, V>>>]>,
    live: AtomicUsize,
    deleted: AtomicUsize,
    largest: AtomicUsize,
    largest_mixed: AtomicUsize,
}

impl<K, V> Table<K, V> {
    /// Build an empty table with `capacity` buckets (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buckets: (0..capacity).map(|_| RwLock::new(Vec::new())).collect(),
            live: AtomicUsize::new(0),
            deleted: AtomicUsize::new(0),
            largest: AtomicUsize::new(0),
            largest_mixed: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn bucket(&self, hash: u32) -> &RwLock<Vec<Slot<K, V>>> {
        &self.buckets[hash as usize % self.buckets.len()]
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn len(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            entries: self.live.load(Ordering::Acquire),
            deleted: self.deleted.load(Ordering::Acquire),
            buckets: self.buckets.len(),
            largest: self.largest.load(Ordering::Acquire),
            largest_mixed: self.largest_mixed.load(Ordering::Acquire),
        }
    }

    pub fn get<Q>(&self, hash: u32, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        V: Clone,
    {
        let bucket = self.bucket(hash).read();
        bucket
            .iter()
            .find(|s| s.value.is_some() && s.matches(hash, q))
            .and_then(|s| s.value.clone())
    }

    pub fn contains_key<Q>(&self, hash: u32, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let bucket = self.bucket(hash).read();
        bucket
            .iter()
            .any(|s| s.value.is_some() && s.matches(hash, q))
    }

    /// Insert or overwrite. A tombstone left by an earlier delete of the same
    /// key is revived rather than shadowed by a second slot.
    pub fn put(&self, hash: u32, key: K, value: V)
    where
        K: Eq,
    {
        let mut bucket = self.bucket(hash).write();
        if let Some(slot) = bucket.iter_mut().find(|s| s.matches(hash, &key)) {
            if slot.value.replace(value).is_none() {
                self.deleted.fetch_sub(1, Ordering::AcqRel);
                self.live.fetch_add(1, Ordering::AcqRel);
            }
            return;
        }
        bucket.push(Slot {
            hash,
            key,
            value: Some(value),
        });
        self.live.fetch_add(1, Ordering::AcqRel);
        self.largest.fetch_max(bucket.len(), Ordering::AcqRel);
        if bucket.iter().any(|s| s.hash != hash) {
            self.largest_mixed.fetch_max(bucket.len(), Ordering::AcqRel);
        }
    }

    /// Tombstone the entry for `q`, returning its value. Absent keys are a
    /// no-op.
    pub fn delete<Q>(&self, hash: u32, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut bucket = self.bucket(hash).write();
        let slot = bucket
            .iter_mut()
            .find(|s| s.value.is_some() && s.matches(hash, q))?;
        let old = slot.value.take();
        self.live.fetch_sub(1, Ordering::AcqRel);
        self.deleted.fetch_add(1, Ordering::AcqRel);
        old
    }

    /// Visit live entries in bucket order until `f` returns false.
    ///
    /// Each bucket is copied out under its read lock and visited after the
    /// lock is dropped, so `f` may write to this table (or to a map that owns
    /// it) without deadlocking. Writes racing with the walk may or may not be
    /// observed. Returns false if the walk was cut short.
    pub fn for_each<F>(&self, mut f: F) -> bool
    where
        K: Clone,
        V: Clone,
        F: FnMut(&K, &V) -> bool,
    {
        let mut batch: Vec<(K, V)> = Vec::new();
        for bucket in self.buckets.iter() {
            batch.clear();
            batch.extend(
                bucket
                    .read()
                    .iter()
                    .filter_map(|s| s.value.as_ref().map(|v| (s.key.clone(), v.clone()))),
            );
            for (k, v) in batch.iter() {
                if !f(k, v) {
                    return false;
                }
            }
        }
        true
    }

    /// Copy every live entry into `dst`, keeping the stored hashes.
    pub fn copy_live_into(&self, dst: &Table<K, V>)
    where
        K: Eq + Clone,
        V: Clone,
    {
        for bucket in self.buckets.iter() {
            for s in bucket.read().iter() {
                if let Some(v) = s.value.as_ref() {
                    dst.put(s.hash, s.key.clone(), v.clone());
                }
            }
        }
    }
}

impl<K, V> core::fmt::Debug for Table<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Table").field("stats", &self.stats()).finish()
    }
}
