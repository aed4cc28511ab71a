//! Key hashing: the caller-supplied `key -> u32` function.

use core::hash::{BuildHasher, Hash};
use std::collections::hash_map::RandomState;

/// A 32-bit hash function over keys, fixed for the lifetime of a map and
/// reused for every table the map builds.
///
/// Any `Fn(&K) -> u32 + Send + Sync` is a `KeyHasher<K>`, so closures and fn
/// items can be handed to [`CMap::with_hasher`](crate::CMap::with_hasher)
/// directly.
pub trait KeyHasher<K: ?Sized>: Send + Sync {
    fn hash32(&self, key: &K) -> u32;
}

impl<K, F> KeyHasher<K> for F
where
    K: ?Sized,
    F: Fn(&K) -> u32 + Send + Sync,
{
    #[inline]
    fn hash32(&self, key: &K) -> u32 {
        self(key)
    }
}

/// Adapts a std `BuildHasher` by folding its 64-bit output into 32 bits.
#[derive(Clone, Debug, Default)]
pub struct FoldedHasher<S = RandomState> {
    build: S,
}

impl<S> FoldedHasher<S> {
    pub fn new(build: S) -> Self {
        Self { build }
    }
}

impl<K, S> KeyHasher<K> for FoldedHasher<S>
where
    K: ?Sized + Hash,
    S: BuildHasher + Send + Sync,
{
    #[inline]
    fn hash32(&self, key: &K) -> u32 {
        let h = self.build.hash_one(key);
        (h ^ (h >> 32)) as u32
    }
}
