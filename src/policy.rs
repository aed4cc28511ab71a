//! Resize decision policy.
//!
//! `ResizePolicy` holds the thresholds; `decide` maps a table's statistics
//! to at most one resize. The coordinator calls it under its write lock and
//! only when no iteration is in flight.

use crate::error::PolicyError;
use crate::table::TableStats;

/// Thresholds driving table growth and compaction.
///
/// Defaults: 16 initial buckets, grow above 6 live entries per bucket or past
/// 18 slots in one chain, compact when tombstones exceed a fifth of the live
/// entries, rebuild compacted tables at 2 entries per bucket, and never
/// resize tables holding fewer than 64 live entries.
///
/// Fields are independent: `min_entries` defaults to 4 entries per initial
/// bucket but does not follow later changes to `initial_capacity`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ResizePolicy {
    pub initial_capacity: usize,
    /// Target load factor of a compacted table.
    pub min_load_factor: usize,
    /// Growth trigger: live entries per bucket.
    pub max_load_factor: usize,
    /// Growth trigger: longest chain.
    pub max_bucket_len: usize,
    /// Compaction trigger: `entries < tombstone_ratio * deleted`.
    pub tombstone_ratio: usize,
    /// Tables with fewer live entries are never resized.
    pub min_entries: usize,
}

const INITIAL_CAPACITY: usize = 1 << 4;
const MIN_LOAD_FACTOR: usize = 2;
const MID_LOAD_FACTOR: usize = 4;
const MAX_LOAD_FACTOR: usize = 6;
const MAX_BUCKET_LEN: usize = 18;
const TOMBSTONE_RATIO: usize = 5;

impl Default for ResizePolicy {
    fn default() -> Self {
        Self {
            initial_capacity: INITIAL_CAPACITY,
            min_load_factor: MIN_LOAD_FACTOR,
            max_load_factor: MAX_LOAD_FACTOR,
            max_bucket_len: MAX_BUCKET_LEN,
            tombstone_ratio: TOMBSTONE_RATIO,
            min_entries: INITIAL_CAPACITY * MID_LOAD_FACTOR,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ResizeKind {
    /// Load factor or chain length too high.
    Grow,
    /// Tombstones dominate.
    Compact,
}

/// A resize chosen by [`ResizePolicy::decide`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Resize {
    pub kind: ResizeKind,
    /// Bucket count of the replacement table.
    pub capacity: usize,
}

impl ResizePolicy {
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_min_load_factor(mut self, factor: usize) -> Self {
        self.min_load_factor = factor;
        self
    }

    pub fn with_max_load_factor(mut self, factor: usize) -> Self {
        self.max_load_factor = factor;
        self
    }

    pub fn with_max_bucket_len(mut self, len: usize) -> Self {
        self.max_bucket_len = len;
        self
    }

    pub fn with_tombstone_ratio(mut self, ratio: usize) -> Self {
        self.tombstone_ratio = ratio;
        self
    }

    pub fn with_min_entries(mut self, entries: usize) -> Self {
        self.min_entries = entries;
        self
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.initial_capacity == 0 {
            return Err(PolicyError::ZeroCapacity);
        }
        if self.min_load_factor == 0 || self.max_load_factor == 0 {
            return Err(PolicyError::ZeroLoadFactor);
        }
        if self.tombstone_ratio == 0 {
            return Err(PolicyError::ZeroTombstoneRatio);
        }
        Ok(())
    }

    /// Pick a resize for a table with statistics `s`, first matching rule
    /// wins: grow, then compact, else nothing.
    ///
    /// Chain overflow only counts for chains holding more than one hash
    /// (`largest_mixed`); a chain of identical hashes stays whole at any
    /// capacity. Growth always adds at least one bucket.
    pub fn decide(&self, s: &TableStats) -> Option<Resize> {
        if s.entries < self.min_entries {
            return None;
        }
        let overloaded = s.entries > self.max_load_factor.saturating_mul(s.buckets);
        let overflowed = s.largest_mixed > self.max_bucket_len;
        if overloaded || overflowed {
            let capacity = s.buckets.saturating_mul(2).saturating_sub(1);
            return Some(Resize {
                kind: ResizeKind::Grow,
                capacity: capacity.max(s.buckets.saturating_add(1)),
            });
        }
        if s.entries < self.tombstone_ratio.saturating_mul(s.deleted) {
            let capacity = (s.entries / self.min_load_factor).max(self.initial_capacity);
            return Some(Resize {
                kind: ResizeKind::Compact,
                capacity,
            });
        }
        None
    }
}
