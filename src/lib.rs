//! resizing-cmap: a concurrent map with lock-free loads, serialized writes,
//! and online resizing that never blocks readers.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: many concurrent lookups, comparatively few mutations (shared
//!   caches, registries), with capacity that follows the live set.
//! - Layers:
//!   - Table<K, V>: fixed-capacity bucket array. Entries are stored,
//!     overwritten and tombstoned in place under per-bucket locks; the bucket
//!     count never changes.
//!   - ResizePolicy: pure decision from a table's statistics (live entries,
//!     tombstones, buckets, longest chain) to "grow", "compact" or nothing.
//!   - CMap<K, V, H>: the coordinator. Publishes one current table through an
//!     epoch-managed atomic pointer, serializes writes on a mutex, and swaps
//!     in a rebuilt table when the policy asks for it.
//!
//! Reads
//! - `load` pins an epoch guard, reads the current table pointer and looks
//!   the key up. It never touches the write lock. A reader that loaded a
//!   table keeps using it even if a resize swaps it out; the retired table is
//!   freed only after every such reader unpins.
//! - The lookup itself holds one bucket's read lock for the scan of that
//!   chain, so a load can briefly wait on a store or delete to the same
//!   bucket. It never waits on a resize or on another bucket.
//!
//! Writes and resizing
//! - `store`/`delete` take the write lock, mutate the current table in place,
//!   then consult the policy. A resize builds a new table, copies the live
//!   entries of the old one (dropping tombstones), and publishes it with a
//!   single atomic swap. Since all in-place writes happen under the same
//!   lock, nothing is lost between the copy and the swap.
//!
//! Iteration
//! - `range` takes the write lock only to bump the suspend-resize counter,
//!   then walks the current table without any map-level lock. While the
//!   counter is non-zero the policy is still evaluated but resizes are
//!   skipped; the next write after the walk re-evaluates. The counter is
//!   released by a drop guard, so a panicking visitor cannot wedge resizing.
//! - Walks are fuzzy: the table is never replaced underfoot, but stores and
//!   deletes racing with the walk may or may not be seen.
//!
//! Notes and non-goals
//! - Writes are fully serialized; there are no multi-key transactions.
//! - Keys hash to 32 bits through a caller-supplied [`KeyHasher`]; closures
//!   work directly and [`FoldedHasher`] adapts any std `BuildHasher`.
//! - Chain-length growth only fires for chains holding more than one hash.
//!   Keys that share one hash value cannot be split by any bucket count;
//!   such maps grow through the load factor alone.
//! - Values are returned by clone (`V: Clone`); wrap large values in `Arc`.
//! - Policy thresholds are configurable through [`ResizePolicy`]; resize
//!   events are emitted as `tracing` events.

mod error;
mod hasher;
mod map;
mod policy;
mod suspend;
pub mod table;

// Public surface
pub use error::PolicyError;
pub use hasher::{FoldedHasher, KeyHasher};
pub use map::CMap;
pub use policy::{Resize, ResizeKind, ResizePolicy};
pub use table::TableStats;
