//! Suspend-resize counter.
//!
//! Counts in-flight iterations. Resizing is only allowed while the count is
//! zero; the coordinator checks it under the same lock it holds when
//! incrementing, so a resize can never start after an iteration registered.
//! Releasing needs no lock: only the zero/non-zero state matters.

use core::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub(crate) struct SuspendResize {
    active: AtomicUsize,
}

impl SuspendResize {
    pub(crate) const fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
        }
    }

    /// Register one iteration. The caller must hold the map's write lock.
    #[inline]
    pub(crate) fn suspend(&self) -> SuspendGuard<'_> {
        self.active.fetch_add(1, Ordering::AcqRel);
        SuspendGuard { owner: self }
    }

    /// True while at least one guard is alive.
    #[inline]
    pub(crate) fn is_suspended(&self) -> bool {
        self.active.load(Ordering::Acquire) != 0
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }
}

/// RAII guard returned by `SuspendResize::suspend`. Dropping it, including
/// during unwinding, releases the suspension.
#[must_use = "resizing resumes as soon as the guard is dropped"]
#[derive(Debug)]
pub(crate) struct SuspendGuard<'a> {
    owner: &'a SuspendResize,
}

impl<'a> Drop for SuspendGuard<'a> {
    fn drop(&mut self) {
        let prev = self.owner.active.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0);
    }
}

#[cfg(test)]
mod tests {
    use super::SuspendResize;

    #[test]
    fn suspend_and_release() {
        let s = SuspendResize::new();
        assert!(!s.is_suspended());
        {
            let _g = s.suspend();
            assert!(s.is_suspended());
        }
        assert!(!s.is_suspended());
    }

    /// Invariant: suspensions nest; resizing resumes only after the last
    /// guard is gone.
    #[test]
    fn nested_guards_count_up_and_down() {
        let s = SuspendResize::new();
        let g1 = s.suspend();
        let g2 = s.suspend();
        assert_eq!(s.active(), 2);
        drop(g1);
        assert!(s.is_suspended());
        drop(g2);
        assert_eq!(s.active(), 0);
    }

    /// Invariant: unwinding through nested guards releases every one.
    #[test]
    fn guards_release_on_panic() {
        let s = SuspendResize::new();
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g1 = s.suspend();
            let _g2 = s.suspend();
            assert_eq!(s.active(), 2);
            panic!("walk aborted");
        }));
        assert!(res.is_err());
        assert_eq!(s.active(), 0);
        assert!(!s.is_suspended());
    }
}
