//! Connection lifecycle: Active → Draining → Released.
//!
//! One atomic word carries the outstanding-work count and two flag bits, so
//! "is draining" and "how much work is left" are always observed together.
//! Exactly one caller of [`Lifecycle::finish`] or [`Lifecycle::begin_drain`]
//! is told to perform the release.

use std::sync::atomic::{AtomicUsize, Ordering};

const DRAINING: usize = 1 << (usize::BITS - 1);
const RELEASED: usize = 1 << (usize::BITS - 2);
const COUNT_MASK: usize = RELEASED - 1;

/// Result of [`Lifecycle::begin_drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drain {
    /// This call moved the connection out of Active.
    pub first: bool,
    /// No work was outstanding; the caller must release.
    pub release: bool,
}

#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicUsize,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one unit of work. Fails once draining has begun.
    pub fn try_begin(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & (DRAINING | RELEASED) != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Retire one unit of work admitted by [`try_begin`](Self::try_begin).
    /// Returns `true` for the single caller that must release.
    pub fn finish(&self) -> bool {
        let prev = self.state.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev & COUNT_MASK > 0, "finish without begin");
        if prev & DRAINING != 0 && prev & COUNT_MASK == 1 {
            return self.claim_release();
        }
        false
    }

    /// Stop admitting work.
    pub fn begin_drain(&self) -> Drain {
        let prev = self.state.fetch_or(DRAINING, Ordering::AcqRel);
        let first = prev & DRAINING == 0;
        let release = prev & COUNT_MASK == 0 && self.claim_release();
        Drain { first, release }
    }

    fn claim_release(&self) -> bool {
        self.state
            .compare_exchange(
                DRAINING,
                DRAINING | RELEASED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn is_draining(&self) -> bool {
        self.state.load(Ordering::Acquire) & DRAINING != 0
    }

    pub fn is_released(&self) -> bool {
        self.state.load(Ordering::Acquire) & RELEASED != 0
    }

    pub fn outstanding(&self) -> usize {
        self.state.load(Ordering::Acquire) & COUNT_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn drain_without_work_releases_immediately() {
        let lc = Lifecycle::new();
        assert_eq!(
            lc.begin_drain(),
            Drain {
                first: true,
                release: true
            }
        );
        assert!(lc.is_released());
        assert_eq!(
            lc.begin_drain(),
            Drain {
                first: false,
                release: false
            }
        );
    }

    #[test]
    fn release_waits_for_outstanding_work() {
        let lc = Lifecycle::new();
        for _ in 0..3 {
            assert!(lc.try_begin());
        }
        let drain = lc.begin_drain();
        assert!(drain.first && !drain.release);
        assert!(!lc.try_begin());
        assert!(!lc.finish());
        assert!(!lc.finish());
        assert!(!lc.is_released());
        assert!(lc.finish());
        assert!(lc.is_released());
        assert_eq!(lc.outstanding(), 0);
    }

    #[test]
    fn finish_before_drain_does_not_release() {
        let lc = Lifecycle::new();
        assert!(lc.try_begin());
        assert!(!lc.finish());
        assert!(!lc.is_released());
        assert!(lc.begin_drain().release);
    }

    #[test]
    fn exactly_once_under_contention() {
        for _ in 0..50 {
            let lc = Arc::new(Lifecycle::new());
            let releases = Arc::new(AtomicUsize::new(0));
            let workers = 8;
            for _ in 0..workers {
                assert!(lc.try_begin());
            }
            let barrier = Arc::new(Barrier::new(workers + 1));

            let mut handles = Vec::new();
            for _ in 0..workers {
                let lc = Arc::clone(&lc);
                let releases = Arc::clone(&releases);
                let barrier = Arc::clone(&barrier);
                handles.push(thread::spawn(move || {
                    barrier.wait();
                    if lc.finish() {
                        releases.fetch_add(1, Ordering::SeqCst);
                    }
                }));
            }
            barrier.wait();
            if lc.begin_drain().release {
                releases.fetch_add(1, Ordering::SeqCst);
            }
            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(releases.load(Ordering::SeqCst), 1);
            assert!(lc.is_released());
        }
    }
}
