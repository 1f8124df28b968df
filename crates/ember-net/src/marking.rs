//! Block-marking continuations.
//!
//! A caller asks the player to mark N blocks (by starting to dig them) and
//! supplies a continuation that receives the marked positions. Requests are
//! served in order; cancelled requests are dropped without running.

use std::collections::VecDeque;
use std::sync::Mutex;

use ember_proto::types::BlockPos;

pub type Continuation<C> = Box<dyn FnOnce(&C, &[BlockPos]) + Send>;

pub struct MarkRequest<C> {
    remaining: usize,
    marked: Vec<BlockPos>,
    continuation: Continuation<C>,
}

/// A request that collected all its marks, ready to run.
pub struct Completed<C> {
    pub positions: Vec<BlockPos>,
    pub continuation: Continuation<C>,
}

impl<C> Completed<C> {
    pub fn run(self, ctx: &C) {
        (self.continuation)(ctx, &self.positions);
    }
}

pub struct MarkQueue<C> {
    requests: Mutex<VecDeque<MarkRequest<C>>>,
}

impl<C> MarkQueue<C> {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue a request for `count` marks. `count` must be non-zero.
    pub fn push(&self, count: usize, continuation: Continuation<C>) {
        debug_assert!(count > 0);
        self.requests
            .lock()
            .expect("mark queue poisoned")
            .push_back(MarkRequest {
                remaining: count,
                marked: Vec::with_capacity(count),
                continuation,
            });
    }

    pub fn is_pending(&self) -> bool {
        !self.requests.lock().expect("mark queue poisoned").is_empty()
    }

    /// Record one mark against the head request. Returns it once complete;
    /// the caller runs it outside the queue lock.
    pub fn mark(&self, pos: BlockPos) -> Option<Completed<C>> {
        let mut requests = self.requests.lock().expect("mark queue poisoned");
        let head = requests.front_mut()?;
        head.marked.push(pos);
        head.remaining -= 1;
        if head.remaining > 0 {
            return None;
        }
        let done = requests.pop_front()?;
        Some(Completed {
            positions: done.marked,
            continuation: done.continuation,
        })
    }

    /// Marks still needed by the head request.
    pub fn remaining(&self) -> usize {
        self.requests
            .lock()
            .expect("mark queue poisoned")
            .front()
            .map_or(0, |r| r.remaining)
    }

    /// Drop every request without running it. Returns how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self
            .requests
            .lock()
            .expect("mark queue poisoned")
            .drain(..)
            .collect();
        drained.len()
    }
}

impl<C> Default for MarkQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    type Log = Mutex<Vec<Vec<BlockPos>>>;

    fn record() -> Continuation<Log> {
        Box::new(|log: &Log, positions: &[BlockPos]| {
            log.lock().unwrap().push(positions.to_vec());
        })
    }

    #[test]
    fn continuation_gets_positions_in_order() {
        let queue = MarkQueue::new();
        let log = Log::default();
        queue.push(2, record());
        assert!(queue.is_pending());
        assert!(queue.mark(BlockPos::new(1, 2, 3)).is_none());
        assert_eq!(queue.remaining(), 1);
        let done = queue.mark(BlockPos::new(4, 5, 6)).unwrap();
        done.run(&log);
        assert_eq!(
            log.lock().unwrap()[0],
            vec![BlockPos::new(1, 2, 3), BlockPos::new(4, 5, 6)]
        );
        assert!(!queue.is_pending());
    }

    #[test]
    fn requests_are_served_fifo() {
        let queue = MarkQueue::new();
        let log = Log::default();
        queue.push(1, record());
        queue.push(1, record());
        queue.mark(BlockPos::new(0, 0, 0)).unwrap().run(&log);
        queue.mark(BlockPos::new(9, 9, 9)).unwrap().run(&log);
        let log = log.lock().unwrap();
        assert_eq!(log[0], vec![BlockPos::new(0, 0, 0)]);
        assert_eq!(log[1], vec![BlockPos::new(9, 9, 9)]);
    }

    #[test]
    fn no_request_means_no_mark() {
        let queue: MarkQueue<Log> = MarkQueue::new();
        assert!(queue.mark(BlockPos::new(0, 0, 0)).is_none());
    }

    #[test]
    fn cancel_drops_without_running() {
        let ran = Arc::new(AtomicUsize::new(0));
        let queue: MarkQueue<()> = MarkQueue::new();
        for _ in 0..3 {
            let ran = Arc::clone(&ran);
            queue.push(
                2,
                Box::new(move |_, _| {
                    ran.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }
        assert_eq!(queue.cancel_all(), 3);
        assert!(!queue.is_pending());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }
}
