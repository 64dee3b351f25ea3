//! Shared task queue with worker wake-ups

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

use super::{Scheduled, Task, TaskKind, TaskQueue};

/// Most workers that may wait on one queue at a time
pub const MAX_WORKERS: usize = 4;

struct Shared {
    queue: TaskQueue,
    wakers: MultiWakerRegistration<MAX_WORKERS>,
}

/// [`TaskQueue`] shared between schedulers and a worker pool
///
/// Scheduling never blocks and is safe from the restricted interrupt
/// path.
pub struct DeferredQueue {
    shared: Mutex<CriticalSectionRawMutex, RefCell<Shared>>,
}

impl DeferredQueue {
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                queue: TaskQueue::new(),
                wakers: MultiWakerRegistration::new(),
            })),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        self.shared.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Queue a task and wake a waiting worker
    pub fn schedule(&self, task: Task) -> Scheduled {
        let outcome = self.with(|shared| {
            let outcome = shared.queue.schedule(task);
            if outcome == Scheduled::Queued {
                shared.wakers.wake();
            }
            outcome
        });
        trace!("schedule {}: {}", task.kind, outcome);
        outcome
    }

    /// Wait for the next runnable task
    ///
    /// Resolves to `None` once the queue is closed.
    pub async fn next(&self) -> Option<Task> {
        poll_fn(|cx| {
            self.with(|shared| {
                if let Some(task) = shared.queue.next() {
                    return Poll::Ready(Some(task));
                }
                if shared.queue.is_closed() {
                    return Poll::Ready(None);
                }
                shared.wakers.register(cx.waker());
                Poll::Pending
            })
        })
        .await
    }

    /// Take the next runnable task without waiting
    pub fn try_next(&self) -> Option<Task> {
        self.with(|shared| shared.queue.next())
    }

    /// Take the next runnable task accepted by `filter` without waiting
    pub fn try_next_matching(&self, filter: impl Fn(TaskKind) -> bool) -> Option<Task> {
        self.with(|shared| shared.queue.next_matching(filter))
    }

    /// Mark a task finished, waking workers if its kind was requeued
    pub fn complete(&self, kind: TaskKind) {
        self.with(|shared| {
            shared.queue.complete(kind);
            if shared.queue.has_ready() {
                shared.wakers.wake();
            }
        });
    }

    /// Drop pending tasks but keep accepting new ones
    pub fn clear(&self) -> usize {
        self.with(|shared| shared.queue.clear())
    }

    /// Drop pending tasks, close the queue and release every worker
    pub fn cancel_all(&self) -> usize {
        self.with(|shared| {
            let dropped = shared.queue.cancel_all();
            shared.wakers.wake();
            dropped
        })
    }

    pub fn is_closed(&self) -> bool {
        self.with(|shared| shared.queue.is_closed())
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.with(|shared| shared.queue.is_pending(kind))
    }

    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.with(|shared| shared.queue.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeferredQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embassy_futures::select::{select, Either};

    #[test]
    fn test_next_returns_queued() {
        let queue = DeferredQueue::new();
        queue.schedule(Task::now(TaskKind::Monitor));
        let task = block_on(queue.next());
        assert_eq!(task.map(|t| t.kind), Some(TaskKind::Monitor));
    }

    #[test]
    fn test_closed_queue_releases_worker() {
        let queue = DeferredQueue::new();
        queue.schedule(Task::now(TaskKind::Monitor));
        assert_eq!(queue.cancel_all(), 1);
        assert_eq!(block_on(queue.next()), None);
        assert_eq!(queue.schedule(Task::now(TaskKind::Monitor)), Scheduled::Closed);
    }

    #[test]
    fn test_waiting_worker_woken_by_schedule() {
        let queue = DeferredQueue::new();
        let scheduler = async {
            embassy_futures::yield_now().await;
            queue.schedule(Task::now(TaskKind::SystemReset));
            core::future::pending::<()>().await
        };

        match block_on(select(queue.next(), scheduler)) {
            Either::First(task) => assert_eq!(task.map(|t| t.kind), Some(TaskKind::SystemReset)),
            Either::Second(()) => unreachable!(),
        }
    }

    #[test]
    fn test_complete_wakes_for_requeued_kind() {
        let queue = DeferredQueue::new();
        queue.schedule(Task::now(TaskKind::Notification));
        let first = queue.try_next().unwrap();
        queue.schedule(Task::now(TaskKind::Notification));
        assert_eq!(queue.try_next(), None);

        queue.complete(first.kind);
        assert_eq!(queue.try_next().map(|t| t.kind), Some(TaskKind::Notification));
    }
}
