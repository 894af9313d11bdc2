use crate::common::LockExt;
use futures::channel::oneshot;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub type Task = Box<dyn FnOnce() + Send>;

type TaskSlot = Arc<Mutex<Option<Task>>>;

/// Handle to a scheduled one-shot task
///
/// [cancel](Self::cancel) drops the task without running it and is an
/// idempotent no-op on a handle that was already cancelled or already fired.
/// Dropping the handle does not cancel the task.
pub struct TaskHandle {
    slot: TaskSlot,
    cancel: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl TaskHandle {
    fn new(slot: TaskSlot, cancel: Option<oneshot::Sender<()>>) -> Self {
        Self {
            slot,
            cancel: Arc::new(Mutex::new(cancel)),
        }
    }

    pub fn cancel(&self) {
        self.slot.with_mut(|slot| slot.take());
        if let Some(cancel) = self.cancel.with_mut(|cancel| cancel.take()) {
            let _ = cancel.send(());
        }
    }

    /// Task is still waiting to run
    pub fn is_pending(&self) -> bool {
        self.slot.with(|slot| slot.is_some())
    }
}

/// Scheduler capability
///
/// All core timers (preload debounce, removal exit-transitions) go through
/// this seam so hosts and tests control time explicitly. Implementations run
/// tasks on a single cooperative loop, never concurrently with each other.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle;
}

/// Scheduler backed by a tokio runtime
#[derive(Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Capture the current runtime, panics outside of a tokio context
    pub fn new() -> Self {
        Self::with_handle(tokio::runtime::Handle::current())
    }

    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let slot: TaskSlot = Arc::new(Mutex::new(Some(task)));
        let (cancel_send, cancel_recv) = oneshot::channel();
        self.handle.spawn({
            let slot = slot.clone();
            async move {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        if let Some(task) = slot.with_mut(|slot| slot.take()) {
                            task()
                        }
                    }
                    _ = cancel_recv => {}
                }
            }
        });
        TaskHandle::new(slot, Some(cancel_send))
    }
}

struct ManualInner {
    now: Duration,
    seq: u64,
    queue: Vec<(Duration, u64, TaskSlot)>,
}

/// Deterministic scheduler for tests and embedders without a runtime
///
/// Tasks fire from [advance](Self::advance) in deadline order; a task
/// scheduling further tasks during `advance` is picked up within the same
/// call when its deadline falls inside the advanced window.
#[derive(Clone)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualInner>>,
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualInner {
                now: Duration::ZERO,
                seq: 0,
                queue: Vec::new(),
            })),
        }
    }

    /// Move the clock forward, running every task due in the window
    pub fn advance(&self, by: Duration) {
        let target = self.inner.with(|inner| inner.now + by);
        loop {
            // earliest due slot, FIFO among equal deadlines
            let next = self.inner.with_mut(|inner| {
                let position = inner
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, (deadline, _, _))| *deadline <= target)
                    .min_by_key(|(_, (deadline, seq, _))| (*deadline, *seq))
                    .map(|(position, _)| position)?;
                let (deadline, _, slot) = inner.queue.remove(position);
                inner.now = deadline;
                Some(slot)
            });
            match next {
                Some(slot) => {
                    // run outside the lock, the task may schedule more work
                    if let Some(task) = slot.with_mut(|slot| slot.take()) {
                        task()
                    }
                }
                None => break,
            }
        }
        self.inner.with_mut(|inner| inner.now = target);
    }

    /// Number of not-yet-cancelled tasks in the queue
    pub fn pending(&self) -> usize {
        self.inner.with(|inner| {
            inner
                .queue
                .iter()
                .filter(|(_, _, slot)| slot.with(|slot| slot.is_some()))
                .count()
        })
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskHandle {
        let slot: TaskSlot = Arc::new(Mutex::new(Some(task)));
        self.inner.with_mut(|inner| {
            let deadline = inner.now + delay;
            let seq = inner.seq;
            inner.seq += 1;
            inner.queue.push((deadline, seq, slot.clone()));
        });
        TaskHandle::new(slot, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Arc<Mutex<usize>>, impl Fn() -> Task) {
        let count = Arc::new(Mutex::new(0));
        let make = {
            let count = count.clone();
            move || -> Task {
                let count = count.clone();
                Box::new(move || count.with_mut(|count| *count += 1))
            }
        };
        (count, make)
    }

    #[test]
    fn test_manual_advance_runs_due_tasks() {
        let scheduler = ManualScheduler::new();
        let (count, task) = counter();
        scheduler.schedule(Duration::from_millis(100), task());
        scheduler.schedule(Duration::from_millis(300), task());

        scheduler.advance(Duration::from_millis(50));
        assert_eq!(count.with(|c| *c), 0);
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(count.with(|c| *c), 1);
        assert_eq!(scheduler.pending(), 1);
        scheduler.advance(Duration::from_millis(1000));
        assert_eq!(count.with(|c| *c), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_reschedule_within_advance() {
        let scheduler = ManualScheduler::new();
        let (count, task) = counter();
        scheduler.schedule(Duration::from_millis(10), {
            let scheduler = scheduler.clone();
            let task = task();
            Box::new(move || {
                let _ = scheduler.schedule(Duration::from_millis(10), task);
            })
        });
        // chained task lands at t=20, inside the advanced window
        scheduler.advance(Duration::from_millis(30));
        assert_eq!(count.with(|c| *c), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let scheduler = ManualScheduler::new();
        let (count, task) = counter();
        let handle = scheduler.schedule(Duration::from_millis(10), task());
        assert!(handle.is_pending());
        handle.cancel();
        handle.cancel();
        assert!(!handle.is_pending());
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(count.with(|c| *c), 0);

        // cancelling after the task fired is a no-op too
        let handle = scheduler.schedule(Duration::from_millis(10), task());
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(count.with(|c| *c), 1);
        handle.cancel();
        assert_eq!(count.with(|c| *c), 1);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_fires_and_cancels() {
        let scheduler = TokioScheduler::new();
        let (count, task) = counter();

        let fired = scheduler.schedule(Duration::from_millis(5), task());
        let cancelled = scheduler.schedule(Duration::from_millis(5), task());
        cancelled.cancel();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.with(|c| *c), 1);
        assert!(!fired.is_pending());
        fired.cancel();
        assert_eq!(count.with(|c| *c), 1);
    }
}
