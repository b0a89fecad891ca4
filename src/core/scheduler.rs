use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

type Task = Box<dyn FnOnce()>;

/// Identifies one scheduled callback; used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle {
    due: Duration,
    seq: u64,
}

impl TimerHandle {
    #[must_use]
    pub fn due(self) -> Duration {
        self.due
    }
}

#[derive(Default)]
struct SchedulerState {
    now: Cell<Duration>,
    next_seq: Cell<u64>,
    queue: RefCell<BTreeMap<TimerHandle, Task>>,
}

/// Single-threaded deferred-callback queue driven by a virtual clock.
///
/// Every deferred step in the crate (throttle delays, transition completion,
/// asynchronous commits) goes through one of these. Time only moves when the
/// host calls [`Scheduler::advance`], which keeps ordering deterministic.
/// Callbacks run with no internal borrow held, so they may schedule or
/// cancel further work.
#[derive(Clone, Default)]
pub struct Scheduler {
    state: Rc<SchedulerState>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.now.get()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.queue.borrow().len()
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state.queue.borrow().is_empty()
    }

    /// Queues `task` to run once `delay` has elapsed on the virtual clock.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + 'static) -> TimerHandle {
        let seq = self.state.next_seq.get();
        self.state.next_seq.set(seq + 1);
        let handle = TimerHandle {
            due: self.now() + delay,
            seq,
        };
        trace!(?delay, seq, "schedule deferred task");
        self.state.queue.borrow_mut().insert(handle, Box::new(task));
        handle
    }

    /// Drops a queued task. Returns `false` when it already ran or was cancelled.
    pub fn cancel(&self, handle: TimerHandle) -> bool {
        self.state.queue.borrow_mut().remove(&handle).is_some()
    }

    #[must_use]
    pub fn is_scheduled(&self, handle: TimerHandle) -> bool {
        self.state.queue.borrow().contains_key(&handle)
    }

    /// Moves the clock forward, running every task that comes due in
    /// due-time order (ties in scheduling order). Returns the number of tasks run.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let target = self.now() + elapsed;
        let ran = self.run_due(target);
        self.state.now.set(target);
        ran
    }

    /// Runs queued tasks until nothing is left, including tasks scheduled
    /// by the tasks themselves.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next_due = self.state.queue.borrow().keys().next().map(|handle| handle.due);
            match next_due {
                Some(due) => ran += self.run_due(due),
                None => return ran,
            }
        }
    }

    fn run_due(&self, target: Duration) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut queue = self.state.queue.borrow_mut();
                let due = queue.first_key_value().map(|(handle, _)| handle.due);
                match due {
                    Some(due) if due <= target => queue.pop_first(),
                    _ => None,
                }
            };
            let Some((handle, task)) = next else {
                return ran;
            };
            if handle.due > self.now() {
                self.state.now.set(handle.due);
            }
            task();
            ran += 1;
        }
    }
}
