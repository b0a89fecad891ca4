use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::trace;

use crate::core::{Scheduler, TimerHandle};

type Action = Box<dyn FnOnce()>;

#[derive(Default)]
struct PendingSlot {
    generation: u64,
    timer: Option<TimerHandle>,
    action: Option<Action>,
}

/// Single-slot coalescing trigger.
///
/// Zero or absent delays run the action inline. Positive delays park the
/// action in the slot; a newer `trigger` replaces it, so only the last action
/// submitted within an overlapping delay window ever runs, and it runs once.
#[derive(Clone)]
pub struct ThrottledTrigger {
    scheduler: Scheduler,
    slot: Rc<RefCell<PendingSlot>>,
}

impl fmt::Debug for ThrottledTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThrottledTrigger")
            .field("pending", &self.has_pending())
            .finish()
    }
}

impl ThrottledTrigger {
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            slot: Rc::new(RefCell::new(PendingSlot::default())),
        }
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn trigger(&self, action: impl FnOnce() + 'static, delay: Option<Duration>) {
        let Some(delay) = delay.filter(|delay| !delay.is_zero()) else {
            action();
            return;
        };

        let generation = {
            let mut slot = self.slot.borrow_mut();
            if let Some(previous) = slot.timer.take() {
                self.scheduler.cancel(previous);
                trace!(generation = slot.generation, "superseded pending action");
            }
            slot.generation += 1;
            slot.action = Some(Box::new(action));
            slot.generation
        };

        let weak = Rc::downgrade(&self.slot);
        let timer = self
            .scheduler
            .schedule(delay, move || fire_if_current(&weak, generation));
        self.slot.borrow_mut().timer = Some(timer);
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slot.borrow().action.is_some()
    }

    /// Drops the pending action, if any. Returns `true` when one was dropped.
    pub fn cancel(&self) -> bool {
        let mut slot = self.slot.borrow_mut();
        if let Some(timer) = slot.timer.take() {
            self.scheduler.cancel(timer);
        }
        slot.generation += 1;
        slot.action.take().is_some()
    }
}

fn fire_if_current(slot: &Weak<RefCell<PendingSlot>>, generation: u64) {
    let Some(slot) = slot.upgrade() else {
        return;
    };
    let action = {
        let mut slot = slot.borrow_mut();
        if slot.generation != generation {
            return;
        }
        slot.timer = None;
        slot.action.take()
    };
    if let Some(action) = action {
        action();
    }
}
