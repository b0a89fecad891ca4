use std::cell::Cell;
use std::rc::Rc;

use crate::core::Scheduler;
use crate::interaction::ThrottledTrigger;
use crate::render::Element;

struct RuntimeState {
    scheduler: Scheduler,
    events: ThrottledTrigger,
    document: Element,
    transitions_disabled: Cell<bool>,
}

/// Execution context shared by a registry, its groups and their charts.
#[derive(Clone)]
pub(crate) struct Runtime {
    state: Rc<RuntimeState>,
}

impl Runtime {
    pub(crate) fn new(transitions_disabled: bool) -> Self {
        let scheduler = Scheduler::new();
        Self {
            state: Rc::new(RuntimeState {
                events: ThrottledTrigger::new(scheduler.clone()),
                scheduler,
                document: Element::new("body"),
                transitions_disabled: Cell::new(transitions_disabled),
            }),
        }
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.state.scheduler
    }

    pub(crate) fn events(&self) -> &ThrottledTrigger {
        &self.state.events
    }

    pub(crate) fn document(&self) -> &Element {
        &self.state.document
    }

    pub(crate) fn transitions_disabled(&self) -> bool {
        self.state.transitions_disabled.get()
    }

    pub(crate) fn set_transitions_disabled(&self, disabled: bool) {
        self.state.transitions_disabled.set(disabled);
    }
}
