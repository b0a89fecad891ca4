use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tracing::trace;

use crate::core::{Scheduler, TimerHandle};

use super::Element;

/// Marker class put on every surface element a chart creates.
pub const SURFACE_CLASS: &str = "chart-surface";

struct SurfaceState {
    element: Element,
    transition: Cell<Option<TimerHandle>>,
}

/// Drawing root created under a chart's root element on first render.
///
/// At most one transition is live per surface: starting a new one cancels
/// the pending completion of the previous one, so only the latest
/// transition ever reports completion.
#[derive(Clone)]
pub struct Surface {
    state: Rc<SurfaceState>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface")
            .field("element", &self.state.element)
            .field("transition_pending", &self.state.transition.get().is_some())
            .finish()
    }
}

impl PartialEq for Surface {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl Surface {
    /// Creates a fresh surface element and appends it under `root`.
    #[must_use]
    pub fn attach(root: &Element) -> Self {
        let element = root.append(Element::new("svg").with_class(SURFACE_CLASS));
        Self {
            state: Rc::new(SurfaceState {
                element,
                transition: Cell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn element(&self) -> &Element {
        &self.state.element
    }

    pub fn set_size(&self, width: f64, height: f64, use_view_box: bool) {
        let element = self.element();
        if use_view_box {
            element.set_attr("viewBox", format!("0 0 {width} {height}"));
            element.remove_attr("width");
            element.remove_attr("height");
        } else {
            element.set_attr("width", width.to_string());
            element.set_attr("height", height.to_string());
            element.remove_attr("viewBox");
        }
    }

    /// Schedules `on_end` for when a transition of `duration` started after
    /// `delay` completes, superseding any transition still in flight.
    pub fn start_transition(
        &self,
        scheduler: &Scheduler,
        delay: Duration,
        duration: Duration,
        on_end: impl FnOnce() + 'static,
    ) {
        if let Some(previous) = self.state.transition.take() {
            if scheduler.cancel(previous) {
                trace!("interrupted in-flight surface transition");
            }
        }
        let weak = Rc::downgrade(&self.state);
        let handle = scheduler.schedule(delay + duration, move || {
            if let Some(state) = weak.upgrade() {
                state.transition.set(None);
            }
            on_end();
        });
        self.state.transition.set(Some(handle));
    }

    #[must_use]
    pub fn transition_pending(&self) -> bool {
        self.state.transition.get().is_some()
    }

    /// Drops the pending completion of the in-flight transition.
    pub fn cancel_transition(&self, scheduler: &Scheduler) -> bool {
        self.state
            .transition
            .take()
            .is_some_and(|pending| scheduler.cancel(pending))
    }

    /// Cancels the in-flight transition, if any, and detaches the element.
    pub fn detach(&self, scheduler: &Scheduler) {
        self.cancel_transition(scheduler);
        self.element().remove();
    }
}
