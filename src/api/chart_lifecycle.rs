use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::{ChartError, ChartResult};
use crate::render::Surface;

use super::chart::AnchorState;
use super::chart_group::GroupAction;
use super::{Chart, ChartDrawer, ChartEvent, EventDetail};

/// `Unrendered -> Rendered <-> Redrawn`; `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    Unrendered,
    Rendered,
    Redrawn,
    Disposed,
}

impl Chart {
    #[must_use]
    pub fn phase(&self) -> LifecyclePhase {
        self.inner.state.borrow().phase
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.phase() == LifecyclePhase::Disposed
    }

    /// Rendering surface; children report their parent's.
    #[must_use]
    pub fn surface(&self) -> Option<Surface> {
        let parent = {
            let state = self.inner.state.borrow();
            match &state.anchor {
                AnchorState::Child { parent } => parent.clone(),
                AnchorState::Root { .. } | AnchorState::Unanchored => {
                    return state.surface.clone();
                }
            }
        };
        parent.surface()
    }

    /// Tears down the current surface (cancelling its transition) and
    /// creates a fresh, sized one under the root element.
    pub fn reset_surface(&self) -> ChartResult<Surface> {
        self.ensure_live()?;
        let (root, stale) = {
            let mut state = self.inner.state.borrow_mut();
            let root = match &state.anchor {
                AnchorState::Root { element } => element.clone(),
                AnchorState::Child { .. } => {
                    return Err(ChartError::InvalidState(format!(
                        "chart {} is a child and draws into its parent's surface",
                        self.id()
                    )));
                }
                AnchorState::Unanchored => {
                    return Err(ChartError::InvalidState(format!(
                        "chart {} is not anchored",
                        self.id()
                    )));
                }
            };
            (root, state.surface.take())
        };
        if let Some(stale) = stale {
            stale.detach(self.runtime().scheduler());
        }
        let surface = Surface::attach(&root);
        self.inner.state.borrow_mut().surface = Some(surface.clone());
        self.size_surface()?;
        Ok(surface)
    }

    fn ensure_surface(&self) -> ChartResult<()> {
        let needs_surface = {
            let state = self.inner.state.borrow();
            matches!(state.anchor, AnchorState::Root { .. }) && state.surface.is_none()
        };
        if needs_surface {
            self.reset_surface()?;
        }
        Ok(())
    }

    /// Applies the current width/height to the surface owned by this chart.
    fn size_surface(&self) -> ChartResult<()> {
        let surface = self.inner.state.borrow().surface.clone();
        let Some(surface) = surface else {
            return Ok(());
        };
        let width = self.width()?;
        let height = self.height()?;
        let view_box = self.inner.config.borrow().use_view_box_resizing();
        surface.set_size(width, height, view_box);
        Ok(())
    }

    /// Full render: recomputes size, draws, renders the legend and runs the
    /// post-render notification sequence.
    pub fn render(&self) -> ChartResult<()> {
        self.ensure_live()?;
        self.invalidate_size_cache();
        self.emit(ChartEvent::PreRender, &EventDetail::None);

        self.ensure_surface()?;
        self.size_surface()?;
        self.run_drawer(|drawer, chart| drawer.draw(chart))?;
        self.render_legend()?;

        self.set_phase(LifecyclePhase::Rendered);
        debug!(chart = %self.id(), "chart rendered");
        self.activate_renderlets(ChartEvent::PostRender);
        Ok(())
    }

    /// Incremental redraw against the existing surface.
    pub fn redraw(&self) -> ChartResult<()> {
        self.ensure_live()?;
        self.size_surface()?;
        self.emit(ChartEvent::PreRedraw, &EventDetail::None);

        self.run_drawer(|drawer, chart| drawer.update(chart))?;
        self.render_legend()?;

        self.set_phase(LifecyclePhase::Redrawn);
        debug!(chart = %self.id(), "chart redrawn");
        self.activate_renderlets(ChartEvent::PostRedraw);
        Ok(())
    }

    /// Releases the filter binding and leaves the group. Idempotent.
    pub fn dispose(&self) {
        if self.is_disposed() {
            return;
        }
        let (group, surface) = {
            let mut state = self.inner.state.borrow_mut();
            state.phase = LifecyclePhase::Disposed;
            (state.group.clone(), state.surface.clone())
        };
        if let Some(surface) = surface {
            surface.cancel_transition(group.runtime().scheduler());
        }
        group.deregister(self);
        self.binding().dispose();
        debug!(chart = %self.id(), "chart disposed");
    }

    fn set_phase(&self, phase: LifecyclePhase) {
        self.inner.state.borrow_mut().phase = phase;
    }

    /// Runs a drawer hook with the drawer moved out of its slot, so the hook
    /// may call back into the chart. A drawer installed by the hook wins.
    fn run_drawer(
        &self,
        hook: impl FnOnce(&mut dyn ChartDrawer, &Chart) -> ChartResult<()>,
    ) -> ChartResult<()> {
        let taken = self.inner.drawer.borrow_mut().take();
        let Some(mut drawer) = taken else {
            return Err(ChartError::InvalidState(format!(
                "chart {} is already drawing",
                self.id()
            )));
        };
        let outcome = hook(drawer.as_mut(), self);
        let mut slot = self.inner.drawer.borrow_mut();
        if slot.is_none() {
            *slot = Some(drawer);
        }
        outcome
    }

    fn render_legend(&self) -> ChartResult<()> {
        let taken = self.inner.legend.borrow_mut().take();
        let Some(mut legend) = taken else {
            return Ok(());
        };
        let outcome = legend.render();
        let mut slot = self.inner.legend.borrow_mut();
        if slot.is_none() {
            *slot = Some(legend);
        }
        outcome
    }

    /// Effective transition duration; zero when the registry disables
    /// transitions.
    #[must_use]
    pub fn transition_duration(&self) -> Duration {
        if self.runtime().transitions_disabled() {
            return Duration::ZERO;
        }
        self.inner.config.borrow().transition_duration()
    }

    fn activate_renderlets(&self, event: ChartEvent) {
        self.emit(ChartEvent::PreTransition, &EventDetail::None);
        let duration = self.transition_duration();
        match self.surface() {
            Some(surface) if !duration.is_zero() => {
                let delay = self.inner.config.borrow().transition_delay();
                trace!(chart = %self.id(), ?event, ?duration, ?delay, "deferring post-transition hooks");
                let weak = self.downgrade();
                surface.start_transition(self.runtime().scheduler(), delay, duration, move || {
                    if let Some(chart) = Chart::upgrade(&weak) {
                        if !chart.is_disposed() {
                            chart.finish_transition(event);
                        }
                    }
                });
            }
            _ => self.finish_transition(event),
        }
    }

    fn finish_transition(&self, event: ChartEvent) {
        self.emit(ChartEvent::Renderlet, &EventDetail::None);
        self.emit(event, &EventDetail::None);
    }

    /// Asks the chart group to render every member, through the commit
    /// handler when one is configured.
    pub fn render_group(&self) -> ChartResult<()> {
        self.request_group_action(GroupAction::Render)
    }

    /// Asks the chart group to redraw every member, through the commit
    /// handler when one is configured.
    ///
    /// With a commit handler the call always returns `Ok`: a rejected
    /// commit is logged and the group action is skipped.
    pub fn redraw_group(&self) -> ChartResult<()> {
        self.request_group_action(GroupAction::Redraw)
    }

    fn request_group_action(&self, action: GroupAction) -> ChartResult<()> {
        self.ensure_live()?;
        let group = self.chart_group();
        let handler = self.inner.hooks.borrow().commit_handler.clone();
        let Some(handler) = handler else {
            return group.run(action);
        };

        let chart_id = self.id().clone();
        handler.commit(
            action == GroupAction::Render,
            Box::new(move |outcome: ChartResult<()>| match outcome {
                Ok(()) => {
                    if let Err(err) = group.run(action) {
                        warn!(chart = %chart_id, ?action, error = %err, "group action failed after commit");
                    }
                }
                Err(err) => {
                    warn!(chart = %chart_id, ?action, error = %err, "commit handler failed; group action skipped");
                }
            }),
        );
        Ok(())
    }
}
