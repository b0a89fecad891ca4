use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use crate::core::Scheduler;
use crate::error::{ChartError, ChartResult, MemberFailure};
use crate::storage::FilterStore;

use super::Chart;
use super::chart::ChartInner;
use super::runtime::Runtime;

/// Called with the group after every group-wide render or redraw pass.
pub type GroupRenderletFn = Rc<dyn Fn(&ChartGroup)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GroupAction {
    Render,
    Redraw,
}

struct GroupInner {
    name: String,
    runtime: Runtime,
    members: RefCell<Vec<Weak<ChartInner>>>,
    store: FilterStore,
    renderlet: RefCell<Option<GroupRenderletFn>>,
}

/// Set of root charts rendered and redrawn together, plus the filter store
/// their bindings share.
///
/// Members are held weakly and visited in registration order.
#[derive(Clone)]
pub struct ChartGroup {
    inner: Rc<GroupInner>,
}

impl fmt::Debug for ChartGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartGroup")
            .field("name", &self.inner.name)
            .field("members", &self.inner.members.borrow().len())
            .finish()
    }
}

impl PartialEq for ChartGroup {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ChartGroup {}

impl ChartGroup {
    /// Standalone group with its own scheduler and document.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_runtime(name.into(), Runtime::new(false))
    }

    pub(crate) fn with_runtime(name: String, runtime: Runtime) -> Self {
        Self {
            inner: Rc::new(GroupInner {
                name,
                runtime,
                members: RefCell::new(Vec::new()),
                store: FilterStore::new(),
                renderlet: RefCell::new(None),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Filter storage context shared by every member's binding.
    #[must_use]
    pub fn filter_store(&self) -> &FilterStore {
        &self.inner.store
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        self.inner.runtime.scheduler()
    }

    /// Adds `chart`; already-registered and child charts are ignored.
    pub fn register(&self, chart: &Chart) {
        if chart.is_child() || self.has_chart(chart) {
            return;
        }
        self.inner.members.borrow_mut().push(chart.downgrade());
        debug!(group = %self.name(), chart = %chart.id(), "chart registered");
    }

    /// Removes `chart`; absent charts are ignored.
    pub fn deregister(&self, chart: &Chart) {
        let target = chart.downgrade();
        let mut members = self.inner.members.borrow_mut();
        let before = members.len();
        members.retain(|member| !Weak::ptr_eq(member, &target) && member.strong_count() > 0);
        if members.len() < before {
            debug!(group = %self.name(), chart = %chart.id(), "chart deregistered");
        }
    }

    #[must_use]
    pub fn has_chart(&self, chart: &Chart) -> bool {
        let target = chart.downgrade();
        self.inner
            .members
            .borrow()
            .iter()
            .any(|member| Weak::ptr_eq(member, &target))
    }

    /// Live members in registration order. Dropped charts are pruned.
    #[must_use]
    pub fn charts(&self) -> Vec<Chart> {
        let mut members = self.inner.members.borrow_mut();
        members.retain(|member| member.strong_count() > 0);
        members.iter().filter_map(Chart::upgrade).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.charts().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn deregister_all(&self) {
        self.inner.members.borrow_mut().clear();
        debug!(group = %self.name(), "all charts deregistered");
    }

    pub fn set_renderlet(&self, renderlet: impl Fn(&ChartGroup) + 'static) -> &Self {
        *self.inner.renderlet.borrow_mut() = Some(Rc::new(renderlet));
        self
    }

    pub fn clear_renderlet(&self) -> &Self {
        *self.inner.renderlet.borrow_mut() = None;
        self
    }

    /// Renders every member in registration order.
    ///
    /// A failing member does not stop the pass; all failures come back
    /// together as [`ChartError::GroupFailures`].
    pub fn render_all(&self) -> ChartResult<()> {
        self.run(GroupAction::Render)
    }

    /// Redraws every member in registration order, isolating failures like
    /// [`ChartGroup::render_all`].
    pub fn redraw_all(&self) -> ChartResult<()> {
        self.run(GroupAction::Redraw)
    }

    /// Clears the filters of every member.
    pub fn filter_all(&self) -> ChartResult<()> {
        self.for_each_member("filter_all", |chart| chart.filter_all().map(|_| ()))
    }

    pub(crate) fn run(&self, action: GroupAction) -> ChartResult<()> {
        let result = match action {
            GroupAction::Render => self.for_each_member("render", Chart::render),
            GroupAction::Redraw => self.for_each_member("redraw", Chart::redraw),
        };
        let renderlet = self.inner.renderlet.borrow().clone();
        if let Some(renderlet) = renderlet {
            renderlet(self);
        }
        result
    }

    fn for_each_member(
        &self,
        operation: &str,
        mut apply: impl FnMut(&Chart) -> ChartResult<()>,
    ) -> ChartResult<()> {
        let charts = self.charts();
        debug!(group = %self.name(), operation, members = charts.len(), "group pass");
        let mut failures = Vec::new();
        for chart in &charts {
            if let Err(err) = apply(chart) {
                warn!(group = %self.name(), chart = %chart.id(), operation, error = %err, "group member failed");
                failures.push(MemberFailure {
                    chart_id: chart.id().clone(),
                    message: err.to_string(),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(ChartError::GroupFailures {
                group: self.name().to_owned(),
                failures,
            })
        }
    }
}
