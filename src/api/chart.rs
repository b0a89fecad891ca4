use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::debug;

use crate::core::{ChartId, Filter, Record};
use crate::error::{ChartError, ChartResult};
use crate::extensions::{CommitHandler, DefaultFilterPrinter, FilterPrinter, Legend};
use crate::render::{Element, ROOT_MARKER_CLASS, Surface};
use crate::storage::{BindingConfig, FilterStorageBinding, MemoryFilterBinding};

use super::chart_sizing::SizeSlot;
use super::runtime::Runtime;
use super::{
    ChartConfig, ChartDrawer, ChartEvent, ChartGroup, EventDetail, LifecyclePhase,
    ListenerRegistry, NullDrawer, parse_listener_name,
};

/// Derives the filter a clicked datum stands for.
pub type KeyAccessor = Rc<dyn Fn(&Record) -> Option<Filter>>;

/// What a chart is anchored to.
#[derive(Debug, Clone)]
pub enum AnchorTarget {
    Element(Element),
    /// `#id`, `.class` or tag name, resolved against the registry document.
    Selector(String),
    /// Wrapped selection; the first element is used.
    Selection(Vec<Element>),
    /// Makes the chart a child drawing into this chart's root.
    Chart(Chart),
}

impl From<Element> for AnchorTarget {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&Element> for AnchorTarget {
    fn from(element: &Element) -> Self {
        Self::Element(element.clone())
    }
}

impl From<&str> for AnchorTarget {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_owned())
    }
}

impl From<String> for AnchorTarget {
    fn from(selector: String) -> Self {
        Self::Selector(selector)
    }
}

impl From<Vec<Element>> for AnchorTarget {
    fn from(selection: Vec<Element>) -> Self {
        Self::Selection(selection)
    }
}

impl From<Chart> for AnchorTarget {
    fn from(parent: Chart) -> Self {
        Self::Chart(parent)
    }
}

impl From<&Chart> for AnchorTarget {
    fn from(parent: &Chart) -> Self {
        Self::Chart(parent.clone())
    }
}

pub(crate) enum AnchorState {
    Unanchored,
    Root { element: Element },
    Child { parent: Chart },
}

pub(crate) struct ChartState {
    pub(crate) phase: LifecyclePhase,
    pub(crate) anchor: AnchorState,
    pub(crate) surface: Option<Surface>,
    pub(crate) group: ChartGroup,
    pub(crate) width: SizeSlot,
    pub(crate) height: SizeSlot,
}

pub(crate) struct ChartHooks {
    pub(crate) key_accessor: KeyAccessor,
    pub(crate) filter_printer: Rc<dyn FilterPrinter>,
    pub(crate) commit_handler: Option<Rc<dyn CommitHandler>>,
}

impl Default for ChartHooks {
    fn default() -> Self {
        Self {
            key_accessor: Rc::new(|record: &Record| {
                record.get("key").and_then(Filter::from_json)
            }),
            filter_printer: Rc::new(DefaultFilterPrinter),
            commit_handler: None,
        }
    }
}

pub(crate) struct ChartInner {
    pub(crate) id: ChartId,
    pub(crate) state: RefCell<ChartState>,
    pub(crate) config: RefCell<ChartConfig>,
    pub(crate) listeners: RefCell<ListenerRegistry>,
    pub(crate) binding: RefCell<Rc<dyn FilterStorageBinding>>,
    /// Empty while a draw hook runs.
    pub(crate) drawer: RefCell<Option<Box<dyn ChartDrawer>>>,
    pub(crate) legend: RefCell<Option<Box<dyn Legend>>>,
    pub(crate) hooks: RefCell<ChartHooks>,
    pub(crate) children: RefCell<Vec<Weak<ChartInner>>>,
}

impl Drop for ChartInner {
    fn drop(&mut self) {
        self.binding.get_mut().dispose();
    }
}

/// One chart: identity, anchoring, sizing, filter binding and the
/// render/redraw/dispose lifecycle.
///
/// `Chart` is a cheap handle; clones refer to the same chart. Groups keep
/// weak references, so a chart lives as long as the host holds a handle.
#[derive(Clone)]
pub struct Chart {
    pub(crate) inner: Rc<ChartInner>,
}

impl PartialEq for Chart {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Chart {}

/// Non-owning chart handle, for collaborators (legends, drawers) that need
/// to reach back to their chart without keeping it alive.
#[derive(Clone, Default)]
pub struct WeakChart {
    inner: Weak<ChartInner>,
}

impl WeakChart {
    #[must_use]
    pub fn upgrade(&self) -> Option<Chart> {
        Chart::upgrade(&self.inner)
    }
}

impl fmt::Debug for WeakChart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakChart")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Chart");
        debug.field("id", &self.inner.id);
        if let Ok(state) = self.inner.state.try_borrow() {
            debug
                .field("phase", &state.phase)
                .field("group", &state.group.name())
                .field("child", &matches!(state.anchor, AnchorState::Child { .. }));
        }
        debug.finish()
    }
}

impl Chart {
    /// Creates a chart in `group` and anchors it to `parent`.
    ///
    /// Root charts register with `group`; passing another chart as `parent`
    /// makes a child that shares the parent's root and filters.
    pub fn new(parent: impl Into<AnchorTarget>, group: &ChartGroup) -> ChartResult<Self> {
        let id = ChartId::next();
        let binding: Rc<dyn FilterStorageBinding> = Rc::new(MemoryFilterBinding::new());
        let chart = Self {
            inner: Rc::new(ChartInner {
                id,
                state: RefCell::new(ChartState {
                    phase: LifecyclePhase::Unrendered,
                    anchor: AnchorState::Unanchored,
                    surface: None,
                    group: group.clone(),
                    width: SizeSlot::default(),
                    height: SizeSlot::default(),
                }),
                config: RefCell::new(ChartConfig::default()),
                listeners: RefCell::new(ListenerRegistry::default()),
                binding: RefCell::new(binding),
                drawer: RefCell::new(Some(Box::new(NullDrawer))),
                legend: RefCell::new(None),
                hooks: RefCell::new(ChartHooks::default()),
                children: RefCell::new(Vec::new()),
            }),
        };
        chart.set_anchor(parent)?;
        debug!(chart = %chart.id(), group = %group.name(), "chart created");
        Ok(chart)
    }

    pub(crate) fn downgrade(&self) -> Weak<ChartInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<ChartInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Handle that does not keep the chart alive.
    #[must_use]
    pub fn weak(&self) -> WeakChart {
        WeakChart {
            inner: self.downgrade(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &ChartId {
        &self.inner.id
    }

    pub(crate) fn runtime(&self) -> Runtime {
        self.inner.state.borrow().group.runtime().clone()
    }

    pub(crate) fn ensure_live(&self) -> ChartResult<()> {
        if self.is_disposed() {
            return Err(ChartError::InvalidState(format!(
                "chart {} has been disposed",
                self.id()
            )));
        }
        Ok(())
    }

    /// Shallow-merges a JSON object into the configuration.
    pub fn configure(&self, patch: Value) -> ChartResult<&Self> {
        self.ensure_live()?;
        self.inner.config.borrow_mut().merge(patch)?;
        Ok(self)
    }

    #[must_use]
    pub fn config(&self) -> ChartConfig {
        self.inner.config.borrow().clone()
    }

    pub fn set_key_accessor(
        &self,
        accessor: impl Fn(&Record) -> Option<Filter> + 'static,
    ) -> ChartResult<&Self> {
        self.ensure_live()?;
        self.inner.hooks.borrow_mut().key_accessor = Rc::new(accessor);
        Ok(self)
    }

    pub fn set_filter_printer(&self, printer: impl FilterPrinter + 'static) -> ChartResult<&Self> {
        self.ensure_live()?;
        self.inner.hooks.borrow_mut().filter_printer = Rc::new(printer);
        Ok(self)
    }

    pub fn set_commit_handler(&self, handler: impl CommitHandler + 'static) -> ChartResult<&Self> {
        self.ensure_live()?;
        self.inner.hooks.borrow_mut().commit_handler = Some(Rc::new(handler));
        Ok(self)
    }

    pub fn clear_commit_handler(&self) -> ChartResult<&Self> {
        self.ensure_live()?;
        self.inner.hooks.borrow_mut().commit_handler = None;
        Ok(self)
    }

    #[must_use]
    pub fn has_commit_handler(&self) -> bool {
        self.inner.hooks.borrow().commit_handler.is_some()
    }

    pub fn set_drawer(&self, drawer: impl ChartDrawer + 'static) -> ChartResult<&Self> {
        self.ensure_live()?;
        *self.inner.drawer.borrow_mut() = Some(Box::new(drawer));
        Ok(self)
    }

    /// Attaches a legend, handing it this chart as parent.
    pub fn set_legend(&self, mut legend: impl Legend + 'static) -> ChartResult<&Self> {
        self.ensure_live()?;
        legend.set_parent(self);
        *self.inner.legend.borrow_mut() = Some(Box::new(legend));
        Ok(self)
    }

    #[must_use]
    pub fn has_legend(&self) -> bool {
        self.inner.legend.borrow().is_some()
    }

    /// Current anchor: the root element, or the parent chart for children.
    #[must_use]
    pub fn anchor(&self) -> Option<AnchorTarget> {
        match &self.inner.state.borrow().anchor {
            AnchorState::Unanchored => None,
            AnchorState::Root { element } => Some(AnchorTarget::Element(element.clone())),
            AnchorState::Child { parent } => Some(AnchorTarget::Chart(parent.clone())),
        }
    }

    pub fn set_anchor(&self, target: impl Into<AnchorTarget>) -> ChartResult<&Self> {
        self.ensure_live()?;
        let previous_parent = self.parent_chart();
        match target.into() {
            AnchorTarget::Chart(parent) => self.anchor_to_parent(parent)?,
            other => {
                let element = self.resolve_anchor_element(other)?;
                self.anchor_to_element(element);
            }
        }
        if let Some(previous) = previous_parent {
            if self.parent_chart().as_ref() != Some(&previous) {
                previous.forget_child(self);
            }
        }
        self.invalidate_size_cache();
        self.rewire_bindings();
        Ok(self)
    }

    fn resolve_anchor_element(&self, target: AnchorTarget) -> ChartResult<Element> {
        match target {
            AnchorTarget::Element(element) => Ok(element),
            AnchorTarget::Selector(selector) => {
                if selector.trim().is_empty() {
                    return Err(ChartError::InvalidArgument(
                        "anchor selector must not be empty".to_owned(),
                    ));
                }
                self.runtime()
                    .document()
                    .select(&selector)
                    .ok_or_else(|| {
                        ChartError::InvalidArgument(format!(
                            "no element matches anchor selector `{selector}`"
                        ))
                    })
            }
            AnchorTarget::Selection(selection) => {
                selection.into_iter().next().ok_or_else(|| {
                    ChartError::InvalidArgument("anchor selection is empty".to_owned())
                })
            }
            AnchorTarget::Chart(_) => Err(ChartError::InvalidArgument(
                "a chart anchor does not resolve to an element".to_owned(),
            )),
        }
    }

    fn anchor_to_parent(&self, parent: Chart) -> ChartResult<()> {
        let mut ancestor = Some(parent.clone());
        while let Some(chart) = ancestor {
            if chart == *self {
                return Err(ChartError::InvalidArgument(
                    "a chart cannot be anchored to itself or its own child".to_owned(),
                ));
            }
            ancestor = chart.parent_chart();
        }

        let (group, surface) = {
            let mut state = self.inner.state.borrow_mut();
            let group = state.group.clone();
            let surface = state.surface.take();
            state.anchor = AnchorState::Child {
                parent: parent.clone(),
            };
            (group, surface)
        };
        if let Some(surface) = surface {
            surface.detach(self.runtime().scheduler());
        }
        group.deregister(self);
        parent.adopt_child(self);
        debug!(chart = %self.id(), parent = %parent.id(), "anchored as child chart");
        Ok(())
    }

    fn anchor_to_element(&self, element: Element) {
        element.add_class(ROOT_MARKER_CLASS);
        let (group, stale_surface) = {
            let mut state = self.inner.state.borrow_mut();
            let same_root =
                matches!(&state.anchor, AnchorState::Root { element: current } if *current == element);
            let stale = if same_root { None } else { state.surface.take() };
            state.anchor = AnchorState::Root {
                element: element.clone(),
            };
            (state.group.clone(), stale)
        };
        if let Some(surface) = stale_surface {
            surface.detach(self.runtime().scheduler());
        }
        group.register(self);
        debug!(chart = %self.id(), anchor = ?element.id(), "anchored as root chart");
    }

    fn adopt_child(&self, child: &Chart) {
        let weak = child.downgrade();
        let mut children = self.inner.children.borrow_mut();
        children.retain(|existing| existing.strong_count() > 0);
        if !children.iter().any(|existing| Weak::ptr_eq(existing, &weak)) {
            children.push(weak);
        }
    }

    fn forget_child(&self, child: &Chart) {
        let weak = child.downgrade();
        self.inner
            .children
            .borrow_mut()
            .retain(|existing| existing.strong_count() > 0 && !Weak::ptr_eq(existing, &weak));
    }

    /// Live charts anchored directly to this one.
    #[must_use]
    pub fn child_charts(&self) -> Vec<Chart> {
        self.inner
            .children
            .borrow()
            .iter()
            .filter_map(Chart::upgrade)
            .collect()
    }

    #[must_use]
    pub fn is_child(&self) -> bool {
        matches!(self.inner.state.borrow().anchor, AnchorState::Child { .. })
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        matches!(self.inner.state.borrow().anchor, AnchorState::Root { .. })
    }

    #[must_use]
    pub fn parent_chart(&self) -> Option<Chart> {
        match &self.inner.state.borrow().anchor {
            AnchorState::Child { parent } => Some(parent.clone()),
            AnchorState::Root { .. } | AnchorState::Unanchored => None,
        }
    }

    /// Element the chart draws under; children resolve through their parent.
    #[must_use]
    pub fn root_element(&self) -> Option<Element> {
        let parent = match &self.inner.state.borrow().anchor {
            AnchorState::Unanchored => return None,
            AnchorState::Root { element } => return Some(element.clone()),
            AnchorState::Child { parent } => parent.clone(),
        };
        parent.root_element()
    }

    /// Id of the chart whose filters this chart shares (itself for roots).
    #[must_use]
    pub fn primary_chart_id(&self) -> ChartId {
        match self.parent_chart() {
            Some(parent) => parent.primary_chart_id(),
            None => self.id().clone(),
        }
    }

    #[must_use]
    pub fn chart_group(&self) -> ChartGroup {
        self.inner.state.borrow().group.clone()
    }

    /// Moves the chart to `group`. Root charts leave the old group's
    /// registry and join the new one. Its binding and those of its child
    /// charts are rewired to the new group's filter store.
    pub fn set_chart_group(&self, group: &ChartGroup) -> ChartResult<&Self> {
        self.ensure_live()?;
        let (previous, is_root) = {
            let mut state = self.inner.state.borrow_mut();
            let previous = std::mem::replace(&mut state.group, group.clone());
            (previous, matches!(state.anchor, AnchorState::Root { .. }))
        };
        if is_root {
            previous.deregister(self);
            group.register(self);
        }
        self.rewire_bindings();
        debug!(chart = %self.id(), from = %previous.name(), to = %group.name(), "chart group changed");
        Ok(self)
    }

    #[must_use]
    pub fn binding(&self) -> Rc<dyn FilterStorageBinding> {
        self.inner.binding.borrow().clone()
    }

    /// Replaces the binding, disposing the previous one first.
    pub fn set_binding(&self, binding: Rc<dyn FilterStorageBinding>) -> ChartResult<&Self> {
        self.ensure_live()?;
        let previous = std::mem::replace(&mut *self.inner.binding.borrow_mut(), binding);
        previous.dispose();
        self.wire_binding();
        Ok(self)
    }

    fn binding_config(&self) -> BindingConfig {
        let weak = self.downgrade();
        BindingConfig {
            chart_id: self.id().clone(),
            primary_chart: self.primary_chart_id(),
            storage: self.storage_group().filter_store().clone(),
            on_filters_changed: Rc::new(move |filters: &[Filter]| {
                if let Some(chart) = Chart::upgrade(&weak) {
                    chart.filters_changed(filters);
                }
            }),
        }
    }

    /// Group whose filter store holds this chart's filters: the primary
    /// chart's group, so children always read their parent's store.
    fn storage_group(&self) -> ChartGroup {
        match self.parent_chart() {
            Some(parent) => parent.storage_group(),
            None => self.chart_group(),
        }
    }

    fn wire_binding(&self) {
        let config = self.binding_config();
        self.binding().configure(config);
    }

    /// Rewires this chart and every live descendant, whose storage group
    /// and primary chart follow this chart's.
    fn rewire_bindings(&self) {
        self.wire_binding();
        for child in self.child_charts() {
            if !child.is_disposed() {
                child.rewire_bindings();
            }
        }
    }

    /// Grouped records from the binding.
    pub fn data(&self) -> ChartResult<Vec<Record>> {
        self.ensure_live()?;
        self.binding().data()
    }

    /// Registers `callback` under `event[.namespace]`, e.g. `"renderlet.axis"`.
    pub fn on(
        &self,
        name: &str,
        callback: impl Fn(&Chart, &EventDetail) + 'static,
    ) -> ChartResult<&Self> {
        self.ensure_live()?;
        let (event, namespace) = parse_listener_name(name)?;
        let event = event.ok_or_else(|| {
            ChartError::InvalidArgument(format!("listener `{name}` names no event type"))
        })?;
        self.inner
            .listeners
            .borrow_mut()
            .add(event, namespace, Rc::new(callback));
        Ok(self)
    }

    /// Removes listeners by `event.namespace`, or `.namespace` across events.
    pub fn off(&self, name: &str) -> ChartResult<usize> {
        self.ensure_live()?;
        let (event, namespace) = parse_listener_name(name)?;
        Ok(self.inner.listeners.borrow_mut().remove(event, namespace))
    }

    #[must_use]
    pub fn listener_count(&self, event: ChartEvent) -> usize {
        self.inner.listeners.borrow().count(event)
    }

    pub(crate) fn emit(&self, event: ChartEvent, detail: &EventDetail) {
        let callbacks = self.inner.listeners.borrow().callbacks(event);
        for callback in callbacks {
            callback(self, detail);
        }
    }

    /// Fires the `zoomed` hook; used by chart kinds with a focus range.
    pub fn invoke_zoomed(&self) -> ChartResult<()> {
        self.ensure_live()?;
        self.emit(ChartEvent::Zoomed, &EventDetail::None);
        Ok(())
    }
}
