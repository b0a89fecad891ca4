use std::cell::RefCell;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::Scheduler;
use crate::error::{ChartError, ChartResult};
use crate::interaction::ThrottledTrigger;
use crate::render::Element;

use super::runtime::Runtime;
use super::{AnchorTarget, Chart, ChartGroup};

/// Name of the group charts join when none is given.
pub const DEFAULT_CHART_GROUP: &str = "__default_chart_group__";

fn default_group_name() -> String {
    DEFAULT_CHART_GROUP.to_owned()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Forces every transition duration to zero, making post-render and
    /// post-redraw notifications synchronous.
    #[serde(default)]
    pub disable_transitions: bool,
    #[serde(default = "default_group_name")]
    pub default_group: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            disable_transitions: false,
            default_group: default_group_name(),
        }
    }
}

impl RegistryConfig {
    pub fn to_json_pretty(&self) -> ChartResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ChartError::InvalidData(format!("failed to serialize config: {e}")))
    }

    pub fn from_json_str(input: &str) -> ChartResult<Self> {
        serde_json::from_str(input)
            .map_err(|e| ChartError::InvalidData(format!("failed to parse config: {e}")))
    }
}

/// Process-scoped table of chart groups.
///
/// Groups are created on first lookup by name and live as long as the
/// registry. All groups share one scheduler, one interaction trigger and
/// one document used to resolve selector anchors.
pub struct ChartRegistry {
    runtime: Runtime,
    default_group: String,
    groups: RefCell<IndexMap<String, ChartGroup>>,
}

impl Default for ChartRegistry {
    fn default() -> Self {
        Self::with_config(RegistryConfig::default())
    }
}

impl std::fmt::Debug for ChartRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRegistry")
            .field("default_group", &self.default_group)
            .field("groups", &self.group_names())
            .finish()
    }
}

impl ChartRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            runtime: Runtime::new(config.disable_transitions),
            default_group: config.default_group,
            groups: RefCell::new(IndexMap::new()),
        }
    }

    /// Looks up a group by name, creating it on first reference. `None`
    /// resolves to the default group.
    #[must_use]
    pub fn group(&self, name: Option<&str>) -> ChartGroup {
        let name = name.unwrap_or(&self.default_group);
        if let Some(group) = self.groups.borrow().get(name) {
            return group.clone();
        }
        let group = ChartGroup::with_runtime(name.to_owned(), self.runtime.clone());
        self.groups
            .borrow_mut()
            .insert(name.to_owned(), group.clone());
        debug!(group = %name, "chart group created");
        group
    }

    #[must_use]
    pub fn default_group(&self) -> ChartGroup {
        self.group(None)
    }

    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        self.groups.borrow().keys().cloned().collect()
    }

    /// Creates a chart in the named group (default group for `None`).
    pub fn chart(&self, parent: impl Into<AnchorTarget>, group: Option<&str>) -> ChartResult<Chart> {
        Chart::new(parent, &self.group(group))
    }

    pub fn render_all(&self, group: Option<&str>) -> ChartResult<()> {
        self.group(group).render_all()
    }

    pub fn redraw_all(&self, group: Option<&str>) -> ChartResult<()> {
        self.group(group).redraw_all()
    }

    pub fn filter_all(&self, group: Option<&str>) -> ChartResult<()> {
        self.group(group).filter_all()
    }

    /// Whether `chart` is registered in any group.
    #[must_use]
    pub fn has_chart(&self, chart: &Chart) -> bool {
        self.groups
            .borrow()
            .values()
            .any(|group| group.has_chart(chart))
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        self.runtime.scheduler()
    }

    /// Trigger shared by every chart's click and brush entry points.
    #[must_use]
    pub fn events(&self) -> &ThrottledTrigger {
        self.runtime.events()
    }

    /// Document that selector anchors resolve against.
    #[must_use]
    pub fn document(&self) -> &Element {
        self.runtime.document()
    }

    #[must_use]
    pub fn transitions_disabled(&self) -> bool {
        self.runtime.transitions_disabled()
    }

    pub fn set_transitions_disabled(&self, disabled: bool) {
        self.runtime.set_transitions_disabled(disabled);
    }
}
