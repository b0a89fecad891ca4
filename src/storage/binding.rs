use crate::core::{ChartId, Filter, Record};
use crate::error::ChartResult;

use super::{FilterStore, FiltersChangedFn};

/// Wiring a chart hands to its binding whenever the binding is attached or
/// the chart moves to another group.
#[derive(Clone)]
pub struct BindingConfig {
    pub chart_id: ChartId,
    /// Chart whose filters this binding reads and writes; a child chart
    /// passes its parent's id.
    pub primary_chart: ChartId,
    pub storage: FilterStore,
    pub on_filters_changed: FiltersChangedFn,
}

impl std::fmt::Debug for BindingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingConfig")
            .field("chart_id", &self.chart_id)
            .field("primary_chart", &self.primary_chart)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

/// Contract between a chart and the external filter/data engine.
///
/// Methods take `&self`: implementations must release their own borrows
/// before notifying, because the chart's change handler may call straight
/// back into the binding.
pub trait FilterStorageBinding {
    /// (Re)attaches the binding. Replaces any previous wiring.
    fn configure(&self, config: BindingConfig);

    /// Grouped records to visualize.
    fn data(&self) -> ChartResult<Vec<Record>>;

    /// First active filter, if any.
    fn filter(&self) -> Option<Filter> {
        self.filters().into_iter().next()
    }

    /// Applies `value` (`None` clears every filter). Notifies exactly once.
    fn apply_filter(&self, value: Option<Filter>) -> ChartResult<()>;

    /// Snapshot of the active filters; stale after the next mutation.
    fn filters(&self) -> Vec<Filter>;

    /// `None` asks whether any filter is active.
    fn has_filter(&self, value: Option<&Filter>) -> bool {
        let filters = self.filters();
        match value {
            Some(value) => filters.contains(value),
            None => !filters.is_empty(),
        }
    }

    /// Clears every filter without notifying.
    fn reset_filters(&self) -> ChartResult<()>;

    /// Releases engine-side resources. Later calls fail with `InvalidState`.
    fn dispose(&self);
}
