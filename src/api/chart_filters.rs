use tracing::{trace, warn};

use crate::core::{Filter, Record};
use crate::error::{ChartError, ChartResult};
use crate::render::{FILTER_CONTROL_CLASS, RESET_CONTROL_CLASS};

use super::{Chart, ChartEvent, EventDetail};

impl Chart {
    /// First active filter, if any.
    pub fn filter(&self) -> ChartResult<Option<Filter>> {
        self.ensure_live()?;
        Ok(self.binding().filter())
    }

    /// Snapshot of every active filter. Not updated by later mutations.
    pub fn filters(&self) -> ChartResult<Vec<Filter>> {
        self.ensure_live()?;
        Ok(self.binding().filters())
    }

    /// Forwards `value` to the binding; `None` clears every filter.
    ///
    /// The binding reports the change back through the chart's filter-change
    /// handler, which fires `filtered` and toggles the control affordances.
    pub fn set_filter(&self, value: Option<Filter>) -> ChartResult<&Self> {
        self.ensure_live()?;
        self.binding().apply_filter(value)?;
        Ok(self)
    }

    pub fn filter_all(&self) -> ChartResult<&Self> {
        self.set_filter(None)
    }

    /// Clears silently, then applies `value`: exactly one change notification.
    pub fn replace_filter(&self, value: Option<Filter>) -> ChartResult<&Self> {
        self.ensure_live()?;
        let binding = self.binding();
        binding.reset_filters()?;
        binding.apply_filter(value)?;
        Ok(self)
    }

    /// `None` asks whether any filter is active.
    pub fn has_filter(&self, value: Option<&Filter>) -> ChartResult<bool> {
        self.ensure_live()?;
        Ok(self.binding().has_filter(value))
    }

    pub(crate) fn filters_changed(&self, filters: &[Filter]) {
        self.emit(ChartEvent::Filtered, &EventDetail::Filters(filters.to_vec()));
        if filters.is_empty() {
            self.hide_controls();
        } else {
            self.show_controls(filters);
        }
    }

    /// Shows reset/filter affordances and prints the active filters.
    pub fn turn_on_controls(&self) -> ChartResult<&Self> {
        self.ensure_live()?;
        let filters = self.binding().filters();
        self.show_controls(&filters);
        Ok(self)
    }

    pub fn turn_off_controls(&self) -> ChartResult<&Self> {
        self.ensure_live()?;
        self.hide_controls();
        Ok(self)
    }

    fn hide_controls(&self) {
        let Some(root) = self.root_element() else {
            return;
        };
        let (attribute, hidden) = self.control_style();
        for reset in root.select_all(&format!(".{RESET_CONTROL_CLASS}")) {
            reset.set_style(attribute, Some(hidden));
        }
        for display in root.select_all(&format!(".{FILTER_CONTROL_CLASS}")) {
            display.set_style(attribute, Some(hidden));
            display.set_text("");
        }
    }

    fn show_controls(&self, filters: &[Filter]) {
        let Some(root) = self.root_element() else {
            return;
        };
        let (attribute, _) = self.control_style();
        for reset in root.select_all(&format!(".{RESET_CONTROL_CLASS}")) {
            reset.set_style(attribute, None);
        }
        let printer = self.inner.hooks.borrow().filter_printer.clone();
        let text = printer.filter_list_to_string(filters);
        for display in root.select_all(&format!(".{FILTER_CONTROL_CLASS}")) {
            display.set_text(text.clone());
            display.set_style(attribute, None);
        }
    }

    fn control_style(&self) -> (&'static str, &'static str) {
        if self.inner.config.borrow().controls_use_visibility() {
            ("visibility", "hidden")
        } else {
            ("display", "none")
        }
    }

    /// Click entry point: toggles the datum's key as a filter and redraws
    /// the group, through the shared event trigger with no delay.
    pub fn on_click(&self, datum: &Record) -> ChartResult<()> {
        self.ensure_live()?;
        let accessor = self.inner.hooks.borrow().key_accessor.clone();
        let filter = accessor(datum).ok_or_else(|| {
            ChartError::InvalidArgument(format!(
                "datum has no filter key for chart {}: {datum}",
                self.id()
            ))
        })?;
        let weak = self.downgrade();
        self.runtime().events().trigger(
            move || {
                if let Some(chart) = Chart::upgrade(&weak) {
                    chart.run_interaction("click", |chart| {
                        chart.set_filter(Some(filter))?;
                        Ok(())
                    });
                }
            },
            None,
        );
        Ok(())
    }

    /// Brush (drag) entry point. Bursts coalesce in the shared event
    /// trigger over the configured `eventDelay`; only the final range is
    /// applied, replacing any previous filter.
    pub fn on_brush(&self, range: Option<Filter>) -> ChartResult<()> {
        self.ensure_live()?;
        let delay = self.inner.config.borrow().event_delay();
        trace!(chart = %self.id(), ?range, ?delay, "brush event");
        let weak = self.downgrade();
        self.runtime().events().trigger(
            move || {
                if let Some(chart) = Chart::upgrade(&weak) {
                    chart.run_interaction("brush", |chart| {
                        chart.replace_filter(range)?;
                        Ok(())
                    });
                }
            },
            Some(delay),
        );
        Ok(())
    }

    fn run_interaction(&self, kind: &str, apply: impl FnOnce(&Chart) -> ChartResult<()>) {
        let result = apply(self).and_then(|()| self.redraw_group());
        if let Err(err) = result {
            warn!(chart = %self.id(), kind, error = %err, "interaction could not be applied");
        }
    }
}
