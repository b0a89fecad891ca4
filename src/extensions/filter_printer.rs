use crate::core::{Filter, FilterKey};

/// Formats filters for the filter-display control. Has no effect on logic.
pub trait FilterPrinter {
    fn filter_to_string(&self, filter: &Filter) -> String;

    fn separator(&self) -> &str {
        ", "
    }

    fn filter_list_to_string(&self, filters: &[Filter]) -> String {
        filters
            .iter()
            .map(|filter| self.filter_to_string(filter))
            .collect::<Vec<_>>()
            .join(self.separator())
    }
}

/// Integers print bare, other numbers with two decimals, ranges as `[a -> b]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFilterPrinter;

impl DefaultFilterPrinter {
    #[must_use]
    pub fn print_key(key: &FilterKey) -> String {
        match key {
            FilterKey::Bool(flag) => flag.to_string(),
            FilterKey::Text(text) => text.clone(),
            FilterKey::Number(number) => {
                let value = number.into_inner();
                if value.fract() == 0.0 && value.is_finite() {
                    format!("{value:.0}")
                } else {
                    format!("{value:.2}")
                }
            }
        }
    }
}

impl FilterPrinter for DefaultFilterPrinter {
    fn filter_to_string(&self, filter: &Filter) -> String {
        match filter {
            Filter::Key(key) => Self::print_key(key),
            Filter::Range(low, high) => {
                format!("[{} -> {}]", Self::print_key(low), Self::print_key(high))
            }
        }
    }
}

impl<F> FilterPrinter for F
where
    F: Fn(&Filter) -> String,
{
    fn filter_to_string(&self, filter: &Filter) -> String {
        self(filter)
    }
}
