use std::cell::RefCell;

use tracing::debug;

use crate::core::{Filter, Record};
use crate::error::{ChartError, ChartResult};

use super::{BindingConfig, FilterStorageBinding, FilterStore, SubscriptionId};

#[derive(Default)]
struct MemoryBindingState {
    wiring: Option<(FilterStore, String, SubscriptionId)>,
    records: Option<Vec<Record>>,
    disposed: bool,
}

/// In-memory binding over a shared [`FilterStore`].
///
/// `apply_filter(Some(v))` toggles `v`: an active value is removed, an
/// inactive one is appended. `apply_filter(None)` clears. Record contents
/// are served as configured; evaluating filters against records belongs to
/// the data engine.
#[derive(Default)]
pub struct MemoryFilterBinding {
    state: RefCell<MemoryBindingState>,
}

impl std::fmt::Debug for MemoryFilterBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryFilterBinding")
            .field("key", &state.wiring.as_ref().map(|(_, key, _)| key))
            .field("records", &state.records.as_ref().map(Vec::len))
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl MemoryFilterBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_records(records: Vec<Record>) -> Self {
        let binding = Self::default();
        binding.set_records(records);
        binding
    }

    pub fn set_records(&self, records: Vec<Record>) {
        self.state.borrow_mut().records = Some(records);
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    /// Storage key this binding currently reads and writes.
    #[must_use]
    pub fn storage_key(&self) -> Option<String> {
        self.state
            .borrow()
            .wiring
            .as_ref()
            .map(|(_, key, _)| key.clone())
    }

    fn target(&self) -> ChartResult<(FilterStore, String)> {
        let state = self.state.borrow();
        if state.disposed {
            return Err(ChartError::InvalidState(
                "filter binding has been disposed".to_owned(),
            ));
        }
        state
            .wiring
            .as_ref()
            .map(|(store, key, _)| (store.clone(), key.clone()))
            .ok_or_else(|| {
                ChartError::InvalidState("filter binding is not configured".to_owned())
            })
    }

    fn release_subscription(&self) {
        if let Some((store, _, subscription)) = self.state.borrow_mut().wiring.take() {
            store.unsubscribe(subscription);
        }
    }
}

impl FilterStorageBinding for MemoryFilterBinding {
    fn configure(&self, config: BindingConfig) {
        self.release_subscription();
        let key = config.primary_chart.as_str().to_owned();
        let subscription = config
            .storage
            .subscribe(&key, config.on_filters_changed.clone());
        debug!(chart = %config.chart_id, key = %key, "filter binding configured");
        let mut state = self.state.borrow_mut();
        state.disposed = false;
        state.wiring = Some((config.storage, key, subscription));
    }

    fn data(&self) -> ChartResult<Vec<Record>> {
        let state = self.state.borrow();
        if state.disposed {
            return Err(ChartError::InvalidState(
                "filter binding has been disposed".to_owned(),
            ));
        }
        state.records.clone().ok_or_else(|| {
            ChartError::InvalidState("no data group configured for this chart".to_owned())
        })
    }

    fn apply_filter(&self, value: Option<Filter>) -> ChartResult<()> {
        let (store, key) = self.target()?;
        let next = match value {
            None => Vec::new(),
            Some(value) => {
                let mut filters = store.filters(&key);
                match filters.iter().position(|active| *active == value) {
                    Some(index) => {
                        filters.remove(index);
                    }
                    None => filters.push(value),
                }
                filters
            }
        };
        store.set_filters(&key, next);
        Ok(())
    }

    fn filters(&self) -> Vec<Filter> {
        match self.target() {
            Ok((store, key)) => store.filters(&key),
            Err(_) => Vec::new(),
        }
    }

    fn reset_filters(&self) -> ChartResult<()> {
        let (store, key) = self.target()?;
        store.reset_silently(&key);
        Ok(())
    }

    fn dispose(&self) {
        self.release_subscription();
        self.state.borrow_mut().disposed = true;
    }
}
