use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use crate::core::Filter;

/// Callback invoked with the complete filter set of a storage key after it changed.
pub type FiltersChangedFn = Rc<dyn Fn(&[Filter])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    key: String,
    callback: FiltersChangedFn,
}

#[derive(Default)]
struct StoreState {
    filters: IndexMap<String, Vec<Filter>>,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
}

/// Filter-storage context shared by every chart of a group.
///
/// Filters live under a storage key (the id of the primary chart that owns
/// them). Every change notifies each subscriber of that key exactly once, no
/// matter which binding initiated it. No borrow is held while subscribers run.
#[derive(Clone, Default)]
pub struct FilterStore {
    state: Rc<RefCell<StoreState>>,
}

impl fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FilterStore")
            .field("filters", &state.filters)
            .field("subscriptions", &state.subscriptions.len())
            .finish()
    }
}

impl PartialEq for FilterStore {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl FilterStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the filters stored under `key`.
    #[must_use]
    pub fn filters(&self, key: &str) -> Vec<Filter> {
        self.state
            .borrow()
            .filters
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn has_filters(&self, key: &str) -> bool {
        self.state
            .borrow()
            .filters
            .get(key)
            .is_some_and(|filters| !filters.is_empty())
    }

    /// Keys that currently hold at least one filter.
    #[must_use]
    pub fn active_keys(&self) -> Vec<String> {
        self.state
            .borrow()
            .filters
            .iter()
            .filter(|(_, filters)| !filters.is_empty())
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Replaces the filters under `key` and notifies its subscribers.
    pub fn set_filters(&self, key: &str, filters: Vec<Filter>) {
        let callbacks: SmallVec<[FiltersChangedFn; 4]> = {
            let mut state = self.state.borrow_mut();
            state.filters.insert(key.to_owned(), filters.clone());
            state
                .subscriptions
                .iter()
                .filter(|subscription| subscription.key == key)
                .map(|subscription| subscription.callback.clone())
                .collect()
        };
        trace!(
            key,
            filters = filters.len(),
            subscribers = callbacks.len(),
            "filters changed"
        );
        for callback in callbacks {
            callback(&filters);
        }
    }

    /// Clears the filters under `key` without notifying anyone.
    pub fn reset_silently(&self, key: &str) {
        if let Some(filters) = self.state.borrow_mut().filters.get_mut(key) {
            filters.clear();
        }
    }

    pub fn subscribe(&self, key: &str, callback: FiltersChangedFn) -> SubscriptionId {
        let mut state = self.state.borrow_mut();
        let id = SubscriptionId(state.next_subscription);
        state.next_subscription += 1;
        state.subscriptions.push(Subscription {
            id,
            key: key.to_owned(),
            callback,
        });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.borrow_mut();
        let before = state.subscriptions.len();
        state.subscriptions.retain(|subscription| subscription.id != id);
        state.subscriptions.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.state
            .borrow()
            .subscriptions
            .iter()
            .filter(|subscription| subscription.key == key)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::FilterStore;
    use crate::core::Filter;

    #[test]
    fn change_notifies_each_subscriber_of_key_once() {
        let store = FilterStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for label in ["a", "b"] {
            let seen = seen.clone();
            store.subscribe(
                "chart-1",
                Rc::new(move |filters: &[Filter]| seen.borrow_mut().push((label, filters.len()))),
            );
        }
        let other = seen.clone();
        store.subscribe(
            "chart-2",
            Rc::new(move |_: &[Filter]| other.borrow_mut().push(("other", 0))),
        );

        store.set_filters("chart-1", vec![Filter::key("x")]);

        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 1)]);
    }

    #[test]
    fn silent_reset_and_unsubscribe() {
        let store = FilterStore::new();
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        let id = store.subscribe(
            "k",
            Rc::new(move |_: &[Filter]| *counter.borrow_mut() += 1),
        );
        store.set_filters("k", vec![Filter::key(1.0)]);
        store.reset_silently("k");

        assert!(!store.has_filters("k"));
        assert_eq!(*hits.borrow(), 1);

        assert!(store.unsubscribe(id));
        store.set_filters("k", vec![Filter::key(2.0)]);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(store.active_keys(), vec!["k".to_owned()]);
    }
}
