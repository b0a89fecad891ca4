use std::rc::Rc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::Filter;
use crate::error::{ChartError, ChartResult};

use super::Chart;

/// Lifecycle hooks a chart exposes to host code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartEvent {
    PreRender,
    PostRender,
    PreRedraw,
    PostRedraw,
    Filtered,
    Zoomed,
    Renderlet,
    PreTransition,
}

impl ChartEvent {
    pub const ALL: [Self; 8] = [
        Self::PreRender,
        Self::PostRender,
        Self::PreRedraw,
        Self::PostRedraw,
        Self::Filtered,
        Self::Zoomed,
        Self::Renderlet,
        Self::PreTransition,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreRender => "preRender",
            Self::PostRender => "postRender",
            Self::PreRedraw => "preRedraw",
            Self::PostRedraw => "postRedraw",
            Self::Filtered => "filtered",
            Self::Zoomed => "zoomed",
            Self::Renderlet => "renderlet",
            Self::PreTransition => "pretransition",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

/// Payload delivered alongside a lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventDetail {
    None,
    /// Complete active filter set after a change.
    Filters(Vec<Filter>),
}

pub type ListenerFn = Rc<dyn Fn(&Chart, &EventDetail)>;

/// Splits `type.namespace` into its parts.
///
/// `".ns"` yields no event (namespace-wide removal). Unknown event types are
/// rejected.
pub fn parse_listener_name(name: &str) -> ChartResult<(Option<ChartEvent>, &str)> {
    let (event, namespace) = name.split_once('.').unwrap_or((name, ""));
    if event.is_empty() {
        if namespace.is_empty() {
            return Err(ChartError::InvalidArgument(
                "listener name must not be empty".to_owned(),
            ));
        }
        return Ok((None, namespace));
    }
    ChartEvent::parse(event)
        .map(|event| (Some(event), namespace))
        .ok_or_else(|| ChartError::InvalidArgument(format!("unknown chart event `{event}`")))
}

struct ListenerEntry {
    namespace: String,
    callback: ListenerFn,
}

/// Ordered per-event callbacks keyed by namespace.
///
/// Registering under an existing `(event, namespace)` pair replaces that
/// callback in place; the empty namespace is a key like any other.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: IndexMap<ChartEvent, SmallVec<[ListenerEntry; 2]>>,
}

impl ListenerRegistry {
    pub fn add(&mut self, event: ChartEvent, namespace: &str, callback: ListenerFn) {
        let entries = self.entries.entry(event).or_default();
        match entries.iter_mut().find(|entry| entry.namespace == namespace) {
            Some(entry) => entry.callback = callback,
            None => entries.push(ListenerEntry {
                namespace: namespace.to_owned(),
                callback,
            }),
        }
    }

    /// Removes matching registrations; `event = None` sweeps every event.
    pub fn remove(&mut self, event: Option<ChartEvent>, namespace: &str) -> usize {
        let mut removed = 0;
        for (kind, entries) in &mut self.entries {
            if event.is_some_and(|event| event != *kind) {
                continue;
            }
            let before = entries.len();
            entries.retain(|entry| entry.namespace != namespace);
            removed += before - entries.len();
        }
        removed
    }

    /// Snapshot of callbacks, so listeners may re-register while running.
    #[must_use]
    pub fn callbacks(&self, event: ChartEvent) -> SmallVec<[ListenerFn; 4]> {
        self.entries
            .get(&event)
            .map(|entries| entries.iter().map(|entry| entry.callback.clone()).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, event: ChartEvent) -> usize {
        self.entries.get(&event).map_or(0, SmallVec::len)
    }
}
