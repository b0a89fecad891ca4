//! Chart lifecycle, group coordination and the registry that ties them to
//! one execution context.

mod chart;
mod chart_config;
mod chart_filters;
mod chart_group;
mod chart_lifecycle;
mod chart_options;
mod chart_sizing;
mod drawer;
mod listeners;
mod registry;
mod runtime;

pub use chart::{AnchorTarget, Chart, KeyAccessor, WeakChart};
pub use chart_config::{
    CONTROLS_USE_VISIBILITY, ChartConfig, DEFAULT_MIN_SIZE, DEFAULT_TRANSITION_DURATION_MS,
    EVENT_DELAY, MIN_HEIGHT, MIN_WIDTH, TRANSITION_DELAY, TRANSITION_DURATION,
    USE_VIEW_BOX_RESIZING,
};
pub use chart_group::{ChartGroup, GroupRenderletFn};
pub use chart_lifecycle::LifecyclePhase;
pub use chart_options::option_keys;
pub use chart_sizing::{SizeFn, SizeSpec, clamp_to_minimum};
pub use drawer::{ChartDrawer, NullDrawer};
pub use listeners::{
    ChartEvent, EventDetail, ListenerFn, ListenerRegistry, parse_listener_name,
};
pub use registry::{ChartRegistry, DEFAULT_CHART_GROUP, RegistryConfig};
