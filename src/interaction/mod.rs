//! Interaction plumbing shared by every chart: event-storm coalescing.

mod throttle;

pub use throttle::ThrottledTrigger;

/// Delay used for continuous interactions (brush drags) when no chart
/// configuration overrides it.
pub const DEFAULT_EVENT_DELAY_MS: u64 = 40;
