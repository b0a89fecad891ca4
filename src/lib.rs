//! linked-charts: lifecycle and coordination layer for groups of
//! interactive charts that share one filterable dataset.
//!
//! A filter applied through one chart propagates to every chart of its
//! group, which then redraws in registration order. Bursts of interaction
//! events are coalesced by a [`interaction::ThrottledTrigger`], and all
//! deferred work runs on a single-threaded [`core::Scheduler`].

pub mod api;
pub mod core;
pub mod error;
pub mod extensions;
pub mod interaction;
pub mod render;
pub mod storage;
pub mod telemetry;

pub use api::{Chart, ChartGroup, ChartRegistry, RegistryConfig};
pub use error::{ChartError, ChartResult};
