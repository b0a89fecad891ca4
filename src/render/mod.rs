//! Headless stand-ins for the host's visual tree.
//!
//! Geometry and drawing stay with the host; this module only models what
//! the lifecycle needs: anchor elements with a measured box, the lazily
//! created rendering surface, and transition completion timing.

mod element;
mod surface;

pub use element::{Element, Selector};
pub use surface::{SURFACE_CLASS, Surface};

/// Marker class put on root charts' anchor elements.
pub const ROOT_MARKER_CLASS: &str = "linked-chart";
/// Class of reset affordances toggled by filter changes.
pub const RESET_CONTROL_CLASS: &str = "reset";
/// Class of filter-display affordances toggled by filter changes.
pub const FILTER_CONTROL_CLASS: &str = "filter";
