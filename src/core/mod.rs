pub mod filter;
pub mod scheduler;
pub mod types;

pub use filter::{Filter, FilterKey, Record};
pub use scheduler::{Scheduler, TimerHandle};
pub use types::{Bounds, ChartId};
