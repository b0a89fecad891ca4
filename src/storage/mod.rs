//! Filter-storage binding contract plus the in-memory reference engine.

mod binding;
mod memory;
mod store;

pub use binding::{BindingConfig, FilterStorageBinding};
pub use memory::MemoryFilterBinding;
pub use store::{FilterStore, FiltersChangedFn, SubscriptionId};
