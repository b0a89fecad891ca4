//! Contracts for collaborators the lifecycle consumes but does not own.

pub mod commit;
pub mod filter_printer;
pub mod legend;

pub use commit::{CommitCallback, CommitHandler};
pub use filter_printer::{DefaultFilterPrinter, FilterPrinter};
pub use legend::Legend;
