use crate::error::ChartResult;

/// Continuation handed to a [`CommitHandler`]; call it once with the outcome.
pub type CommitCallback = Box<dyn FnOnce(ChartResult<()>)>;

/// Asynchronous gate consulted before a group-wide render or redraw.
///
/// The handler may invoke `done` inline or defer it (for example through the
/// registry's `Scheduler`). An `Err` outcome suppresses the group action.
pub trait CommitHandler {
    fn commit(&self, render: bool, done: CommitCallback);
}

impl<F> CommitHandler for F
where
    F: Fn(bool, CommitCallback),
{
    fn commit(&self, render: bool, done: CommitCallback) {
        self(render, done);
    }
}
