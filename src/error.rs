use thiserror::Error;

use crate::core::ChartId;

pub type ChartResult<T> = Result<T, ChartError>;

/// One member failure collected while a group action kept going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberFailure {
    pub chart_id: ChartId,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("commit rejected: {0}")]
    Commit(String),

    #[error("{} chart(s) failed in group `{group}`", failures.len())]
    GroupFailures {
        group: String,
        failures: Vec<MemberFailure>,
    },
}
