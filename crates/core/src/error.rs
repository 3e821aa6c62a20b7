use thiserror::Error;

use crate::status::Status;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown status '{0}': must be one of created, executing, completed, failed")]
    UnknownStatus(String),
}

/// A status change that is not in the transition table.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("illegal status transition {from} -> {to}")]
pub struct TransitionError {
    pub from: Status,
    pub to: Status,
}
