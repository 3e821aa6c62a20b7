//! Forward-only lifecycle shared by jobs and tasks.
//!
//! Every status change in the system goes through [`Status::transition`],
//! which consults [`TRANSITIONS`]. The store layer turns the same table into
//! SQL guards via [`Status::predecessors`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, TransitionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Stored, not yet decomposed (jobs) or dispatched (tasks).
    Created,
    /// Handed to the compute pool.
    Executing,
    /// Finished (terminal).
    Completed,
    /// Finished with a terminal error (terminal).
    Failed,
}

/// Every allowed `(from, to)` pair. Anything absent is rejected.
pub const TRANSITIONS: &[(Status, Status)] = &[
    (Status::Created, Status::Executing),
    (Status::Created, Status::Failed),
    (Status::Executing, Status::Completed),
    (Status::Executing, Status::Failed),
];

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Created,
        Status::Executing,
        Status::Completed,
        Status::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: Status) -> bool {
        TRANSITIONS.iter().any(|&(from, to)| from == *self && to == next)
    }

    /// Validate a move to `next`, returning `next` when allowed.
    pub fn transition(self, next: Status) -> Result<Status, TransitionError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(TransitionError { from: self, to: next })
        }
    }

    /// Statuses from which `next` is reachable in one step.
    pub fn predecessors(next: Status) -> Vec<Status> {
        TRANSITIONS
            .iter()
            .filter(|(_, to)| *to == next)
            .map(|(from, _)| *from)
            .collect()
    }

    /// Position in the lifecycle; terminal states share the last rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Executing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "executing" => Ok(Self::Executing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}
