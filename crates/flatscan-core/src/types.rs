// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared identifiers and lifecycle states.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a rectification task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle states of a rectification task.
///
/// Transitions are strictly linear: `Ready -> Executing -> Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    /// Created, not yet started.
    Ready,
    /// Rectification is running on a worker.
    Executing,
    /// Completion has been delivered (or the task was cancelled before it ran).
    Finished,
}

impl TaskState {
    /// The state that follows this one, or `None` once finished.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Ready => Some(Self::Executing),
            Self::Executing => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    pub fn is_finished(self) -> bool {
        self == Self::Finished
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Ready => "ready",
            Self::Executing => "executing",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique() {
        assert_ne!(TaskId::new(), TaskId::new());
    }

    #[test]
    fn states_advance_linearly() {
        assert_eq!(TaskState::Ready.next(), Some(TaskState::Executing));
        assert_eq!(TaskState::Executing.next(), Some(TaskState::Finished));
        assert_eq!(TaskState::Finished.next(), None);
        assert!(TaskState::Finished.is_finished());
        assert!(!TaskState::Executing.is_finished());
    }
}
