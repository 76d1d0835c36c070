//! Pipeline State Machine: the only way a task's status and stage change.
//!
//! Status and stage are modelled together as one `PipelineState`, so a
//! combination such as `Pending` with a stage cannot be represented.

use super::error::EngineError;
use super::types::{Stage, Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Pending,
    InProgress(Stage),
    Done,
}

impl PipelineState {
    /// Reads the state stored on a task. A stageless in-progress task is
    /// treated as sitting in the first stage.
    #[must_use]
    pub fn of(task: &Task) -> Self {
        match task.status {
            TaskStatus::Pending => Self::Pending,
            TaskStatus::InProgress => Self::InProgress(task.stage.unwrap_or_else(Stage::first)),
            TaskStatus::Done => Self::Done,
        }
    }

    /// Target state for a move. There is no transition graph: every state
    /// is reachable from every other in one step.
    #[must_use]
    pub fn transition(target: TaskStatus, stage: Option<Stage>) -> Self {
        match target {
            TaskStatus::Pending => Self::Pending,
            TaskStatus::InProgress => Self::InProgress(stage.unwrap_or_else(Stage::first)),
            TaskStatus::Done => Self::Done,
        }
    }

    /// Entering `InProgress` via the group column: a task already in a
    /// stage stays there, anything else starts at the first stage.
    #[must_use]
    pub fn enter_in_progress_keeping(current: &Task) -> Self {
        let kept = match current.status {
            TaskStatus::InProgress => current.stage,
            TaskStatus::Pending | TaskStatus::Done => None,
        };
        Self::transition(TaskStatus::InProgress, kept)
    }

    #[must_use]
    pub fn status(self) -> TaskStatus {
        match self {
            Self::Pending => TaskStatus::Pending,
            Self::InProgress(_) => TaskStatus::InProgress,
            Self::Done => TaskStatus::Done,
        }
    }

    #[must_use]
    pub fn stage(self) -> Option<Stage> {
        match self {
            Self::InProgress(stage) => Some(stage),
            Self::Pending | Self::Done => None,
        }
    }

    /// Returns the display color hint for UI rendering.
    #[must_use]
    pub fn color_hint(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress(Stage::SpecCheck) => "spec",
            Self::InProgress(Stage::Ccb) => "ccb",
            Self::InProgress(Stage::Development) => "dev",
            Self::InProgress(Stage::Verification) => "verify",
            Self::InProgress(Stage::Review) => "review",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress(stage) => write!(f, "InProgress/{stage}"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// The `{status, stage}` pair as written back to the task store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusStage {
    pub status: TaskStatus,
    pub stage: Option<Stage>,
}

impl StatusStage {
    /// The pair exactly as stored, including a missing stage.
    #[must_use]
    pub fn of(task: &Task) -> Self {
        Self {
            status: task.status,
            stage: task.stage,
        }
    }
}

impl From<PipelineState> for StatusStage {
    fn from(state: PipelineState) -> Self {
        Self {
            status: state.status(),
            stage: state.stage(),
        }
    }
}

/// A request to move a task, as it arrives from the board or an edit form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub task_id: i64,
    pub target_status: TaskStatus,
    #[serde(default)]
    pub target_stage: Option<String>,
    /// Keep the current stage when entering `InProgress` without one.
    #[serde(default)]
    pub keep_stage: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub task_id: i64,
    pub from: StatusStage,
    pub to: StatusStage,
}

impl TransitionOutcome {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

/// Resolves a transition request against a snapshot.
///
/// The caller persists `to`; nothing in `tasks` is modified.
///
/// # Errors
/// Returns `TaskNotFound` for an unknown id and `InvalidStage` when the
/// requested stage is not one of the pipeline stages.
pub fn apply_transition(tasks: &[Task], request: &TransitionRequest) -> Result<TransitionOutcome, EngineError> {
    let task = tasks
        .iter()
        .find(|t| t.id == request.task_id)
        .ok_or(EngineError::TaskNotFound(request.task_id))?;

    let stage = request
        .target_stage
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Stage>)
        .transpose()?;

    let next = match (request.target_status, stage) {
        (TaskStatus::InProgress, None) if request.keep_stage => PipelineState::enter_in_progress_keeping(task),
        (target, stage) => PipelineState::transition(target, stage),
    };

    let outcome = TransitionOutcome {
        task_id: task.id,
        from: StatusStage::of(task),
        to: next.into(),
    };
    debug!(task_id = task.id, to = %next, "resolved transition");
    Ok(outcome)
}

/// Writes a resolved pair onto a task. Both fields change together.
pub fn write_back(task: &mut Task, to: StatusStage, now: DateTime<Utc>) {
    task.status = to.status;
    task.stage = to.stage;
    task.updated_at = Some(now);
}
