//! View Projector: schedule rows and board buckets.

use super::dates::{resolve_dates, DueDate};
use super::error::EngineError;
use super::graph::TaskForest;
use super::progress::Progress;
use super::state::PipelineState;
use super::types::{Stage, Task};
use chrono::{DateTime, NaiveDate, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;

/// One line of the schedule table.
///
/// Serialized as the task record exactly as stored (snake_case keys such as
/// `parent_task_id`, `start_date`) followed by the derived fields in
/// camelCase (`effectiveStart`, `idealProgress`, ...). Stored and derived
/// values are never confused: a derived key is never snake_case.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRow<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub depth: usize,
    pub effective_start: NaiveDate,
    pub effective_due: DueDate,
    pub inherited_start: bool,
    pub inherited_due: bool,
    #[serde(flatten)]
    pub progress: Progress,
}

impl ScheduleRow<'_> {
    #[must_use]
    pub fn state(&self) -> PipelineState {
        PipelineState::of(self.task)
    }
}

/// Flattens the snapshot into pre-order rows with resolved dates and progress.
///
/// # Errors
/// Returns `MalformedHierarchy` if parent links form a cycle.
pub fn project_rows(tasks: &[Task], now: DateTime<Utc>) -> Result<Vec<ScheduleRow<'_>>, EngineError> {
    let forest = TaskForest::build(tasks)?;

    let rows = resolve_dates(&forest)
        .into_iter()
        .map(|dates| {
            let task = forest.task(dates.slot);
            ScheduleRow {
                task,
                depth: dates.depth,
                effective_start: dates.effective_start,
                effective_due: dates.effective_due,
                inherited_start: dates.inherited_start,
                inherited_due: dates.inherited_due,
                progress: Progress::compute(task.status, task.stage, &dates, now),
            }
        })
        .collect();
    Ok(rows)
}

/// A board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Pending,
    Stage(Stage),
    Done,
}

impl Bucket {
    /// All buckets in board order.
    pub const ALL: [Bucket; 7] = [
        Bucket::Pending,
        Bucket::Stage(Stage::SpecCheck),
        Bucket::Stage(Stage::Ccb),
        Bucket::Stage(Stage::Development),
        Bucket::Stage(Stage::Verification),
        Bucket::Stage(Stage::Review),
        Bucket::Done,
    ];

    #[must_use]
    pub fn of(task: &Task) -> Self {
        match PipelineState::of(task) {
            PipelineState::Pending => Self::Pending,
            PipelineState::InProgress(stage) => Self::Stage(stage),
            PipelineState::Done => Self::Done,
        }
    }

    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Stage(stage) => stage.name(),
            Self::Done => "Done",
        }
    }

    fn position(self) -> usize {
        match self {
            Self::Pending => 0,
            Self::Stage(stage) => 1 + stage.index(),
            Self::Done => Self::ALL.len() - 1,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Tasks partitioned into the seven board columns.
#[derive(Debug, Clone)]
pub struct Board<'a> {
    columns: [Vec<&'a Task>; 7],
}

impl<'a> Board<'a> {
    /// Buckets every task exactly once, keeping input order within a bucket.
    #[must_use]
    pub fn project(tasks: &'a [Task]) -> Self {
        let mut columns: [Vec<&'a Task>; 7] = Default::default();
        for task in tasks {
            columns[Bucket::of(task).position()].push(task);
        }
        Self { columns }
    }

    #[must_use]
    pub fn bucket(&self, bucket: Bucket) -> &[&'a Task] {
        &self.columns[bucket.position()]
    }

    /// Columns in board order.
    pub fn columns(&self) -> impl Iterator<Item = (Bucket, &[&'a Task])> + '_ {
        Bucket::ALL.iter().map(move |&b| (b, self.bucket(b)))
    }

    #[must_use]
    pub fn count(&self, bucket: Bucket) -> usize {
        self.bucket(bucket).len()
    }

    /// Size of the whole in-progress group, across all stage columns.
    #[must_use]
    pub fn in_progress_count(&self) -> usize {
        self.columns()
            .filter(|(b, _)| matches!(b, Bucket::Stage(_)))
            .map(|(_, tasks)| tasks.len())
            .sum()
    }

    #[must_use]
    pub fn counts(&self) -> BoardCounts {
        BoardCounts {
            pending: self.count(Bucket::Pending),
            in_progress: self.in_progress_count(),
            done: self.count(Bucket::Done),
        }
    }
}

impl Serialize for Board<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Bucket::ALL.len()))?;
        for (bucket, tasks) in self.columns() {
            map.serialize_entry(bucket.key(), tasks)?;
        }
        map.end()
    }
}

/// Header counts per status group.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
}

impl BoardCounts {
    #[must_use]
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.done
    }
}
