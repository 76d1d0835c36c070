//! Date Resolver: effective start/due dates with ancestor inheritance.

use super::graph::TaskForest;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use std::fmt;

/// A resolved due date. `Unbounded` means no due date anywhere in the lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate {
    On(NaiveDate),
    Unbounded,
}

impl DueDate {
    #[must_use]
    pub fn is_unbounded(self) -> bool {
        matches!(self, Self::Unbounded)
    }
}

impl From<Option<NaiveDate>> for DueDate {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(Self::Unbounded, Self::On)
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::On(d) => write!(f, "{d}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

impl Serialize for DueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Dates actually used for display and progress, for one forest slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDates {
    pub slot: usize,
    /// 0 for roots.
    pub depth: usize,
    pub effective_start: NaiveDate,
    pub effective_due: DueDate,
    /// True when the start came from an ancestor.
    pub inherited_start: bool,
    /// True when the due date came from an ancestor.
    pub inherited_due: bool,
}

/// Resolves dates for every task in the forest, in depth-first pre-order.
///
/// Children inherit the parent's *effective* values, so inheritance
/// compounds down any number of levels. Every slot appears exactly once.
#[must_use]
pub fn resolve_dates(forest: &TaskForest<'_>) -> Vec<ResolvedDates> {
    let mut resolved = Vec::with_capacity(forest.len());
    let mut stack: Vec<(usize, usize, Option<NaiveDate>, Option<NaiveDate>)> =
        forest.roots().iter().rev().map(|&s| (s, 0, None, None)).collect();

    while let Some((slot, depth, parent_start, parent_due)) = stack.pop() {
        let task = forest.task(slot);

        let effective_start = task
            .start_date
            .or(parent_start)
            .unwrap_or_else(|| task.created_at.date_naive());
        let effective_due = task.due_date.or(parent_due);

        resolved.push(ResolvedDates {
            slot,
            depth,
            effective_start,
            effective_due: effective_due.into(),
            inherited_start: task.start_date.is_none() && parent_start.is_some(),
            inherited_due: task.due_date.is_none() && parent_due.is_some(),
        });

        for &child in forest.children(slot).iter().rev() {
            stack.push((child, depth + 1, Some(effective_start), effective_due));
        }
    }

    resolved
}
