//! Task creation and field edits.
//!
//! Status and stage are never touched here; they only change through
//! `state::apply_transition`.

use super::error::EngineError;
use super::types::Task;
use chrono::{DateTime, NaiveDate, Utc};

/// Fields supplied when a task is created. Everything but the title is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub parent_task_id: Option<i64>,
    pub description: Option<String>,
    pub alias: Option<String>,
    pub assignee: Option<String>,
    pub tags: Option<String>,
    pub keywords: Option<String>,
    pub project_key: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    #[must_use]
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Builds the pending task with the given id.
    ///
    /// # Errors
    /// Returns `BlankTitle` if the title is empty.
    pub fn into_task(self, id: i64, now: DateTime<Utc>) -> Result<Task, EngineError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(EngineError::BlankTitle);
        }
        let mut task = Task::new(id, title, now);
        task.parent_task_id = self.parent_task_id;
        task.description = blank_to_none(self.description);
        task.alias = blank_to_none(self.alias);
        task.assignee = blank_to_none(self.assignee);
        task.tags = blank_to_none(self.tags);
        task.keywords = blank_to_none(self.keywords);
        task.project_key = blank_to_none(self.project_key);
        task.start_date = self.start_date;
        task.due_date = self.due_date;
        Ok(task)
    }
}

/// A partial update. `None` leaves a field as it is.
///
/// Dates take `Some(None)` to clear them. For text fields an empty string
/// clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub alias: Option<String>,
    pub assignee: Option<String>,
    pub tags: Option<String>,
    pub keywords: Option<String>,
    pub start_date: Option<Option<NaiveDate>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskEdit {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the edit and stamps `updated_at`.
    ///
    /// # Errors
    /// Returns `BlankTitle` if the new title is empty. The task is left
    /// untouched in that case.
    pub fn apply(&self, task: &mut Task, now: DateTime<Utc>) -> Result<(), EngineError> {
        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(EngineError::BlankTitle);
            }
            task.title = title.to_string();
        }
        replace_text(&mut task.description, self.description.as_ref());
        replace_text(&mut task.alias, self.alias.as_ref());
        replace_text(&mut task.assignee, self.assignee.as_ref());
        replace_text(&mut task.tags, self.tags.as_ref());
        replace_text(&mut task.keywords, self.keywords.as_ref());
        if let Some(start) = self.start_date {
            task.start_date = start;
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        task.updated_at = Some(now);
        Ok(())
    }
}

fn replace_text(field: &mut Option<String>, value: Option<&String>) {
    if let Some(value) = value {
        *field = blank_to_none(Some(value.clone()));
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_task_starts_pending() {
        let mut new = NewTask::titled("  Ship it ");
        new.due_date = Some(date(2024, 3, 10));
        new.alias = Some(String::new());
        let task = new.into_task(7, now()).unwrap();
        assert_eq!(task.id, 7);
        assert_eq!(task.title, "Ship it");
        assert_eq!(task.status, crate::engine::types::TaskStatus::Pending);
        assert_eq!(task.stage, None);
        assert_eq!(task.alias, None);
        assert_eq!(task.created_at, now());
        assert_eq!(task.due_date, Some(date(2024, 3, 10)));
    }

    #[test]
    fn test_blank_title_rejected() {
        assert_eq!(NewTask::titled("  ").into_task(1, now()), Err(EngineError::BlankTitle));

        let mut task = Task::new(1, "keep", now());
        let edit = TaskEdit {
            title: Some(String::new()),
            alias: Some("x".to_string()),
            ..TaskEdit::default()
        };
        assert_eq!(edit.apply(&mut task, now()), Err(EngineError::BlankTitle));
        assert_eq!(task.title, "keep");
        assert_eq!(task.alias, None);
        assert_eq!(task.updated_at, None);
    }

    #[test]
    fn test_edit_leaves_unset_fields() {
        let mut task = Task::new(1, "a", now());
        task.assignee = Some("kim".to_string());
        task.start_date = Some(date(2024, 1, 1));
        let edit = TaskEdit {
            due_date: Some(Some(date(2024, 2, 1))),
            tags: Some("backend".to_string()),
            ..TaskEdit::default()
        };
        edit.apply(&mut task, now()).unwrap();
        assert_eq!(task.assignee.as_deref(), Some("kim"));
        assert_eq!(task.start_date, Some(date(2024, 1, 1)));
        assert_eq!(task.due_date, Some(date(2024, 2, 1)));
        assert_eq!(task.tags.as_deref(), Some("backend"));
        assert_eq!(task.updated_at, Some(now()));
    }

    #[test]
    fn test_edit_clears_dates_and_text() {
        let mut task = Task::new(1, "a", now());
        task.start_date = Some(date(2024, 1, 1));
        task.alias = Some("old".to_string());
        let edit = TaskEdit {
            start_date: Some(None),
            alias: Some(" ".to_string()),
            ..TaskEdit::default()
        };
        edit.apply(&mut task, now()).unwrap();
        assert_eq!(task.start_date, None);
        assert_eq!(task.alias, None);
    }

    #[test]
    fn test_empty_edit() {
        assert!(TaskEdit::default().is_empty());
        assert!(!TaskEdit {
            due_date: Some(None),
            ..TaskEdit::default()
        }
        .is_empty());
    }
}
