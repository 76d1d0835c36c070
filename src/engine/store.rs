//! Snapshot Store: loads and saves the flat task snapshot.
//!
//! Loose input (blank strings, SQLite timestamps, localized stage labels) is
//! normalized here, before any engine code sees a `Task`.

use super::edit::{NewTask, TaskEdit};
use super::error::EngineError;
use super::types::{Comment, Stage, Task, TaskStatus};
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const STORE_DIR: &str = ".kanban";
pub const STORE_FILE: &str = "tasks.json";

/// Everything the engine needs for one invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tasks: Vec<Task>,
    pub comments: Vec<Comment>,
    /// Stored values the engine does not model, keyed by task id.
    kept: HashMap<i64, Kept>,
    kept_comments: HashMap<i64, Map<String, Value>>,
}

/// What a save must write back untouched for one task.
#[derive(Debug, Clone, Default, PartialEq)]
struct Kept {
    /// A stage label that did not parse, on an in-progress task.
    raw_stage: Option<String>,
    /// Fields outside the task record.
    extra: Map<String, Value>,
}

impl Snapshot {
    #[must_use]
    pub fn find(&self, id: i64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: i64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Comments on a task, oldest first.
    #[must_use]
    pub fn comments_for(&self, task_id: i64) -> Vec<&Comment> {
        let mut out: Vec<_> = self.comments.iter().filter(|c| c.task_id == task_id).collect();
        out.sort_by_key(|c| c.created_at);
        out
    }

    /// The id a newly created task gets: one past the largest in use.
    #[must_use]
    pub fn next_id(&self) -> i64 {
        self.tasks.iter().map(|t| t.id).max().map_or(1, |id| id + 1)
    }

    /// Appends a new pending task.
    ///
    /// # Errors
    /// Returns `TaskNotFound` if the parent is not in the snapshot, or
    /// `BlankTitle` if the title is empty.
    pub fn add_task(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<&Task, EngineError> {
        if let Some(parent) = new.parent_task_id {
            if self.find(parent).is_none() {
                return Err(EngineError::TaskNotFound(parent));
            }
        }
        let task = new.into_task(self.next_id(), now)?;
        debug!(task_id = task.id, parent_id = ?task.parent_task_id, "adding task");
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Applies a field edit to one task and stamps `updated_at`.
    ///
    /// # Errors
    /// Returns `TaskNotFound` if the task is missing, or `BlankTitle` if the
    /// edit would empty the title.
    pub fn edit_task(&mut self, id: i64, edit: &TaskEdit, now: DateTime<Utc>) -> Result<&Task, EngineError> {
        let task = self.find_mut(id).ok_or(EngineError::TaskNotFound(id))?;
        edit.apply(task, now)?;
        Ok(&*task)
    }

    /// Parses a snapshot document, normalizing every record.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or a field cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(json).context("Snapshot is not valid JSON")?;
        let mut snapshot = Self::default();
        for raw_task in raw.tasks {
            let (task, kept) = raw_task.normalize()?;
            if kept != Kept::default() {
                snapshot.kept.entry(task.id).or_insert(kept);
            }
            snapshot.tasks.push(task);
        }
        for raw_comment in raw.comments {
            let (comment, extra) = raw_comment.normalize()?;
            if !extra.is_empty() {
                snapshot.kept_comments.entry(comment.id).or_insert(extra);
            }
            snapshot.comments.push(comment);
        }
        Ok(snapshot)
    }

    /// Renders the snapshot document, writing back stored values the engine
    /// left untouched.
    ///
    /// # Errors
    /// Returns an error if a record cannot be serialized.
    pub fn to_json(&self) -> Result<String> {
        let tasks = self
            .tasks
            .iter()
            .map(|t| self.stored_task(t))
            .collect::<Result<Vec<_>>>()?;
        let comments = self
            .comments
            .iter()
            .map(|c| Ok(with_extra(serde_json::to_value(c)?, self.kept_comments.get(&c.id))))
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::to_string_pretty(&json!({ "tasks": tasks, "comments": comments }))?)
    }

    fn stored_task(&self, task: &Task) -> Result<Value> {
        let value = serde_json::to_value(task)?;
        let Some(kept) = self.kept.get(&task.id) else {
            return Ok(value);
        };
        let mut value = with_extra(value, Some(&kept.extra));
        // An unparsed stage survives until the task is moved out of it.
        if task.status == TaskStatus::InProgress && task.stage.is_none() {
            if let (Some(raw), Value::Object(fields)) = (&kept.raw_stage, &mut value) {
                fields.insert("stage".to_string(), Value::String(raw.clone()));
            }
        }
        Ok(value)
    }
}

fn with_extra(mut value: Value, extra: Option<&Map<String, Value>>) -> Value {
    if let (Value::Object(fields), Some(extra)) = (&mut value, extra) {
        for (key, v) in extra {
            fields.entry(key.clone()).or_insert_with(|| v.clone());
        }
    }
    value
}

/// File-backed snapshot location.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional location under the working directory.
    #[must_use]
    pub fn default_path() -> PathBuf {
        Path::new(STORE_DIR).join(STORE_FILE)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the parent directory and an empty snapshot.
    ///
    /// # Errors
    /// Returns error if the snapshot already exists or cannot be written.
    pub fn init(&self) -> Result<()> {
        if self.path.exists() {
            bail!("Snapshot already exists at {}", self.path.display());
        }
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        self.save(&Snapshot::default())
    }

    /// Loads and normalizes the snapshot.
    ///
    /// # Errors
    /// Returns error if the file is missing or cannot be parsed.
    pub fn load(&self) -> Result<Snapshot> {
        if !self.path.exists() {
            bail!(
                "No snapshot at {}. Run `kanban init` first.",
                self.path.display()
            );
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let snapshot = Snapshot::from_json(&text)
            .with_context(|| format!("Failed to load {}", self.path.display()))?;
        debug!(
            tasks = snapshot.tasks.len(),
            comments = snapshot.comments.len(),
            "loaded snapshot"
        );
        Ok(snapshot)
    }

    /// Writes the whole snapshot back. Last write wins.
    ///
    /// # Errors
    /// Returns error if serialization or the write fails.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = snapshot.to_json()?;
        fs::write(&self.path, json).with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    tasks: Vec<RawTask>,
    #[serde(default)]
    comments: Vec<RawComment>,
}

#[derive(Deserialize)]
struct RawTask {
    id: i64,
    #[serde(default)]
    parent_task_id: Option<i64>,
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    assignee: Option<String>,
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    project_key: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    stage: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    created_at: String,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    jira_ticket_key: Option<String>,
    #[serde(default)]
    jira_url: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl RawTask {
    fn normalize(self) -> Result<(Task, Kept)> {
        let id = self.id;
        let mut raw_stage = None;
        let status = match blank_to_none(self.status) {
            Some(s) => s.parse::<TaskStatus>().with_context(|| format!("task {id}"))?,
            None => TaskStatus::Pending,
        };

        let stage = match blank_to_none(self.stage) {
            Some(s) if status == TaskStatus::InProgress => match s.parse::<Stage>() {
                Ok(stage) => Some(stage),
                Err(e) => {
                    warn!(task_id = id, "{e}, treating as stageless");
                    raw_stage = Some(s);
                    None
                }
            },
            Some(s) => {
                warn!(task_id = id, stage = %s, %status, "dropping stage on task that is not in progress");
                None
            }
            None => None,
        };

        let task = Task {
            id,
            parent_task_id: self.parent_task_id,
            title: self.title,
            description: blank_to_none(self.description),
            alias: blank_to_none(self.alias),
            assignee: blank_to_none(self.assignee),
            tags: blank_to_none(self.tags),
            keywords: blank_to_none(self.keywords),
            project_key: blank_to_none(self.project_key),
            status,
            stage,
            start_date: parse_date(self.start_date).with_context(|| format!("task {id}: start_date"))?,
            due_date: parse_date(self.due_date).with_context(|| format!("task {id}: due_date"))?,
            created_at: parse_timestamp(&self.created_at).with_context(|| format!("task {id}: created_at"))?,
            updated_at: blank_to_none(self.updated_at)
                .map(|s| parse_timestamp(&s))
                .transpose()
                .with_context(|| format!("task {id}: updated_at"))?,
            jira_ticket_key: blank_to_none(self.jira_ticket_key),
            jira_url: blank_to_none(self.jira_url),
        };
        let kept = Kept {
            raw_stage,
            extra: self.extra,
        };
        Ok((task, kept))
    }
}

#[derive(Deserialize)]
struct RawComment {
    id: i64,
    task_id: i64,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    attachments: Option<String>,
    created_at: String,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl RawComment {
    fn normalize(self) -> Result<(Comment, Map<String, Value>)> {
        let comment = Comment {
            id: self.id,
            task_id: self.task_id,
            author: blank_to_none(self.author).unwrap_or_else(|| "anonymous".to_string()),
            content: self.content,
            attachments: blank_to_none(self.attachments),
            created_at: parse_timestamp(&self.created_at)
                .with_context(|| format!("comment {}: created_at", self.id))?,
        };
        Ok((comment, self.extra))
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn parse_date(value: Option<String>) -> Result<Option<NaiveDate>> {
    blank_to_none(value).map(|s| parse_day(&s)).transpose()
}

/// Parses a calendar day (`YYYY-MM-DD`).
///
/// A full timestamp is tolerated where a date was expected; its written
/// calendar day is kept. Any other trailing text is rejected.
///
/// # Errors
/// Returns an error if the value is neither a date nor a timestamp.
pub fn parse_day(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day);
    }
    if matches!(value.as_bytes().get(10), Some(b'T' | b' ')) && parse_timestamp(value).is_ok() {
        if let Some(Ok(day)) = value.get(..10).map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d")) {
            return Ok(day);
        }
    }
    bail!("invalid date '{value}'")
}

/// Parses a timestamp. Accepts RFC 3339, SQLite `CURRENT_TIMESTAMP` text (UTC), or a bare date.
///
/// # Errors
/// Returns an error if no accepted format matches.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.and_utc());
    }
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(day.and_time(NaiveTime::default()).and_utc());
    }
    bail!("invalid timestamp '{value}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_blank_strings_become_none() {
        let snapshot = Snapshot::from_json(
            r#"{"tasks": [{"id": 1, "title": "a", "alias": "", "tags": "  ", "start_date": "",
                           "due_date": null, "stage": "", "status": "Pending",
                           "created_at": "2024-01-01T09:00:00Z"}]}"#,
        )
        .unwrap();
        let task = &snapshot.tasks[0];
        assert_eq!(task.alias, None);
        assert_eq!(task.tags, None);
        assert_eq!(task.start_date, None);
        assert_eq!(task.stage, None);
    }

    #[test]
    fn test_sqlite_timestamp_and_localized_stage() {
        let snapshot = Snapshot::from_json(
            r#"{"tasks": [{"id": 3, "title": "b", "status": "InProgress", "stage": "검증",
                           "due_date": "2024-02-01", "created_at": "2024-01-15 08:30:00"}]}"#,
        )
        .unwrap();
        let task = &snapshot.tasks[0];
        assert_eq!(task.stage, Some(Stage::Verification));
        assert_eq!(task.created_at, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
        assert_eq!(task.due_date, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_stage_dropped_outside_in_progress() {
        let snapshot = Snapshot::from_json(
            r#"{"tasks": [{"id": 1, "title": "a", "status": "Done", "stage": "Review",
                           "created_at": "2024-01-01"}]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.tasks[0].stage, None);
    }

    #[test]
    fn test_date_rejects_trailing_text() {
        let err = Snapshot::from_json(
            r#"{"tasks": [{"id": 5, "title": "a", "due_date": "2024-01-10garbage", "created_at": "2024-01-01"}]}"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("2024-01-10garbage"));
    }

    #[test]
    fn test_date_accepts_timestamp_day() {
        assert_eq!(parse_day("2024-01-10T23:30:00+09:00").unwrap(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(parse_day("2024-01-10 08:00:00").unwrap(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert!(parse_day("2024-01-10Tnoon").is_err());
        assert!(parse_day("2024-13-01").is_err());
    }

    #[test]
    fn test_unknown_stage_written_back() {
        let snapshot = Snapshot::from_json(
            r#"{"tasks": [{"id": 1, "title": "a", "status": "InProgress", "stage": "QA",
                           "sprint": 7, "created_at": "2024-01-01"}]}"#,
        )
        .unwrap();
        let stored: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(stored["tasks"][0]["stage"], "QA");
        assert_eq!(stored["tasks"][0]["sprint"], 7);
    }

    #[test]
    fn test_unknown_stage_cleared_once_moved() {
        let mut snapshot = Snapshot::from_json(
            r#"{"tasks": [{"id": 1, "title": "a", "status": "InProgress", "stage": "QA",
                           "created_at": "2024-01-01"}]}"#,
        )
        .unwrap();
        snapshot.tasks[0].status = TaskStatus::Done;
        let stored: Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert!(stored["tasks"][0]["stage"].is_null());
    }

    #[test]
    fn test_unknown_stored_stage_is_stageless() {
        let snapshot = Snapshot::from_json(
            r#"{"tasks": [{"id": 1, "title": "a", "status": "InProgress", "stage": "QA",
                           "created_at": "2024-01-01"}]}"#,
        )
        .unwrap();
        assert_eq!(snapshot.tasks[0].stage, None);
    }

    #[test]
    fn test_missing_status_defaults_pending() {
        let snapshot =
            Snapshot::from_json(r#"{"tasks": [{"id": 1, "title": "a", "created_at": "2024-01-01"}]}"#).unwrap();
        assert_eq!(snapshot.tasks[0].status, TaskStatus::Pending);
    }

    #[test]
    fn test_invalid_date_is_error() {
        let err = Snapshot::from_json(
            r#"{"tasks": [{"id": 9, "title": "a", "due_date": "soon", "created_at": "2024-01-01"}]}"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("task 9"));
    }

    #[test]
    fn test_add_task_assigns_next_id() {
        let mut snapshot = Snapshot::default();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(snapshot.add_task(NewTask::titled("root"), now).unwrap().id, 1);

        let mut child = NewTask::titled("child");
        child.parent_task_id = Some(1);
        let added = snapshot.add_task(child, now).unwrap();
        assert_eq!(added.id, 2);
        assert_eq!(added.parent_task_id, Some(1));
        assert_eq!(snapshot.next_id(), 3);
    }

    #[test]
    fn test_add_task_requires_known_parent() {
        let mut snapshot = Snapshot::default();
        let mut orphan = NewTask::titled("orphan");
        orphan.parent_task_id = Some(42);
        let err = snapshot.add_task(orphan, Utc::now()).unwrap_err();
        assert_eq!(err, EngineError::TaskNotFound(42));
        assert!(snapshot.tasks.is_empty());
    }

    #[test]
    fn test_edit_missing_task() {
        let mut snapshot = Snapshot::default();
        let err = snapshot.edit_task(3, &TaskEdit::default(), Utc::now()).unwrap_err();
        assert_eq!(err, EngineError::TaskNotFound(3));
    }

    #[test]
    fn test_comments_sorted_oldest_first() {
        let snapshot = Snapshot::from_json(
            r#"{"tasks": [], "comments": [
                {"id": 2, "task_id": 1, "author": "kim", "content": "later", "created_at": "2024-01-02T00:00:00Z"},
                {"id": 1, "task_id": 1, "author": "", "content": "first", "created_at": "2024-01-01T00:00:00Z"},
                {"id": 3, "task_id": 2, "author": "lee", "content": "other", "created_at": "2024-01-01T00:00:00Z"}
            ]}"#,
        )
        .unwrap();
        let comments = snapshot.comments_for(1);
        assert_eq!(comments.iter().map(|c| c.id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(comments[0].author, "anonymous");
    }
}
