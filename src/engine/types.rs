//! Core types for the board engine.
//!
//! Note: effective dates and progress are never stored on `Task`.
//! They are derived per snapshot by `dates.rs` and `progress.rs`.

use super::error::EngineError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse pipeline state stored on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Done => write!(f, "Done"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "pending" => Ok(Self::Pending),
            "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(EngineError::InvalidStatus(s.to_string())),
        }
    }
}

/// The five ordered sub-phases of `InProgress` work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Stage {
    SpecCheck,
    #[serde(rename = "CCB")]
    Ccb,
    Development,
    Verification,
    Review,
}

impl Stage {
    /// All stages in pipeline order.
    pub const ALL: [Stage; 5] = [
        Stage::SpecCheck,
        Stage::Ccb,
        Stage::Development,
        Stage::Verification,
        Stage::Review,
    ];

    /// The stage a task enters when no stage is chosen.
    #[must_use]
    pub fn first() -> Self {
        Self::ALL[0]
    }

    /// Zero-based position in the pipeline.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::SpecCheck => 0,
            Self::Ccb => 1,
            Self::Development => 2,
            Self::Verification => 3,
            Self::Review => 4,
        }
    }

    /// Canonical name, as used on the wire and as a board bucket key.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SpecCheck => "SpecCheck",
            Self::Ccb => "CCB",
            Self::Development => "Development",
            Self::Verification => "Verification",
            Self::Review => "Review",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = EngineError;

    /// Accepts canonical names, kebab/snake case, and the tracker's
    /// localized labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', '_', ' '], "");
        match key.as_str() {
            "speccheck" | "spec" | "사양확인" => Ok(Self::SpecCheck),
            "ccb" => Ok(Self::Ccb),
            "development" | "dev" | "개발" => Ok(Self::Development),
            "verification" | "verify" | "검증" => Ok(Self::Verification),
            "review" | "리뷰" => Ok(Self::Review),
            _ => Err(EngineError::InvalidStage(s.to_string())),
        }
    }
}

/// A work item on the board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: i64,
    pub parent_task_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub alias: Option<String>,
    pub assignee: Option<String>,
    pub tags: Option<String>,
    pub keywords: Option<String>,
    pub project_key: Option<String>,
    pub status: TaskStatus,
    pub stage: Option<Stage>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub jira_ticket_key: Option<String>,
    pub jira_url: Option<String>,
}

impl Task {
    /// Creates a pending task with no dates and no metadata.
    #[must_use]
    pub fn new(id: i64, title: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            parent_task_id: None,
            title: title.to_string(),
            description: None,
            alias: None,
            assignee: None,
            tags: None,
            keywords: None,
            project_key: None,
            status: TaskStatus::Pending,
            stage: None,
            start_date: None,
            due_date: None,
            created_at,
            updated_at: None,
            jira_ticket_key: None,
            jira_url: None,
        }
    }

    /// Short label for lists: the alias when set, the title otherwise.
    #[must_use]
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.title)
    }
}

/// Read-only discussion entry attached to a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub author: String,
    pub content: String,
    pub attachments: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_matches_index() {
        for (i, stage) in Stage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(Stage::first(), Stage::SpecCheck);
    }

    #[test]
    fn test_stage_parse_aliases() {
        assert_eq!("CCB".parse::<Stage>().unwrap(), Stage::Ccb);
        assert_eq!("spec-check".parse::<Stage>().unwrap(), Stage::SpecCheck);
        assert_eq!("개발".parse::<Stage>().unwrap(), Stage::Development);
        assert_eq!(" Review ".parse::<Stage>().unwrap(), Stage::Review);
    }

    #[test]
    fn test_stage_parse_rejects_unknown() {
        let err = "Deploy".parse::<Stage>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidStage(ref s) if s == "Deploy"));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("Done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert!("Blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_stage_serde_uses_canonical_names() {
        assert_eq!(serde_json::to_string(&Stage::Ccb).unwrap(), "\"CCB\"");
        assert_eq!(serde_json::to_string(&Stage::SpecCheck).unwrap(), "\"SpecCheck\"");
    }
}
