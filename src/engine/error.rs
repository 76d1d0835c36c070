//! Engine error conditions.

use thiserror::Error;

/// Conditions the engine refuses to paper over.
///
/// Orphaned parents, missing dates and degenerate windows are handled
/// in-band and never show up here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown pipeline stage '{0}'")]
    InvalidStage(String),

    #[error("unknown task status '{0}'")]
    InvalidStatus(String),

    #[error("parent links form a cycle through tasks {ids:?}")]
    MalformedHierarchy { ids: Vec<i64> },

    #[error("task {0} not found")]
    TaskNotFound(i64),

    #[error("task title must not be blank")]
    BlankTitle,
}
