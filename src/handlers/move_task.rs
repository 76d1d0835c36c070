//! Handler for the `move` command.

use super::{paint, state_label};
use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use kanban::engine::state::{apply_transition, write_back, PipelineState, TransitionRequest};
use kanban::engine::store::SnapshotStore;
use kanban::engine::types::TaskStatus;

/// Moves a task and writes the new status/stage pair back to the snapshot.
///
/// # Errors
/// Returns error if the status or stage is unknown, the task is missing,
/// or the snapshot cannot be written.
pub fn handle(
    store: &SnapshotStore,
    task_id: i64,
    status: &str,
    stage: Option<String>,
    keep_stage: bool,
    json: bool,
) -> Result<()> {
    let mut snapshot = store.load()?;
    let request = TransitionRequest {
        task_id,
        target_status: status.parse::<TaskStatus>()?,
        target_stage: stage,
        keep_stage,
    };

    let outcome = apply_transition(&snapshot.tasks, &request)?;

    if !outcome.is_noop() {
        let task = snapshot
            .find_mut(task_id)
            .context("Task disappeared from snapshot")?;
        write_back(task, outcome.to, Utc::now());
        store.save(&snapshot)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    let label = snapshot.find(task_id).map_or("", |t| t.label());
    let next = PipelineState::transition(outcome.to.status, outcome.to.stage);
    if outcome.is_noop() {
        println!("{} [{}] {} already in {}", "=".dimmed(), task_id.to_string().yellow(), label, state_label(next));
    } else {
        println!(
            "{} [{}] {} → {}",
            "→".yellow(),
            task_id.to_string().yellow(),
            label,
            paint(next, &state_label(next))
        );
    }
    Ok(())
}
