//! Handler for the `edit` command.

use anyhow::{bail, Result};
use chrono::Utc;
use colored::Colorize;
use kanban::engine::edit::TaskEdit;
use kanban::engine::store::SnapshotStore;

/// Applies a field edit to one task and saves.
///
/// # Errors
/// Returns error if nothing would change, the task is missing,
/// or the snapshot cannot be written.
pub fn handle(store: &SnapshotStore, task_id: i64, edit: &TaskEdit, json: bool) -> Result<()> {
    if edit.is_empty() {
        bail!("Nothing to change. Pass at least one field to edit.");
    }

    let mut snapshot = store.load()?;
    let task = snapshot.edit_task(task_id, edit, Utc::now())?.clone();
    store.save(&snapshot)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    println!("{} Updated [{}] {}", "✓".green(), task.id.to_string().yellow(), task.label());
    let show = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".dimmed().to_string(), |d| d.to_string());
    println!("   start {}  due {}", show(task.start_date), show(task.due_date));
    Ok(())
}
