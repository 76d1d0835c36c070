//! Handler for the `add` command.

use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use kanban::engine::edit::NewTask;
use kanban::engine::store::SnapshotStore;

/// Adds a pending task to the snapshot.
///
/// # Errors
/// Returns error if the title is blank, the parent does not exist,
/// or the snapshot cannot be written.
pub fn handle(store: &SnapshotStore, new: NewTask, json: bool) -> Result<()> {
    let mut snapshot = store.load()?;
    let task = snapshot.add_task(new, Utc::now())?.clone();
    store.save(&snapshot)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    println!("{} Added task [{}] {}", "✓".green(), task.id.to_string().yellow(), task.title);
    if let Some(parent) = task.parent_task_id {
        println!("   {} under [{}]", "↳".cyan(), parent);
    }
    Ok(())
}
