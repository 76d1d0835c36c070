//! Handler for the `init` command.

use anyhow::Result;
use colored::Colorize;
use kanban::engine::store::SnapshotStore;

/// Creates an empty snapshot.
///
/// # Errors
/// Returns error if the snapshot exists or cannot be written.
pub fn handle(store: &SnapshotStore) -> Result<()> {
    store.init()?;
    println!("{} Initialized {}", "✓".green(), store.path().display());
    Ok(())
}
