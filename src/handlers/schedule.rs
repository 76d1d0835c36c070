//! Handler for the `schedule` command.

use super::{paint, progress_bar, resolve_now, state_label};
use anyhow::Result;
use colored::Colorize;
use kanban::engine::store::SnapshotStore;
use kanban::engine::view::{project_rows, ScheduleRow};

/// Prints the schedule table in tree order.
///
/// # Errors
/// Returns error if the snapshot cannot be loaded or its hierarchy is cyclic.
pub fn handle(store: &SnapshotStore, json: bool, now: Option<&str>) -> Result<()> {
    let snapshot = store.load()?;
    let now = resolve_now(now)?;
    let rows = project_rows(&snapshot.tasks, now)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    print_human(&rows);
    Ok(())
}

fn print_human(rows: &[ScheduleRow<'_>]) {
    println!("{} Schedule", "📅".cyan());

    if rows.is_empty() {
        println!("   (No tasks on the board yet)");
        return;
    }

    for row in rows {
        print_row(row);
    }
}

pub(super) fn print_row(row: &ScheduleRow<'_>) {
    let state = row.state();
    let indent = "  ".repeat(row.depth);

    let start = if row.inherited_start {
        row.effective_start.to_string().dimmed().italic()
    } else {
        row.effective_start.to_string().normal()
    };
    let due = if row.effective_due.is_unbounded() {
        "no due".dimmed()
    } else if row.inherited_due {
        row.effective_due.to_string().dimmed().italic()
    } else {
        row.effective_due.to_string().normal()
    };

    println!(
        "   {}[{}] {} {}",
        indent,
        row.task.id.to_string().yellow(),
        row.task.label(),
        paint(state, &state_label(state))
    );
    println!(
        "   {}     {} → {}  {} {:>3}% / {:>3}%",
        indent,
        start,
        due,
        progress_bar(state, row.progress.ideal_progress, row.progress.actual_progress),
        row.progress.actual_progress,
        row.progress.ideal_progress
    );
}
