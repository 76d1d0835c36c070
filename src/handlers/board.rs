//! Handler for the `board` command.

use super::paint;
use anyhow::Result;
use colored::Colorize;
use kanban::engine::state::PipelineState;
use kanban::engine::store::SnapshotStore;
use kanban::engine::view::{Board, BoardCounts, Bucket};
use serde::Serialize;

/// Prints the seven board columns with their counts.
///
/// # Errors
/// Returns error if the snapshot cannot be loaded.
pub fn handle(store: &SnapshotStore, json: bool) -> Result<()> {
    let snapshot = store.load()?;
    let board = Board::project(&snapshot.tasks);

    if json {
        return print_json(&board);
    }

    print_human(&board);
    Ok(())
}

#[derive(Serialize)]
struct BoardReport<'a> {
    counts: BoardCounts,
    columns: &'a Board<'a>,
}

fn print_json(board: &Board<'_>) -> Result<()> {
    let report = BoardReport {
        counts: board.counts(),
        columns: board,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_human(board: &Board<'_>) {
    let counts = board.counts();
    println!(
        "{} Board  {} pending · {} in progress · {} done",
        "🗂".cyan(),
        counts.pending,
        counts.in_progress,
        counts.done
    );

    for (bucket, tasks) in board.columns() {
        let header = format!("{} ({})", bucket, tasks.len());
        println!("\n   {}", paint(bucket_state(bucket), &header).bold());
        for task in tasks {
            println!("     - [{}] {}", task.id.to_string().dimmed(), task.label());
        }
    }
}

fn bucket_state(bucket: Bucket) -> PipelineState {
    match bucket {
        Bucket::Pending => PipelineState::Pending,
        Bucket::Stage(stage) => PipelineState::InProgress(stage),
        Bucket::Done => PipelineState::Done,
    }
}
