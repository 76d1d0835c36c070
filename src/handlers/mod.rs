//! Command handlers. Each loads the snapshot, runs the engine once, prints.

pub mod add;
pub mod board;
pub mod edit;
pub mod init;
pub mod move_task;
pub mod schedule;
pub mod show;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use kanban::engine::state::PipelineState;
use kanban::engine::store::parse_timestamp;

const BAR_WIDTH: usize = 20;

/// The evaluation time: `--now` when given, the wall clock otherwise.
fn resolve_now(now: Option<&str>) -> Result<DateTime<Utc>> {
    now.map_or_else(
        || Ok(Utc::now()),
        |s| parse_timestamp(s).context("Invalid --now value"),
    )
}

/// Colors text by the pipeline state's color hint.
fn paint(state: PipelineState, text: &str) -> ColoredString {
    match state.color_hint() {
        "spec" => text.cyan(),
        "ccb" => text.magenta(),
        "dev" => text.blue(),
        "verify" => text.yellow(),
        "review" => text.bright_magenta(),
        "done" => text.green(),
        _ => text.dimmed(),
    }
}

/// Short state label for tables.
fn state_label(state: PipelineState) -> String {
    match state {
        PipelineState::InProgress(stage) => stage.to_string(),
        other => other.to_string(),
    }
}

/// Two stacked bars: `ideal` as a dim track, `actual` drawn over it.
fn progress_bar(state: PipelineState, ideal: u8, actual: u8) -> String {
    let ideal_cells = usize::from(ideal) * BAR_WIDTH / 100;
    let actual_cells = usize::from(actual) * BAR_WIDTH / 100;
    let mut bar = String::new();
    for i in 0..BAR_WIDTH {
        let cell = if i < actual_cells {
            paint(state, "█").to_string()
        } else if i < ideal_cells {
            "░".dimmed().to_string()
        } else {
            " ".to_string()
        };
        bar.push_str(&cell);
    }
    bar
}
