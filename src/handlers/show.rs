//! Handler for the `show` command.

use super::resolve_now;
use super::schedule::print_row;
use anyhow::{Context, Result};
use colored::Colorize;
use kanban::engine::store::SnapshotStore;
use kanban::engine::types::Comment;
use kanban::engine::view::{project_rows, ScheduleRow};
use serde::Serialize;

/// Shows one task as a schedule row, with its metadata and comments.
///
/// # Errors
/// Returns error if the snapshot cannot be loaded or the task is missing.
pub fn handle(store: &SnapshotStore, task_id: i64, json: bool, now: Option<&str>) -> Result<()> {
    let snapshot = store.load()?;
    let now = resolve_now(now)?;
    let rows = project_rows(&snapshot.tasks, now)?;
    let row = rows
        .iter()
        .find(|r| r.task.id == task_id)
        .with_context(|| format!("Task {task_id} not found"))?;
    let comments = snapshot.comments_for(task_id);

    if json {
        let detail = TaskDetail { row, comments };
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    print_human(row, &comments);
    Ok(())
}

#[derive(Serialize)]
struct TaskDetail<'a> {
    #[serde(flatten)]
    row: &'a ScheduleRow<'a>,
    comments: Vec<&'a Comment>,
}

fn print_human(row: &ScheduleRow<'_>, comments: &[&Comment]) {
    let task = row.task;
    print_row(&ScheduleRow { depth: 0, ..row.clone() });

    let fields = [
        ("Title", Some(task.title.as_str())),
        ("Assignee", task.assignee.as_deref()),
        ("Tags", task.tags.as_deref()),
        ("Keywords", task.keywords.as_deref()),
        ("Project", task.project_key.as_deref()),
        ("Ticket", task.jira_ticket_key.as_deref()),
    ];
    println!();
    for (name, value) in fields {
        if let Some(value) = value {
            println!("   {:<9}{}", format!("{name}:").dimmed(), value);
        }
    }
    if let Some(parent) = task.parent_task_id {
        println!("   {:<9}{}", "Parent:".dimmed(), parent);
    }
    println!(
        "   {:<9}{:+}%",
        "Drift:".dimmed(),
        row.progress.drift()
    );
    if let Some(description) = &task.description {
        println!("\n   {}", description);
    }

    println!("\n{}", "Comments:".dimmed().underline());
    if comments.is_empty() {
        println!("   (No comments)");
        return;
    }
    for comment in comments {
        println!(
            "   {}  {}",
            comment.created_at.format("%Y-%m-%d %H:%M").to_string().dimmed(),
            comment.author.cyan()
        );
        for line in comment.content.lines() {
            println!("     {line}");
        }
        if let Some(attachments) = &comment.attachments {
            println!("     {} {}", "📎".dimmed(), attachments.dimmed());
        }
    }
}
