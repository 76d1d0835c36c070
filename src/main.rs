mod handlers;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use kanban::engine::edit::{NewTask, TaskEdit};
use kanban::engine::store::{parse_day, SnapshotStore};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kanban", version, about = "Staged delivery board and schedule")]
struct Cli {
    /// Task snapshot file
    #[arg(long, global = true, env = "KANBAN_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Create an empty task snapshot
    Init,
    /// Add a new pending task
    Add {
        title: String,
        /// Parent task id
        #[arg(long, short = 'p')]
        parent: Option<i64>,
        /// Start date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day_arg)]
        start: Option<NaiveDate>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day_arg)]
        due: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, short = 'a')]
        alias: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Edit a task's title, dates or metadata (an empty value clears text fields)
    Edit {
        task: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_day_arg, conflicts_with = "clear_start")]
        start: Option<NaiveDate>,
        #[arg(long, value_parser = parse_day_arg, conflicts_with = "clear_due")]
        due: Option<NaiveDate>,
        /// Remove the start date so it is inherited again
        #[arg(long)]
        clear_start: bool,
        /// Remove the due date so it is inherited again
        #[arg(long)]
        clear_due: bool,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, short = 'a')]
        alias: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show the schedule table (tree order, resolved dates, progress)
    Schedule {
        #[arg(long)]
        json: bool,
        /// Evaluate progress at this time instead of now (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        now: Option<String>,
    },
    /// Show the board columns
    Board {
        #[arg(long)]
        json: bool,
    },
    /// Move a task to a status (and stage)
    Move {
        task: i64,
        /// Pending, InProgress or Done
        status: String,
        /// Pipeline stage when moving to InProgress
        #[arg(long, short = 's')]
        stage: Option<String>,
        /// Keep the current stage when moving to InProgress without --stage
        #[arg(long, conflicts_with = "stage")]
        keep_stage: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show one task with its resolved dates, progress and comments
    Show {
        task: i64,
        #[arg(long)]
        json: bool,
        #[arg(long)]
        now: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = SnapshotStore::new(cli.snapshot.unwrap_or_else(SnapshotStore::default_path));

    match cli.command {
        Commands::Init | Commands::Add { .. } | Commands::Edit { .. } | Commands::Move { .. } => {
            dispatch_write_ops(&store, cli.command)
        }
        Commands::Schedule { .. } | Commands::Board { .. } | Commands::Show { .. } => {
            dispatch_read_ops(&store, cli.command)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "kanban=debug" } else { "kanban=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch_write_ops(store: &SnapshotStore, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Init => handlers::init::handle(store),
        Commands::Add {
            title,
            parent,
            start,
            due,
            description,
            alias,
            assignee,
            tags,
            keywords,
            project,
            json,
        } => {
            let new = NewTask {
                title,
                parent_task_id: parent,
                description,
                alias,
                assignee,
                tags,
                keywords,
                project_key: project,
                start_date: start,
                due_date: due,
            };
            handlers::add::handle(store, new, json)
        }
        Commands::Edit {
            task,
            title,
            start,
            due,
            clear_start,
            clear_due,
            description,
            alias,
            assignee,
            tags,
            keywords,
            json,
        } => {
            let edit = TaskEdit {
                title,
                description,
                alias,
                assignee,
                tags,
                keywords,
                start_date: if clear_start { Some(None) } else { start.map(Some) },
                due_date: if clear_due { Some(None) } else { due.map(Some) },
            };
            handlers::edit::handle(store, task, &edit, json)
        }
        Commands::Move {
            task,
            status,
            stage,
            keep_stage,
            json,
        } => handlers::move_task::handle(store, task, &status, stage, keep_stage, json),
        _ => unreachable!("Invalid write command dispatch"),
    }
}

fn parse_day_arg(value: &str) -> Result<NaiveDate, String> {
    parse_day(value).map_err(|e| e.to_string())
}

fn dispatch_read_ops(store: &SnapshotStore, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Schedule { json, now } => handlers::schedule::handle(store, json, now.as_deref()),
        Commands::Board { json } => handlers::board::handle(store, json),
        Commands::Show { task, json, now } => handlers::show::handle(store, task, json, now.as_deref()),
        _ => unreachable!("Invalid read command dispatch"),
    }
}
