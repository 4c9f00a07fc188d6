use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create your profile (first run only)
    ///
    /// Example: taskboard setup "Ada"
    Setup {
        name: String,
    },
    /// Add a new task
    ///
    /// Example: taskboard add "Standup" --start 2026-03-02T09:00:00Z --end 2026-03-02T09:15:00Z --reminder 10
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        /// Start instant (RFC3339)
        #[arg(long)]
        start: String,
        /// End instant (RFC3339), must be after start
        #[arg(long)]
        end: String,
        /// Minutes before start to surface an upcoming reminder
        #[arg(long, default_value_t = 0)]
        reminder: u32,
    },
    /// Start working on a task
    ///
    /// Example: taskboard start task-1772438400-1a2b3c4d
    Start {
        id: String,
    },
    /// Mark a task as completed
    ///
    /// Example: taskboard done task-1772438400-1a2b3c4d
    Done {
        id: String,
    },
    /// Delete a task
    ///
    /// Example: taskboard delete task-1772438400-1a2b3c4d
    Delete {
        id: String,
    },
    /// Show details of a task
    ///
    /// Example: taskboard show task-1772438400-1a2b3c4d
    Show {
        id: String,
    },
    /// List tasks sorted by start time
    ///
    /// Example: taskboard list
    /// Example: taskboard list --filter overdue
    List {
        /// all, todo, progress, completed or overdue
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show status counters and today's tasks
    ///
    /// Example: taskboard dashboard
    Dashboard,
    /// List active notifications
    ///
    /// Example: taskboard notifications
    Notifications,
    /// Clear the notification panel until the next check
    ///
    /// Example: taskboard read-all
    ReadAll,
    /// Show or set the color theme
    ///
    /// Example: taskboard theme dark
    Theme {
        value: Option<String>,
    },
    /// Check tasks on an interval, sending desktop notifications
    ///
    /// Example: taskboard watch --interval 30
    Watch {
        /// Seconds between checks
        #[arg(long, default_value_t = taskboard_core::poller::DEFAULT_PERIOD.as_secs())]
        interval: u64,
    },
}
