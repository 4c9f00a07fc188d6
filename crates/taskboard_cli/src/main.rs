mod cli;

use crate::cli::{Cli, Command};
use clap::{CommandFactory, Parser};
use log::warn;
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskboard_core::app::{AppState, TaskFilter, local_offset};
use taskboard_core::config::{Palette, Theme, palette_for_theme};
use taskboard_core::error::AppError;
use taskboard_core::model::{Notification, NotificationKind, Task, TaskStatus};
use taskboard_core::notify::{Notifier, notifier_from_env};
use taskboard_core::poller::Poller;
use taskboard_core::repo::NewTask;
use taskboard_core::storage::JsonStore;
use time::OffsetDateTime;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Reminder")]
    reminder: String,
}

impl TaskRow {
    fn from_task(task: &Task) -> Self {
        let reminder = if task.reminder_minutes > 0 {
            format!("{} min before", task.reminder_minutes)
        } else {
            "-".to_string()
        };
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            status: task.status.label().to_string(),
            start: task.start_date.clone(),
            end: task.end_date.clone(),
            reminder,
        }
    }
}

fn print_task_table(tasks: &[Task], palette: &Palette) {
    if tasks.is_empty() {
        println!("{}", palette.mutedize("No tasks available"));
        return;
    }

    let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from_task).collect();
    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{table}");
}

fn print_tasks_json(tasks: &[Task]) -> Result<(), AppError> {
    let payload = serde_json::to_string(tasks).map_err(|err| AppError::io(err.to_string()))?;
    println!("{payload}");
    Ok(())
}

fn print_task_json(task: &Task) -> Result<(), AppError> {
    let payload = serde_json::to_string(task).map_err(|err| AppError::io(err.to_string()))?;
    println!("{payload}");
    Ok(())
}

fn print_task_detail(task: &Task, palette: &Palette) {
    println!("{} ({})", palette.accentize(&task.title), task.id);
    println!("Status: {}", task.status.label());
    if let Some(description) = task.description.as_deref() {
        println!("Description: {description}");
    }
    println!("Start: {}", task.start_date);
    println!("End: {}", task.end_date);
    if task.reminder_minutes > 0 {
        println!("Reminder: {} minutes before", task.reminder_minutes);
    }
    println!("Created: {}", task.created_at);
}

fn print_notifications_plain(notifications: &[Notification], palette: &Palette) {
    if notifications.is_empty() {
        println!("{}", palette.mutedize("No notifications"));
        return;
    }

    for notification in notifications {
        println!(
            "[{}] {}: {}",
            notification.kind.as_str(),
            notification.title,
            notification.message
        );
    }
}

fn print_notifications_json(notifications: &[Notification]) -> Result<(), AppError> {
    let payload =
        serde_json::to_string(notifications).map_err(|err| AppError::io(err.to_string()))?;
    println!("{payload}");
    Ok(())
}

fn open_app(now: OffsetDateTime) -> Result<AppState<JsonStore>, AppError> {
    let store = JsonStore::open_default()?;
    let mut app = AppState::new(store);
    app.init(now);
    Ok(app)
}

fn require_profile(app: &AppState<JsonStore>) -> Result<(), AppError> {
    if app.profile().is_none() {
        return Err(AppError::validation(
            "no profile yet; run: taskboard setup <name>",
        ));
    }
    Ok(())
}

fn run_command(cli: Cli, app: &mut AppState<JsonStore>) -> Result<(), AppError> {
    let now = OffsetDateTime::now_utc();
    let palette = palette_for_theme(app.theme());

    match cli.command {
        Command::Setup { name } => {
            let profile = app.create_profile(&name, now)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&profile).map_err(|err| AppError::io(err.to_string()))?
                );
            } else {
                println!("Welcome, {}!", palette.accentize(&profile.name));
            }
        }
        Command::Add {
            title,
            description,
            start,
            end,
            reminder,
        } => {
            require_profile(app)?;
            let task = app.create_task(
                NewTask {
                    title,
                    description,
                    start_date: start,
                    end_date: end,
                    reminder_minutes: reminder,
                },
                now,
            )?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Added task: {} ({})", task.title, task.id);
            }
        }
        Command::Start { id } => {
            require_profile(app)?;
            let task = app.set_status(&id, TaskStatus::Progress, now)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Started task: {} ({})", task.title, task.id);
            }
        }
        Command::Done { id } => {
            require_profile(app)?;
            let task = app.set_status(&id, TaskStatus::Completed, now)?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                println!("Completed task: {} ({})", task.title, task.id);
            }
        }
        Command::Delete { id } => {
            require_profile(app)?;
            app.delete_task(&id, now)?;
            if cli.json {
                println!("{}", serde_json::json!({ "id": id, "deleted": true }));
            } else {
                println!("Deleted task: {id}");
            }
        }
        Command::Show { id } => {
            require_profile(app)?;
            app.tick(now);
            let task = app
                .get_task(&id)
                .cloned()
                .ok_or_else(|| AppError::validation("task not found"))?;
            if cli.json {
                print_task_json(&task)?;
            } else {
                print_task_detail(&task, &palette);
            }
        }
        Command::List { filter } => {
            require_profile(app)?;
            if let Some(raw) = filter.as_deref() {
                let parsed = TaskFilter::parse(raw).ok_or_else(|| {
                    AppError::validation("filter must be all, todo, progress, completed or overdue")
                })?;
                app.set_filter(parsed);
            }
            app.tick(now);
            let tasks = app.filtered_tasks();
            if cli.json {
                print_tasks_json(&tasks)?;
            } else {
                print_task_table(&tasks, &palette);
            }
        }
        Command::Dashboard => {
            require_profile(app)?;
            app.tick(now);
            let counts = app.counts();
            let today = app.today_tasks(now, local_offset());
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "todo": counts.todo,
                        "progress": counts.progress,
                        "completed": counts.completed,
                        "overdue": counts.overdue,
                        "today": today,
                    })
                );
            } else {
                if let Some(profile) = app.profile() {
                    println!("Hello, {}!", palette.accentize(&profile.name));
                }
                println!(
                    "To Do: {}  In Progress: {}  Completed: {}  Overdue: {}",
                    counts.todo, counts.progress, counts.completed, counts.overdue
                );
                if today.is_empty() {
                    println!("{}", palette.mutedize("No tasks for today"));
                } else {
                    print_task_table(&today, &palette);
                }
            }
        }
        Command::Notifications => {
            require_profile(app)?;
            app.tick(now);
            if cli.json {
                print_notifications_json(app.notifications())?;
            } else {
                print_notifications_plain(app.notifications(), &palette);
            }
        }
        Command::ReadAll => {
            require_profile(app)?;
            app.mark_all_read();
            if cli.json {
                print_notifications_json(app.notifications())?;
            } else {
                println!("Notifications cleared");
            }
        }
        Command::Theme { value } => match value {
            Some(raw) => {
                let theme = Theme::parse(&raw)
                    .ok_or_else(|| AppError::validation("theme must be light or dark"))?;
                app.set_theme(theme)?;
                println!("Theme set to {}", theme.as_str());
            }
            None => println!("{}", app.theme().as_str()),
        },
        Command::Watch { interval } => {
            require_profile(app)?;
            run_watch(interval)?;
        }
    }

    Ok(())
}

/// Foreground checker: replays the dashboard's periodic evaluation,
/// forwarding each newly surfaced notification to the desktop.
fn run_watch(interval_secs: u64) -> Result<(), AppError> {
    let interval = Duration::from_secs(interval_secs.max(1));
    let now = OffsetDateTime::now_utc();
    let app = Arc::new(Mutex::new(open_app(now)?));
    let notifier = notifier_from_env();

    let mut seen: HashSet<(NotificationKind, String)> = HashSet::new();
    {
        let app = app.lock().map_err(|_| AppError::io("state lock poisoned"))?;
        for notification in app.notifications() {
            seen.insert((notification.kind, notification.task_id.clone()));
            println!(
                "[{}] {}: {}",
                notification.kind.as_str(),
                notification.title,
                notification.message
            );
            if let Err(err) = notifier.notify(notification) {
                warn!("desktop notification failed: {err}");
            }
        }
    }

    let worker_app = app.clone();
    let mut checker = None;
    Poller::restart(&mut checker, interval, move || {
        let now = OffsetDateTime::now_utc();
        let Ok(mut app) = worker_app.lock() else {
            return;
        };
        app.tick(now);
        for notification in app.notifications() {
            let key = (notification.kind, notification.task_id.clone());
            if seen.insert(key) {
                println!(
                    "[{}] {}: {}",
                    notification.kind.as_str(),
                    notification.title,
                    notification.message
                );
                if let Err(err) = notifier.notify(notification) {
                    warn!("desktop notification failed: {err}");
                }
            }
        }
    });

    println!("Checking tasks every {interval_secs}s; press Enter to stop.");
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);

    if let Some(checker) = checker.take() {
        checker.stop();
    }
    Ok(())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::validation("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn run_interactive() -> Result<(), AppError> {
    let mut app = open_app(OffsetDateTime::now_utc())?;
    let mut input = String::new();
    let stdin = io::stdin();

    loop {
        input.clear();
        // Locked per line so a nested `watch` can read stdin too.
        let bytes = stdin
            .lock()
            .read_line(&mut input)
            .map_err(|err| AppError::io(err.to_string()))?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {err}");
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskboard".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli, &mut app) {
            eprintln!("ERROR: {err}");
        }
    }

    Ok(())
}

fn init_logging() -> Option<flexi_logger::LoggerHandle> {
    flexi_logger::Logger::try_with_env_or_str("warn")
        .ok()
        .and_then(|logger| logger.start().ok())
}

fn main() {
    let _logger = init_logging();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    let mut app = match open_app(OffsetDateTime::now_utc()) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("ERROR: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli, &mut app) {
        eprintln!("ERROR: {err}");
        std::process::exit(1);
    }
}
