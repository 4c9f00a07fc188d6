use crate::error::AppError;
use crate::model::{Notification, NotificationKind, Task, TaskStatus};
use log::warn;
use time::{Duration, OffsetDateTime};

/// Applies the automatic status rule: any task that is not completed and
/// whose end has passed becomes overdue. Already-overdue and completed
/// tasks are left untouched, so re-evaluating with the same `now` is a
/// no-op. Returns the ids of the tasks this call changed.
pub fn mark_overdue(now: OffsetDateTime, tasks: &mut [Task]) -> Vec<String> {
    let mut changed = Vec::new();

    for task in tasks.iter_mut() {
        if matches!(task.status, TaskStatus::Completed | TaskStatus::Overdue) {
            continue;
        }

        let end = match task.end() {
            Ok(end) => end,
            Err(err) => {
                warn!("skipping status check for {}: {}", task.id, err);
                continue;
            }
        };

        if now > end {
            task.status = TaskStatus::Overdue;
            changed.push(task.id.clone());
        }
    }

    changed
}

/// Checks a user-requested transition. The automatic evaluator never
/// calls this; it covers the start/complete intents only.
pub fn manual_transition(current: TaskStatus, target: TaskStatus) -> Result<(), AppError> {
    let allowed = matches!(
        (current, target),
        (TaskStatus::Todo, TaskStatus::Progress)
            | (TaskStatus::Todo, TaskStatus::Completed)
            | (TaskStatus::Progress, TaskStatus::Completed)
            | (TaskStatus::Overdue, TaskStatus::Completed)
    );

    if allowed {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "cannot move task from {} to {}",
            current.as_str(),
            target.as_str()
        )))
    }
}

/// Derives the notification set from `(now, tasks)` alone. Fully
/// recomputed on every call; order follows the task collection.
pub fn derive_notifications(now: OffsetDateTime, tasks: &[Task]) -> Vec<Notification> {
    let mut notifications = Vec::new();

    for task in tasks {
        if task.status == TaskStatus::Overdue {
            notifications.push(Notification {
                kind: NotificationKind::Overdue,
                title: task.title.clone(),
                message: "This task is overdue".to_string(),
                task_id: task.id.clone(),
            });
            continue;
        }

        if task.status == TaskStatus::Completed || task.reminder_minutes == 0 {
            continue;
        }

        let start = match task.start() {
            Ok(start) => start,
            Err(err) => {
                warn!("skipping reminder check for {}: {}", task.id, err);
                continue;
            }
        };

        let reminder_time = start - Duration::minutes(i64::from(task.reminder_minutes));
        if reminder_time <= now && now < start {
            notifications.push(Notification {
                kind: NotificationKind::Upcoming,
                title: task.title.clone(),
                message: format!("Starting in {} minutes", task.reminder_minutes),
                task_id: task.id.clone(),
            });
        }
    }

    notifications
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub todo: usize,
    pub progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

pub fn status_counts(tasks: &[Task]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for task in tasks {
        match task.status {
            TaskStatus::Todo => counts.todo += 1,
            TaskStatus::Progress => counts.progress += 1,
            TaskStatus::Completed => counts.completed += 1,
            TaskStatus::Overdue => counts.overdue += 1,
        }
    }
    counts
}
