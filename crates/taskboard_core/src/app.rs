use crate::config::{self, Theme};
use crate::error::AppError;
use crate::lifecycle::{self, StatusCounts};
use crate::model::{Notification, Task, TaskStatus, UserProfile};
use crate::repo::{NewTask, TaskRepository};
use crate::storage::PROFILE_KEY;
use crate::storage::kv::KvStore;
use log::warn;
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskFilter {
    #[default]
    All,
    Status(TaskStatus),
}

impl TaskFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Some(Self::All);
        }
        TaskStatus::parse(trimmed).map(Self::Status)
    }

    fn matches(self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Status(status) => task.status == status,
        }
    }
}

/// The single owner of application state: task collection (via the
/// repository), user profile, active filter and the derived
/// notification list. User intents dispatch through the methods here;
/// no rendering concern ever enters this type.
pub struct AppState<S: KvStore> {
    repo: TaskRepository<S>,
    profile: Option<UserProfile>,
    filter: TaskFilter,
    notifications: Vec<Notification>,
}

impl<S: KvStore> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            repo: TaskRepository::new(store),
            profile: None,
            filter: TaskFilter::All,
            notifications: Vec::new(),
        }
    }

    /// First thing after construction: pull the profile and the task
    /// collection out of the store and run one evaluation. Load
    /// failures degrade rather than propagate.
    pub fn init(&mut self, now: OffsetDateTime) {
        self.profile = match self.repo.store().get(PROFILE_KEY) {
            Ok(Some(value)) => match serde_json::from_str(&value) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    warn!("dropping unreadable profile: {err}");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!("profile read failed: {err}");
                None
            }
        };

        self.repo.load_all();
        self.tick(now);
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn create_profile(
        &mut self,
        name: &str,
        now: OffsetDateTime,
    ) -> Result<UserProfile, AppError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if self.profile.is_some() {
            return Err(AppError::validation("profile already exists"));
        }

        let created_at = now
            .format(&Rfc3339)
            .map_err(|err| AppError::validation(err.to_string()))?;
        let profile = UserProfile {
            name: trimmed.to_string(),
            created_at,
        };

        let value = serde_json::to_string(&profile)
            .map_err(|err| AppError::storage_write(err.to_string()))?;
        self.repo.store().set(PROFILE_KEY, &value)?;
        self.profile = Some(profile.clone());

        Ok(profile)
    }

    pub fn create_task(&mut self, input: NewTask, now: OffsetDateTime) -> Result<Task, AppError> {
        let task = self.repo.create(input, now)?;
        self.tick(now);
        Ok(task)
    }

    /// Applies a manual transition and persists it. Legality is checked
    /// by the lifecycle engine before anything is written.
    pub fn set_status(
        &mut self,
        id: &str,
        target: TaskStatus,
        now: OffsetDateTime,
    ) -> Result<Task, AppError> {
        let current = self
            .repo
            .get(id)
            .map(|task| task.status)
            .ok_or_else(|| AppError::validation("task not found"))?;
        lifecycle::manual_transition(current, target)?;

        let task = self.repo.set_status(id, target)?;
        self.tick(now);
        Ok(task)
    }

    pub fn delete_task(&mut self, id: &str, now: OffsetDateTime) -> Result<(), AppError> {
        self.repo.delete(id)?;
        self.tick(now);
        Ok(())
    }

    pub fn set_filter(&mut self, filter: TaskFilter) {
        self.filter = filter;
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    /// One evaluation cycle: run the automatic status rule, persist the
    /// tasks it changed (a failed write is logged and skipped, the rest
    /// still persist), then rebuild the notification list.
    pub fn tick(&mut self, now: OffsetDateTime) {
        let changed = lifecycle::mark_overdue(now, self.repo.tasks_mut());
        for id in changed {
            if let Some(task) = self.repo.get(&id)
                && let Err(err) = self.repo.save(task)
            {
                warn!("failed to persist status of {id}: {err}");
            }
        }

        self.notifications = lifecycle::derive_notifications(now, self.repo.tasks());
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Clears the derived list only. The next tick regenerates any
    /// notification whose underlying condition still holds.
    pub fn mark_all_read(&mut self) {
        self.notifications.clear();
    }

    pub fn tasks(&self) -> &[Task] {
        self.repo.tasks()
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.repo.get(id)
    }

    /// The list view: tasks matching the active filter, sorted by start
    /// time ascending.
    pub fn filtered_tasks(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .repo
            .tasks()
            .iter()
            .filter(|task| self.filter.matches(task))
            .cloned()
            .collect();
        tasks.sort_by_key(|task| task.start().unwrap_or(OffsetDateTime::UNIX_EPOCH));
        tasks
    }

    /// The dashboard view: tasks whose start falls on today's calendar
    /// date in the given offset.
    pub fn today_tasks(&self, now: OffsetDateTime, offset: UtcOffset) -> Vec<Task> {
        let today = now.to_offset(offset).date();
        self.repo
            .tasks()
            .iter()
            .filter(|task| match task.start() {
                Ok(start) => start.to_offset(offset).date() == today,
                Err(_) => false,
            })
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        lifecycle::status_counts(self.repo.tasks())
    }

    pub fn theme(&self) -> Theme {
        config::load_theme(self.repo.store())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), AppError> {
        config::save_theme(self.repo.store(), theme)
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

#[cfg(test)]
mod tests {
    use super::{AppState, TaskFilter};
    use crate::error::AppError;
    use crate::model::{NotificationKind, TaskStatus};
    use crate::repo::NewTask;
    use crate::storage::kv::{KvStore, MemoryStore};
    use crate::storage::task_key;
    use std::sync::Mutex;
    use time::format_description::well_known::Rfc3339;
    use time::macros::datetime;
    use time::{Duration, OffsetDateTime, UtcOffset};

    fn input_between(title: &str, start: OffsetDateTime, end: OffsetDateTime) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            start_date: start.format(&Rfc3339).unwrap(),
            end_date: end.format(&Rfc3339).unwrap(),
            reminder_minutes: 0,
        }
    }

    #[test]
    fn create_profile_persists_once() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);

        let profile = app.create_profile("Ada", now).unwrap();
        assert_eq!(profile.name, "Ada");
        assert_eq!(app.profile().unwrap().name, "Ada");

        let err = app.create_profile("Grace", now).unwrap_err();
        assert_eq!(err.code(), "validation");
        assert_eq!(app.profile().unwrap().name, "Ada");
    }

    #[test]
    fn create_profile_rejects_blank_name() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);

        let err = app.create_profile("  ", now).unwrap_err();

        assert_eq!(err.code(), "validation");
        assert!(app.profile().is_none());
    }

    #[test]
    fn init_restores_profile_and_tasks() {
        let store = MemoryStore::new();
        store
            .set(
                "user-profile",
                "{\"name\":\"Ada\",\"createdAt\":\"2026-02-01T00:00:00Z\"}",
            )
            .unwrap();
        let now = datetime!(2026-03-01 08:00 UTC);
        {
            let mut seed = AppState::new(&store);
            seed.create_task(
                input_between("demo", now + Duration::hours(1), now + Duration::hours(2)),
                now,
            )
            .unwrap();
        }

        let mut app = AppState::new(&store);
        app.init(now);

        assert_eq!(app.profile().unwrap().name, "Ada");
        assert_eq!(app.tasks().len(), 1);
    }

    #[test]
    fn tick_marks_overdue_and_raises_notification() {
        let mut app = AppState::new(MemoryStore::new());
        let created = datetime!(2026-03-01 08:00 UTC);
        let task = app
            .create_task(
                input_between(
                    "expired",
                    created + Duration::minutes(10),
                    created + Duration::minutes(30),
                ),
                created,
            )
            .unwrap();

        let later = created + Duration::hours(1);
        app.tick(later);

        assert_eq!(app.get_task(&task.id).unwrap().status, TaskStatus::Overdue);
        assert_eq!(app.notifications().len(), 1);
        assert_eq!(app.notifications()[0].kind, NotificationKind::Overdue);
    }

    #[test]
    fn tick_persists_flipped_status_to_store() {
        let store = MemoryStore::new();
        let created = datetime!(2026-03-01 08:00 UTC);
        let task_id;
        {
            let mut app = AppState::new(&store);
            let task = app
                .create_task(
                    input_between(
                        "expired",
                        created + Duration::minutes(10),
                        created + Duration::minutes(30),
                    ),
                    created,
                )
                .unwrap();
            task_id = task.id.clone();
            app.tick(created + Duration::hours(1));
        }

        let mut fresh = AppState::new(&store);
        fresh.init(created + Duration::minutes(5));

        assert_eq!(
            fresh.get_task(&task_id).unwrap().status,
            TaskStatus::Overdue
        );
    }

    #[test]
    fn set_status_runs_allowed_transitions() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);
        let task = app
            .create_task(
                input_between("demo", now + Duration::hours(1), now + Duration::hours(2)),
                now,
            )
            .unwrap();

        let started = app.set_status(&task.id, TaskStatus::Progress, now).unwrap();
        assert_eq!(started.status, TaskStatus::Progress);

        let completed = app
            .set_status(&task.id, TaskStatus::Completed, now)
            .unwrap();
        assert_eq!(completed.status, TaskStatus::Completed);
    }

    #[test]
    fn set_status_rejects_restarting_completed_task() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);
        let task = app
            .create_task(
                input_between("demo", now + Duration::hours(1), now + Duration::hours(2)),
                now,
            )
            .unwrap();
        app.set_status(&task.id, TaskStatus::Completed, now).unwrap();

        let err = app
            .set_status(&task.id, TaskStatus::Progress, now)
            .unwrap_err();

        assert_eq!(err.code(), "validation");
        assert_eq!(
            app.get_task(&task.id).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn overdue_task_can_still_be_completed_manually() {
        let mut app = AppState::new(MemoryStore::new());
        let created = datetime!(2026-03-01 08:00 UTC);
        let task = app
            .create_task(
                input_between(
                    "late",
                    created + Duration::minutes(5),
                    created + Duration::minutes(10),
                ),
                created,
            )
            .unwrap();
        let later = created + Duration::hours(1);
        app.tick(later);
        assert_eq!(app.get_task(&task.id).unwrap().status, TaskStatus::Overdue);

        let completed = app
            .set_status(&task.id, TaskStatus::Completed, later)
            .unwrap();

        assert_eq!(completed.status, TaskStatus::Completed);
        // Completion is absorbing: further ticks leave it alone.
        app.tick(later + Duration::hours(1));
        assert_eq!(
            app.get_task(&task.id).unwrap().status,
            TaskStatus::Completed
        );
    }

    #[test]
    fn mark_all_read_clears_until_next_tick() {
        let mut app = AppState::new(MemoryStore::new());
        let created = datetime!(2026-03-01 08:00 UTC);
        app.create_task(
            input_between(
                "expired",
                created + Duration::minutes(5),
                created + Duration::minutes(10),
            ),
            created,
        )
        .unwrap();
        let later = created + Duration::hours(1);
        app.tick(later);
        assert_eq!(app.notifications().len(), 1);

        app.mark_all_read();
        assert!(app.notifications().is_empty());

        // Conditions unchanged, so the next cycle resurfaces it.
        app.tick(later + Duration::minutes(1));
        assert_eq!(app.notifications().len(), 1);
    }

    #[test]
    fn filtered_tasks_sorts_by_start_ascending() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);
        let late = app
            .create_task(
                input_between("late", now + Duration::hours(3), now + Duration::hours(4)),
                now,
            )
            .unwrap();
        let early = app
            .create_task(
                input_between("early", now + Duration::hours(1), now + Duration::hours(2)),
                now,
            )
            .unwrap();

        let tasks = app.filtered_tasks();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, early.id);
        assert_eq!(tasks[1].id, late.id);
    }

    #[test]
    fn status_filter_narrows_the_list() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);
        let first = app
            .create_task(
                input_between("one", now + Duration::hours(1), now + Duration::hours(2)),
                now,
            )
            .unwrap();
        app.create_task(
            input_between("two", now + Duration::hours(1), now + Duration::hours(2)),
            now,
        )
        .unwrap();
        app.set_status(&first.id, TaskStatus::Progress, now).unwrap();

        app.set_filter(TaskFilter::Status(TaskStatus::Progress));
        let tasks = app.filtered_tasks();

        assert_eq!(app.filter(), TaskFilter::Status(TaskStatus::Progress));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, first.id);
    }

    #[test]
    fn task_filter_parse_accepts_all_and_statuses() {
        assert_eq!(TaskFilter::parse("all"), Some(TaskFilter::All));
        assert_eq!(
            TaskFilter::parse("overdue"),
            Some(TaskFilter::Status(TaskStatus::Overdue))
        );
        assert_eq!(TaskFilter::parse("bogus"), None);
    }

    #[test]
    fn today_tasks_match_calendar_date() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);
        let today = app
            .create_task(
                input_between("today", now + Duration::hours(2), now + Duration::hours(3)),
                now,
            )
            .unwrap();
        app.create_task(
            input_between(
                "tomorrow",
                now + Duration::days(1),
                now + Duration::days(1) + Duration::hours(1),
            ),
            now,
        )
        .unwrap();

        let tasks = app.today_tasks(now, UtcOffset::UTC);

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, today.id);
    }

    #[test]
    fn counts_follow_status_changes() {
        let mut app = AppState::new(MemoryStore::new());
        let now = datetime!(2026-03-01 08:00 UTC);
        let first = app
            .create_task(
                input_between("one", now + Duration::hours(1), now + Duration::hours(2)),
                now,
            )
            .unwrap();
        app.create_task(
            input_between("two", now + Duration::hours(1), now + Duration::hours(2)),
            now,
        )
        .unwrap();
        app.set_status(&first.id, TaskStatus::Completed, now).unwrap();

        let counts = app.counts();

        assert_eq!(counts.todo, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.progress, 0);
        assert_eq!(counts.overdue, 0);
    }

    /// Fails writes for one specific key; everything else passes through.
    struct FlakyStore {
        inner: MemoryStore,
        poison_key: String,
        failed_writes: Mutex<usize>,
    }

    impl KvStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, AppError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
            if key == self.poison_key {
                *self.failed_writes.lock().unwrap() += 1;
                return Err(AppError::storage_write("disk full"));
            }
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), AppError> {
            self.inner.delete(key)
        }

        fn list(&self, prefix: &str) -> Result<Vec<String>, AppError> {
            self.inner.list(prefix)
        }
    }

    #[test]
    fn tick_keeps_going_when_one_status_write_fails() {
        let created = datetime!(2026-03-01 08:00 UTC);
        let seed = MemoryStore::new();
        let (first_id, second_id) = {
            let mut seeder = AppState::new(&seed);
            let first = seeder
                .create_task(
                    input_between(
                        "one",
                        created + Duration::minutes(5),
                        created + Duration::minutes(10),
                    ),
                    created,
                )
                .unwrap();
            let second = seeder
                .create_task(
                    input_between(
                        "two",
                        created + Duration::minutes(5),
                        created + Duration::minutes(10),
                    ),
                    created,
                )
                .unwrap();
            (first.id, second.id)
        };

        let flaky = FlakyStore {
            inner: seed,
            poison_key: task_key(&first_id),
            failed_writes: Mutex::new(0),
        };
        let mut app = AppState::new(flaky);
        app.init(created);
        assert_eq!(app.tasks().len(), 2);

        app.tick(created + Duration::hours(1));

        // Both flipped in memory, both notified, the healthy one persisted.
        assert_eq!(app.get_task(&first_id).unwrap().status, TaskStatus::Overdue);
        assert_eq!(
            app.get_task(&second_id).unwrap().status,
            TaskStatus::Overdue
        );
        assert_eq!(app.notifications().len(), 2);
        assert_eq!(*app.repo.store().failed_writes.lock().unwrap(), 1);
        let stored = app
            .repo
            .store()
            .get(&task_key(&second_id))
            .unwrap()
            .unwrap();
        assert!(stored.contains("\"status\":\"overdue\""));
    }
}
