use crate::error::AppError;
use crate::model::{Task, TaskStatus, parse_instant};
use crate::storage::kv::KvStore;
use crate::storage::{TASK_KEY_PREFIX, task_key};
use log::{debug, warn};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub reminder_minutes: u32,
}

/// Owns the in-memory task collection; the store owns the serialized
/// form. All durable writes go through here.
pub struct TaskRepository<S: KvStore> {
    store: S,
    tasks: Vec<Task>,
}

impl<S: KvStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            tasks: Vec::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Loads every record under the task namespace. A record that cannot
    /// be fetched or deserialized is dropped so the rest of the
    /// collection still loads; a failed key listing degrades to an empty
    /// collection. Returns the number of tasks loaded.
    pub fn load_all(&mut self) -> usize {
        let keys = match self.store.list(TASK_KEY_PREFIX) {
            Ok(keys) => keys,
            Err(err) => {
                warn!("task listing failed, starting empty: {err}");
                self.tasks = Vec::new();
                return 0;
            }
        };

        let mut tasks = Vec::with_capacity(keys.len());
        for key in keys {
            let value = match self.store.get(&key) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(err) => {
                    warn!("dropping {key}: {err}");
                    continue;
                }
            };

            match serde_json::from_str::<Task>(&value) {
                Ok(task) => tasks.push(task),
                Err(err) => warn!("dropping {key}: {err}"),
            }
        }

        debug!("loaded {} tasks", tasks.len());
        self.tasks = tasks;
        self.tasks.len()
    }

    /// Validates the input, persists the new record and appends it to
    /// the collection. Nothing is stored when validation fails.
    pub fn create(&mut self, input: NewTask, now: OffsetDateTime) -> Result<Task, AppError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("title is required"));
        }

        let start = parse_instant(&input.start_date, "startDate")?;
        let end = parse_instant(&input.end_date, "endDate")?;
        if end <= start {
            return Err(AppError::validation("endDate must be after startDate"));
        }

        let created_at = now
            .format(&Rfc3339)
            .map_err(|err| AppError::validation(err.to_string()))?;
        let description = input
            .description
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let task = Task {
            id: generate_id(now),
            title: title.to_string(),
            description,
            start_date: input.start_date.trim().to_string(),
            end_date: input.end_date.trim().to_string(),
            reminder_minutes: input.reminder_minutes,
            status: TaskStatus::Todo,
            created_at,
        };

        self.save(&task)?;
        self.tasks.push(task.clone());

        Ok(task)
    }

    pub fn save(&self, task: &Task) -> Result<(), AppError> {
        let value = serde_json::to_string(task)
            .map_err(|err| AppError::storage_write(err.to_string()))?;
        self.store.set(&task_key(&task.id), &value)
    }

    /// Removes the stored record and the in-memory entry. A failed store
    /// delete propagates and leaves the collection unchanged; an unknown
    /// id is a no-op.
    pub fn delete(&mut self, id: &str) -> Result<(), AppError> {
        self.store.delete(&task_key(id))?;
        self.tasks.retain(|task| task.id != id);
        Ok(())
    }

    /// Persists a status change for one task. Transition legality is the
    /// lifecycle engine's concern; this only mutates and stores.
    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> Result<Task, AppError> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::validation("task not found"))?;

        let previous = self.tasks[index].status;
        self.tasks[index].status = status;
        if let Err(err) = self.save(&self.tasks[index]) {
            self.tasks[index].status = previous;
            return Err(err);
        }

        Ok(self.tasks[index].clone())
    }
}

fn generate_id(now: OffsetDateTime) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("task-{}-{}", now.unix_timestamp(), &suffix[..8])
}
