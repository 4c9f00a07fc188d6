pub mod json_store;
pub mod kv;

pub use json_store::JsonStore;
pub use kv::{KvStore, MemoryStore};

pub const PROFILE_KEY: &str = "user-profile";
pub const TASK_KEY_PREFIX: &str = "task:";
pub const THEME_KEY: &str = "theme";

pub fn task_key(task_id: &str) -> String {
    format!("{TASK_KEY_PREFIX}{task_id}")
}
