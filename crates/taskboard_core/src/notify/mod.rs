use crate::error::AppError;
use crate::model::Notification;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
pub use linux::LinuxNotifier;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
pub use windows::WindowsNotifier;

/// Bridge that surfaces a derived notification outside the app, e.g. as
/// a desktop toast while `watch` is running.
pub trait Notifier: Send {
    fn notify(&self, notification: &Notification) -> Result<(), AppError>;
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), AppError> {
        Ok(())
    }
}

pub fn notifier_from_env() -> Box<dyn Notifier> {
    if std::env::var("TASKBOARD_DISABLE_NOTIFICATIONS").is_ok() {
        return Box::new(NoopNotifier);
    }

    platform_notifier()
}

#[cfg(target_os = "linux")]
fn platform_notifier() -> Box<dyn Notifier> {
    Box::new(LinuxNotifier)
}

#[cfg(windows)]
fn platform_notifier() -> Box<dyn Notifier> {
    Box::new(WindowsNotifier)
}

#[cfg(not(any(target_os = "linux", windows)))]
fn platform_notifier() -> Box<dyn Notifier> {
    Box::new(NoopNotifier)
}
