use crate::error::AppError;
use crate::model::Notification;
use crate::notify::Notifier;
use notify_rust::Notification as Toast;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), AppError> {
        Toast::new()
            .summary(&notification.title)
            .body(&notification.message)
            .show()
            .map_err(|err| AppError::io(err.to_string()))
            .map(|_| ())
    }
}
