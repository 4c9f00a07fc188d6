use crate::error::AppError;
use crate::model::Notification;
use crate::notify::Notifier;
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), AppError> {
        Toast::new(Toast::POWERSHELL_APP_ID)
            .title("taskboard")
            .text1(&notification.title)
            .text2(&notification.message)
            .show()
            .map_err(|err| AppError::io(err.to_string()))
    }
}
