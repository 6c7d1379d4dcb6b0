use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use tracing::warn;

use crate::lockout::LockScreenPresenter;

/// Notification-backed blocking overlay.
///
/// Every poll tick with a locked app in the foreground re-presents the
/// notification, which keeps the prompt on screen for as long as the user
/// stays in the app.
pub struct NotifyPresenter;

impl LockScreenPresenter for NotifyPresenter {
    fn present(&self, unlock_deadline: DateTime<Utc>) {
        let until = unlock_deadline.with_timezone(&Local).format("%H:%M");
        let message = format!("This app is locked until {}. Stay focused.", until);
        if let Err(e) = send_notification("App locked", &message) {
            warn!("Failed to present lock screen: {:#}", e);
        }
    }
}

/// Send a system notification (platform-specific).
pub fn send_notification(title: &str, message: &str) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::process::Command;
        Command::new("notify-send")
            .arg(title)
            .arg(message)
            .arg("--urgency=critical")
            .arg("--icon=alarm-clock")
            .output()?;
    }

    #[cfg(target_os = "macos")]
    {
        use std::process::Command;
        let script = format!(
            "display notification \"{}\" with title \"{}\" sound name \"Glass\"",
            message, title
        );
        Command::new("osascript").arg("-e").arg(&script).output()?;
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        warn!("Notification: {} - {}", title, message);
    }

    Ok(())
}
