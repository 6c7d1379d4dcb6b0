use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::lockout::UsageQuery;

/// Foreground-application identity from the desktop session.
///
/// The desktop is queried live at sample time, so the trailing window the
/// monitor passes is not needed here; fakes in tests use it to model
/// recent-usage semantics. Platforms without a supported query report no
/// foreground app, which the monitor treats as nothing to block.
pub struct SystemUsageQuery;

impl UsageQuery for SystemUsageQuery {
    fn most_recent_foreground_app(
        &self,
        _window_start: DateTime<Utc>,
        _window_end: DateTime<Utc>,
    ) -> Result<Option<String>> {
        current_foreground_app()
    }
}

/// Whether this platform can answer foreground-app queries at all.
///
/// Surfaced through `status` so an incomplete setup is visible instead of
/// silently never blocking anything.
pub fn has_usage_query_capability() -> bool {
    #[cfg(target_os = "linux")]
    {
        use std::process::Command;
        Command::new("xdotool")
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    #[cfg(target_os = "macos")]
    {
        true
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        false
    }
}

#[cfg(target_os = "linux")]
fn current_foreground_app() -> Result<Option<String>> {
    use anyhow::Context;
    use std::process::Command;

    let output = Command::new("xdotool")
        .args(["getactivewindow", "getwindowclassname"])
        .output()
        .context("Failed to run xdotool")?;

    // No active window (or no X session) is a normal empty sample
    if !output.status.success() {
        return Ok(None);
    }

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!name.is_empty()).then_some(name))
}

#[cfg(target_os = "macos")]
fn current_foreground_app() -> Result<Option<String>> {
    use anyhow::Context;
    use std::process::Command;

    let script = r#"tell application "System Events" to get bundle identifier of first process whose frontmost is true"#;
    let output = Command::new("osascript")
        .arg("-e")
        .arg(script)
        .output()
        .context("Failed to run osascript")?;

    if !output.status.success() {
        return Ok(None);
    }

    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok((!name.is_empty()).then_some(name))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn current_foreground_app() -> Result<Option<String>> {
    Ok(None)
}
