/// Platform-specific collaborators
///
/// Desktop integrations the engine consumes through its traits: the
/// foreground-application query, notification-based lock presentation, and
/// filesystem helpers. All of them are best effort; missing helpers degrade
/// to "nothing known / nothing shown" rather than erroring.

pub mod common;
pub mod foreground;
pub mod notify;
