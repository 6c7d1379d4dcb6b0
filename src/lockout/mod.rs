/// Lockout enforcement
///
/// This module provides functionality to:
/// - Compute the unlock deadline for a triggered lockout window
/// - Poll foreground-application identity against the locked set
/// - Drive one lockout session end-to-end with guaranteed termination

pub mod monitor;
pub mod session;
pub mod window;

pub use monitor::UsageQuery;
pub use session::{LockScreenPresenter, LockoutSessionManager};
pub use window::TriggerKind;
