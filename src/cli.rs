use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Morning Focus Alarm
///
/// Schedules a daily morning alarm (and an optional nightly pre-lockout) and
/// enforces a timed block on selected applications while the lockout runs.
#[derive(Parser, Debug)]
#[command(name = "wakeguard")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the settings file (defaults to the per-user data directory)
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the alarm and lockout daemon in the foreground
    Start,
    /// Show settings, permissions, and the next computed fire times
    Status,
    /// Enable the daily alarm
    Enable,
    /// Disable the daily alarm
    Disable,
    /// Update alarm and lockout settings
    Set {
        /// Morning alarm hour (0-23)
        #[arg(long)]
        hour: Option<u32>,

        /// Morning alarm minute (0-59)
        #[arg(long)]
        minute: Option<u32>,

        /// Lockout duration in minutes
        #[arg(long)]
        duration: Option<u32>,

        /// Enable or disable the nightly pre-lockout
        #[arg(long)]
        nightly: Option<bool>,

        /// Nightly lockout hour (0-23)
        #[arg(long)]
        nightly_hour: Option<u32>,

        /// Nightly lockout minute (0-59)
        #[arg(long)]
        nightly_minute: Option<u32>,
    },
    /// Manage the locked application list
    Apps {
        #[command(subcommand)]
        command: AppsCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum AppsCommands {
    /// Add an application identifier to the locked set
    Add { package: String },
    /// Remove an application identifier from the locked set
    Remove { package: String },
    /// List locked application identifiers
    List,
}
