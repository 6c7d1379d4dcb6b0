use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::sync::Arc;

mod cli;
mod clock;
mod daemon;
mod lockout;
mod platform;
mod schedule;
mod settings;
mod wakeup;

use cli::{AppsCommands, Args, Commands};
use settings::{FileSettingsStore, SettingsStore};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let store = match &args.settings {
        Some(path) => FileSettingsStore::new(path.clone()),
        None => FileSettingsStore::at_default_path()?,
    };
    let store = Arc::new(store);

    match args.command {
        Commands::Start => cmd_start(store),
        Commands::Status => cmd_status(store.as_ref()),
        Commands::Enable => cmd_set_enabled(store.as_ref(), true),
        Commands::Disable => cmd_set_enabled(store.as_ref(), false),
        Commands::Set {
            hour,
            minute,
            duration,
            nightly,
            nightly_hour,
            nightly_minute,
        } => cmd_set(
            store.as_ref(),
            hour,
            minute,
            duration,
            nightly,
            nightly_hour,
            nightly_minute,
        ),
        Commands::Apps { command } => cmd_apps(store.as_ref(), command),
    }
}

/// Initialize logging
fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

/// Run the daemon in the foreground
fn cmd_start(store: Arc<FileSettingsStore>) -> Result<()> {
    println!("Starting wakeguard in foreground mode...");
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(daemon::run_daemon(store))
}

/// Show current settings and computed schedule
fn cmd_status(store: &dyn SettingsStore) -> Result<()> {
    let settings = store.read()?;

    println!("Wakeguard Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "Alarm:            {} at {:02}:{:02}",
        if settings.enabled { "enabled" } else { "disabled" },
        settings.alarm_hour,
        settings.alarm_minute
    );
    println!(
        "Lockout duration: {} minutes",
        settings.lockout_duration_minutes
    );
    println!(
        "Nightly lockout:  {} at {:02}:{:02}",
        if settings.nightly_enabled {
            "enabled"
        } else {
            "disabled"
        },
        settings.nightly_hour,
        settings.nightly_minute
    );
    println!("Locked apps:      {}", settings.locked_packages.len());

    if settings.enabled {
        let now = Local::now();
        let morning = schedule::next_fire_time(&now, settings.alarm_hour, settings.alarm_minute);
        println!();
        println!("Next morning fire: {}", morning.format("%Y-%m-%d %H:%M"));
        if settings.nightly_enabled {
            let nightly =
                schedule::next_fire_time(&now, settings.nightly_hour, settings.nightly_minute);
            println!("Next nightly fire: {}", nightly.format("%Y-%m-%d %H:%M"));
        }
    }

    println!();
    println!("Permissions:");
    println!("  Exact scheduling: ✓ (in-process timers)");
    if platform::foreground::has_usage_query_capability() {
        println!("  Foreground query: ✓");
    } else {
        println!("  Foreground query: ✗ (lockouts will not block anything)");
    }

    if !store.onboarding_done()? {
        println!();
        println!("Setup incomplete: run 'wakeguard set' to configure the alarm.");
    }

    Ok(())
}

/// Toggle the persisted enabled flag
fn cmd_set_enabled(store: &dyn SettingsStore, enabled: bool) -> Result<()> {
    let mut settings = store.read()?;
    settings.enabled = enabled;
    store.write(&settings).context("Failed to save settings")?;

    if enabled {
        let morning = schedule::next_fire_time(
            &Local::now(),
            settings.alarm_hour,
            settings.alarm_minute,
        );
        println!("✓ Alarm enabled, next fire {}", morning.format("%Y-%m-%d %H:%M"));
    } else {
        println!("✓ Alarm disabled");
    }
    println!("A running daemon picks this up at its next fire; restart it to apply now.");

    Ok(())
}

/// Update alarm and lockout settings
fn cmd_set(
    store: &dyn SettingsStore,
    hour: Option<u32>,
    minute: Option<u32>,
    duration: Option<u32>,
    nightly: Option<bool>,
    nightly_hour: Option<u32>,
    nightly_minute: Option<u32>,
) -> Result<()> {
    let mut settings = store.read()?;

    apply_setting(&mut settings.alarm_hour, hour);
    apply_setting(&mut settings.alarm_minute, minute);
    apply_setting(&mut settings.lockout_duration_minutes, duration);
    apply_setting(&mut settings.nightly_enabled, nightly);
    apply_setting(&mut settings.nightly_hour, nightly_hour);
    apply_setting(&mut settings.nightly_minute, nightly_minute);

    store.write(&settings).context("Failed to save settings")?;
    store.mark_onboarding_done()?;

    println!(
        "✓ Alarm set to {:02}:{:02}, {} minute lockout",
        settings.alarm_hour, settings.alarm_minute, settings.lockout_duration_minutes
    );
    if settings.nightly_enabled {
        println!(
            "✓ Nightly lockout at {:02}:{:02}",
            settings.nightly_hour, settings.nightly_minute
        );
    }

    Ok(())
}

fn apply_setting<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Manage the locked application list
fn cmd_apps(store: &dyn SettingsStore, command: AppsCommands) -> Result<()> {
    let mut settings = store.read()?;

    match command {
        AppsCommands::Add { package } => {
            if settings.locked_packages.insert(package.clone()) {
                store.write(&settings).context("Failed to save settings")?;
                println!("✓ Added {}", package);
            } else {
                println!("{} is already locked", package);
            }
        }
        AppsCommands::Remove { package } => {
            if settings.locked_packages.remove(&package) {
                store.write(&settings).context("Failed to save settings")?;
                println!("✓ Removed {}", package);
            } else {
                println!("{} was not locked", package);
            }
        }
        AppsCommands::List => {
            if settings.locked_packages.is_empty() {
                println!("No locked apps configured");
            } else {
                for package in &settings.locked_packages {
                    println!("{}", package);
                }
            }
        }
    }

    Ok(())
}
