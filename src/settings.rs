use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
#[cfg(test)]
use std::sync::Mutex;

/// Alarm and lockout settings.
///
/// This is the value the rest of the engine consumes as an immutable snapshot:
/// a session takes its copy of `locked_packages` at start, and later writes to
/// the store do not retroactively affect it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct AlarmSettings {
    /// Whether the daily alarm (and with it the lockout) is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Morning alarm wall-clock hour (0-23)
    #[serde(default = "default_alarm_hour")]
    pub alarm_hour: u32,

    /// Morning alarm wall-clock minute (0-59)
    #[serde(default)]
    pub alarm_minute: u32,

    /// How long apps stay locked after the morning alarm fires
    #[serde(default = "default_lockout_duration")]
    pub lockout_duration_minutes: u32,

    /// Whether the nightly pre-lockout is enabled
    #[serde(default)]
    pub nightly_enabled: bool,

    /// Nightly lockout wall-clock hour (0-23)
    #[serde(default = "default_nightly_hour")]
    pub nightly_hour: u32,

    /// Nightly lockout wall-clock minute (0-59)
    #[serde(default)]
    pub nightly_minute: u32,

    /// Application identifiers blocked during a lockout session
    #[serde(default)]
    pub locked_packages: BTreeSet<String>,
}

fn default_alarm_hour() -> u32 {
    7
}

fn default_lockout_duration() -> u32 {
    30
}

fn default_nightly_hour() -> u32 {
    22
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            alarm_hour: default_alarm_hour(),
            alarm_minute: 0,
            lockout_duration_minutes: default_lockout_duration(),
            nightly_enabled: false,
            nightly_hour: default_nightly_hour(),
            nightly_minute: 0,
            locked_packages: BTreeSet::new(),
        }
    }
}

/// Validate settings at the write boundary.
///
/// The engine's computations assume in-range values; anything invalid is
/// rejected here and never reaches a fire-time or deadline calculation.
pub fn validate_settings(settings: &AlarmSettings) -> Result<()> {
    if settings.alarm_hour > 23 {
        anyhow::bail!("Alarm hour must be 0-23, got {}", settings.alarm_hour);
    }
    if settings.alarm_minute > 59 {
        anyhow::bail!("Alarm minute must be 0-59, got {}", settings.alarm_minute);
    }
    if settings.nightly_hour > 23 {
        anyhow::bail!("Nightly hour must be 0-23, got {}", settings.nightly_hour);
    }
    if settings.nightly_minute > 59 {
        anyhow::bail!("Nightly minute must be 0-59, got {}", settings.nightly_minute);
    }
    if settings.lockout_duration_minutes == 0 {
        anyhow::bail!("Lockout duration must be at least one minute");
    }
    for package in &settings.locked_packages {
        if package.trim().is_empty() {
            anyhow::bail!("Locked package identifiers cannot be empty");
        }
    }
    Ok(())
}

/// Persistent store for the settings snapshot and the onboarding flag.
pub trait SettingsStore: Send + Sync {
    /// Read the latest persisted snapshot (defaults when nothing is stored).
    fn read(&self) -> Result<AlarmSettings>;

    /// Validate and persist a new snapshot.
    fn write(&self, settings: &AlarmSettings) -> Result<()>;

    fn onboarding_done(&self) -> Result<bool>;

    fn mark_onboarding_done(&self) -> Result<()>;
}

/// On-disk document wrapping the settings with the onboarding flag.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct StoredDocument {
    #[serde(default)]
    onboarding_done: bool,
    #[serde(default)]
    settings: AlarmSettings,
}

/// File-backed settings store (JSON, written atomically).
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the per-user default location.
    pub fn at_default_path() -> Result<Self> {
        Ok(Self::new(default_settings_path()?))
    }

    fn load(&self) -> Result<StoredDocument> {
        if !self.path.exists() {
            return Ok(StoredDocument::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings file: {}", self.path.display()))?;

        let document: StoredDocument = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", self.path.display()))?;

        Ok(document)
    }

    fn save(&self, document: &StoredDocument) -> Result<()> {
        let content =
            serde_json::to_string_pretty(document).context("Failed to serialize settings")?;

        crate::platform::common::atomic_write(&self.path, content.as_bytes())
            .with_context(|| format!("Failed to write settings file: {}", self.path.display()))?;

        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn read(&self) -> Result<AlarmSettings> {
        Ok(self.load()?.settings)
    }

    fn write(&self, settings: &AlarmSettings) -> Result<()> {
        validate_settings(settings)?;

        let mut document = self.load()?;
        document.settings = settings.clone();
        self.save(&document)
    }

    fn onboarding_done(&self) -> Result<bool> {
        Ok(self.load()?.onboarding_done)
    }

    fn mark_onboarding_done(&self) -> Result<()> {
        let mut document = self.load()?;
        document.onboarding_done = true;
        self.save(&document)
    }
}

/// Get the per-user settings file path.
pub fn default_settings_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "wakeguard")
        .context("Failed to determine user data directory")?;
    Ok(dirs.data_dir().join("settings.json"))
}

/// In-memory settings store, used by tests and shared test doubles.
#[cfg(test)]
pub struct MemorySettingsStore {
    inner: Mutex<StoredDocument>,
}

#[cfg(test)]
impl MemorySettingsStore {
    pub fn new(settings: AlarmSettings) -> Self {
        Self {
            inner: Mutex::new(StoredDocument {
                onboarding_done: false,
                settings,
            }),
        }
    }
}

#[cfg(test)]
impl SettingsStore for MemorySettingsStore {
    fn read(&self) -> Result<AlarmSettings> {
        Ok(self.inner.lock().expect("store poisoned").settings.clone())
    }

    fn write(&self, settings: &AlarmSettings) -> Result<()> {
        validate_settings(settings)?;
        self.inner.lock().expect("store poisoned").settings = settings.clone();
        Ok(())
    }

    fn onboarding_done(&self) -> Result<bool> {
        Ok(self.inner.lock().expect("store poisoned").onboarding_done)
    }

    fn mark_onboarding_done(&self) -> Result<()> {
        self.inner.lock().expect("store poisoned").onboarding_done = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_first_run() {
        let settings = AlarmSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.alarm_hour, 7);
        assert_eq!(settings.alarm_minute, 0);
        assert_eq!(settings.lockout_duration_minutes, 30);
        assert!(!settings.nightly_enabled);
        assert_eq!(settings.nightly_hour, 22);
        assert!(settings.locked_packages.is_empty());
    }

    #[test]
    fn test_validate_rejects_out_of_range_hour() {
        let settings = AlarmSettings {
            alarm_hour: 24,
            ..Default::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_minute() {
        let settings = AlarmSettings {
            nightly_minute: 60,
            ..Default::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_duration() {
        let settings = AlarmSettings {
            lockout_duration_minutes: 0,
            ..Default::default()
        };
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_package() {
        let mut settings = AlarmSettings::default();
        settings.locked_packages.insert("  ".to_string());
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.json"));

        // Missing file reads as defaults
        assert_eq!(store.read().unwrap(), AlarmSettings::default());

        let mut settings = AlarmSettings {
            enabled: true,
            alarm_hour: 6,
            alarm_minute: 45,
            ..Default::default()
        };
        settings.locked_packages.insert("com.example.feed".to_string());

        store.write(&settings).unwrap();
        assert_eq!(store.read().unwrap(), settings);
    }

    #[test]
    fn test_file_store_rejects_invalid_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.json"));

        let settings = AlarmSettings {
            alarm_hour: 99,
            ..Default::default()
        };
        assert!(store.write(&settings).is_err());
        assert!(!dir.path().join("settings.json").exists());
    }

    #[test]
    fn test_onboarding_flag_survives_settings_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.json"));

        assert!(!store.onboarding_done().unwrap());
        store.mark_onboarding_done().unwrap();
        assert!(store.onboarding_done().unwrap());

        store.write(&AlarmSettings::default()).unwrap();
        assert!(store.onboarding_done().unwrap());
    }
}
