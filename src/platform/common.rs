use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Atomically write content to a file.
///
/// Writes to a temporary file in the same directory, syncs to disk, then
/// renames to the target path, so a crash mid-write never leaves a truncated
/// settings file behind.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp_path = path.with_extension("tmp");

    {
        let mut file = File::create(&temp_path).with_context(|| {
            format!("Failed to create temporary file: {}", temp_path.display())
        })?;

        file.write_all(content)
            .context("Failed to write to temporary file")?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}
