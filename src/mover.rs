use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub struct FileMover;

impl FileMover {
    /// Renames `source` to `destination`. Never overwrites an existing file.
    pub fn rename_file(source: &Path, destination: &Path) -> Result<PathBuf> {
        if !source.exists() {
            anyhow::bail!("Source file does not exist: {:?}", source);
        }

        if destination.exists() {
            anyhow::bail!("Destination already exists: {:?}", destination);
        }

        log::debug!("Renaming {:?} -> {:?}", source, destination);

        fs::rename(source, destination)
            .with_context(|| format!("Failed to rename {:?} to {:?}", source, destination))?;

        Ok(destination.to_path_buf())
    }

    /// Returns `path` if nothing is there, otherwise the first free
    /// `{stem}-{n}.{ext}` for n = 1, 2, ... Each candidate is checked on the filesystem so
    /// names taken earlier in the same run are seen.
    pub fn resolve_conflict(path: &Path) -> Result<PathBuf> {
        if !path.exists() {
            return Ok(path.to_path_buf());
        }

        let file_stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .context("Could not extract file stem")?;

        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let parent = path.parent().context("Could not get parent directory")?;

        let mut counter: u64 = 1;
        loop {
            let new_name = if extension.is_empty() {
                format!("{}-{}", file_stem, counter)
            } else {
                format!("{}-{}.{}", file_stem, counter, extension)
            };

            let new_path = parent.join(new_name);
            if !new_path.exists() {
                log::info!(
                    "Name already taken, using {:?}",
                    new_path.file_name().unwrap_or_default()
                );
                return Ok(new_path);
            }

            counter += 1;
        }
    }
}
