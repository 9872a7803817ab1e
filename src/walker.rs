use crate::detector::ScreenshotDetector;
use crate::utils::file::is_hidden_file;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use walkdir::{DirEntry, WalkDir};

/// Recursively collects legacy-named screenshots under a directory
pub struct ScreenshotWalker {
    root: PathBuf,
}

impl ScreenshotWalker {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Paths of every file whose name matches the legacy pattern, in sorted
    /// order. Names with an impossible date are included so the pipeline can
    /// report them.
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            anyhow::bail!("Not a directory: {:?}", self.root);
        }

        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("Failed to resolve {:?}", self.root))?;

        info!("Scanning {:?}", root);

        let mut found = Vec::new();
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden_file(entry.path()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if Self::is_candidate(&entry) {
                debug!("Found {:?}", entry.path());
                found.push(entry.into_path());
            }
        }

        Ok(found)
    }

    fn is_candidate(entry: &DirEntry) -> bool {
        entry.file_type().is_file() && ScreenshotDetector::matches_legacy_name(entry.path())
    }
}
