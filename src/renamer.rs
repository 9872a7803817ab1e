use crate::detector::{Candidate, ScreenshotDetector};
use crate::error::SkipReason;
use crate::mover::FileMover;
use crate::provider::DescriptionProvider;
use crate::synthesizer;
use crate::utils::file::display_name;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// How far a file got through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovered,
    Described,
    Synthesized,
    Resolved,
    Renamed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovered => "discovered",
            Stage::Described => "described",
            Stage::Synthesized => "synthesized",
            Stage::Resolved => "resolved",
            Stage::Renamed => "renamed",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum FileOutcome {
    Renamed {
        from: PathBuf,
        to: PathBuf,
    },
    /// Only produced in dry-run mode
    WouldRename {
        from: PathBuf,
        to: PathBuf,
    },
    Skipped {
        path: PathBuf,
        /// Last stage the file reached
        stage: Stage,
        reason: SkipReason,
    },
}

impl FileOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            FileOutcome::Renamed { .. } => Stage::Renamed,
            FileOutcome::WouldRename { .. } => Stage::Resolved,
            FileOutcome::Skipped { stage, .. } => *stage,
        }
    }

    fn skipped(path: &Path, stage: Stage, reason: SkipReason) -> Self {
        FileOutcome::Skipped {
            path: path.to_path_buf(),
            stage,
            reason,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub found: usize,
    pub renamed: usize,
    /// Dry-run only; nothing on disk changed for these
    pub would_rename: usize,
    pub skipped: usize,
}

pub struct ScreenshotRenamer {
    provider: Box<dyn DescriptionProvider>,
    dry_run: bool,
}

impl ScreenshotRenamer {
    pub fn new(provider: Box<dyn DescriptionProvider>, dry_run: bool) -> Self {
        Self { provider, dry_run }
    }

    /// Runs every file through the pipeline, one at a time. Never stops early.
    /// Once the provider is found to be unavailable, later files are skipped
    /// without calling it again.
    pub fn run(&self, files: &[PathBuf]) -> BatchSummary {
        let total = files.len();
        let mut summary = BatchSummary {
            found: total,
            ..BatchSummary::default()
        };

        log::info!("Found {} file(s) to process", total);
        if total == 0 {
            return summary;
        }

        let mut unavailable = match self.provider.check_available() {
            Ok(()) => None,
            Err(e) => {
                log::error!("Provider '{}' is unavailable: {}", self.provider.name(), e);
                Some(e.to_string())
            }
        };

        for (idx, path) in files.iter().enumerate() {
            log::info!("Processing ({}/{}): {}", idx + 1, total, display_name(path));

            let outcome = self.process(path, &mut unavailable);

            Self::report(&outcome);
            log::debug!("Final stage: {}", outcome.stage());
            match outcome {
                FileOutcome::Renamed { .. } => summary.renamed += 1,
                FileOutcome::WouldRename { .. } => summary.would_rename += 1,
                FileOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }

        summary
    }

    /// Carries a single file from discovery to rename
    pub fn rename_file(&self, path: &Path) -> FileOutcome {
        self.process(path, &mut None)
    }

    /// `unavailable` holds the reason the provider was given up on, if it
    /// has been; it is set here the first time a call shows the provider
    /// cannot be reached.
    fn process(&self, path: &Path, unavailable: &mut Option<String>) -> FileOutcome {
        let candidate = match ScreenshotDetector::detect(path) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                return FileOutcome::skipped(path, Stage::Discovered, SkipReason::NotEligible)
            }
            Err(e) => {
                let reason = SkipReason::InvalidDate(e.to_string());
                return FileOutcome::skipped(path, Stage::Discovered, reason);
            }
        };

        if let Some(message) = unavailable.as_ref() {
            let reason = SkipReason::ProviderUnavailable(message.clone());
            return FileOutcome::skipped(path, Stage::Discovered, reason);
        }

        let description = match self.describe(&candidate) {
            Ok(description) => description,
            Err(reason) => {
                if let SkipReason::ProviderUnavailable(message) = &reason {
                    log::error!(
                        "Provider '{}' is unavailable, skipping remaining files: {}",
                        self.provider.name(),
                        message
                    );
                    *unavailable = Some(message.clone());
                }
                return FileOutcome::skipped(path, Stage::Discovered, reason);
            }
        };

        let Some(file_name) = synthesizer::synthesize(&candidate.date, &description) else {
            let reason = SkipReason::EmptyName(description);
            return FileOutcome::skipped(path, Stage::Described, reason);
        };

        let Some(parent) = path.parent() else {
            return FileOutcome::skipped(
                path,
                Stage::Synthesized,
                SkipReason::RenameFailed("file has no parent directory".to_string()),
            );
        };

        let target = match FileMover::resolve_conflict(&parent.join(&file_name)) {
            Ok(target) => target,
            Err(e) => {
                let reason = SkipReason::RenameFailed(format!("{:#}", e));
                return FileOutcome::skipped(path, Stage::Synthesized, reason);
            }
        };

        if self.dry_run {
            return FileOutcome::WouldRename {
                from: path.to_path_buf(),
                to: target,
            };
        }

        match FileMover::rename_file(path, &target) {
            Ok(to) => FileOutcome::Renamed {
                from: path.to_path_buf(),
                to,
            },
            Err(e) => {
                let reason = SkipReason::RenameFailed(format!("{:#}", e));
                FileOutcome::skipped(path, Stage::Resolved, reason)
            }
        }
    }

    fn describe(&self, candidate: &Candidate) -> Result<String, SkipReason> {
        log::debug!("Date {} -> {}", candidate.raw_timestamp, candidate.date);
        let image =
            fs::read(&candidate.path).map_err(|e| SkipReason::Unreadable(e.to_string()))?;

        let description = self.provider.describe(&image).map_err(|e| {
            if e.is_unavailable() {
                SkipReason::ProviderUnavailable(e.to_string())
            } else {
                SkipReason::NoDescription(e.to_string())
            }
        })?;

        log::debug!("Description for {}: {:?}", display_name(&candidate.path), description);
        Ok(description)
    }

    fn report(outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Renamed { from, to } => {
                log::info!("  -> Renamed {} to: {}", display_name(from), display_name(to));
            }
            FileOutcome::WouldRename { from, to } => {
                log::info!("  -> Would rename {} to: {}", display_name(from), display_name(to));
            }
            FileOutcome::Skipped { path, stage, reason } => {
                log::warn!("  -> Skipped {} after {}: {}", display_name(path), stage, reason);
            }
        }
    }
}
