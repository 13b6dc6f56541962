//! Round-robin distribution into numbered subfolders, with rollback, plus
//! the reverse merge and the restored-file-list mover.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::normalize::normalize;
use crate::resolve::resolve_collision_free;
use crate::{
    is_directory_empty, list_immediate_directories, list_immediate_files, move_file, path_to_filename_string,
};

/// Progress callback invoked with `(processed, total)` after each item.
pub type ProgressCallback<'a> = &'a dyn Fn(usize, usize);

/// Lines in a restored-file list starting with this are skipped.
const SKIP_SENTINEL: char = '?';

/// Snapshot of one distribution: the root, its immediate files at plan time
/// and the subdivision count.
#[derive(Debug, Clone)]
pub struct DistributionPlan {
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    pub subdivisions: usize,
}

/// One committed move, the unit of rollback.
#[derive(Debug)]
struct MoveRecord {
    original: PathBuf,
    new: PathBuf,
}

/// Terminal state of one distribute invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributeOutcome {
    /// Every file was moved into its numbered subfolder.
    Completed { moved: usize },
    /// A move failed and the already-moved files were put back.
    RolledBack {
        reason: String,
        restored: usize,
        failed_restores: usize,
    },
}

/// Result of merging subfolder contents back into the root.
#[derive(Debug, Default, Clone)]
pub struct MergeSummary {
    /// Files moved into the root.
    pub moved: usize,
    /// Emptied subdirectories that were removed.
    pub removed_dirs: usize,
    /// Files that could not be moved. Merge is resumable, so these stay put.
    pub failed: usize,
}

impl DistributionPlan {
    /// Snapshot the immediate files of `root` for distribution into
    /// `subdivisions` numbered subfolders.
    ///
    /// # Errors
    /// Returns an error when `subdivisions` is zero, the root cannot be read,
    /// or the root holds no files.
    pub fn new(root: &Path, subdivisions: usize) -> Result<Self> {
        anyhow::ensure!(subdivisions >= 1, "Subdivision count must be at least 1");
        let files = list_immediate_files(root)?;
        anyhow::ensure!(!files.is_empty(), "No files to distribute in '{}'", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            files,
            subdivisions,
        })
    }

    /// Pure view of the round-robin assignment: `(subfolder number, file)`
    /// pairs in input order. File `i` goes to subfolder `(i % n) + 1`.
    pub fn assignments(&self) -> impl Iterator<Item = (usize, &PathBuf)> {
        self.files
            .iter()
            .enumerate()
            .map(|(index, file)| (index % self.subdivisions + 1, file))
    }
}

/// Move every file in the plan to its numbered subfolder.
///
/// Subfolders are created lazily on first use. If any move fails, all moves
/// already made are reversed and the created subfolders that are left empty
/// are removed; the outcome is then [`DistributeOutcome::RolledBack`].
///
/// # Errors
/// Only for conditions detected before any file is touched. A mid-run move
/// failure is reported through the outcome, not as an error.
pub fn distribute(plan: &DistributionPlan, progress: Option<ProgressCallback>) -> Result<DistributeOutcome> {
    let total = plan.files.len();
    let mut moves: Vec<MoveRecord> = Vec::with_capacity(total);
    let mut created_dirs: Vec<PathBuf> = Vec::new();

    for (index, (subfolder_number, file)) in plan.assignments().enumerate() {
        let subfolder = plan.root.join(subfolder_number.to_string());
        if !subfolder.exists() {
            if let Err(error) = fs::create_dir(&subfolder) {
                let reason = format!("Failed to create '{}': {error}", subfolder.display());
                return Ok(roll_back(&moves, &created_dirs, reason));
            }
            created_dirs.push(subfolder.clone());
        }

        let target = resolve_collision_free(&subfolder, &path_to_filename_string(file));
        if let Err(error) = move_file(file, &target) {
            let reason = format!("Failed to move '{}': {error}", file.display());
            return Ok(roll_back(&moves, &created_dirs, reason));
        }
        moves.push(MoveRecord {
            original: file.clone(),
            new: target,
        });

        if let Some(callback) = progress {
            callback(index + 1, total);
        }
    }

    Ok(DistributeOutcome::Completed { moved: moves.len() })
}

/// Reverse already-committed moves and prune created-and-empty directories.
///
/// Best effort: a failing reversal is logged and skipped, the rest of the
/// rollback continues.
fn roll_back(moves: &[MoveRecord], created_dirs: &[PathBuf], reason: String) -> DistributeOutcome {
    let mut restored = 0;
    let mut failed_restores = 0;

    for record in moves.iter().rev() {
        // Restore overwrites whatever has appeared at the original path.
        if record.original.exists() {
            let _ = fs::remove_file(&record.original);
        }
        match move_file(&record.new, &record.original) {
            Ok(()) => restored += 1,
            Err(error) => {
                crate::print_error!("Rollback failed for '{}': {error}", record.new.display());
                failed_restores += 1;
            }
        }
    }

    // Directories that gained unrelated content in the meantime stay.
    for dir in created_dirs.iter().rev() {
        if is_directory_empty(dir) && fs::remove_dir(dir).is_err() {
            crate::print_error!("Rollback could not remove '{}'", dir.display());
        }
    }

    DistributeOutcome::RolledBack {
        reason,
        restored,
        failed_restores,
    }
}

/// Move the immediate files of every immediate subdirectory of `root` into
/// `root`, removing each subdirectory that is left empty.
///
/// Not transactional: an interrupted merge leaves a partially merged tree
/// that a second run completes.
///
/// # Errors
/// Returns an error when `root` cannot be read.
pub fn merge(root: &Path, progress: Option<ProgressCallback>) -> Result<MergeSummary> {
    let subdirs = list_immediate_directories(root)?;
    let contents = subdirs
        .iter()
        .map(|subdir| Ok((subdir, list_immediate_files(subdir)?)))
        .collect::<Result<Vec<_>>>()?;
    let total: usize = contents.iter().map(|(_, files)| files.len()).sum();

    let mut summary = MergeSummary::default();
    let mut processed = 0;

    for (subdir, files) in contents {
        for file in files {
            let target = resolve_collision_free(root, &path_to_filename_string(&file));
            match move_file(&file, &target) {
                Ok(()) => summary.moved += 1,
                Err(error) => {
                    crate::print_error!("Failed to move '{}': {error}", file.display());
                    summary.failed += 1;
                }
            }

            processed += 1;
            if let Some(callback) = progress {
                callback(processed, total);
            }
        }

        if is_directory_empty(subdir) {
            match fs::remove_dir(subdir) {
                Ok(()) => summary.removed_dirs += 1,
                Err(error) => crate::print_error!("Failed to remove '{}': {error}", subdir.display()),
            }
        }
    }

    Ok(summary)
}

/// Parse a restored-file list: one absolute path per line.
///
/// The first line may carry a UTF-8 BOM. Blank lines and lines starting with
/// `?` are skipped.
///
/// # Errors
/// Returns an error when the list file cannot be read.
pub fn read_restored_list(list_path: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(list_path)
        .with_context(|| format!("Failed to read file list: '{}'", list_path.display()))?;

    let paths = content
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(SKIP_SENTINEL))
        .map(PathBuf::from)
        .collect();

    Ok(paths)
}

/// File each listed path into `destination_root/<normalized name>/`.
///
/// Entries that no longer exist are noted and skipped. Returns the number of
/// files moved.
///
/// # Errors
/// Returns an error when a destination subdirectory cannot be created.
pub fn move_from_list(entries: &[PathBuf], destination_root: &Path, progress: Option<ProgressCallback>) -> Result<usize> {
    let total = entries.len();
    let mut moved = 0;

    for (index, entry) in entries.iter().enumerate() {
        if !entry.is_file() {
            crate::print_warning!("Skipping missing file: '{}'", entry.display());
        } else {
            let name = path_to_filename_string(entry);
            let subdir = destination_root.join(normalize(&name));
            fs::create_dir_all(&subdir)
                .with_context(|| format!("Failed to create directory: '{}'", subdir.display()))?;

            let target = resolve_collision_free(&subdir, &name);
            match move_file(entry, &target) {
                Ok(()) => moved += 1,
                Err(error) => crate::print_error!("Failed to move '{}': {error}", entry.display()),
            }
        }

        if let Some(callback) = progress {
            callback(index + 1, total);
        }
    }

    Ok(moved)
}

impl fmt::Display for DistributeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed { moved } => {
                write!(f, "{}", format!("Distributed {moved} files").green())
            }
            Self::RolledBack {
                reason,
                restored,
                failed_restores,
            } => {
                if *failed_restores == 0 {
                    write!(
                        f,
                        "{}",
                        format!("Rolled back after failure: {reason} ({restored} files restored)").red()
                    )
                } else {
                    write!(
                        f,
                        "{}",
                        format!(
                            "Rolled back after failure: {reason} ({restored} restored, {failed_restores} could not be restored)"
                        )
                        .red()
                    )
                }
            }
        }
    }
}

impl fmt::Display for MergeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed == 0 {
            write!(
                f,
                "{}",
                format!("Merged {} files, removed {} subfolders", self.moved, self.removed_dirs).green()
            )
        } else {
            write!(
                f,
                "{}",
                format!(
                    "Merged {} files, removed {} subfolders, {} files failed",
                    self.moved, self.removed_dirs, self.failed
                )
                .red()
            )
        }
    }
}
