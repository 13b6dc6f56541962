//! Sibling folder cleanup: rename to normalized names, merging duplicates.

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::normalize::normalize;
use crate::resolve::resolve_collision_free;
use crate::{
    is_directory_empty, list_immediate_directories, list_immediate_files, move_file, path_to_filename_string,
};

/// Progress callback invoked with `(processed, total)` after each directory.
pub type ProgressCallback<'a> = &'a dyn Fn(usize, usize);

/// Normalize the names of the immediate subdirectories of `parent`.
///
/// A subdirectory whose normalized name matches an existing sibling is merged
/// into that sibling file by file and removed once empty; otherwise it is
/// renamed when the name changed. Read-only files are skipped during a merge.
/// Returns the number of directories renamed or merged.
///
/// # Errors
/// Returns an error when `parent` cannot be read.
pub fn clean_folder_names(parent: &Path, progress: Option<ProgressCallback>) -> Result<usize> {
    let subdirs = list_immediate_directories(parent)?;
    let total = subdirs.len();
    let mut cleaned = 0;

    for (index, subdir) in subdirs.iter().enumerate() {
        let name = path_to_filename_string(subdir);
        let normalized = normalize(&name);

        if normalized != name {
            let target = parent.join(&normalized);
            if target.is_dir() {
                if merge_into(subdir, &target) {
                    cleaned += 1;
                }
            } else if target.exists() {
                crate::print_warning!("Skipping '{name}': a file named '{normalized}' is in the way");
            } else {
                match fs::rename(subdir, &target) {
                    Ok(()) => cleaned += 1,
                    Err(error) => crate::print_error!("Failed to rename '{name}': {error}"),
                }
            }
        }

        if let Some(callback) = progress {
            callback(index + 1, total);
        }
    }

    Ok(cleaned)
}

/// Move every child of `source` into `target`, removing `source` once empty.
/// Returns true only when `source` was fully emptied and removed.
fn merge_into(source: &Path, target: &Path) -> bool {
    let (files, subdirs) = match (list_immediate_files(source), list_immediate_directories(source)) {
        (Ok(files), Ok(subdirs)) => (files, subdirs),
        (Err(error), _) | (_, Err(error)) => {
            crate::print_error!("Cannot read '{}': {error}", source.display());
            return false;
        }
    };

    for file in files {
        if is_read_only(&file) {
            crate::print_warning!("Skipping locked file: '{}'", file.display());
            continue;
        }
        let destination = resolve_collision_free(target, &path_to_filename_string(&file));
        if let Err(error) = move_file(&file, &destination) {
            crate::print_error!("Failed to move '{}': {error}", file.display());
        }
    }

    // Nested directories move wholesale, keeping their contents.
    for subdir in subdirs {
        let destination = resolve_collision_free(target, &path_to_filename_string(&subdir));
        if let Err(error) = fs::rename(&subdir, &destination) {
            crate::print_error!("Failed to move '{}': {error}", subdir.display());
        }
    }

    if !is_directory_empty(source) {
        return false;
    }
    match fs::remove_dir(source) {
        Ok(()) => true,
        Err(error) => {
            crate::print_error!("Failed to remove '{}': {error}", source.display());
            false
        }
    }
}

fn is_read_only(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|metadata| metadata.permissions().readonly())
}

#[cfg(test)]
mod organize_tests {
    use super::*;

    use std::path::PathBuf;

    use tempfile::tempdir;

    fn subdir(parent: &Path, name: &str) -> PathBuf {
        let dir = parent.join(name);
        fs::create_dir(&dir).unwrap();
        dir
    }

    #[test]
    fn test_rename_to_normalized_name() {
        let parent = tempdir().unwrap();
        subdir(parent.path(), "Holiday_12");

        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        assert_eq!(cleaned, 1);
        assert!(parent.path().join("Holiday").is_dir());
        assert!(!parent.path().join("Holiday_12").exists());
    }

    #[test]
    fn test_already_clean_names_are_untouched() {
        let parent = tempdir().unwrap();
        subdir(parent.path(), "Holiday");
        subdir(parent.path(), "Work");

        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        assert_eq!(cleaned, 0);
        assert!(parent.path().join("Holiday").is_dir());
        assert!(parent.path().join("Work").is_dir());
    }

    #[test]
    fn test_merge_into_existing_sibling() {
        let parent = tempdir().unwrap();
        let keep = subdir(parent.path(), "Holiday");
        let duplicate = subdir(parent.path(), "Holiday (2)");
        fs::write(keep.join("a.jpg"), b"a").unwrap();
        fs::write(duplicate.join("b.jpg"), b"b").unwrap();

        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        assert_eq!(cleaned, 1);
        assert!(!duplicate.exists());
        assert!(keep.join("a.jpg").is_file());
        assert!(keep.join("b.jpg").is_file());
    }

    #[test]
    fn test_merge_resolves_file_collisions() {
        let parent = tempdir().unwrap();
        let keep = subdir(parent.path(), "Holiday");
        let duplicate = subdir(parent.path(), "Holiday_3");
        fs::write(keep.join("photo.jpg"), b"kept").unwrap();
        fs::write(duplicate.join("photo.jpg"), b"merged").unwrap();

        clean_folder_names(parent.path(), None).unwrap();

        assert_eq!(fs::read(keep.join("photo.jpg")).unwrap(), b"kept");
        assert_eq!(fs::read(keep.join("photo_1.jpg")).unwrap(), b"merged");
    }

    #[test]
    fn test_two_duplicates_collapse_into_one() {
        let parent = tempdir().unwrap();
        let first = subdir(parent.path(), "Trip (1)");
        let second = subdir(parent.path(), "Trip (2)");
        fs::write(first.join("a.jpg"), b"a").unwrap();
        fs::write(second.join("b.jpg"), b"b").unwrap();

        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        // First duplicate is renamed to "Trip", second merges into it.
        assert_eq!(cleaned, 2);
        let merged = parent.path().join("Trip");
        assert!(merged.join("a.jpg").is_file());
        assert!(merged.join("b.jpg").is_file());
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn test_merge_moves_nested_directories() {
        let parent = tempdir().unwrap();
        subdir(parent.path(), "Trip");
        let duplicate = subdir(parent.path(), "Trip (2)");
        fs::write(duplicate.join("a.jpg"), b"a").unwrap();
        fs::create_dir(duplicate.join("nested")).unwrap();
        fs::write(duplicate.join("nested").join("x.txt"), b"x").unwrap();

        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        assert_eq!(cleaned, 1);
        assert!(!duplicate.exists());
        let merged = parent.path().join("Trip");
        assert!(merged.join("a.jpg").is_file());
        assert!(merged.join("nested").join("x.txt").is_file());

        // A second run finds nothing left to do.
        assert_eq!(clean_folder_names(parent.path(), None).unwrap(), 0);
    }

    #[test]
    fn test_merge_resolves_nested_directory_collisions() {
        let parent = tempdir().unwrap();
        let keep = subdir(parent.path(), "Trip");
        fs::create_dir(keep.join("nested")).unwrap();
        fs::write(keep.join("nested").join("kept.txt"), b"kept").unwrap();

        let duplicate = subdir(parent.path(), "Trip (2)");
        fs::create_dir(duplicate.join("nested")).unwrap();
        fs::write(duplicate.join("nested").join("merged.txt"), b"merged").unwrap();

        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        assert_eq!(cleaned, 1);
        assert!(keep.join("nested").join("kept.txt").is_file());
        assert!(keep.join("nested_1").join("merged.txt").is_file());
    }

    #[test]
    fn test_unusable_name_falls_back_to_sentinel() {
        let parent = tempdir().unwrap();
        subdir(parent.path(), "12345");

        // Plain digits survive normalization, so nothing happens.
        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        assert_eq!(cleaned, 0);
        assert!(parent.path().join("12345").is_dir());
    }

    #[test]
    fn test_blocking_file_is_reported_not_fatal() {
        let parent = tempdir().unwrap();
        subdir(parent.path(), "Notes_2");
        fs::write(parent.path().join("Notes"), b"a plain file").unwrap();

        let cleaned = clean_folder_names(parent.path(), None).unwrap();
        assert_eq!(cleaned, 0);
        assert!(parent.path().join("Notes_2").is_dir());
    }
}
