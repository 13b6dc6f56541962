//! Collision-safe target path resolution.

use std::path::{Path, PathBuf};

use crate::get_file_stem_and_extension;

/// Return a path under `target_dir` for `desired_name` that does not collide
/// with an existing entry.
///
/// If the desired name is free it is used as-is, otherwise `stem_1.ext`,
/// `stem_2.ext`, ... are probed in increasing order and the first free one
/// wins. This is a check-then-act sequence: with a single writer per
/// directory (the batch model here) that is sufficient, concurrent external
/// writers are not defended against.
#[must_use]
pub fn resolve_collision_free(target_dir: &Path, desired_name: &str) -> PathBuf {
    let candidate = target_dir.join(desired_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) =
        get_file_stem_and_extension(Path::new(desired_name)).unwrap_or_else(|_| (desired_name.to_string(), String::new()));

    let mut index: u32 = 1;
    loop {
        let name = if extension.is_empty() {
            format!("{stem}_{index}")
        } else {
            format!("{stem}_{index}.{extension}")
        };
        let path = target_dir.join(name);
        if !path.exists() {
            return path;
        }
        index += 1;
    }
}
