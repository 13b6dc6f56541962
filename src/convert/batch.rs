//! Batch driver for the conversion pipeline.

use std::fmt;

use anyhow::Result;
use colored::Colorize;

use crate::convert::pipeline::ConversionPipeline;
use crate::convert::{ConversionOutcome, ConversionRequest, FileEntry, normalize_extension};

/// Progress callback invoked after each file with `(processed, total)`.
pub type ProgressCallback<'a> = &'a dyn Fn(usize, usize);

/// Aggregate result of one batch run.
#[derive(Debug, Default, Clone)]
pub struct BatchResult {
    /// Files that ended up at their target path in the requested format.
    pub succeeded: usize,
    /// Files moved to the quarantine directory. Also counted in `failed`.
    pub quarantined: usize,
    /// Every file that did not convert, in input order.
    pub failed: Vec<FileEntry>,
}

/// Runs the pipeline over a fixed snapshot of files.
pub struct BatchRunner {
    pipeline: ConversionPipeline,
}

impl BatchRunner {
    #[must_use]
    pub const fn new(pipeline: ConversionPipeline) -> Self {
        Self { pipeline }
    }

    /// Convert every file to the given extension, in input order.
    ///
    /// A single file failing never aborts the batch; it is recorded and the
    /// run continues. The progress callback fires after every file and
    /// reaches `(total, total)` on every completed run.
    ///
    /// # Errors
    /// Returns an error before any side effect when the extension normalizes
    /// to empty or the file list is empty.
    pub fn run(
        &self,
        files: Vec<FileEntry>,
        target_extension: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<BatchResult> {
        let extension = normalize_extension(target_extension);
        anyhow::ensure!(!extension.is_empty(), "Target extension cannot be empty");
        anyhow::ensure!(!files.is_empty(), "No files to process");

        let total = files.len();
        let mut result = BatchResult::default();

        for (index, file) in files.into_iter().enumerate() {
            match ConversionRequest::new(file.clone(), &extension) {
                Ok(request) => match self.pipeline.convert(&request) {
                    ConversionOutcome::Converted(_) => result.succeeded += 1,
                    ConversionOutcome::Quarantined { path, reason } => {
                        crate::print_error!("{}: {reason}, moved to {}", file.name, path.display());
                        result.quarantined += 1;
                        result.failed.push(file);
                    }
                    ConversionOutcome::Failed(error) => {
                        crate::print_error!("{}: {error}", file.name);
                        result.failed.push(file);
                    }
                },
                Err(error) => {
                    crate::print_error!("{}: {error}", file.name);
                    result.failed.push(file);
                }
            }
            if let Some(callback) = progress {
                callback(index + 1, total);
            }
        }

        Ok(result)
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed.is_empty() {
            write!(f, "{}", format!("Converted {} files", self.succeeded).green())
        } else {
            write!(
                f,
                "{}",
                format!(
                    "Converted {} files, {} failed ({} quarantined)",
                    self.succeeded,
                    self.failed.len(),
                    self.quarantined
                )
                .red()
            )
        }
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use image::{ImageFormat, Rgb, RgbImage};
    use tempfile::tempdir;

    use crate::convert::converters::ImageCodecConverter;
    use crate::convert::pipeline::PipelineConfig;

    fn test_pipeline() -> ConversionPipeline {
        let config = PipelineConfig {
            quarantine_dir_name: Some("corrupted".to_string()),
            repair: false,
            use_trash: false,
        };
        ConversionPipeline::new(vec![Box::new(ImageCodecConverter)], config)
    }

    fn write_png(path: &Path) {
        RgbImage::from_pixel(2, 2, Rgb([5, 5, 5]))
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn entries(paths: &[std::path::PathBuf]) -> Vec<FileEntry> {
        paths
            .iter()
            .map(|path| FileEntry::new(path.clone()).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_extension_fails_before_side_effects() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("photo.png");
        write_png(&path);

        let runner = BatchRunner::new(test_pipeline());
        assert!(runner.run(entries(&[path.clone()]), "  .  ", None).is_err());
        assert!(path.is_file());
    }

    #[test]
    fn test_empty_file_list_fails() {
        let runner = BatchRunner::new(test_pipeline());
        assert!(runner.run(Vec::new(), "jpg", None).is_err());
    }

    #[test]
    fn test_failures_do_not_abort_batch() {
        let dir = tempdir().unwrap();
        let good_one = dir.path().join("a.png");
        let bad = dir.path().join("b.png");
        let good_two = dir.path().join("c.png");
        write_png(&good_one);
        fs::write(&bad, b"not an image").unwrap();
        write_png(&good_two);

        let runner = BatchRunner::new(test_pipeline());
        let result = runner
            .run(entries(&[good_one, bad.clone(), good_two]), "jpg", None)
            .unwrap();

        assert_eq!(result.succeeded, 2);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.quarantined, 1);
        assert_eq!(result.failed[0].name, "b.png");
        // The broken file went to quarantine, the good ones converted.
        assert!(dir.path().join("corrupted").join("b.png").is_file());
        assert!(dir.path().join("a.jpg").is_file());
        assert!(dir.path().join("c.jpg").is_file());
    }

    #[test]
    fn test_progress_reaches_total() {
        let dir = tempdir().unwrap();
        let paths: Vec<_> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("photo_{i}.png"));
                write_png(&path);
                path
            })
            .collect();

        let seen = RefCell::new(Vec::new());
        let callback = |processed: usize, total: usize| {
            seen.borrow_mut().push((processed, total));
        };

        let runner = BatchRunner::new(test_pipeline());
        runner.run(entries(&paths), "jpg", Some(&callback)).unwrap();

        assert_eq!(*seen.borrow(), vec![(1, 3), (2, 3), (3, 3)]);
    }
}
