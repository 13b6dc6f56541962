//! Ordered converter cascade with repair and quarantine.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConvertConfig;
use crate::convert::converters::{Converter, ImageCodecConverter, MagickConverter, ScriptConverter};
use crate::convert::{ConversionOutcome, ConversionRequest, canonical_format, is_raster_extension, sniff_extension};
use crate::resolve::resolve_collision_free;
use crate::{is_network_path, move_file, path_to_file_stem_string};

/// Behavior knobs for one pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Name of the quarantine subdirectory created next to failing files.
    /// `None` disables quarantine: exhausted files stay in place.
    pub quarantine_dir_name: Option<String>,
    /// Attempt a repair pass before quarantining a raster image.
    pub repair: bool,
    /// Move converted originals to the trash instead of deleting them.
    pub use_trash: bool,
}

/// Converts one file per call, trying strategies in order.
pub struct ConversionPipeline {
    converters: Vec<Box<dyn Converter>>,
    config: PipelineConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quarantine_dir_name: Some("corrupted".to_string()),
            repair: true,
            use_trash: true,
        }
    }
}

impl ConversionPipeline {
    /// Build a pipeline with an explicit strategy list. The list order is the
    /// try order.
    #[must_use]
    pub fn new(converters: Vec<Box<dyn Converter>>, config: PipelineConfig) -> Self {
        Self { converters, config }
    }

    /// Build the standard cascade from user config: native codec first, then
    /// the external image tool, then the script fallback when configured.
    #[must_use]
    pub fn from_user_config(user_config: &ConvertConfig) -> Self {
        let mut converters: Vec<Box<dyn Converter>> = vec![
            Box::new(ImageCodecConverter),
            Box::new(MagickConverter::new(&user_config.magick_command)),
        ];
        if let Some(script) = &user_config.repair_script {
            converters.push(Box::new(ScriptConverter::new(
                &user_config.script_interpreter,
                script.clone(),
            )));
        }
        let config = PipelineConfig {
            quarantine_dir_name: Some(user_config.quarantine_dir_name.clone()),
            repair: user_config.repair,
            use_trash: user_config.use_trash,
        };
        Self::new(converters, config)
    }

    /// Disable quarantine: exhausted files stay at their original path.
    #[must_use]
    pub fn without_quarantine(mut self) -> Self {
        self.config.quarantine_dir_name = None;
        self
    }

    /// Convert a single file, producing exactly one outcome.
    ///
    /// On `Converted` the source no longer exists at its original path. On
    /// `Quarantined` it has moved into the quarantine directory. On `Failed`
    /// it is untouched.
    #[must_use]
    pub fn convert(&self, request: &ConversionRequest) -> ConversionOutcome {
        let source = &request.source;
        let target_format = canonical_format(&request.target_extension).to_string();

        // The content decides the source format; the declared extension is
        // only a fallback when the leading bytes are not a known image.
        let source_format =
            sniff_extension(&source.path).unwrap_or_else(|| canonical_format(&source.extension).to_string());

        if source_format == target_format || !is_raster_extension(&request.target_extension) {
            return self.rename_only(source.parent(), &source.path, &request.target_extension);
        }

        let stem = path_to_file_stem_string(&source.path);
        let target = resolve_collision_free(source.parent(), &format!("{stem}.{}", request.target_extension));

        if self.try_cascade(&source.path, &target, &request.target_extension) {
            return self.finish_conversion(&source.path, target);
        }

        if self.config.repair
            && let Some(outcome) = self.repair_and_retry(request, &target, &target_format)
        {
            return outcome;
        }

        self.quarantine_or_fail(
            source.parent(),
            &source.path,
            &source.name,
            "all conversion strategies failed",
        )
    }

    /// Same format or non-raster target: a collision-safe extension swap.
    fn rename_only(&self, dir: &Path, source: &Path, target_extension: &str) -> ConversionOutcome {
        let stem = path_to_file_stem_string(source);
        let desired = format!("{stem}.{target_extension}");
        if source.file_name().is_some_and(|name| *name == *desired.as_str()) {
            // Already has the requested extension.
            return ConversionOutcome::Converted(source.to_path_buf());
        }

        let target = resolve_collision_free(dir, &desired);
        match fs::rename(source, &target) {
            Ok(()) => ConversionOutcome::Converted(target),
            Err(error) => ConversionOutcome::Failed(format!("Rename failed: {error}")),
        }
    }

    /// Try every strategy in order; true when one produced the target file.
    fn try_cascade(&self, source: &Path, target: &Path, extension: &str) -> bool {
        for converter in &self.converters {
            match converter.convert(source, target, extension) {
                Ok(true) => return true,
                Ok(false) => {}
                Err(error) => {
                    crate::print_warning!("{} converter error: {error}", converter.name());
                }
            }
        }
        // An encoder that fails mid-write can leave a partial file behind.
        // The target path was free at resolution time, so anything there now
        // is this run's debris.
        if target.exists() {
            let _ = fs::remove_file(target);
        }
        false
    }

    /// Write a corrected copy next to the source and retry the conversion on
    /// it. Returns `None` when repair did not help.
    fn repair_and_retry(
        &self,
        request: &ConversionRequest,
        target: &Path,
        target_format: &str,
    ) -> Option<ConversionOutcome> {
        let source = &request.source;
        let stem = path_to_file_stem_string(&source.path);
        let repaired = resolve_collision_free(source.parent(), &format!("{stem}_fixed.jpg"));

        let repaired_ok = self
            .converters
            .iter()
            .any(|converter| converter.repair(&source.path, &repaired).unwrap_or(false));
        if !repaired_ok {
            if repaired.exists() {
                let _ = fs::remove_file(&repaired);
            }
            return None;
        }

        // The repair output is already a JPEG, so a JPEG target needs no
        // second conversion pass.
        if target_format == "jpg" {
            return match move_file(&repaired, target) {
                Ok(()) => Some(self.finish_conversion(&source.path, target.to_path_buf())),
                Err(error) => {
                    let _ = fs::remove_file(&repaired);
                    Some(ConversionOutcome::Failed(format!(
                        "Failed to place repaired file: {error}"
                    )))
                }
            };
        }

        let converted = self.try_cascade(&repaired, target, &request.target_extension);
        let _ = fs::remove_file(&repaired);
        converted.then(|| self.finish_conversion(&source.path, target.to_path_buf()))
    }

    /// Remove the original after a successful conversion.
    ///
    /// If the original cannot be removed, the new copy is taken back so the
    /// file ends in exactly one location.
    fn finish_conversion(&self, original: &Path, target: PathBuf) -> ConversionOutcome {
        match self.discard_original(original) {
            Ok(()) => ConversionOutcome::Converted(target),
            Err(error) => {
                let _ = fs::remove_file(&target);
                ConversionOutcome::Failed(format!("Failed to remove original: {error}"))
            }
        }
    }

    fn discard_original(&self, path: &Path) -> std::io::Result<()> {
        // Trash implementations choke on network shares, delete directly there.
        if self.config.use_trash && !is_network_path(path) && trash::delete(path).is_ok() {
            return Ok(());
        }
        fs::remove_file(path)
    }

    /// Move an exhausted file into the quarantine directory, or leave it in
    /// place when quarantine is disabled.
    fn quarantine_or_fail(&self, dir: &Path, source: &Path, name: &str, reason: &str) -> ConversionOutcome {
        let Some(quarantine_name) = &self.config.quarantine_dir_name else {
            return ConversionOutcome::Failed(reason.to_string());
        };

        let quarantine_dir = dir.join(quarantine_name);
        if let Err(error) = fs::create_dir_all(&quarantine_dir) {
            return ConversionOutcome::Failed(format!("{reason}; quarantine unavailable: {error}"));
        }

        let quarantine_path = resolve_collision_free(&quarantine_dir, name);
        match move_file(source, &quarantine_path) {
            Ok(()) => ConversionOutcome::Quarantined {
                path: quarantine_path,
                reason: reason.to_string(),
            },
            Err(error) => ConversionOutcome::Failed(format!("{reason}; quarantine move failed: {error}")),
        }
    }
}
