//! Converter strategies tried in order by the pipeline.
//!
//! Every strategy observes the same contract: report `Ok(true)` when the
//! target file was produced, `Ok(false)` when this strategy cannot handle the
//! file. A missing backing tool is a plain `Ok(false)`, never a fatal error,
//! so the cascade can move on to the next strategy.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Result;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::convert::codec_format;

/// Re-encode parameters passed to the external image tool.
const MAGICK_CONVERT_ARGS: [&str; 14] = [
    "-auto-orient",
    "-colorspace",
    "sRGB",
    "-depth",
    "8",
    "-alpha",
    "remove",
    "-sampling-factor",
    "4:2:0",
    "-strip",
    "-interlace",
    "Plane",
    "-quality",
    "80",
];

/// One strategy for producing the target file from the source file.
pub trait Converter {
    /// Short name used in messages.
    fn name(&self) -> &'static str;

    /// Produce `target` from `source` in the format named by `extension`.
    ///
    /// `Ok(false)` means this strategy could not handle the file and the next
    /// one should be tried.
    ///
    /// # Errors
    /// Only for conditions that should abort the whole batch; per-file
    /// decode and tool failures are `Ok(false)`.
    fn convert(&self, source: &Path, target: &Path, extension: &str) -> Result<bool>;

    /// Best-effort repair pass: write a corrected copy of a broken image.
    ///
    /// Default implementation does not support repair.
    ///
    /// # Errors
    /// Same policy as [`Converter::convert`].
    fn repair(&self, _source: &Path, _output: &Path) -> Result<bool> {
        Ok(false)
    }

    /// Probe whether the backing tool is present. Advisory only: a converter
    /// whose tool is absent still just returns `Ok(false)` from `convert`.
    fn is_available(&self) -> bool {
        true
    }
}

/// In-process decode and re-encode using the native codec library.
#[derive(Debug, Default)]
pub struct ImageCodecConverter;

/// External whole-image CLI tool (ImageMagick).
#[derive(Debug)]
pub struct MagickConverter {
    command: String,
}

/// Interpreter-driven script fallback for legacy containers the other
/// strategies cannot decode.
#[derive(Debug)]
pub struct ScriptConverter {
    interpreter: String,
    script: PathBuf,
}

impl Converter for ImageCodecConverter {
    fn name(&self) -> &'static str {
        "native codec"
    }

    fn convert(&self, source: &Path, target: &Path, extension: &str) -> Result<bool> {
        let Ok(format) = codec_format(extension) else {
            return Ok(false);
        };
        let Ok(img) = image::open(source) else {
            return Ok(false);
        };

        let result = if format == ImageFormat::Jpeg {
            // JPEG has no alpha channel, so transparency is flattened onto
            // white instead of letting the encoder fail.
            flatten_to_rgb(&img).save_with_format(target, format)
        } else {
            img.save_with_format(target, format)
        };

        Ok(result.is_ok())
    }

    fn repair(&self, source: &Path, output: &Path) -> Result<bool> {
        // A decodable image is "repaired" by a clean 8-bit RGB re-encode,
        // which drops broken metadata and transparency.
        let Ok(img) = image::open(source) else {
            return Ok(false);
        };
        Ok(flatten_to_rgb(&img).save_with_format(output, ImageFormat::Jpeg).is_ok())
    }
}

impl MagickConverter {
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl Converter for MagickConverter {
    fn name(&self) -> &'static str {
        "magick"
    }

    fn convert(&self, source: &Path, target: &Path, _extension: &str) -> Result<bool> {
        let output = Command::new(&self.command)
            .arg(source)
            .args(MAGICK_CONVERT_ARGS)
            .arg(target)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(result) => Ok(result.status.success() && target.is_file()),
            // Tool not installed or not executable.
            Err(_) => Ok(false),
        }
    }

    fn repair(&self, source: &Path, output: &Path) -> Result<bool> {
        let result = Command::new(&self.command)
            .args(["-define", "png:ignore-crc=TRUE"])
            .arg(source)
            .args(["-background", "white", "-alpha", "remove"])
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match result {
            Ok(result) => Ok(result.status.success() && output.is_file()),
            Err(_) => Ok(false),
        }
    }

    fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    }
}

impl ScriptConverter {
    #[must_use]
    pub fn new(interpreter: &str, script: PathBuf) -> Self {
        Self {
            interpreter: interpreter.to_string(),
            script,
        }
    }

    fn run_script(&self, source: &Path, target: &Path) -> Result<bool> {
        if !self.is_available() {
            return Ok(false);
        }
        let output = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg(source)
            .arg(target)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .output();

        match output {
            Ok(result) => Ok(result.status.success() && target.is_file()),
            Err(_) => Ok(false),
        }
    }
}

impl Converter for ScriptConverter {
    fn name(&self) -> &'static str {
        "script fallback"
    }

    fn convert(&self, source: &Path, target: &Path, _extension: &str) -> Result<bool> {
        self.run_script(source, target)
    }

    fn repair(&self, source: &Path, output: &Path) -> Result<bool> {
        self.run_script(source, output)
    }

    fn is_available(&self) -> bool {
        self.script.is_file()
    }
}

/// Alpha-blend an image onto a white background, yielding opaque 8-bit RGB.
#[must_use]
pub fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut flattened = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = f32::from(pixel[3]) / 255.0;
        let blend = |channel: u8| -> u8 {
            let value = f32::from(channel).mul_add(alpha, 255.0 * (1.0 - alpha));
            value.round().clamp(0.0, 255.0) as u8
        };
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    flattened
}
