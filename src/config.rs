//! User configuration shared by the reorg tools.

use std::path::PathBuf;
use std::sync::LazyLock;
use std::{fmt, fs};

use anyhow::Context;
use serde::Deserialize;

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Path to the user config file: `$HOME/.config/reorg-tools.toml`
///
/// Returns `None` if the home directory cannot be determined.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});

/// Converter settings from the `[chext]` section of the user config file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// ImageMagick executable name or full path.
    pub magick_command: String,
    /// Interpreter used to run the fallback decoder script.
    pub script_interpreter: String,
    /// Optional fallback decoder script for legacy image containers.
    pub repair_script: Option<PathBuf>,
    /// Name of the quarantine subdirectory for unconvertible files.
    pub quarantine_dir_name: String,
    /// Attempt a repair pass on broken images before quarantining.
    pub repair: bool,
    /// Move converted originals to the trash instead of deleting them.
    pub use_trash: bool,
}

/// Wrapper needed for parsing the config section.
#[derive(Debug, Default, Deserialize)]
struct UserConfig {
    #[serde(default)]
    chext: ConvertConfig,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            magick_command: "magick".to_string(),
            script_interpreter: "python3".to_string(),
            repair_script: None,
            quarantine_dir_name: "corrupted".to_string(),
            repair: true,
            use_trash: true,
        }
    }
}

impl ConvertConfig {
    /// Try to read user config from the file if it exists.
    /// Otherwise, fall back to default config.
    ///
    /// # Errors
    /// Returns an error if config file exists but cannot be read or parsed.
    pub fn get_user_config() -> anyhow::Result<Self> {
        let Some(path) = CONFIG_PATH.as_ref() else {
            return Ok(Self::default());
        };

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse config file {}:\n{e}", path.display())),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(error) => Err(anyhow::anyhow!(
                "Failed to read config file {}: {error}",
                path.display()
            )),
        }
    }

    /// Parse config from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML string is invalid.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str::<UserConfig>(toml_str)
            .map(|config| config.chext)
            .with_context(|| "Failed to parse config TOML")
    }
}

impl fmt::Display for ConvertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Config:")?;
        writeln!(f, "  magick command:  {}", self.magick_command)?;
        writeln!(f, "  interpreter:     {}", self.script_interpreter)?;
        writeln!(
            f,
            "  repair script:   {}",
            self.repair_script
                .as_ref()
                .map_or_else(|| "none".to_string(), |p| p.display().to_string())
        )?;
        writeln!(f, "  quarantine dir:  {}", self.quarantine_dir_name)?;
        writeln!(f, "  repair:          {}", self.repair)?;
        write!(f, "  use trash:       {}", self.use_trash)
    }
}
