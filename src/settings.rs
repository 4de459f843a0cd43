//! Code for loading program settings.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::sensitivity::{DEFAULT_SPREAD, SensitivityMode};
use anyhow::{Context, Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for smartroi.
# Uncomment a line to change a setting.
";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_sensitivity_spread() -> f64 {
    DEFAULT_SPREAD
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Fractional spread either side of baseline for rent and price in sensitivity analysis
    #[serde(default = "default_sensitivity_spread")]
    pub sensitivity_spread: f64,
    /// How smart features are swept in sensitivity analysis (full_impact or what_if)
    #[serde(default)]
    pub sensitivity_mode: SensitivityMode,
    /// Default directory containing the trained model (if unset, no model is used)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            sensitivity_spread: DEFAULT_SPREAD,
            sensitivity_mode: SensitivityMode::default(),
            model_dir: None,
        }
    }
}

impl Settings {
    /// Read the settings file from the user's config directory.
    ///
    /// If the file is not present, default values for settings will be used
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, using defaults if the file doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", file_path.display()))?;

        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..1.0).contains(&self.sensitivity_spread),
            "sensitivity_spread must be at least 0 and less than 1"
        );

        Ok(())
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> String {
        let settings_raw =
            toml::to_string(&Settings::default()).expect("Could not convert settings to TOML");

        // Comment out every setting and document it from its doc comment
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            if let Some(last) = line.find('=') {
                let field = line[..last].trim();
                let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
                for line in docs.lines() {
                    write!(&mut out, "\n# # {}\n", line.trim()).unwrap();
                }

                writeln!(&mut out, "# {}", line.trim()).unwrap();
            }
        }

        out
    }
}
