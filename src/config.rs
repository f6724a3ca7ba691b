//! Layered settings: defaults, optional config file, `WX_*` environment, CLI overrides.

use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_DATABASE_PATH, DEFAULT_DATA_PATH, DEFAULT_FILE_PATTERN, ENV_PREFIX,
};
use clap::ValueEnum;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use validator::Validate;

/// What to do when a discovered file cannot be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileErrorPolicy {
    /// Log it, list it in the run summary, carry on with the other files
    #[default]
    Skip,
    /// Fail the whole run; nothing is committed
    Abort,
}

impl FileErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileErrorPolicy::Skip => "skip",
            FileErrorPolicy::Abort => "abort",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate(length(min = 1))]
    pub data_path: String,

    #[validate(length(min = 1))]
    pub file_pattern: String,

    #[validate(length(min = 1))]
    pub database_path: String,

    pub on_file_error: FileErrorPolicy,
}

/// Values given on the command line; `None` leaves lower layers in charge.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub data_path: Option<PathBuf>,
    pub file_pattern: Option<String>,
    pub database_path: Option<PathBuf>,
    pub on_file_error: Option<FileErrorPolicy>,
}

impl Settings {
    pub fn load(config_file: Option<&Path>, overrides: &SettingsOverrides) -> Result<Self> {
        Self::load_with_env(config_file, overrides, Environment::with_prefix(ENV_PREFIX))
    }

    fn load_with_env(
        config_file: Option<&Path>,
        overrides: &SettingsOverrides,
        environment: Environment,
    ) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("data_path", DEFAULT_DATA_PATH)?
            .set_default("file_pattern", DEFAULT_FILE_PATTERN)?
            .set_default("database_path", DEFAULT_DATABASE_PATH)?
            .set_default("on_file_error", FileErrorPolicy::default().as_str())?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(environment)
            .set_override_option("data_path", overrides.data_path.as_deref().map(path_string))?
            .set_override_option("file_pattern", overrides.file_pattern.clone())?
            .set_override_option(
                "database_path",
                overrides.database_path.as_deref().map(path_string),
            )?
            .set_override_option("on_file_error", overrides.on_file_error.map(|p| p.as_str()))?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn data_dir(&self) -> &Path {
        Path::new(&self.data_path)
    }

    pub fn database(&self) -> &Path {
        Path::new(&self.database_path)
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
