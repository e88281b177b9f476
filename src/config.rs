use std::{fs::File, io::BufReader, path::Path, path::PathBuf};

use clap::ValueEnum;
use home::home_dir;
use serde::{Deserialize, Serialize};

use crate::chart::song::DEFAULT_RESOLUTION;
use crate::ChartError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Chart,
    Msce,
}

impl OutputFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Chart => "chart",
            Self::Msce => "msce",
        }
    }
}

/// Knobs handed to the chart writer, shared read-only by every package
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Ticks per beat of the written chart, 0 keeps the source resolution
    pub target_resolution: u32,
    pub format: OutputFormat,
    pub substitute_lyric_chars: bool,
    pub copy_down_empty_difficulty: bool,
    /// Keep forced flags, dropped on export otherwise
    pub forced: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            target_resolution: DEFAULT_RESOLUTION,
            format: OutputFormat::Chart,
            substitute_lyric_chars: true,
            copy_down_empty_difficulty: true,
            forced: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Scan every descendant instead of the root and its direct children
    pub recursive: bool,
    pub include_audio: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            include_audio: true,
        }
    }
}

/// Local defaults, overridden by command line flags
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub export: ExportConfig,
    pub batch: BatchOptions,
}

impl Config {
    // folder placed in $HOME directory
    const FOLDER: &'static str = ".chartconv";

    fn get_path() -> Result<PathBuf, ChartError> {
        let home = home_dir()
            .ok_or_else(|| ChartError::ConfigError("Could not find home directory".to_string()))?;
        Ok(home.join(Self::FOLDER).join("config.json"))
    }

    /// Defaults from the home folder, built-in defaults if there is no file
    pub fn read_config() -> Result<Self, ChartError> {
        let config_path = Self::get_path()?;
        if !config_path.exists() {
            log::debug!("No local configuration at {config_path:?}");
            return Ok(Self::default());
        }
        Self::read_from(&config_path)
    }

    pub fn read_from(path: &Path) -> Result<Self, ChartError> {
        let file = File::open(path).map_err(|err| {
            ChartError::ConfigError(format!("Could not open configuration {path:?}: {err}"))
        })?;
        let reader = BufReader::new(file);
        let config: Self = serde_json::from_reader(reader).map_err(|err| {
            ChartError::ConfigError(format!("Could not read configuration {path:?}: {err}"))
        })?;
        Ok(config)
    }
}
