//src/config.rs
use comfy_table::Color;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;
use thiserror::Error;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR: &str = "fitsheet";
const CONFIG_ENV_VAR: &str = "FITSHEET_CONFIG_DIR"; // Environment variable name

pub const KM_TO_MILE: f64 = 0.621_371;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not determine configuration directory.")]
    CannotDetermineConfigDir,
    #[error("Could not determine data directory for the workout sheet.")]
    CannotDetermineDataDir,
    #[error("I/O error accessing config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file (TOML): {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize config data (TOML): {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Invalid color name: {0}")]
    InvalidColor(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric, // km
    Imperial, // miles
}

impl Units {
    /// Converts a stored kilometre value for display.
    pub fn from_km(self, km: f64) -> f64 {
        match self {
            Self::Metric => km,
            Self::Imperial => km * KM_TO_MILE,
        }
    }

    pub const fn distance_label(self) -> &'static str {
        match self {
            Self::Metric => "km",
            Self::Imperial => "miles",
        }
    }
}

/// Where the workout sheet lives.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Csv,
    Sqlite,
}

impl StoreBackend {
    pub const fn default_file_name(self) -> &'static str {
        match self {
            Self::Csv => "workouts.csv",
            Self::Sqlite => "workouts.sqlite",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum StandardColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Grey,
}

impl From<StandardColor> for Color {
    fn from(value: StandardColor) -> Self {
        match value {
            StandardColor::Black => Self::Black,
            StandardColor::Red => Self::Red,
            StandardColor::Green => Self::Green,
            StandardColor::Yellow => Self::Yellow,
            StandardColor::Blue => Self::Blue,
            StandardColor::Magenta => Self::Magenta,
            StandardColor::Cyan => Self::Cyan,
            StandardColor::White => Self::White,
            StandardColor::Grey => Self::Grey,
        }
    }
}

pub fn parse_color(color_str: &str) -> Result<StandardColor, Error> {
    StandardColor::iter()
        .find(|color| format!("{color:?}").eq_ignore_ascii_case(color_str.trim()))
        .ok_or_else(|| Error::InvalidColor(color_str.to_string()))
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Theme {
    pub header_color: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            header_color: "Green".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)] // Missing fields fall back to defaults
pub struct Config {
    pub store: StoreBackend,
    /// Overrides the default sheet location in the data directory.
    pub sheet_path: Option<PathBuf>,
    pub units: Units,
    pub theme: Theme,
}

impl Config {
    /// The sheet file to open: `sheet_path` if set, else the backend's file in the data dir.
    pub fn resolve_sheet_path(&self) -> Result<PathBuf, Error> {
        if let Some(path) = &self.sheet_path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(Error::CannotDetermineDataDir)?;
        Ok(data_dir
            .join(APP_DIR)
            .join(self.store.default_file_name()))
    }
}

/// Determines the path to the configuration file, creating its directory.
pub fn get_config_path() -> Result<PathBuf, Error> {
    let config_dir_path = match std::env::var(CONFIG_ENV_VAR) {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => dirs::config_dir()
            .ok_or(Error::CannotDetermineConfigDir)?
            .join(APP_DIR),
    };

    if !config_dir_path.is_dir() {
        log::info!(
            "Creating configuration directory {}",
            config_dir_path.display()
        );
        fs::create_dir_all(&config_dir_path)?;
    }

    Ok(config_dir_path.join(CONFIG_FILE_NAME))
}

/// Loads the configuration, writing a default file if none exists yet.
pub fn load(config_path: &Path) -> Result<Config, Error> {
    if config_path.exists() {
        let config_content = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    } else {
        let default_config = Config::default();
        save(config_path, &default_config)?;
        Ok(default_config)
    }
}

/// Saves the configuration to the TOML file.
pub fn save(config_path: &Path, config: &Config) -> Result<(), Error> {
    if let Some(parent_dir) = config_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            fs::create_dir_all(parent_dir)?;
        }
    }
    let config_content = toml::to_string_pretty(config)?;
    fs::write(config_path, config_content)?;
    Ok(())
}
