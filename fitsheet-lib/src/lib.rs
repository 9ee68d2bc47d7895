// src/lib.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;

// --- Declare modules ---
mod config;
pub mod db;
pub mod engine;
pub mod record;
pub mod sheet;
pub mod store;

// --- Expose public types ---
pub use config::{
    get_config_path as get_config_path_util, load as load_config_util, parse_color,
    save as save_config_util, Config, Error as ConfigError, StandardColor, StoreBackend, Theme,
    Units, KM_TO_MILE,
};
pub use engine::{
    Parameter, Period, SeriesPoint, SortMode, TypeFilter, WeeklySummary, ALL_TYPES,
};
pub use record::{CellValue, RawRow, WorkoutKind, WorkoutRecord, DEFAULT_WORKOUT_NAME};
pub use store::{StoreError, WorkoutStore};

use record::UNSET_CELL;

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error("Duration must be zero or more minutes, got {0}.")]
    NegativeDuration(i64),
    #[error("Distance must be a non-negative number of kilometres, got {0}.")]
    InvalidDistance(f64),
}

/// Form input of the add-workout page.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub kind: WorkoutKind,
    pub name: String,
    /// `None` means today.
    pub date: Option<NaiveDate>,
    pub duration_minutes: i64,
    pub distance_km: f64,
    pub details: String,
}

impl NewWorkout {
    /// A workout of `kind` with every other field at its form default.
    pub fn new(kind: WorkoutKind) -> Self {
        Self {
            kind,
            name: DEFAULT_WORKOUT_NAME.to_string(),
            date: None,
            duration_minutes: 0,
            distance_km: 0.0,
            details: String::new(),
        }
    }

    /// Validates the input and builds the sheet row to append.
    ///
    /// A zero distance and blank details are written as `"-"`, matching what
    /// the sheet has always held for "not set".
    /// # Errors
    /// Returns `InputError` if duration is negative or distance is negative or not finite.
    pub fn into_row(&self, today: NaiveDate) -> Result<RawRow, InputError> {
        if self.duration_minutes < 0 {
            return Err(InputError::NegativeDuration(self.duration_minutes));
        }
        if !self.distance_km.is_finite() || self.distance_km < 0.0 {
            return Err(InputError::InvalidDistance(self.distance_km));
        }

        let name = match self.name.trim() {
            "" => DEFAULT_WORKOUT_NAME,
            trimmed => trimmed,
        };
        let distance = if self.distance_km == 0.0 {
            CellValue::from(UNSET_CELL)
        } else {
            CellValue::Number(self.distance_km)
        };
        let details = match self.details.trim() {
            "" => UNSET_CELL,
            trimmed => trimmed,
        };

        Ok(RawRow::new()
            .with("workout_type", self.kind.to_string())
            .with("name", name)
            .with(
                "date",
                self.date.unwrap_or(today).format("%Y-%m-%d").to_string(),
            )
            .with("duration", self.duration_minutes)
            .with("distance", distance)
            .with("details", details))
    }
}

pub struct AppService {
    pub config: Config,
    pub store: Box<dyn WorkoutStore>,
    pub config_path: PathBuf,
    pub sheet_path: PathBuf,
}

impl AppService {
    /// Initializes the application service from the config file.
    /// # Errors
    /// Returns `anyhow::Error` if the config cannot be loaded or the sheet cannot be opened.
    pub fn initialize() -> Result<Self> {
        let config_path =
            config::get_config_path().context("Failed to determine configuration file path")?;
        let config = config::load(&config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"))?;

        let sheet_path = config
            .resolve_sheet_path()
            .context("Failed to determine workout sheet path")?;
        let store = store::open_store(config.store, &sheet_path)
            .with_context(|| format!("Failed to open workout sheet at {sheet_path:?}"))?;

        Ok(Self {
            config,
            store,
            config_path,
            sheet_path,
        })
    }

    /// Builds a service around an already opened store; `config_path` is
    /// where `save_config` writes.
    pub fn with_store<P: Into<PathBuf>>(
        config: Config,
        config_path: P,
        store: Box<dyn WorkoutStore>,
    ) -> Self {
        let sheet_path = PathBuf::from(store.location());
        Self {
            config,
            store,
            config_path: config_path.into(),
            sheet_path,
        }
    }

    pub fn get_config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn get_sheet_path(&self) -> &Path {
        &self.sheet_path
    }

    /// Saves the current configuration state.
    /// # Errors
    /// Returns `ConfigError` if saving fails.
    pub fn save_config(&self) -> Result<(), ConfigError> {
        config::save(&self.config_path, &self.config)
    }

    /// Sets the display units.
    /// # Errors
    /// Returns `ConfigError` variants if saving fails.
    pub fn set_units(&mut self, units: Units) -> Result<(), ConfigError> {
        self.config.units = units;
        self.save_config()
    }

    /// Fetches every row and normalizes it. No caching: each page calls this.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError::Unavailable`.
    pub fn fetch_records(&self) -> Result<Vec<WorkoutRecord>> {
        let rows = self
            .store
            .fetch_all()
            .with_context(|| format!("Failed to read workouts from {}", self.store.location()))?;
        Ok(engine::normalize(&rows))
    }

    /// Home page data; `Ok(None)` when nothing was logged in the past week.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError::Unavailable`.
    pub fn weekly_summary(&self, today: NaiveDate) -> Result<Option<WeeklySummary>> {
        let records = self.fetch_records()?;
        Ok(engine::weekly_summary(&records, today))
    }

    /// View-workouts page data.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError::Unavailable`.
    pub fn list_workouts(
        &self,
        type_filter: &TypeFilter,
        sort_mode: SortMode,
    ) -> Result<Vec<WorkoutRecord>> {
        let records = self.fetch_records()?;
        Ok(engine::filter_and_sort(&records, type_filter, sort_mode))
    }

    /// Workout types present in the sheet, for the type selector.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError::Unavailable`.
    pub fn workout_types(&self) -> Result<Vec<String>> {
        let records = self.fetch_records()?;
        Ok(engine::distinct_types(&records))
    }

    /// Create-graph page data.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError::Unavailable`.
    pub fn graph_series(
        &self,
        type_filter: &TypeFilter,
        period: Period,
        parameter: Parameter,
        today: NaiveDate,
    ) -> Result<Vec<SeriesPoint>> {
        let records = self.fetch_records()?;
        Ok(engine::period_series(
            &records,
            type_filter,
            period,
            parameter,
            today,
        ))
    }

    /// Validates and appends a workout; it becomes the last row.
    /// # Returns
    /// The row that was written.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `InputError` or `StoreError::WriteFailed`.
    pub fn add_workout(&mut self, workout: &NewWorkout, today: NaiveDate) -> Result<RawRow> {
        let row = workout.into_row(today)?;
        self.store
            .append(&row)
            .context("Failed to save workout")?;
        Ok(row)
    }

    /// Deletes the workout at the given store position.
    ///
    /// The position comes from an earlier fetch; if the sheet changed since,
    /// a different workout may be removed.
    /// # Errors
    /// Returns `anyhow::Error` wrapping `StoreError::RowNotFound` or `StoreError::WriteFailed`.
    pub fn delete_workout(&mut self, position: usize) -> Result<()> {
        self.store
            .delete_at(position)
            .with_context(|| format!("Failed to delete workout at position {position}"))
    }
}
