//src/store.rs
use crate::config::StoreBackend;
use crate::db::SqliteSheet;
use crate::record::RawRow;
use crate::sheet::CsvSheet;
use std::path::Path;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Workout sheet is unavailable")]
    Unavailable(#[source] BoxError),
    #[error("Workout sheet rejected the write")]
    WriteFailed(#[source] BoxError),
    #[error("No workout at position {position}; the sheet holds {len} row(s)")]
    RowNotFound { position: usize, len: usize },
}

impl StoreError {
    pub fn unavailable(err: impl Into<BoxError>) -> Self {
        Self::Unavailable(err.into())
    }

    pub fn write_failed(err: impl Into<BoxError>) -> Self {
        Self::WriteFailed(err.into())
    }

    /// The store could not be reached; pages show an empty state.
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// An append or delete was rejected; pages show an error and abort.
    pub const fn is_write_error(&self) -> bool {
        matches!(self, Self::WriteFailed(_) | Self::RowNotFound { .. })
    }
}

/// Tabular store of workout rows, addressed by position in its current order.
///
/// Positions are not stable identities: if the sheet changes between a fetch
/// and a `delete_at`, the position may name a different row.
pub trait WorkoutStore {
    /// All rows in store order.
    fn fetch_all(&self) -> Result<Vec<RawRow>, StoreError>;

    /// Appends `row` after the last row.
    fn append(&mut self, row: &RawRow) -> Result<(), StoreError>;

    /// Removes the row at 0-based logical `position`.
    fn delete_at(&mut self, position: usize) -> Result<(), StoreError>;

    /// Human readable location, for status output.
    fn location(&self) -> String;
}

/// Opens the configured backend at `path`.
pub fn open_store(backend: StoreBackend, path: &Path) -> Result<Box<dyn WorkoutStore>, StoreError> {
    log::debug!("Opening {backend:?} workout sheet at {}", path.display());
    Ok(match backend {
        StoreBackend::Csv => Box::new(CsvSheet::new(path)),
        StoreBackend::Sqlite => Box::new(SqliteSheet::open(path)?),
    })
}
