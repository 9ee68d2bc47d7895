//src/db.rs
use crate::record::{CellValue, RawRow, COLUMNS};
use crate::store::{StoreError, WorkoutStore};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::{Path, PathBuf};

// Cells keep whatever SQLite type they were written with, like spreadsheet cells
impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Empty => ToSqlOutput::Owned(Value::Null),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Number(n) => ToSqlOutput::Owned(Value::Real(*n)),
        })
    }
}

impl FromSql for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Self::Empty),
            ValueRef::Integer(i) => Ok(Self::Number(i as f64)),
            ValueRef::Real(f) => Ok(Self::Number(f)),
            ValueRef::Text(_) => value.as_str().map(Self::from_text),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// The workout sheet stored as a single SQLite table; row id order is sheet order.
pub struct SqliteSheet {
    conn: Connection,
    path: PathBuf,
}

impl SqliteSheet {
    /// Opens (creating if needed) the sheet database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(StoreError::unavailable)?;
        }
        let conn = Connection::open(&path).map_err(StoreError::unavailable)?;
        init_db(&conn).map_err(StoreError::unavailable)?;
        Ok(Self { conn, path })
    }

    /// In-memory sheet, mostly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::unavailable)?;
        init_db(&conn).map_err(StoreError::unavailable)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn row_count(&self) -> rusqlite::Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sheet_rows", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

/// Initializes the sheet table if it doesn't exist.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    // Untyped columns: SQLite keeps each value's own storage class
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sheet_rows (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_type,
            name,
            date,
            duration,
            distance,
            details
        )",
        [],
    )?;
    Ok(())
}

fn map_row_to_raw(row: &Row) -> rusqlite::Result<RawRow> {
    COLUMNS
        .iter()
        .enumerate()
        .try_fold(RawRow::new(), |raw, (idx, column)| {
            Ok(raw.with(column, row.get::<_, CellValue>(idx)?))
        })
}

impl WorkoutStore for SqliteSheet {
    fn fetch_all(&self) -> Result<Vec<RawRow>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT workout_type, name, date, duration, distance, details
                 FROM sheet_rows ORDER BY row_id ASC",
            )
            .map_err(StoreError::unavailable)?;
        let rows = stmt
            .query_map([], map_row_to_raw)
            .map_err(StoreError::unavailable)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::unavailable)
    }

    fn append(&mut self, row: &RawRow) -> Result<(), StoreError> {
        let values: Vec<CellValue> = COLUMNS
            .iter()
            .map(|column| row.get(column).cloned().unwrap_or_default())
            .collect();
        self.conn
            .execute(
                "INSERT INTO sheet_rows (workout_type, name, date, duration, distance, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![values[0], values[1], values[2], values[3], values[4], values[5]],
            )
            .map_err(StoreError::write_failed)?;
        log::info!(
            "Appended workout as row id {} in {}",
            self.conn.last_insert_rowid(),
            self.path.display()
        );
        Ok(())
    }

    fn delete_at(&mut self, position: usize) -> Result<(), StoreError> {
        let offset = i64::try_from(position).map_err(StoreError::write_failed)?;
        let row_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT row_id FROM sheet_rows ORDER BY row_id ASC LIMIT 1 OFFSET ?1",
                params![offset],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::write_failed)?;

        let Some(row_id) = row_id else {
            let len = self.row_count().map_err(StoreError::write_failed)?;
            return Err(StoreError::RowNotFound { position, len });
        };

        self.conn
            .execute("DELETE FROM sheet_rows WHERE row_id = ?1", params![row_id])
            .map_err(StoreError::write_failed)?;
        log::info!("Deleted row id {row_id} (position {position})");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
