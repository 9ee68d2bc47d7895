//src/record.rs
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Canonical sheet columns, in the order new rows are written.
pub const COLUMNS: [&str; 6] = [
    "workout_type",
    "name",
    "date",
    "duration",
    "distance",
    "details",
];

pub const DEFAULT_WORKOUT_NAME: &str = "Today's Workout";
/// Placeholder the sheet uses for an unset distance or empty details.
pub const UNSET_CELL: &str = "-";

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
];
// Largest serial a spreadsheet will produce (9999-12-31).
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// The fixed label set offered when logging a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum WorkoutKind {
    Running,
    Swimming,
    Biking,
    Weights,
    Other,
}

/// Typed content of a single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Builds a cell from raw sheet text; empty text is an empty cell.
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            Self::Empty
        } else {
            Self::Text(text.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{s}"),
            // Whole numbers are written the way a sheet shows them ("45", not "45.0")
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{n:.0}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::from_text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

/// One row as the store hands it out: column name to cell, in sheet order.
/// Column lookup ignores ASCII case.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    cells: Vec<(String, CellValue)>,
}

impl RawRow {
    #[must_use]
    pub const fn new() -> Self {
        Self { cells: Vec::new() }
    }

    /// Builder form of [`RawRow::set`].
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.set(column, value);
        self
    }

    /// Sets a cell, replacing any existing cell whose column matches case-insensitively.
    pub fn set(&mut self, column: &str, value: impl Into<CellValue>) {
        let value = value.into();
        match self
            .cells
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
        {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(column))
            .map(|(_, cell)| cell)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn cells(&self) -> &[(String, CellValue)] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A parsed value plus whether it had to fall back to a default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced<T> {
    pub value: T,
    pub defaulted: bool,
}

impl<T> Coerced<T> {
    pub const fn parsed(value: T) -> Self {
        Self {
            value,
            defaulted: false,
        }
    }

    pub const fn fallback(value: T) -> Self {
        Self {
            value,
            defaulted: true,
        }
    }
}

/// Which fields of a record were silently defaulted during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Defaulted {
    pub duration: bool,
    pub distance: bool,
    pub date: bool,
}

impl Defaulted {
    #[must_use]
    pub const fn any(&self) -> bool {
        self.duration || self.distance || self.date
    }
}

/// Normalized in-memory representation of one logged workout.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutRecord {
    /// 0-based position in the store at fetch time; doubles as the delete key.
    pub position: usize,
    pub workout_type: String,
    pub name: String,
    /// `None` is the unknown-date sentinel.
    pub date: Option<NaiveDate>,
    pub duration: f64,
    pub distance: f64,
    pub details: String,
    pub defaulted: Defaulted,
}

impl WorkoutRecord {
    pub fn date_label(&self) -> String {
        self.date
            .map_or_else(|| "unknown".to_string(), |d| d.format("%Y-%m-%d").to_string())
    }
}

/// Coerces a numeric cell to a non-negative number.
/// Missing, blank, `"-"`, unparseable, non-finite and negative values become 0.
pub fn coerce_number(cell: Option<&CellValue>) -> Coerced<f64> {
    let parsed = match cell {
        Some(CellValue::Number(n)) => Some(*n),
        Some(CellValue::Text(s)) => s.trim().parse::<f64>().ok(),
        Some(CellValue::Empty) | None => None,
    };
    match parsed {
        Some(n) if n.is_finite() && n >= 0.0 => Coerced::parsed(n),
        _ => Coerced::fallback(0.0),
    }
}

/// Coerces a date cell. Unparseable values become the unknown-date sentinel.
pub fn coerce_date(cell: Option<&CellValue>) -> Coerced<Option<NaiveDate>> {
    let parsed = match cell {
        Some(CellValue::Text(s)) => parse_date_text(s).or_else(|| serial_from_text(s)),
        Some(CellValue::Number(serial)) => date_from_serial(*serial),
        Some(CellValue::Empty) | None => None,
    };
    match parsed {
        Some(date) => Coerced::parsed(Some(date)),
        None => Coerced::fallback(None),
    }
}

/// Parses the date forms a sheet commonly holds, dropping any time of day.
pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// A serial day number written out as text, as CSV exports of date cells hold it.
fn serial_from_text(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok().and_then(date_from_serial)
}

/// Converts a spreadsheet serial day number (days since 1899-12-30).
#[allow(clippy::cast_possible_truncation)]
fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=MAX_SERIAL_DAY).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
