//src/engine.rs
//! Pure aggregation over normalized workout records: the weekly summary,
//! the filtered/sorted workout view and the per-day chart series.
use crate::record::{
    coerce_date, coerce_number, CellValue, Defaulted, RawRow, WorkoutRecord, DEFAULT_WORKOUT_NAME,
    UNSET_CELL,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use strum_macros::{Display, EnumIter};

pub const WEEKLY_WINDOW_DAYS: i64 = 7;
pub const MONTH_WINDOW_DAYS: i64 = 30;
pub const YEAR_WINDOW_DAYS: i64 = 365;
/// Selector entry meaning "no type filter".
pub const ALL_TYPES: &str = "All";
const FALLBACK_WORKOUT_TYPE: &str = "Other";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    /// Case-sensitive match on the normalized workout type.
    Only(String),
}

impl TypeFilter {
    /// Maps a selector value ("All" or a workout type) to a filter.
    pub fn from_selection(selection: &str) -> Self {
        if selection == ALL_TYPES {
            Self::All
        } else {
            Self::Only(selection.to_string())
        }
    }

    pub fn matches(&self, record: &WorkoutRecord) -> bool {
        match self {
            Self::All => true,
            Self::Only(workout_type) => record.workout_type == *workout_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, Display)]
pub enum SortMode {
    /// Store order.
    #[default]
    None,
    /// Longest distance first.
    Distance,
    /// Newest date first, unknown dates last.
    Recent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum Period {
    /// Monday to Sunday of the current calendar week.
    PastWeek,
    /// Trailing 30 days, today included.
    PastMonth,
    /// Trailing 365 days, today included.
    PastYear,
}

impl Period {
    /// Inclusive `(start, end)` date range of the period as seen from `today`.
    pub fn window(self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            Self::PastWeek => {
                let monday =
                    today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
                (monday, monday + Duration::days(6))
            }
            Self::PastMonth => (today - Duration::days(MONTH_WINDOW_DAYS), today),
            Self::PastYear => (today - Duration::days(YEAR_WINDOW_DAYS), today),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PastWeek => "Past Week",
            Self::PastMonth => "Past Month",
            Self::PastYear => "Past Year",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum Parameter {
    Duration,
    Distance,
}

impl Parameter {
    pub const fn value_of(self, record: &WorkoutRecord) -> f64 {
        match self {
            Self::Duration => record.duration,
            Self::Distance => record.distance,
        }
    }
}

/// Home-page summary of the trailing week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklySummary {
    pub top_type: String,
    pub top_distance: f64,
    /// Summed distance per workout type inside the window, in lexical type order.
    pub distance_by_type: BTreeMap<String, f64>,
    /// Most recent record overall, not only inside the window.
    pub last_workout: WorkoutRecord,
}

/// One bar/point of a chart: an ISO date and the summed parameter for that day.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub period: String,
    pub total: f64,
}

/// Turns raw sheet rows into records. Never fails; one record per row.
pub fn normalize(rows: &[RawRow]) -> Vec<WorkoutRecord> {
    let records: Vec<WorkoutRecord> = rows
        .iter()
        .enumerate()
        .map(|(position, row)| normalize_row(position, row))
        .collect();

    let defaulted = records.iter().filter(|r| r.defaulted.any()).count();
    if defaulted > 0 {
        log::debug!(
            "Normalized {} rows, {defaulted} with defaulted duration/distance/date",
            records.len()
        );
    }
    records
}

fn normalize_row(position: usize, row: &RawRow) -> WorkoutRecord {
    let duration = coerce_number(row.get("duration"));
    let distance = coerce_number(row.get("distance"));
    let date = coerce_date(row.get("date"));

    WorkoutRecord {
        position,
        workout_type: text_or(row.get("workout_type"), FALLBACK_WORKOUT_TYPE),
        name: text_or(row.get("name"), DEFAULT_WORKOUT_NAME),
        date: date.value,
        duration: duration.value,
        distance: distance.value,
        details: text_or(row.get("details"), UNSET_CELL),
        defaulted: Defaulted {
            duration: duration.defaulted,
            distance: distance.defaulted,
            date: date.defaulted,
        },
    }
}

fn text_or(cell: Option<&CellValue>, fallback: &str) -> String {
    match cell {
        Some(cell) if !cell.is_blank() => cell.to_string().trim().to_string(),
        _ => fallback.to_string(),
    }
}

/// Summarizes the trailing week (`today - 7 days` onwards, inclusive).
///
/// Returns `None` when no record with a known date falls in the window. The
/// top type is the one with the largest summed distance; on a tie the
/// lexically first type wins.
pub fn weekly_summary(records: &[WorkoutRecord], today: NaiveDate) -> Option<WeeklySummary> {
    let window_start = today - Duration::days(WEEKLY_WINDOW_DAYS);

    let mut distance_by_type: BTreeMap<String, f64> = BTreeMap::new();
    for record in records
        .iter()
        .filter(|r| r.date.is_some_and(|d| d >= window_start))
    {
        *distance_by_type
            .entry(record.workout_type.clone())
            .or_insert(0.0) += record.distance;
    }

    // Strictly-greater keeps the first (lexically smallest) type on ties
    let (top_type, top_distance) = distance_by_type.iter().fold(
        None,
        |best: Option<(&String, f64)>, (workout_type, &distance)| match best {
            Some((_, best_distance)) if best_distance >= distance => best,
            _ => Some((workout_type, distance)),
        },
    )?;
    let top_type = top_type.clone();
    let last_workout = last_workout(records)?.clone();

    Some(WeeklySummary {
        top_type,
        top_distance,
        distance_by_type,
        last_workout,
    })
}

/// Most recent record by date; equal dates go to the later store position.
/// Unknown dates only win when no record has a date.
pub fn last_workout(records: &[WorkoutRecord]) -> Option<&WorkoutRecord> {
    records
        .iter()
        .max_by(|a, b| a.date.cmp(&b.date).then(a.position.cmp(&b.position)))
}

/// Applies the type filter, then a stable sort.
pub fn filter_and_sort(
    records: &[WorkoutRecord],
    type_filter: &TypeFilter,
    sort_mode: SortMode,
) -> Vec<WorkoutRecord> {
    let mut selected: Vec<WorkoutRecord> = records
        .iter()
        .filter(|r| type_filter.matches(r))
        .cloned()
        .collect();

    match sort_mode {
        SortMode::None => {}
        SortMode::Distance => selected.sort_by(|a, b| b.distance.total_cmp(&a.distance)),
        SortMode::Recent => selected.sort_by(cmp_recent_first),
    }
    selected
}

fn cmp_recent_first(a: &WorkoutRecord, b: &WorkoutRecord) -> Ordering {
    match (a.date, b.date) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Per-day totals of `parameter` inside `period`, ordered by date.
/// An empty result means "no data", not an error.
pub fn period_series(
    records: &[WorkoutRecord],
    type_filter: &TypeFilter,
    period: Period,
    parameter: Parameter,
    today: NaiveDate,
) -> Vec<SeriesPoint> {
    let (start, end) = period.window(today);

    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records.iter().filter(|r| type_filter.matches(r)) {
        let Some(date) = record.date.filter(|d| (start..=end).contains(d)) else {
            continue;
        };
        *totals.entry(date).or_insert(0.0) += parameter.value_of(record);
    }

    totals
        .into_iter()
        .map(|(date, total)| SeriesPoint {
            period: date.format("%Y-%m-%d").to_string(),
            total,
        })
        .collect()
}

/// Unique workout types in first-appearance order.
pub fn distinct_types(records: &[WorkoutRecord]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for record in records {
        if !types.contains(&record.workout_type) {
            types.push(record.workout_type.clone());
        }
    }
    types
}
