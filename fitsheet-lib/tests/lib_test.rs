use anyhow::Result;
use chrono::NaiveDate;
use fitsheet_lib::db::SqliteSheet;
use fitsheet_lib::sheet::{sheet_row_number, CsvSheet};
use fitsheet_lib::{
    AppService, CellValue, Config, InputError, NewWorkout, Parameter, Period, RawRow, SortMode,
    StoreBackend, StoreError, TypeFilter, Units, WorkoutKind, WorkoutStore,
};
use std::fs;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()
}

// Helper function to create a test service backed by an in-memory sheet.
// The returned dir holds the config file and must outlive the service.
fn create_test_service() -> Result<(AppService, TempDir)> {
    let dir = TempDir::new()?;
    let store = SqliteSheet::open_in_memory()?;
    let service = AppService::with_store(
        Config::default(),
        dir.path().join("config.toml"),
        Box::new(store),
    );
    Ok((service, dir))
}

fn create_csv_service(dir: &TempDir) -> AppService {
    let store = CsvSheet::new(dir.path().join("workouts.csv"));
    AppService::with_store(
        Config::default(),
        dir.path().join("config.toml"),
        Box::new(store),
    )
}

fn workout(kind: WorkoutKind, name: &str, date: &str, duration: i64, distance: f64) -> NewWorkout {
    NewWorkout {
        kind,
        name: name.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
        duration_minutes: duration,
        distance_km: distance,
        details: String::new(),
    }
}

fn store_error(err: &anyhow::Error) -> &StoreError {
    err.downcast_ref::<StoreError>()
        .expect("error should wrap a StoreError")
}

#[test]
fn test_add_workout_applies_form_defaults() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;

    let new_workout = NewWorkout {
        name: "   ".to_string(),
        duration_minutes: 25,
        ..NewWorkout::new(WorkoutKind::Weights)
    };
    let row = service.add_workout(&new_workout, today())?;

    assert_eq!(row.get("workout_type"), Some(&CellValue::Text("Weights".into())));
    assert_eq!(row.get("name"), Some(&CellValue::Text("Today's Workout".into())));
    assert_eq!(row.get("date"), Some(&CellValue::Text("2024-03-13".into())));
    assert_eq!(row.get("duration"), Some(&CellValue::Number(25.0)));
    assert_eq!(row.get("distance"), Some(&CellValue::Text("-".into())));
    assert_eq!(row.get("details"), Some(&CellValue::Text("-".into())));

    let records = service.fetch_records()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Today's Workout");
    assert_eq!(records[0].date, Some(today()));
    assert_eq!(records[0].duration, 25.0);
    assert_eq!(records[0].distance, 0.0);
    assert!(records[0].defaulted.distance);
    assert_eq!(records[0].details, "-");
    Ok(())
}

#[test]
fn test_add_workout_rejects_invalid_input() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;

    let negative_duration = workout(WorkoutKind::Running, "Run", "2024-03-12", -5, 3.0);
    let err = service
        .add_workout(&negative_duration, today())
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<InputError>(),
        Some(&InputError::NegativeDuration(-5))
    );

    let bad_distance = workout(WorkoutKind::Running, "Run", "2024-03-12", 5, f64::NAN);
    assert!(service.add_workout(&bad_distance, today()).is_err());

    let negative_distance = workout(WorkoutKind::Running, "Run", "2024-03-12", 5, -1.0);
    assert!(service.add_workout(&negative_distance, today()).is_err());

    // Nothing reached the sheet
    assert!(service.fetch_records()?.is_empty());
    Ok(())
}

#[test]
fn test_appended_workouts_are_last_in_order() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    service.add_workout(&workout(WorkoutKind::Running, "A", "2024-03-10", 30, 5.0), today())?;
    service.add_workout(&workout(WorkoutKind::Biking, "B", "2024-03-01", 60, 20.0), today())?;
    service.add_workout(&workout(WorkoutKind::Swimming, "C", "2024-03-12", 40, 1.5), today())?;

    let records = service.list_workouts(&TypeFilter::All, SortMode::None)?;
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(
        records.iter().map(|r| r.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    let recent = service.list_workouts(&TypeFilter::All, SortMode::Recent)?;
    let names: Vec<&str> = recent.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["C", "A", "B"]);

    assert_eq!(service.workout_types()?, vec!["Running", "Biking", "Swimming"]);
    Ok(())
}

#[test]
fn test_service_weekly_summary_and_graph() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    assert!(service.weekly_summary(today())?.is_none());
    assert!(service
        .graph_series(&TypeFilter::All, Period::PastWeek, Parameter::Distance, today())?
        .is_empty());

    service.add_workout(&workout(WorkoutKind::Running, "Run", "2024-03-10", 30, 4.0), today())?;
    service.add_workout(&workout(WorkoutKind::Biking, "Ride", "2024-03-10", 50, 6.0), today())?;
    service.add_workout(&workout(WorkoutKind::Running, "Run 2", "2024-03-12", 20, 5.0), today())?;

    let summary = service.weekly_summary(today())?.expect("workouts this week");
    assert_eq!(summary.top_type, "Running");
    assert_eq!(summary.top_distance, 9.0);
    assert_eq!(summary.last_workout.name, "Run 2");

    // 2024-03-10 is the Sunday before this calendar week
    let week = service.graph_series(
        &TypeFilter::All,
        Period::PastWeek,
        Parameter::Duration,
        today(),
    )?;
    assert_eq!(week.len(), 1);
    assert_eq!(week[0].period, "2024-03-12");
    assert_eq!(week[0].total, 20.0);

    let month = service.graph_series(
        &TypeFilter::Only("Running".to_string()),
        Period::PastMonth,
        Parameter::Distance,
        today(),
    )?;
    assert_eq!(month.len(), 2);
    assert_eq!(month[0].total, 4.0);
    Ok(())
}

#[test]
fn test_delete_by_position_after_sorting() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    service.add_workout(&workout(WorkoutKind::Running, "Short", "2024-03-10", 20, 2.0), today())?;
    service.add_workout(&workout(WorkoutKind::Running, "Long", "2024-03-11", 90, 21.1), today())?;
    service.add_workout(&workout(WorkoutKind::Running, "Medium", "2024-03-12", 45, 8.0), today())?;

    let by_distance = service.list_workouts(&TypeFilter::All, SortMode::Distance)?;
    assert_eq!(by_distance[0].name, "Long");

    // The record's position, not its index in the sorted view, is the delete key
    service.delete_workout(by_distance[0].position)?;

    let remaining = service.fetch_records()?;
    let names: Vec<&str> = remaining.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Short", "Medium"]);
    Ok(())
}

#[test]
fn test_delete_stale_position_is_a_write_error() -> Result<()> {
    let (mut service, _dir) = create_test_service()?;
    service.add_workout(&workout(WorkoutKind::Other, "Only", "2024-03-12", 10, 0.0), today())?;

    let err = service.delete_workout(3).unwrap_err();
    let store_err = store_error(&err);
    assert!(store_err.is_write_error());
    assert!(matches!(
        store_err,
        StoreError::RowNotFound {
            position: 3,
            len: 1
        }
    ));
    assert_eq!(service.fetch_records()?.len(), 1);
    Ok(())
}

#[test]
fn test_csv_sheet_missing_file_is_empty_and_created_on_append() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("workouts.csv");
    let mut sheet = CsvSheet::new(&path);

    assert!(sheet.fetch_all()?.is_empty());
    assert!(!path.exists());

    let row = NewWorkout {
        distance_km: 5.25,
        details: "hills".to_string(),
        ..NewWorkout::new(WorkoutKind::Running)
    }
    .into_row(today())?;
    sheet.append(&row)?;

    let contents = fs::read_to_string(&path)?;
    let mut lines = contents.lines();
    assert_eq!(
        lines.next(),
        Some("workout_type,name,date,duration,distance,details")
    );
    assert_eq!(
        lines.next(),
        Some("Running,Today's Workout,2024-03-13,0,5.25,hills")
    );
    assert_eq!(lines.next(), None);
    Ok(())
}

#[test]
fn test_csv_sheet_follows_existing_header() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("workouts.csv");
    fs::write(
        &path,
        "Date,Workout_Type,Name,Duration,Distance,Details,Mood\n\
         2024-03-01,Swimming,Pool,40,1.5,-,good\n",
    )?;
    let mut sheet = CsvSheet::new(&path);

    let rows = sheet.fetch_all()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("workout_type"), Some(&CellValue::Text("Swimming".into())));
    assert_eq!(rows[0].get("mood"), Some(&CellValue::Text("good".into())));

    let row = workout(WorkoutKind::Biking, "Commute", "2024-03-02", 30, 12.0).into_row(today())?;
    sheet.append(&row)?;

    let contents = fs::read_to_string(&path)?;
    assert_eq!(
        contents.lines().last(),
        Some("2024-03-02,Biking,Commute,30,12,-,")
    );

    let records = fitsheet_lib::engine::normalize(&sheet.fetch_all()?);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].workout_type, "Biking");
    assert_eq!(records[1].distance, 12.0);
    assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 3, 2));
    Ok(())
}

#[test]
fn test_csv_sheet_zero_byte_file_gets_default_header() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("workouts.csv");
    fs::write(&path, "")?;
    let mut service = create_csv_service(&dir);

    assert!(service.fetch_records()?.is_empty());
    service.add_workout(&workout(WorkoutKind::Running, "Tempo", "2024-03-12", 30, 5.0), today())?;

    let records = service.fetch_records()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].workout_type, "Running");
    assert_eq!(records[0].name, "Tempo");
    assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 3, 12));
    assert_eq!(records[0].distance, 5.0);

    let contents = fs::read_to_string(&path)?;
    assert_eq!(
        contents.lines().next(),
        Some("workout_type,name,date,duration,distance,details")
    );
    Ok(())
}

#[test]
fn test_csv_sheet_adds_missing_columns_on_append() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("workouts.csv");
    fs::write(&path, "workout_type,name,duration\nRunning,Old,20\n")?;
    let mut service = create_csv_service(&dir);

    service.add_workout(&workout(WorkoutKind::Biking, "Commute", "2024-03-02", 30, 12.0), today())?;

    let contents = fs::read_to_string(&path)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "workout_type,name,duration,date,distance,details");
    assert_eq!(lines[1], "Running,Old,20");
    assert_eq!(lines[2], "Biking,Commute,30,2024-03-02,12,-");

    let records = service.fetch_records()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].duration, 20.0);
    assert_eq!(records[0].date, None);
    assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 3, 2));
    assert_eq!(records[1].distance, 12.0);
    Ok(())
}

#[test]
fn test_csv_sheet_tolerates_invalid_utf8_cells() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("workouts.csv");
    fs::write(
        &path,
        b"workout_type,name,date,duration,distance,details\n\
          Running,Easy,2024-03-11,30,5,-\n\
          Biking,Bad\xffName,2024-03-12,40,10,-\n",
    )?;
    let mut service = create_csv_service(&dir);

    let records = service.fetch_records()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].name, "Bad\u{fffd}Name");
    assert_eq!(records[1].distance, 10.0);

    // The damaged row can still be removed
    service.delete_workout(1)?;
    let remaining = service.fetch_records()?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Easy");
    Ok(())
}

#[test]
fn test_csv_sheet_delete_offsets_header_row() -> Result<()> {
    assert_eq!(sheet_row_number(0), 2);
    assert_eq!(sheet_row_number(4), 6);

    let dir = TempDir::new()?;
    let mut service = create_csv_service(&dir);
    service.add_workout(&workout(WorkoutKind::Running, "First", "2024-03-10", 20, 2.0), today())?;
    service.add_workout(&workout(WorkoutKind::Biking, "Second", "2024-03-11", 40, 9.0), today())?;

    service.delete_workout(0)?;
    let remaining = service.fetch_records()?;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "Second");
    assert_eq!(remaining[0].position, 0);

    let err = service.delete_workout(1).unwrap_err();
    assert!(matches!(
        store_error(&err),
        StoreError::RowNotFound { position: 1, len: 1 }
    ));

    // Header survives deleting the last workout
    service.delete_workout(0)?;
    let contents = fs::read_to_string(dir.path().join("workouts.csv"))?;
    assert_eq!(
        contents.trim_end(),
        "workout_type,name,date,duration,distance,details"
    );
    Ok(())
}

#[test]
fn test_position_delete_is_fragile_under_concurrent_reorder() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("workouts.csv");
    let mut service = create_csv_service(&dir);
    service.add_workout(&workout(WorkoutKind::Running, "Keep", "2024-03-10", 20, 2.0), today())?;
    service.add_workout(&workout(WorkoutKind::Biking, "Remove", "2024-03-11", 40, 9.0), today())?;

    let target = service
        .fetch_records()?
        .into_iter()
        .find(|r| r.name == "Remove")
        .unwrap();
    assert_eq!(target.position, 1);

    // Another writer reorders the sheet between the fetch and the delete
    fs::write(
        &path,
        "workout_type,name,date,duration,distance,details\n\
         Biking,Remove,2024-03-11,40,9,-\n\
         Running,Keep,2024-03-10,20,2,-\n",
    )?;
    service.delete_workout(target.position)?;

    // Positions are not identities: the wrong workout is gone
    let names: Vec<String> = service
        .fetch_records()?
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec!["Remove"]);
    Ok(())
}

#[test]
fn test_unreachable_sheet_is_unavailable() -> Result<()> {
    let dir = TempDir::new()?;
    // A directory where the sheet file should be cannot be read as CSV
    let service = AppService::with_store(
        Config::default(),
        dir.path().join("config.toml"),
        Box::new(CsvSheet::new(dir.path())),
    );

    let err = service.fetch_records().unwrap_err();
    let store_err = store_error(&err);
    assert!(store_err.is_unavailable());
    // The cause is reported once, through the error chain
    assert_eq!(store_err.to_string(), "Workout sheet is unavailable");
    assert!(std::error::Error::source(store_err).is_some());
    assert!(service.weekly_summary(today()).is_err());
    Ok(())
}

#[test]
fn test_sqlite_sheet_keeps_cell_types() -> Result<()> {
    let mut sheet = SqliteSheet::open_in_memory()?;
    sheet.append(
        &RawRow::new()
            .with("WORKOUT_TYPE", "Yoga")
            .with("date", "2024-03-12")
            .with("duration", 45_i64)
            .with("distance", "-"),
    )?;

    let rows = sheet.fetch_all()?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("workout_type"), Some(&CellValue::Text("Yoga".into())));
    assert_eq!(rows[0].get("duration"), Some(&CellValue::Number(45.0)));
    assert_eq!(rows[0].get("distance"), Some(&CellValue::Text("-".into())));
    assert_eq!(rows[0].get("name"), Some(&CellValue::Empty));

    // Rows written by other tools may hold integers or odd text
    sheet.connection().execute(
        "INSERT INTO sheet_rows (workout_type, name, date, duration, distance, details)
         VALUES ('Running', 'Track', 45363, '30', 8, NULL)",
        [],
    )?;
    let records = fitsheet_lib::engine::normalize(&sheet.fetch_all()?);
    assert_eq!(records[0].name, "Today's Workout");
    assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2024, 3, 12));
    assert_eq!(records[1].duration, 30.0);
    assert_eq!(records[1].distance, 8.0);
    assert_eq!(records[1].details, "-");
    Ok(())
}

#[test]
fn test_sqlite_sheet_persists_to_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data").join("workouts.sqlite");
    {
        let mut sheet = SqliteSheet::open(&path)?;
        let row = workout(WorkoutKind::Swimming, "Laps", "2024-03-05", 35, 1.2).into_row(today())?;
        sheet.append(&row)?;
    }
    let sheet = SqliteSheet::open(&path)?;
    assert_eq!(sheet.fetch_all()?.len(), 1);
    assert_eq!(sheet.location(), path.display().to_string());
    Ok(())
}

#[test]
fn test_config_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = dir.path().join("config.toml");

    // Missing file writes and returns the defaults
    let config = fitsheet_lib::load_config_util(&config_path)?;
    assert_eq!(config, Config::default());
    assert!(config_path.exists());

    let custom = Config {
        store: StoreBackend::Sqlite,
        sheet_path: Some(dir.path().join("sheet.sqlite")),
        units: Units::Imperial,
        ..Config::default()
    };
    fitsheet_lib::save_config_util(&config_path, &custom)?;
    let loaded = fitsheet_lib::load_config_util(&config_path)?;
    assert_eq!(loaded, custom);
    assert_eq!(loaded.resolve_sheet_path()?, dir.path().join("sheet.sqlite"));

    // Partial files fall back to defaults for missing keys
    fs::write(&config_path, "units = \"imperial\"\n")?;
    let partial = fitsheet_lib::load_config_util(&config_path)?;
    assert_eq!(partial.store, StoreBackend::Csv);
    assert_eq!(partial.units, Units::Imperial);
    assert_eq!(partial.theme.header_color, "Green");
    Ok(())
}

#[test]
fn test_set_units_saves_config() -> Result<()> {
    let (mut service, dir) = create_test_service()?;
    assert_eq!(service.get_config_path(), dir.path().join("config.toml"));

    service.set_units(Units::Imperial)?;
    let saved = fitsheet_lib::load_config_util(service.get_config_path())?;
    assert_eq!(saved.units, Units::Imperial);
    assert!((Units::Imperial.from_km(10.0) - 6.21371).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_parse_color() {
    assert!(fitsheet_lib::parse_color("cyan").is_ok());
    assert!(fitsheet_lib::parse_color(" Blue ").is_ok());
    assert!(fitsheet_lib::parse_color("chartreuse").is_err());
}
