//src/main.rs
mod cli;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use std::io::{self, stdout};

use fitsheet_lib::{
    AppService, NewWorkout, Parameter, Period, SeriesPoint, SortMode, StoreError, TypeFilter,
    Units, WeeklySummary, WorkoutKind, WorkoutRecord, ALL_TYPES,
};

const BAR_WIDTH: f64 = 40.0;

fn main() -> Result<()> {
    env_logger::init();

    let cli_args = cli::parse_args();
    let export_csv = cli_args.export_csv;

    if let cli::Commands::GenerateCompletion { shell } = cli_args.command {
        let mut cmd = cli::build_cli_command();
        let bin_name = cmd.get_name().to_string();
        eprintln!("Generating completion script for {shell}...");
        clap_complete::generate(shell, &mut cmd, bin_name, &mut stdout());
        return Ok(());
    }

    let mut service = match AppService::initialize() {
        Ok(service) => service,
        Err(e) if is_store_unavailable(&e) => {
            // Opening the sheet is part of every page; treat it like an empty sheet
            println!("No workout data available.");
            eprintln!("{e:#}");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to initialize application service"),
    };
    let today = Local::now().date_naive();

    match cli_args.command {
        cli::Commands::GenerateCompletion { .. } => {
            unreachable!("Completion generation should have exited already");
        }
        cli::Commands::Home => show_home_page(&service, today, export_csv),
        cli::Commands::Add {
            kind,
            name,
            date,
            duration,
            distance,
            details,
        } => {
            let workout = NewWorkout {
                kind: cli_kind_to_lib(kind),
                name,
                date,
                duration_minutes: duration,
                distance_km: distance,
                details,
            };
            show_add_workout_page(&mut service, &workout, today);
            Ok(())
        }
        cli::Commands::List { type_, sort } => {
            show_view_workouts_page(&service, &type_, cli_sort_to_lib(sort), export_csv)
        }
        cli::Commands::Delete { position } => {
            match service.delete_workout(position) {
                Ok(()) => println!("Workout deleted!"),
                Err(e) => eprintln!("An error occurred while deleting: {e:#}"),
            }
            Ok(())
        }
        cli::Commands::Graph {
            type_,
            period,
            parameter,
        } => show_create_graph_page(
            &service,
            &type_,
            cli_period_to_lib(period),
            cli_parameter_to_lib(parameter),
            today,
            export_csv,
        ),
        cli::Commands::Types => {
            match service.workout_types() {
                Ok(types) if types.is_empty() => println!("No workouts recorded yet."),
                Ok(types) => {
                    println!("{ALL_TYPES}");
                    for workout_type in types {
                        println!("{workout_type}");
                    }
                }
                Err(e) => report_read_error(&e, "No workout data available."),
            }
            Ok(())
        }
        cli::Commands::SetUnits { units } => {
            let units = match units {
                cli::UnitsCli::Metric => Units::Metric,
                cli::UnitsCli::Imperial => Units::Imperial,
            };
            service
                .set_units(units)
                .context("Error setting units")?;
            println!("Successfully set display units to: {units:?}");
            println!("Config file updated: {:?}", service.get_config_path());
            Ok(())
        }
        cli::Commands::ConfigPath => {
            println!("Config file is located at: {:?}", service.get_config_path());
            Ok(())
        }
        cli::Commands::SheetPath => {
            println!(
                "Workout sheet ({:?}) is located at: {:?}",
                service.config.store,
                service.get_sheet_path()
            );
            Ok(())
        }
    }
}

// --- Pages ---

fn show_home_page(service: &AppService, today: NaiveDate, export_csv: bool) -> Result<()> {
    if !export_csv {
        println!("Welcome to fitsheet!");
        println!("Today's date is {}", today.format("%B %d, %Y"));
        println!();
    }

    let summary = match service.weekly_summary(today) {
        Ok(Some(summary)) => summary,
        Ok(None) => {
            println!("No workouts in the past week.");
            return Ok(());
        }
        Err(e) => {
            report_read_error(&e, "No workout data available.");
            return Ok(());
        }
    };

    let units = service.config.units;
    if export_csv {
        return print_type_distance_csv(&summary, units);
    }

    println!(
        "Your most used workout type in the past week was {}!",
        summary.top_type
    );
    println!(
        "Total distance: {}",
        format_distance(summary.top_distance, units)
    );
    println!();
    println!("Workout types and total distance in the past week:");
    let bars: Vec<(String, f64)> = summary
        .distance_by_type
        .iter()
        .map(|(workout_type, km)| (workout_type.clone(), units.from_km(*km)))
        .collect();
    print_bar_chart(&bars, units.distance_label());
    println!();
    println!("Last workout details:");
    print_workout_card(&summary.last_workout, header_color(service), units);
    Ok(())
}

fn show_add_workout_page(service: &mut AppService, workout: &NewWorkout, today: NaiveDate) {
    match service.add_workout(workout, today) {
        Ok(row) => {
            log::debug!("Saved row {row:?}");
            println!(
                "Workout saved successfully! ({} on {})",
                workout.kind,
                workout.date.unwrap_or(today).format("%Y-%m-%d")
            );
        }
        Err(e) => eprintln!("An error occurred: {e:#}"),
    }
}

fn show_view_workouts_page(
    service: &AppService,
    type_selection: &str,
    sort_mode: SortMode,
    export_csv: bool,
) -> Result<()> {
    let type_filter = TypeFilter::from_selection(type_selection);
    let workouts = match service.list_workouts(&type_filter, sort_mode) {
        Ok(workouts) => workouts,
        Err(e) => {
            report_read_error(&e, "No workouts recorded yet.");
            return Ok(());
        }
    };
    if workouts.is_empty() {
        match type_filter {
            TypeFilter::All => {
                println!("No workouts recorded yet. Add some with 'fitsheet add'.");
            }
            TypeFilter::Only(_) => println!("No workouts found."),
        }
        return Ok(());
    }

    if export_csv {
        print_workout_csv(&workouts, service.config.units)
    } else {
        print_workout_table(&workouts, header_color(service), service.config.units);
        Ok(())
    }
}

fn show_create_graph_page(
    service: &AppService,
    type_selection: &str,
    period: Period,
    parameter: Parameter,
    today: NaiveDate,
    export_csv: bool,
) -> Result<()> {
    let type_filter = TypeFilter::from_selection(type_selection);
    let series = match service.graph_series(&type_filter, period, parameter, today) {
        Ok(series) => series,
        Err(e) => {
            report_read_error(&e, "No workout data available to create graphs.");
            return Ok(());
        }
    };
    if series.is_empty() {
        println!("No data available for selected filters.");
        return Ok(());
    }

    let units = service.config.units;
    let (points, unit_label) = display_series(&series, parameter, units);
    if export_csv {
        return print_series_csv(&points, parameter, unit_label);
    }

    println!("{parameter} over {}", period.label());
    print_series_table(&points, parameter, unit_label, header_color(service));
    print_bar_chart(&points, unit_label);
    Ok(())
}

// --- Helpers ---

fn is_store_unavailable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<StoreError>()
        .is_some_and(StoreError::is_unavailable)
}

/// Page-boundary recovery for read failures: an unreachable sheet shows the
/// page's empty state, anything else is reported without aborting.
fn report_read_error(err: &anyhow::Error, empty_message: &str) {
    if is_store_unavailable(err) {
        println!("{empty_message}");
        log::warn!("{err:#}");
    } else {
        eprintln!("An error occurred: {err:#}");
    }
}

fn header_color(service: &AppService) -> Color {
    fitsheet_lib::parse_color(&service.config.theme.header_color)
        .map(Color::from)
        .unwrap_or(Color::Green) // Fallback
}

fn format_distance(km: f64, units: Units) -> String {
    format!("{:.2} {}", units.from_km(km), units.distance_label())
}

fn display_series(
    series: &[SeriesPoint],
    parameter: Parameter,
    units: Units,
) -> (Vec<(String, f64)>, &'static str) {
    let label = match parameter {
        Parameter::Duration => "min",
        Parameter::Distance => units.distance_label(),
    };
    let points = series
        .iter()
        .map(|point| {
            let value = match parameter {
                Parameter::Duration => point.total,
                Parameter::Distance => units.from_km(point.total),
            };
            (point.period.clone(), value)
        })
        .collect();
    (points, label)
}

const fn cli_kind_to_lib(kind: cli::WorkoutKindCli) -> WorkoutKind {
    match kind {
        cli::WorkoutKindCli::Running => WorkoutKind::Running,
        cli::WorkoutKindCli::Swimming => WorkoutKind::Swimming,
        cli::WorkoutKindCli::Biking => WorkoutKind::Biking,
        cli::WorkoutKindCli::Weights => WorkoutKind::Weights,
        cli::WorkoutKindCli::Other => WorkoutKind::Other,
    }
}

const fn cli_sort_to_lib(sort: cli::SortCli) -> SortMode {
    match sort {
        cli::SortCli::None => SortMode::None,
        cli::SortCli::Distance => SortMode::Distance,
        cli::SortCli::Recent => SortMode::Recent,
    }
}

const fn cli_period_to_lib(period: cli::PeriodCli) -> Period {
    match period {
        cli::PeriodCli::Week => Period::PastWeek,
        cli::PeriodCli::Month => Period::PastMonth,
        cli::PeriodCli::Year => Period::PastYear,
    }
}

const fn cli_parameter_to_lib(parameter: cli::ParameterCli) -> Parameter {
    match parameter {
        cli::ParameterCli::Duration => Parameter::Duration,
        cli::ParameterCli::Distance => Parameter::Distance,
    }
}

// --- Table Printing Functions ---

/// Prints workouts in a table; the Pos column is what 'delete' takes.
fn print_workout_table(workouts: &[WorkoutRecord], header_color: Color, units: Units) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Pos").fg(header_color),
            Cell::new("Type").fg(header_color),
            Cell::new("Name").fg(header_color),
            Cell::new("Date").fg(header_color),
            Cell::new("Duration (min)").fg(header_color),
            Cell::new(format!("Distance ({})", units.distance_label())).fg(header_color),
            Cell::new("Details").fg(header_color),
        ]);

    for workout in workouts {
        table.add_row(vec![
            Cell::new(workout.position.to_string()),
            Cell::new(&workout.workout_type),
            Cell::new(&workout.name),
            Cell::new(workout.date_label()),
            Cell::new(format!("{}", workout.duration)),
            Cell::new(format!("{:.2}", units.from_km(workout.distance))),
            Cell::new(&workout.details),
        ]);
    }
    println!("{table}");
}

/// Prints a single workout as a two-column card.
fn print_workout_card(workout: &WorkoutRecord, header_color: Color, units: Units) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let fields = [
        ("Workout Type", workout.workout_type.clone()),
        ("Name", workout.name.clone()),
        ("Date", workout.date_label()),
        ("Duration", format!("{} min", workout.duration)),
        ("Distance", format_distance(workout.distance, units)),
        ("Details", workout.details.clone()),
    ];
    for (label, value) in fields {
        table.add_row(vec![
            Cell::new(label)
                .fg(header_color)
                .add_attribute(Attribute::Bold),
            Cell::new(value),
        ]);
    }
    println!("{table}");
}

fn print_series_table(
    points: &[(String, f64)],
    parameter: Parameter,
    unit_label: &str,
    header_color: Color,
) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Date").fg(header_color),
            Cell::new(format!("{parameter} ({unit_label})")).fg(header_color),
        ]);
    for (period, value) in points {
        table.add_row(vec![Cell::new(period), Cell::new(format!("{value:.2}"))]);
    }
    println!("{table}");
}

/// Horizontal bar chart scaled to the largest value.
fn print_bar_chart(points: &[(String, f64)], unit_label: &str) {
    let max_value = points.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    let label_width = points.iter().map(|(label, _)| label.len()).max().unwrap_or(0);

    for (label, value) in points {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let bar_len = if max_value > 0.0 {
            ((value / max_value) * BAR_WIDTH).round() as usize
        } else {
            0
        };
        println!(
            "{label:<label_width$} | {} {value:.2} {unit_label}",
            "█".repeat(bar_len)
        );
    }
}

fn print_workout_csv(workouts: &[WorkoutRecord], units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record([
        "Position",
        "Type",
        "Name",
        "Date",
        "Duration_min",
        &format!("Distance_{}", units.distance_label()),
        "Details",
    ])?;

    for workout in workouts {
        writer.write_record([
            workout.position.to_string(),
            workout.workout_type.clone(),
            workout.name.clone(),
            workout.date_label(),
            workout.duration.to_string(),
            format!("{:.2}", units.from_km(workout.distance)),
            workout.details.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_type_distance_csv(summary: &WeeklySummary, units: Units) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Type", &format!("Distance_{}", units.distance_label())])?;
    for (workout_type, km) in &summary.distance_by_type {
        writer.write_record([workout_type.clone(), format!("{:.2}", units.from_km(*km))])?;
    }
    writer.flush()?;
    Ok(())
}

fn print_series_csv(points: &[(String, f64)], parameter: Parameter, unit_label: &str) -> Result<()> {
    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(["Period", &format!("{parameter}_{unit_label}")])?;
    for (period, value) in points {
        writer.write_record([period.clone(), format!("{value:.2}")])?;
    }
    writer.flush()?;
    Ok(())
}
