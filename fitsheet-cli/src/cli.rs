// src/cli.rs
use chrono::NaiveDate;
use clap::{Command, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(author, version, about = "Log workouts to a sheet and review them", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print tables as CSV instead of formatted text
    #[arg(long, global = true)]
    pub export_csv: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkoutKindCli {
    Running,
    Swimming,
    Biking,
    Weights,
    Other,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortCli {
    #[default]
    None,
    Distance,
    Recent,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PeriodCli {
    #[default]
    Week,
    Month,
    Year,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ParameterCli {
    #[default]
    Duration,
    Distance,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitsCli {
    Metric,
    Imperial,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the past week's most used workout and the last workout logged
    Home,
    /// Log a new workout
    Add {
        /// Workout type
        #[arg(short = 't', long = "type", value_enum)]
        kind: WorkoutKindCli,
        /// Workout name (defaults to "Today's Workout")
        #[arg(short, long, default_value = fitsheet_lib::DEFAULT_WORKOUT_NAME)]
        name: String,
        /// Date of the workout (YYYY-MM-DD, defaults to today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        /// Duration in minutes
        #[arg(short, long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
        duration: i64,
        /// Distance in kilometres
        #[arg(short = 'k', long, default_value_t = 0.0)]
        distance: f64,
        /// Any details about the workout
        #[arg(long, default_value = "")]
        details: String,
    },
    /// List logged workouts
    #[command(alias = "view")]
    List {
        /// Only show this workout type ("All" shows every type)
        #[arg(short = 't', long = "type", default_value = fitsheet_lib::ALL_TYPES)]
        type_: String,
        /// Sort order
        #[arg(short, long, value_enum, default_value_t = SortCli::None)]
        sort: SortCli,
    },
    /// Delete the workout at POSITION (as shown by 'list')
    Delete { position: usize },
    /// Chart duration or distance per day over a time period
    Graph {
        /// Only chart this workout type ("All" charts every type)
        #[arg(short = 't', long = "type", default_value = fitsheet_lib::ALL_TYPES)]
        type_: String,
        /// Time period
        #[arg(short, long, value_enum, default_value_t = PeriodCli::Week)]
        period: PeriodCli,
        /// Value to chart
        #[arg(short = 'm', long, value_enum, default_value_t = ParameterCli::Duration)]
        parameter: ParameterCli,
    },
    /// List the workout types present in the sheet
    Types,
    /// Set the units distances are displayed in
    SetUnits {
        #[arg(value_enum)]
        units: UnitsCli,
    },
    /// Show the path to the config file
    ConfigPath,
    /// Show the path to the workout sheet
    SheetPath,
    /// Generate shell completion scripts
    GenerateCompletion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_date(arg: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(arg, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{arg}' (expected YYYY-MM-DD): {e}"))
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn build_cli_command() -> Command {
    Cli::command()
}
