use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::data::query::{filter, FilterQuery};
use crate::data::views;
use crate::data::{DataSource, Dataset, DatasetLoader, Metric};
use crate::server;

const USAGE: &str = "usage: covid-explorer <serve|summary|series|validate>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Serve,
    Summary,
    Series,
    Validate,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("serve") => Some(Command::Serve),
        Some("summary") => Some(Command::Summary),
        Some("series") => Some(Command::Series),
        Some("validate") => Some(Command::Validate),
        _ => None,
    }
}

/// Dispatch a command line; returns the process exit code.
pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid configuration");
            return 1;
        }
    };

    match command {
        Command::Serve => handle_serve(&config),
        Command::Summary => handle_summary(&config),
        Command::Series => handle_series(&config, args),
        Command::Validate => handle_validate(&config, args),
    }
}

fn load_dataset(source: DataSource) -> Option<Arc<Dataset>> {
    match DatasetLoader::new(source).load() {
        Ok(dataset) => Some(dataset),
        Err(err) => {
            error!(error = %err, "cannot start without the case dataset");
            None
        }
    }
}

fn handle_serve(config: &AppConfig) -> i32 {
    let Some(dataset) = load_dataset(DataSource::new(&config.data_dir)) else {
        return 1;
    };
    match server::run_server(config, dataset) {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "server error");
            1
        }
    }
}

fn handle_summary(config: &AppConfig) -> i32 {
    let Some(dataset) = load_dataset(DataSource::new(&config.data_dir)) else {
        return 1;
    };
    print_json(&views::summary(&dataset))
}

fn handle_series(config: &AppConfig, args: &[String]) -> i32 {
    let Some(region) = args.get(2) else {
        eprintln!("usage: covid-explorer series <region> [start YYYY-MM-DD] [end YYYY-MM-DD]");
        return 2;
    };
    let Some(dataset) = load_dataset(DataSource::new(&config.data_dir)) else {
        return 1;
    };

    let query = FilterQuery {
        start: parse_date_arg(args.get(3), "start"),
        end: parse_date_arg(args.get(4), "end"),
        ..FilterQuery::region(region.as_str())
    };
    let projection = filter(&dataset, &query);
    if projection.is_empty() {
        info!(region = %region, "no records matched");
    }
    print_json(&projection)
}

fn handle_validate(config: &AppConfig, args: &[String]) -> i32 {
    let dir = args
        .get(2)
        .map_or_else(|| config.data_dir.clone(), Into::into);
    let source = DataSource::new(dir);
    match source.read() {
        Ok(dataset) => {
            let metrics: Vec<&str> = dataset.metrics().iter().map(Metric::as_str).collect();
            println!(
                "validation passed: {} regions, {} dates ({}..{}), {} records, metrics: {}",
                dataset.regions().len(),
                dataset.dates().len(),
                dataset.first_date(),
                dataset.last_date(),
                dataset.len(),
                metrics.join(",")
            );
            0
        }
        Err(err) => {
            eprintln!("validation failed: {err}");
            1
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> i32 {
    match serde_json::to_string_pretty(value) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            error!(error = %err, "failed to serialize output");
            1
        }
    }
}

fn parse_date_arg(raw: Option<&String>, name: &str) -> Option<NaiveDate> {
    let raw = raw?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            warn!("invalid {name} date '{raw}', leaving the bound open");
            None
        }
    }
}
