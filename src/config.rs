use crate::forecast::Period;
use crate::route::Route;
use clap::Parser;
use std::path::PathBuf;

/// Terminal conflict forecast dashboard
#[derive(Debug, Clone, Parser)]
#[command(name = "conflict-map", version, about)]
pub struct Args {
    /// Pre-built forecast dataset (JSON with `metadata` and `forecasts`)
    #[arg(long, env = "FORECAST_DATA", default_value = "data/forecast_data.json")]
    pub data: PathBuf,

    /// Directory holding Natural Earth admin-0 country GeoJSON files
    #[arg(long, env = "FORECAST_GEO_DIR", default_value = "data")]
    pub geo_dir: PathBuf,

    /// Write logs here (the terminal itself is owned by the UI)
    #[arg(long, env = "FORECAST_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Initial map period as month-year, e.g. 12-2025 (default: latest per country)
    #[arg(long, value_parser = parse_period)]
    pub period: Option<Period>,

    /// Open directly at a route such as /country/SDN/12-2025
    #[arg(long, value_parser = parse_route)]
    pub route: Option<Route>,
}

fn parse_period(s: &str) -> Result<Period, String> {
    let period: Period = s.parse()?;
    if !(1..=12).contains(&period.month) {
        return Err(format!("month {} outside 1..=12", period.month));
    }
    Ok(period)
}

fn parse_route(s: &str) -> Result<Route, String> {
    match Route::parse(s) {
        Route::Landing if !matches!(s.trim(), "" | "/") => {
            Err(format!("{:?} is not a /country/CODE/month-year route", s))
        }
        route => Ok(route),
    }
}
