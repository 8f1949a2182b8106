//! Conflict forecast records and the read-only index over them.
//!
//! A dataset is loaded once from a pre-built JSON file, validated into
//! strongly-typed [`ForecastRecord`]s, and indexed by country and period.
//! Every query afterwards is an in-memory lookup.

pub mod detail;
mod index;
mod loader;
mod shared;

pub use detail::CountryDetail;
pub use index::ForecastIndex;
pub use loader::{parse_dataset, read_dataset, Dataset};
pub use shared::SharedIndex;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading a forecast dataset. Loading is the only
/// fallible step; queries never fail.
#[derive(Error, Debug)]
pub enum DataLoadError {
    #[error("failed to read forecast data from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("forecast data is not well-formed JSON: {0}")]
    Parse(#[from] simd_json::Error),
    #[error("forecast data has no `forecasts` array")]
    MissingForecasts,
    #[error("forecast record #{index} ({country}): {reason}")]
    InvalidRecord {
        index: usize,
        country: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, DataLoadError>;

/// Qualitative conflict risk label, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskCategory {
    NearCertainNoConflict,
    ImprobableConflict,
    ProbableConflict,
    NearCertainConflict,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::NearCertainNoConflict,
        RiskCategory::ImprobableConflict,
        RiskCategory::ProbableConflict,
        RiskCategory::NearCertainConflict,
    ];

    /// Label exactly as it appears in the dataset
    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::NearCertainNoConflict => "Near-certain no conflict",
            RiskCategory::ImprobableConflict => "Improbable conflict",
            RiskCategory::ProbableConflict => "Probable conflict",
            RiskCategory::NearCertainConflict => "Near-certain conflict",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RiskCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RiskCategory::ALL
            .into_iter()
            .find(|c| c.label() == s)
            .ok_or_else(|| format!("unknown risk category {:?}", s))
    }
}

/// A forecast period. Ordering compares year first, then month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    pub year: i32,
    pub month: i32,
}

impl Period {
    pub fn new(year: i32, month: i32) -> Self {
        Self { year, month }
    }

    /// `"YYYY-MM"`, the date form used by the historical series
    pub fn date_key(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }

    /// Human label such as "December 2025"
    pub fn label(&self) -> String {
        format!("{} {}", month_name(self.month), self.year)
    }
}

/// Selector form `"{month}-{year}"`
impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.month, self.year)
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (month, year) = s
            .split_once('-')
            .ok_or_else(|| format!("period {:?} is not of the form month-year", s))?;
        let month: i32 = month
            .trim()
            .parse()
            .map_err(|_| format!("invalid month in period {:?}", s))?;
        let year: i32 = year
            .trim()
            .parse()
            .map_err(|_| format!("invalid year in period {:?}", s))?;
        Ok(Period::new(year, month))
    }
}

/// Full English month name; out-of-range months fall back to the number.
pub fn month_name(month: i32) -> String {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    usize::try_from(month - 1)
        .ok()
        .and_then(|i| NAMES.get(i))
        .map(|name| name.to_string())
        .unwrap_or_else(|| month.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastValues {
    pub predicted_fatalities: f64,
    pub risk_category: RiskCategory,
}

/// One month of observed fatalities
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: String,
    pub fatalities: f64,
}

/// A peer country's forecast summary used for comparison plots
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalPeer {
    pub country_code: String,
    pub country_name: String,
    /// Probability of at least 25 fatalities
    pub probability: f64,
    pub predicted_fatalities: f64,
}

/// One forecast for one (country, month, year)
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRecord {
    pub country_code: String,
    pub country_name: String,
    pub month: i32,
    pub year: i32,
    pub forecast: ForecastValues,
    pub bluf: String,
    /// Indicator name to percentile rank (0-100)
    pub covariates: BTreeMap<String, f64>,
    /// Chronological monthly observations
    pub history: Vec<Observation>,
    pub regional_context: Vec<RegionalPeer>,
    pub cohort: Option<String>,
}

impl ForecastRecord {
    pub fn period(&self) -> Period {
        Period::new(self.year, self.month)
    }
}
