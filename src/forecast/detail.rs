//! Derived data for the per-country detail screen

use super::{ForecastIndex, ForecastRecord, Period, RiskCategory};

/// Rolling mean window for the violence trend, in observations
pub const ROLLING_WINDOW: usize = 6;

/// An entry in the detail screen's period selector
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodOption {
    pub period: Period,
    /// e.g. "March 2026"
    pub label: String,
    /// e.g. "3-2026"
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date: String,
    pub value: f64,
}

/// Historical fatalities plus the country's forecasts on one time axis
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trend {
    pub history: Vec<TrendPoint>,
    pub rolling_mean: Vec<TrendPoint>,
    pub forecasts: Vec<TrendPoint>,
    pub target: Option<TrendPoint>,
}

impl Trend {
    pub fn max_value(&self) -> f64 {
        self.history
            .iter()
            .chain(&self.forecasts)
            .map(|p| p.value)
            .fold(0.0, f64::max)
    }
}

/// Percentile band used to color covariate bars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    Elevated,
    High,
    Critical,
}

impl Band {
    pub fn from_percentile(p: f64) -> Self {
        if p >= 80.0 {
            Band::Critical
        } else if p >= 60.0 {
            Band::High
        } else if p >= 40.0 {
            Band::Elevated
        } else {
            Band::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CovariateBar {
    pub label: String,
    pub percentile: f64,
    pub band: Band,
}

/// A regional peer placed on the probability / fatalities plane
#[derive(Debug, Clone, PartialEq)]
pub struct PeerPoint {
    pub country_code: String,
    pub country_name: String,
    pub probability: f64,
    pub predicted_fatalities: f64,
    pub risk_category: RiskCategory,
    pub is_target: bool,
}

/// Everything the detail screen shows for one (country, period)
#[derive(Debug, Clone)]
pub struct CountryDetail {
    pub record: ForecastRecord,
    pub period_options: Vec<PeriodOption>,
    pub trend: Trend,
    pub covariates: Vec<CovariateBar>,
    pub peers: Vec<PeerPoint>,
}

impl CountryDetail {
    /// `None` when the index has no forecast for that key
    pub fn build(index: &ForecastIndex, country_code: &str, month: i32, year: i32) -> Option<Self> {
        let record = index.get_forecast(country_code, month, year)?;
        let series = index.country_forecasts(country_code);

        let period_options = series
            .iter()
            .map(|r| {
                let period = r.period();
                PeriodOption {
                    period,
                    label: period.label(),
                    value: period.to_string(),
                }
            })
            .collect();

        Some(Self {
            record: record.clone(),
            period_options,
            trend: build_trend(record, &series),
            covariates: covariate_bars(record),
            peers: peer_points(index, record),
        })
    }

    pub fn period(&self) -> Period {
        self.record.period()
    }

    /// Selector entry for the period on display
    pub fn selected_option(&self) -> Option<&PeriodOption> {
        self.period_options.iter().find(|o| o.period == self.period())
    }

    /// Neighbouring period in the selector, wrapping at both ends
    pub fn step_period(&self, forward: bool) -> Option<Period> {
        let n = self.period_options.len();
        if n == 0 {
            return None;
        }
        let current = self
            .period_options
            .iter()
            .position(|o| o.period == self.period())
            .unwrap_or(0);
        let next = if forward { (current + 1) % n } else { (current + n - 1) % n };
        Some(self.period_options[next].period)
    }
}

fn build_trend(record: &ForecastRecord, series: &[&ForecastRecord]) -> Trend {
    let history: Vec<TrendPoint> = record
        .history
        .iter()
        .map(|o| TrendPoint {
            date: o.date.clone(),
            value: o.fatalities,
        })
        .collect();

    let values: Vec<f64> = history.iter().map(|p| p.value).collect();
    let rolling_mean = rolling_mean(&values, ROLLING_WINDOW)
        .into_iter()
        .zip(history.iter().skip(ROLLING_WINDOW - 1))
        .map(|(value, p)| TrendPoint {
            date: p.date.clone(),
            value,
        })
        .collect();

    let forecasts = series
        .iter()
        .map(|r| TrendPoint {
            date: r.period().date_key(),
            value: r.forecast.predicted_fatalities,
        })
        .collect();

    Trend {
        history,
        rolling_mean,
        forecasts,
        target: Some(TrendPoint {
            date: record.period().date_key(),
            value: record.forecast.predicted_fatalities,
        }),
    }
}

/// Trailing mean over `window` values, one output per full window
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() < window {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

/// Display label for a covariate key
pub fn covariate_label(key: &str) -> String {
    match key {
        "infant_mortality" => "Infant Mortality Rate".to_string(),
        "military_power" => "Military Executive Power".to_string(),
        other => other
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn covariate_bars(record: &ForecastRecord) -> Vec<CovariateBar> {
    record
        .covariates
        .iter()
        .map(|(key, &percentile)| CovariateBar {
            label: covariate_label(key),
            percentile,
            band: Band::from_percentile(percentile),
        })
        .collect()
}

/// Join regional context with the index to learn each peer's risk category
/// in the same period. Peers with no forecast for that period are dropped.
fn peer_points(index: &ForecastIndex, record: &ForecastRecord) -> Vec<PeerPoint> {
    let period = record.period();
    record
        .regional_context
        .iter()
        .filter_map(|peer| {
            let peer_record = index.get(&peer.country_code, period)?;
            Some(PeerPoint {
                country_code: peer.country_code.clone(),
                country_name: peer.country_name.clone(),
                probability: peer.probability,
                predicted_fatalities: peer.predicted_fatalities,
                risk_category: peer_record.forecast.risk_category,
                is_target: peer.country_code == record.country_code,
            })
        })
        .collect()
}
