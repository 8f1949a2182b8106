use crate::forecast::Period;
use std::fmt;

/// Screen address. Detail views are keyed by (country, month, year).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Landing,
    Country { code: String, period: Period },
}

impl Route {
    pub fn country(code: impl Into<String>, period: Period) -> Self {
        Route::Country {
            code: code.into(),
            period,
        }
    }

    /// Parse `/country/{CODE}/{month}-{year}`. Anything else, including a
    /// malformed period, lands on the map.
    pub fn parse(path: &str) -> Self {
        let mut parts = path.trim_start_matches('/').split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("country"), Some(code), Some(period)) if !code.is_empty() => {
                match period.parse::<Period>() {
                    Ok(period) => Route::country(code, period),
                    Err(_) => Route::Landing,
                }
            }
            _ => Route::Landing,
        }
    }

    /// Route for a map click at `location` with the selector showing `selector`
    pub fn from_selection(location: &str, selector: &str) -> Option<Self> {
        if location.is_empty() {
            return None;
        }
        let period = selector.parse::<Period>().ok()?;
        Some(Route::country(location, period))
    }

    /// Same country at another period; the landing page has no period
    pub fn with_period(&self, period: Period) -> Option<Self> {
        match self {
            Route::Landing => None,
            Route::Country { code, .. } => Some(Route::country(code.clone(), period)),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Landing => f.write_str("/"),
            Route::Country { code, period } => write!(f, "/country/{}/{}", code, period),
        }
    }
}
