//! Reading and validating the forecast dataset

use super::{
    DataLoadError, ForecastRecord, ForecastValues, Observation, RegionalPeer, Result, RiskCategory,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// The full validated collection plus its auxiliary metadata
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<ForecastRecord>,
    pub metadata: Map<String, Value>,
}

/// Raw document as found on disk
#[derive(Debug, Deserialize)]
struct RawDataset {
    metadata: Option<Map<String, Value>>,
    forecasts: Option<Vec<RawForecast>>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    country_code: Option<String>,
    country_name: Option<String>,
    month: Option<i64>,
    year: Option<i64>,
    forecast: Option<RawForecastValues>,
    bluf: Option<String>,
    covariates: Option<BTreeMap<String, f64>>,
    historical: Option<RawHistorical>,
    regional_context: Option<Vec<RawPeer>>,
    cohort: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawForecastValues {
    predicted_fatalities: Option<f64>,
    risk_category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHistorical {
    monthly_data: Option<Vec<RawObservation>>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: Option<String>,
    fatalities: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawPeer {
    country_code: Option<String>,
    country_name: Option<String>,
    probability: Option<f64>,
    predicted_fatalities: Option<f64>,
}

/// Read and validate a dataset file
pub fn read_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    info!("Loading forecast data from {:?}", path);

    let mut bytes = fs::read(path).map_err(|source| DataLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dataset(&mut bytes)
}

/// Parse and validate a dataset from raw JSON bytes.
/// simd-json parses in place, so the buffer is clobbered.
pub fn parse_dataset(bytes: &mut [u8]) -> Result<Dataset> {
    let raw: RawDataset = simd_json::serde::from_slice(bytes)?;
    let forecasts = raw.forecasts.ok_or(DataLoadError::MissingForecasts)?;

    let records = forecasts
        .into_iter()
        .enumerate()
        .map(|(index, raw)| validate_record(index, raw))
        .collect::<Result<Vec<_>>>()?;

    debug!("Validated {} forecast records", records.len());

    Ok(Dataset {
        records,
        metadata: raw.metadata.unwrap_or_default(),
    })
}

/// Turn a raw record into a typed one, rejecting anything missing or
/// out of range. Missing values are never defaulted.
fn validate_record(index: usize, raw: RawForecast) -> Result<ForecastRecord> {
    let country = raw.country_code.clone().unwrap_or_else(|| "?".to_string());
    let invalid = |reason: String| DataLoadError::InvalidRecord {
        index,
        country: country.clone(),
        reason,
    };
    let missing = |field: &str| invalid(format!("missing field `{}`", field));

    let country_code = raw.country_code.ok_or_else(|| missing("country_code"))?;
    if country_code.trim().is_empty() {
        return Err(invalid("empty country_code".to_string()));
    }
    let country_name = raw.country_name.ok_or_else(|| missing("country_name"))?;

    let month = raw.month.ok_or_else(|| missing("month"))?;
    if !(1..=12).contains(&month) {
        return Err(invalid(format!("month {} outside 1..=12", month)));
    }
    let year = raw.year.ok_or_else(|| missing("year"))?;
    let year = i32::try_from(year).map_err(|_| invalid(format!("year {} out of range", year)))?;

    let values = raw.forecast.ok_or_else(|| missing("forecast"))?;
    let predicted_fatalities = values
        .predicted_fatalities
        .ok_or_else(|| missing("forecast.predicted_fatalities"))?;
    if !predicted_fatalities.is_finite() || predicted_fatalities < 0.0 {
        return Err(invalid(format!(
            "predicted_fatalities {} is not a non-negative number",
            predicted_fatalities
        )));
    }
    let risk_category: RiskCategory = values
        .risk_category
        .ok_or_else(|| missing("forecast.risk_category"))?
        .parse()
        .map_err(&invalid)?;

    let bluf = raw.bluf.ok_or_else(|| missing("bluf"))?;

    let covariates = raw.covariates.ok_or_else(|| missing("covariates"))?;
    if let Some((name, value)) = covariates
        .iter()
        .find(|(_, v)| !v.is_finite() || !(0.0..=100.0).contains(*v))
    {
        return Err(invalid(format!(
            "covariate `{}` percentile {} outside 0..=100",
            name, value
        )));
    }

    let monthly = raw
        .historical
        .ok_or_else(|| missing("historical"))?
        .monthly_data
        .ok_or_else(|| missing("historical.monthly_data"))?;
    let mut history = Vec::with_capacity(monthly.len());
    for (i, obs) in monthly.into_iter().enumerate() {
        let date = obs
            .date
            .ok_or_else(|| invalid(format!("monthly_data[{}] missing `date`", i)))?;
        let fatalities = obs
            .fatalities
            .ok_or_else(|| invalid(format!("monthly_data[{}] missing `fatalities`", i)))?;
        if !fatalities.is_finite() || fatalities < 0.0 {
            return Err(invalid(format!(
                "monthly_data[{}] fatalities {} is not a non-negative number",
                i, fatalities
            )));
        }
        history.push(Observation { date, fatalities });
    }

    let peers = raw
        .regional_context
        .ok_or_else(|| missing("regional_context"))?;
    let mut regional_context = Vec::with_capacity(peers.len());
    for (i, peer) in peers.into_iter().enumerate() {
        let field = |name: &str| invalid(format!("regional_context[{}] missing `{}`", i, name));
        let probability = peer.probability.ok_or_else(|| field("probability"))?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(invalid(format!(
                "regional_context[{}] probability {} outside 0..=1",
                i, probability
            )));
        }
        let peer_fatalities = peer
            .predicted_fatalities
            .ok_or_else(|| field("predicted_fatalities"))?;
        if !peer_fatalities.is_finite() || peer_fatalities < 0.0 {
            return Err(invalid(format!(
                "regional_context[{}] predicted_fatalities {} is not a non-negative number",
                i, peer_fatalities
            )));
        }
        regional_context.push(RegionalPeer {
            country_code: peer.country_code.ok_or_else(|| field("country_code"))?,
            country_name: peer.country_name.ok_or_else(|| field("country_name"))?,
            probability,
            predicted_fatalities: peer_fatalities,
        });
    }

    Ok(ForecastRecord {
        country_code,
        country_name,
        month: month as i32,
        year,
        forecast: ForecastValues {
            predicted_fatalities,
            risk_category,
        },
        bluf,
        covariates,
        history,
        regional_context,
        cohort: raw.cohort,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// A well-formed record as JSON text
    pub(crate) fn record_json(code: &str, month: i32, year: i32, fatalities: f64) -> String {
        format!(
            r#"{{
                "country_code": "{code}", "country_name": "{code} name",
                "month": {month}, "year": {year},
                "forecast": {{ "predicted_fatalities": {fatalities}, "risk_category": "Probable conflict" }},
                "bluf": "Summary for {code}",
                "covariates": {{ "infant_mortality": 72, "military_power": 55 }},
                "historical": {{ "monthly_data": [ {{"date": "2024-01", "fatalities": 10}} ] }},
                "regional_context": [
                    {{"country_code": "ETH", "country_name": "Ethiopia", "probability": 0.2, "predicted_fatalities": 5.0}}
                ]
            }}"#
        )
    }

    pub(crate) fn dataset_json(records: &[String]) -> String {
        format!(
            r#"{{ "metadata": {{ "months": [3, 9, 12] }}, "forecasts": [{}] }}"#,
            records.join(",")
        )
    }

    fn parse(json: &str) -> Result<Dataset> {
        let mut bytes = json.as_bytes().to_vec();
        parse_dataset(&mut bytes)
    }

    #[test]
    fn test_parse_well_formed_dataset() {
        let json = dataset_json(&[record_json("SDN", 12, 2025, 123.4)]);
        let dataset = parse(&json).unwrap();

        assert_eq!(dataset.records.len(), 1);
        let record = &dataset.records[0];
        assert_eq!(record.country_code, "SDN");
        assert_eq!(record.period(), crate::forecast::Period::new(2025, 12));
        assert_eq!(record.forecast.predicted_fatalities, 123.4);
        assert_eq!(record.forecast.risk_category, RiskCategory::ProbableConflict);
        assert_eq!(record.covariates.get("infant_mortality"), Some(&72.0));
        assert_eq!(record.history[0].fatalities, 10.0);
        assert_eq!(record.regional_context[0].country_code, "ETH");
        assert!(record.cohort.is_none());
        assert!(dataset.metadata.contains_key("months"));
    }

    #[test]
    fn test_missing_metadata_is_empty() {
        let json = format!(r#"{{ "forecasts": [{}] }}"#, record_json("SDN", 3, 2026, 1.0));
        let dataset = parse(&json).unwrap();
        assert!(dataset.metadata.is_empty());
    }

    #[test]
    fn test_missing_forecasts_key() {
        let err = parse(r#"{ "metadata": {} }"#).unwrap_err();
        assert!(matches!(err, DataLoadError::MissingForecasts));
    }

    #[test]
    fn test_malformed_json() {
        let err = parse(r#"{ "forecasts": [ "#).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse(_)));
    }

    #[test]
    fn test_missing_fatalities_is_rejected_not_defaulted() {
        let record =
            record_json("SDN", 12, 2025, 1.0).replace(r#""predicted_fatalities": 1, "#, "");
        assert!(record.contains(r#""forecast": { "risk_category""#));
        let err = parse(&dataset_json(&[record])).unwrap_err();
        match err {
            DataLoadError::InvalidRecord { index, country, reason } => {
                assert_eq!(index, 0);
                assert_eq!(country, "SDN");
                assert!(reason.contains("predicted_fatalities"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_risk_category_is_rejected() {
        let record = record_json("SDN", 12, 2025, 1.0).replace("Probable conflict", "Maybe");
        let err = parse(&dataset_json(&[record])).unwrap_err();
        assert!(err.to_string().contains("unknown risk category"));
    }

    #[test]
    fn test_month_out_of_range_is_rejected() {
        let err = parse(&dataset_json(&[
            record_json("SDN", 12, 2025, 1.0),
            record_json("ETH", 13, 2025, 1.0),
        ]))
        .unwrap_err();
        match err {
            DataLoadError::InvalidRecord { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_fatalities_rejected() {
        let err = parse(&dataset_json(&[record_json("SDN", 12, 2025, -4.0)])).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidRecord { .. }));
    }

    /// Load a valid record followed by `bad`, expecting `bad` to be rejected
    fn rejection(bad: String) -> (usize, String, String) {
        let json = dataset_json(&[record_json("SDN", 12, 2025, 1.0), bad]);
        match parse(&json).unwrap_err() {
            DataLoadError::InvalidRecord { index, country, reason } => (index, country, reason),
            other => panic!("unexpected error: {other}"),
        }
    }

    fn eth(edit: impl Fn(String) -> String) -> String {
        edit(record_json("ETH", 12, 2025, 5.0))
    }

    #[test]
    fn test_covariate_out_of_range_rejected() {
        let (index, country, reason) =
            rejection(eth(|r| r.replace(r#""military_power": 55"#, r#""military_power": 101"#)));
        assert_eq!((index, country.as_str()), (1, "ETH"));
        assert_eq!(reason, "covariate `military_power` percentile 101 outside 0..=100");

        let (_, _, reason) =
            rejection(eth(|r| r.replace(r#""infant_mortality": 72"#, r#""infant_mortality": -1"#)));
        assert_eq!(reason, "covariate `infant_mortality` percentile -1 outside 0..=100");
    }

    #[test]
    fn test_peer_probability_out_of_range_rejected() {
        let (index, _, reason) =
            rejection(eth(|r| r.replace(r#""probability": 0.2"#, r#""probability": 1.5"#)));
        assert_eq!(index, 1);
        assert_eq!(reason, "regional_context[0] probability 1.5 outside 0..=1");
    }

    #[test]
    fn test_empty_country_code_rejected() {
        let (index, country, reason) = rejection(record_json(" ", 12, 2025, 5.0));
        assert_eq!(index, 1);
        assert_eq!(country, " ");
        assert_eq!(reason, "empty country_code");
    }

    #[test]
    fn test_negative_history_fatalities_rejected() {
        let (index, _, reason) =
            rejection(eth(|r| r.replace(r#""fatalities": 10"#, r#""fatalities": -3"#)));
        assert_eq!(index, 1);
        assert_eq!(reason, "monthly_data[0] fatalities -3 is not a non-negative number");
    }

    #[test]
    fn test_history_missing_fields_rejected() {
        let (_, _, reason) = rejection(eth(|r| r.replace(r#", "fatalities": 10"#, "")));
        assert_eq!(reason, "monthly_data[0] missing `fatalities`");

        let (_, _, reason) = rejection(eth(|r| r.replace(r#""date": "2024-01", "#, "")));
        assert_eq!(reason, "monthly_data[0] missing `date`");
    }

    #[test]
    fn test_year_beyond_i32_rejected() {
        let (index, _, reason) =
            rejection(eth(|r| r.replace(r#""year": 2025"#, r#""year": 3000000000"#)));
        assert_eq!(index, 1);
        assert_eq!(reason, "year 3000000000 out of range");
    }

    #[test]
    fn test_peer_missing_fields_rejected() {
        let (index, _, reason) =
            rejection(eth(|r| r.replace(r#""country_name": "Ethiopia", "#, "")));
        assert_eq!(index, 1);
        assert_eq!(reason, "regional_context[0] missing `country_name`");

        let (_, _, reason) = rejection(eth(|r| r.replace(r#""probability": 0.2, "#, "")));
        assert_eq!(reason, "regional_context[0] missing `probability`");

        let (_, _, reason) = rejection(eth(|r| {
            r.replace(
                r#""country_code": "ETH", "country_name": "Ethiopia", "#,
                r#""country_name": "Ethiopia", "#,
            )
        }));
        assert_eq!(reason, "regional_context[0] missing `country_code`");
    }

    #[test]
    fn test_read_dataset_from_file() {
        let json = dataset_json(&[record_json("SDN", 12, 2025, 50.0)]);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let dataset = read_dataset(file.path()).unwrap();
        assert_eq!(dataset.records.len(), 1);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dataset(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, DataLoadError::Io { .. }));
    }
}
