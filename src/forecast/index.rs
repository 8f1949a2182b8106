use super::{loader, Dataset, ForecastRecord, Period, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{info, warn};

/// Per-country lookup structures (positions into the record arena)
#[derive(Debug, Default)]
struct CountrySlot {
    by_period: HashMap<Period, usize>,
    /// Sorted by period ascending
    chronological: Vec<usize>,
}

/// Read-only forecast store.
///
/// Owns every record in a single arena; the derived indices hold record
/// positions, never copies. Built once and never mutated afterwards;
/// a reload constructs a fresh index (see [`super::SharedIndex`]).
#[derive(Debug, Default)]
pub struct ForecastIndex {
    records: Vec<ForecastRecord>,
    metadata: Map<String, Value>,
    countries: HashMap<String, CountrySlot>,
    /// Distinct country codes, sorted
    country_codes: Vec<String>,
    periods: BTreeMap<Period, BTreeMap<String, usize>>,
}

impl ForecastIndex {
    /// Load a dataset file and index it
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let dataset = loader::read_dataset(path)?;
        Ok(Self::from_dataset(dataset))
    }

    /// Index a JSON document held in memory. The buffer is parsed in place.
    pub fn from_slice(bytes: &mut [u8]) -> Result<Self> {
        let dataset = loader::parse_dataset(bytes)?;
        Ok(Self::from_dataset(dataset))
    }

    /// Build all indices from an already validated dataset.
    /// Duplicate (country, month, year) keys keep the last record seen.
    pub fn from_dataset(dataset: Dataset) -> Self {
        let mut records: Vec<ForecastRecord> = Vec::with_capacity(dataset.records.len());
        let mut countries: HashMap<String, CountrySlot> = HashMap::new();
        let mut duplicates = 0usize;

        for record in dataset.records {
            let period = record.period();
            let slot = countries.entry(record.country_code.clone()).or_default();
            match slot.by_period.get(&period) {
                Some(&pos) => {
                    warn!(
                        "Duplicate forecast for {} {}, keeping the later record",
                        record.country_code, period
                    );
                    records[pos] = record;
                    duplicates += 1;
                }
                None => {
                    slot.by_period.insert(period, records.len());
                    records.push(record);
                }
            }
        }

        let mut periods: BTreeMap<Period, BTreeMap<String, usize>> = BTreeMap::new();
        for (code, slot) in countries.iter_mut() {
            let mut chronological: Vec<(Period, usize)> =
                slot.by_period.iter().map(|(p, &pos)| (*p, pos)).collect();
            chronological.sort_unstable_by_key(|(p, _)| *p);
            for &(period, pos) in &chronological {
                periods.entry(period).or_default().insert(code.clone(), pos);
            }
            slot.chronological = chronological.into_iter().map(|(_, pos)| pos).collect();
        }

        let mut country_codes: Vec<String> = countries.keys().cloned().collect();
        country_codes.sort_unstable();

        info!(
            "Indexed {} forecasts across {} countries and {} periods ({} duplicates replaced)",
            records.len(),
            country_codes.len(),
            periods.len(),
            duplicates
        );

        Self {
            records,
            metadata: dataset.metadata,
            countries,
            country_codes,
            periods,
        }
    }

    /// Exact point lookup. Arguments are always (country, month, year).
    pub fn get_forecast(&self, country_code: &str, month: i32, year: i32) -> Option<&ForecastRecord> {
        self.get(country_code, Period::new(year, month))
    }

    pub fn get(&self, country_code: &str, period: Period) -> Option<&ForecastRecord> {
        let slot = self.countries.get(country_code)?;
        slot.by_period.get(&period).map(|&pos| &self.records[pos])
    }

    /// Distinct country codes in lexicographic order
    pub fn all_countries(&self) -> Vec<&str> {
        self.country_codes.iter().map(String::as_str).collect()
    }

    /// All forecasts for a country, oldest period first
    pub fn country_forecasts(&self, country_code: &str) -> Vec<&ForecastRecord> {
        self.countries
            .get(country_code)
            .map(|slot| slot.chronological.iter().map(|&pos| &self.records[pos]).collect())
            .unwrap_or_default()
    }

    /// Most recent forecast for every country
    pub fn latest_forecast_for_map(&self) -> BTreeMap<&str, &ForecastRecord> {
        self.countries
            .iter()
            .filter_map(|(code, slot)| {
                slot.chronological
                    .last()
                    .map(|&pos| (code.as_str(), &self.records[pos]))
            })
            .collect()
    }

    /// Distinct periods, ascending by year then month
    pub fn available_periods(&self) -> Vec<Period> {
        self.periods.keys().copied().collect()
    }

    /// One record per country for the exact (month, year)
    pub fn forecasts_for_period(&self, month: i32, year: i32) -> BTreeMap<&str, &ForecastRecord> {
        self.period_forecasts(Period::new(year, month))
    }

    pub fn period_forecasts(&self, period: Period) -> BTreeMap<&str, &ForecastRecord> {
        self.periods
            .get(&period)
            .map(|by_country| {
                by_country
                    .iter()
                    .map(|(code, &pos)| (code.as_str(), &self.records[pos]))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Auxiliary metadata; empty when the source had none
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn records(&self) -> impl Iterator<Item = &ForecastRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::loader::tests::{dataset_json, record_json};
    use crate::forecast::{ForecastValues, RiskCategory};
    use proptest::prelude::*;
    use std::collections::{BTreeSet, HashSet};

    fn record(code: &str, month: i32, year: i32, fatalities: f64) -> ForecastRecord {
        ForecastRecord {
            country_code: code.to_string(),
            country_name: format!("{code} name"),
            month,
            year,
            forecast: ForecastValues {
                predicted_fatalities: fatalities,
                risk_category: RiskCategory::ProbableConflict,
            },
            bluf: String::new(),
            covariates: BTreeMap::new(),
            history: Vec::new(),
            regional_context: Vec::new(),
            cohort: None,
        }
    }

    fn index(records: Vec<ForecastRecord>) -> ForecastIndex {
        ForecastIndex::from_dataset(Dataset {
            records,
            metadata: Map::new(),
        })
    }

    fn example() -> ForecastIndex {
        index(vec![
            record("SDN", 12, 2025, 50.0),
            record("SDN", 3, 2026, 80.0),
            record("ETH", 12, 2025, 5.0),
        ])
    }

    #[test]
    fn test_latest_and_period_example() {
        let idx = example();

        let latest = idx.latest_forecast_for_map();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["SDN"].period(), Period::new(2026, 3));
        assert_eq!(latest["ETH"].period(), Period::new(2025, 12));

        let dec = idx.forecasts_for_period(12, 2025);
        assert_eq!(dec.len(), 2);
        assert_eq!(dec["SDN"].forecast.predicted_fatalities, 50.0);
        assert_eq!(dec["ETH"].forecast.predicted_fatalities, 5.0);
    }

    #[test]
    fn test_get_forecast_takes_month_before_year() {
        let idx = index(vec![record("SDN", 12, 2025, 50.0), record("SDN", 3, 2026, 80.0)]);
        let hit = idx.get_forecast("SDN", 3, 2026).unwrap();
        assert_eq!(hit.forecast.predicted_fatalities, 80.0);
        // Swapped arguments must not find anything
        assert!(idx.get_forecast("SDN", 2026, 3).is_none());
        assert!(idx.forecasts_for_period(2025, 12).is_empty());
    }

    #[test]
    fn test_unknown_keys_are_empty() {
        let idx = example();
        assert!(idx.get_forecast("XXX", 12, 2025).is_none());
        assert!(idx.get_forecast("SDN", 9, 2026).is_none());
        assert!(idx.country_forecasts("XXX").is_empty());
        assert!(idx.forecasts_for_period(1, 1999).is_empty());
    }

    #[test]
    fn test_empty_index() {
        let idx = ForecastIndex::default();
        assert!(idx.is_empty());
        assert!(idx.all_countries().is_empty());
        assert!(idx.available_periods().is_empty());
        assert!(idx.latest_forecast_for_map().is_empty());
        assert!(idx.metadata().is_empty());
    }

    #[test]
    fn test_duplicate_keys_last_wins_everywhere() {
        let idx = index(vec![
            record("SDN", 12, 2025, 1.0),
            record("ETH", 12, 2025, 5.0),
            record("SDN", 12, 2025, 2.0),
        ]);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx.get_forecast("SDN", 12, 2025).unwrap().forecast.predicted_fatalities, 2.0);
        assert_eq!(idx.forecasts_for_period(12, 2025)["SDN"].forecast.predicted_fatalities, 2.0);
        assert_eq!(idx.latest_forecast_for_map()["SDN"].forecast.predicted_fatalities, 2.0);
        assert_eq!(idx.country_forecasts("SDN").len(), 1);
    }

    #[test]
    fn test_arbitrary_months_and_ordering() {
        let idx = index(vec![
            record("SDN", 9, 2026, 1.0),
            record("SDN", 1, 2024, 1.0),
            record("SDN", 7, 2025, 1.0),
            record("AFG", 7, 2025, 1.0),
        ]);
        let periods: Vec<Period> = idx
            .country_forecasts("SDN")
            .iter()
            .map(|r| r.period())
            .collect();
        assert_eq!(
            periods,
            vec![Period::new(2024, 1), Period::new(2025, 7), Period::new(2026, 9)]
        );
        assert_eq!(
            idx.available_periods(),
            vec![Period::new(2024, 1), Period::new(2025, 7), Period::new(2026, 9)]
        );
        assert_eq!(idx.all_countries(), vec!["AFG", "SDN"]);
    }

    #[test]
    fn test_from_slice_keeps_metadata() {
        let json = dataset_json(&[
            record_json("SDN", 12, 2025, 50.0),
            record_json("SDN", 3, 2026, 80.0),
        ]);
        let mut bytes = json.into_bytes();
        let idx = ForecastIndex::from_slice(&mut bytes).unwrap();
        assert_eq!(idx.len(), 2);
        assert_eq!(
            idx.metadata().get("months"),
            Some(&serde_json::json!([3, 9, 12]))
        );
    }

    fn arb_records() -> impl Strategy<Value = Vec<ForecastRecord>> {
        let codes = prop::sample::select(vec!["AFG", "ETH", "MLI", "SDN", "SOM", "YEM"]);
        prop::collection::vec(
            (codes, 1..=12i32, 2020..2030i32, 0.0..1000.0f64),
            0..60,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .map(|(code, month, year, f)| record(code, month, year, f))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_point_lookup_matches_last_record(records in arb_records()) {
            let mut expected: HashMap<(String, i32, i32), f64> = HashMap::new();
            for r in &records {
                expected.insert((r.country_code.clone(), r.month, r.year), r.forecast.predicted_fatalities);
            }
            let idx = index(records);
            prop_assert_eq!(idx.len(), expected.len());
            for ((code, month, year), fatalities) in &expected {
                let hit = idx.get_forecast(code, *month, *year).unwrap();
                prop_assert_eq!(&hit.country_code, code);
                prop_assert_eq!(hit.month, *month);
                prop_assert_eq!(hit.year, *year);
                prop_assert_eq!(hit.forecast.predicted_fatalities, *fatalities);
            }
        }

        #[test]
        fn prop_country_forecasts_sorted(records in arb_records()) {
            let idx = index(records);
            for code in idx.all_countries() {
                let series = idx.country_forecasts(code);
                prop_assert!(!series.is_empty());
                prop_assert!(series.iter().all(|r| r.country_code == code));
                prop_assert!(series.windows(2).all(|w| w[0].period() <= w[1].period()));
            }
        }

        #[test]
        fn prop_countries_and_periods_distinct_sorted(records in arb_records()) {
            let codes: BTreeSet<String> = records.iter().map(|r| r.country_code.clone()).collect();
            let periods: BTreeSet<Period> = records.iter().map(|r| r.period()).collect();
            let idx = index(records);

            let all = idx.all_countries();
            prop_assert_eq!(all.len(), codes.len());
            prop_assert!(all.windows(2).all(|w| w[0] < w[1]));

            let available = idx.available_periods();
            prop_assert_eq!(available.len(), periods.len());
            prop_assert!(available.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn prop_latest_is_max_period(records in arb_records()) {
            let idx = index(records);
            let latest = idx.latest_forecast_for_map();
            prop_assert_eq!(latest.len(), idx.all_countries().len());
            for (code, record) in latest {
                let max = idx.country_forecasts(code).iter().map(|r| r.period()).max();
                prop_assert_eq!(Some(record.period()), max);
            }
        }

        #[test]
        fn prop_period_partitions_records(records in arb_records()) {
            let idx = index(records);
            let mut seen = HashSet::new();
            let mut total = 0;
            for period in idx.available_periods() {
                let by_country = idx.forecasts_for_period(period.month, period.year);
                for (code, record) in &by_country {
                    prop_assert_eq!(record.period(), period);
                    prop_assert_eq!(&record.country_code.as_str(), code);
                    prop_assert!(seen.insert((code.to_string(), period)));
                }
                total += by_country.len();
            }
            prop_assert_eq!(total, idx.len());
        }
    }
}
