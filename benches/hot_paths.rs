use conflict_map::forecast::{CountryDetail, ForecastIndex, Period, RiskCategory};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

const COUNTRIES: usize = 180;
const PERIODS: [(i32, i32); 6] = [(3, 2025), (9, 2025), (12, 2025), (3, 2026), (9, 2026), (12, 2026)];

fn code(i: usize) -> String {
    let a = b'A' + (i / 26 / 26 % 26) as u8;
    let b = b'A' + (i / 26 % 26) as u8;
    let c = b'A' + (i % 26) as u8;
    String::from_utf8_lossy(&[a, b, c]).into_owned()
}

/// Roughly the shape of a production dataset: every country in every period
fn dataset_bytes() -> Vec<u8> {
    let mut forecasts = Vec::new();
    for i in 0..COUNTRIES {
        for (n, (month, year)) in PERIODS.iter().enumerate() {
            let fatalities = ((i * 37 + n * 11) % 500) as f64;
            let history: Vec<_> = (1..=24)
                .map(|m| {
                    json!({
                        "date": format!("{}-{:02}", 2023 + (m - 1) / 12, (m - 1) % 12 + 1),
                        "fatalities": (i + m) % 40,
                    })
                })
                .collect();
            let peers: Vec<_> = (1..=5)
                .map(|k| {
                    json!({
                        "country_code": code((i + k) % COUNTRIES),
                        "country_name": format!("Peer {k}"),
                        "probability": 0.1 * k as f64,
                        "predicted_fatalities": (k * 3) as f64,
                    })
                })
                .collect();
            forecasts.push(json!({
                "country_code": code(i),
                "country_name": format!("Country {i}"),
                "month": month,
                "year": year,
                "forecast": {
                    "predicted_fatalities": fatalities,
                    "risk_category": RiskCategory::ALL[i % 4].label(),
                },
                "bluf": "Synthetic summary",
                "covariates": { "infant_mortality": (i % 100) as f64, "military_power": 40.0 },
                "historical": { "monthly_data": history },
                "regional_context": peers,
            }));
        }
    }
    serde_json::to_vec(&json!({ "metadata": { "countries": COUNTRIES }, "forecasts": forecasts }))
        .unwrap()
}

fn bench_index_build(c: &mut Criterion) {
    let bytes = dataset_bytes();
    c.bench_function("index_from_slice", |b| {
        b.iter(|| {
            let mut buf = bytes.clone();
            ForecastIndex::from_slice(black_box(&mut buf)).unwrap()
        })
    });
}

fn bench_queries(c: &mut Criterion) {
    let mut bytes = dataset_bytes();
    let index = ForecastIndex::from_slice(&mut bytes).unwrap();
    let target = code(42);

    c.bench_function("get_forecast", |b| {
        b.iter(|| index.get_forecast(black_box(&target), black_box(12), black_box(2025)))
    });
    c.bench_function("latest_forecast_for_map", |b| {
        b.iter(|| index.latest_forecast_for_map().len())
    });
    c.bench_function("period_forecasts", |b| {
        b.iter(|| index.period_forecasts(black_box(Period::new(2026, 3))).len())
    });
    c.bench_function("country_detail", |b| {
        b.iter(|| CountryDetail::build(&index, black_box(&target), 12, 2025))
    });
}

criterion_group!(benches, bench_index_build, bench_queries);
criterion_main!(benches);
