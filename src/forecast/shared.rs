use super::{ForecastIndex, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Handle to the active index that can be swapped for a freshly built one.
///
/// Readers take an `Arc` snapshot and keep using it for as long as they
/// like; a reload never mutates an index that someone may be reading.
#[derive(Debug)]
pub struct SharedIndex {
    source: PathBuf,
    current: RwLock<Arc<ForecastIndex>>,
}

impl SharedIndex {
    /// Load the initial index from `source`. Failure here is fatal to the
    /// caller; there is no degraded empty index.
    pub fn load(source: impl Into<PathBuf>) -> Result<Self> {
        let source = source.into();
        let index = ForecastIndex::load(&source)?;
        Ok(Self::with_index(source, index))
    }

    pub fn with_index(source: impl Into<PathBuf>, index: ForecastIndex) -> Self {
        Self {
            source: source.into(),
            current: RwLock::new(Arc::new(index)),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Snapshot of the active index
    pub fn current(&self) -> Arc<ForecastIndex> {
        Arc::clone(&self.current.read())
    }

    /// Rebuild from the source and swap it in. On failure the previous
    /// index stays active and the error is returned.
    pub fn reload(&self) -> Result<Arc<ForecastIndex>> {
        let fresh = match ForecastIndex::load(&self.source) {
            Ok(index) => Arc::new(index),
            Err(e) => {
                error!("Reload of {:?} failed, keeping previous index: {}", self.source, e);
                return Err(e);
            }
        };

        *self.current.write() = Arc::clone(&fresh);
        info!("Reloaded forecast index from {:?}", self.source);
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::loader::tests::{dataset_json, record_json};
    use std::fs;

    #[test]
    fn test_reload_swaps_index_without_touching_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast_data.json");
        fs::write(&path, dataset_json(&[record_json("SDN", 12, 2025, 50.0)])).unwrap();

        let shared = SharedIndex::load(&path).unwrap();
        let before = shared.current();
        assert_eq!(before.len(), 1);

        fs::write(
            &path,
            dataset_json(&[
                record_json("SDN", 12, 2025, 60.0),
                record_json("ETH", 12, 2025, 5.0),
            ]),
        )
        .unwrap();
        shared.reload().unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(
            before.get_forecast("SDN", 12, 2025).unwrap().forecast.predicted_fatalities,
            50.0
        );
        let after = shared.current();
        assert_eq!(after.len(), 2);
        assert_eq!(
            after.get_forecast("SDN", 12, 2025).unwrap().forecast.predicted_fatalities,
            60.0
        );
    }

    #[test]
    fn test_failed_reload_keeps_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast_data.json");
        fs::write(&path, dataset_json(&[record_json("SDN", 12, 2025, 50.0)])).unwrap();

        let shared = SharedIndex::load(&path).unwrap();
        fs::write(&path, r#"{ "metadata": {} }"#).unwrap();

        assert!(shared.reload().is_err());
        assert_eq!(shared.current().len(), 1);
        assert_eq!(shared.source(), path.as_path());
    }

    #[test]
    fn test_readers_see_whole_indexes_during_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forecast_data.json");
        fs::write(&path, dataset_json(&[record_json("SDN", 12, 2025, 50.0)])).unwrap();
        let shared = SharedIndex::load(&path).unwrap();
        fs::write(
            &path,
            dataset_json(&[
                record_json("SDN", 12, 2025, 60.0),
                record_json("ETH", 12, 2025, 5.0),
            ]),
        )
        .unwrap();

        std::thread::scope(|s| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    s.spawn(|| {
                        (0..200)
                            .map(|_| shared.current().len())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for _ in 0..5 {
                shared.reload().unwrap();
            }
            for reader in readers {
                assert!(reader.join().unwrap().iter().all(|&n| n == 1 || n == 2));
            }
        });
        assert_eq!(shared.current().len(), 2);
    }

    #[test]
    fn test_initial_load_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SharedIndex::load(dir.path().join("missing.json")).is_err());
    }
}
