#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Living-population fetching for the visitor map.
//!
//! A [`PopulationSource`] returns the raw JSON envelope for one hour.
//! [`PopulationFetcher`] parses it permissively, keeps only rows inside
//! the district allow-list, and caches the result per [`HourKey`] in an
//! injected [`HourlyCache`].

pub mod cache;
pub mod envelope;
pub mod source;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use thiserror::Error;
use visitor_map_district_models::TractPrefixes;
use visitor_map_population_models::{HourKey, PopulationRecord};

pub use cache::{HourRecords, HourlyCache};
pub use source::SeoulOpenApi;

/// Errors that can occur while fetching population data.
#[derive(Debug, Error)]
pub enum PopulationError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Remote service returned HTTP {status} for {key}")]
    RemoteService {
        /// The hour that was requested.
        key: HourKey,
        /// HTTP status code.
        status: u16,
    },
}

/// Something that can return the raw API envelope for one hour.
#[async_trait]
pub trait PopulationSource: Send + Sync {
    /// Fetches the JSON envelope for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError`] if the request fails or the service
    /// answers with a non-success status.
    async fn fetch_envelope(&self, key: HourKey) -> Result<serde_json::Value, PopulationError>;
}

/// Fetches, filters, and caches hourly population records.
pub struct PopulationFetcher {
    source: Arc<dyn PopulationSource>,
    prefixes: TractPrefixes,
    service: String,
    cache: HourlyCache,
}

impl PopulationFetcher {
    /// Creates a fetcher.
    ///
    /// `service` is the envelope key the rows live under.
    #[must_use]
    pub fn new(
        source: Arc<dyn PopulationSource>,
        prefixes: TractPrefixes,
        service: impl Into<String>,
        cache: HourlyCache,
    ) -> Self {
        Self {
            source,
            prefixes,
            service: service.into(),
            cache,
        }
    }

    /// The cache backing this fetcher.
    #[must_use]
    pub const fn cache(&self) -> &HourlyCache {
        &self.cache
    }

    /// Returns the district's records for one hour.
    ///
    /// A cache hit returns the previously fetched records without calling
    /// the source.
    ///
    /// # Errors
    ///
    /// Returns [`PopulationError`] if the source fails.
    pub async fn fetch(&self, key: HourKey) -> Result<HourRecords, PopulationError> {
        if let Some(records) = self.cache.get(&key, Utc::now()) {
            log::debug!("Cache hit for {key} ({} records)", records.len());
            return Ok(records);
        }

        log::info!("Fetching {} for {key}", self.service);
        let envelope = self.source.fetch_envelope(key).await?;
        let rows = envelope::parse_envelope(&envelope, &self.service);
        let total = rows.len();

        let records: Vec<PopulationRecord> = rows
            .into_iter()
            .filter(|record| self.prefixes.matches(&record.tract_id))
            .collect();
        log::info!(
            "{key}: kept {} of {total} rows inside the district",
            records.len()
        );

        let records = Arc::new(records);
        self.cache.insert(key, Arc::clone(&records), Utc::now());
        Ok(records)
    }

    /// Returns the records for every hour of `date`, ordered 0..23.
    ///
    /// The 24 hours are fetched concurrently. If any hour fails the whole
    /// call fails.
    ///
    /// # Errors
    ///
    /// Returns the first [`PopulationError`] encountered.
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<HourRecords>, PopulationError> {
        futures::future::try_join_all(HourKey::day(date).into_iter().map(|key| self.fetch(key)))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves one row per hour for a fixed tract list, counting calls.
    struct FakeSource {
        tracts: Vec<&'static str>,
        failing_hour: Option<u8>,
        calls: AtomicUsize,
    }

    impl FakeSource {
        fn new(tracts: Vec<&'static str>) -> Self {
            Self {
                tracts,
                failing_hour: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PopulationSource for FakeSource {
        async fn fetch_envelope(
            &self,
            key: HourKey,
        ) -> Result<serde_json::Value, PopulationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_hour == Some(key.hour()) {
                return Err(PopulationError::RemoteService { key, status: 500 });
            }
            let rows: Vec<serde_json::Value> = self
                .tracts
                .iter()
                .map(|tract| {
                    serde_json::json!({
                        "STDR_DE_ID": key.date_path(),
                        "TMZON_PD_SE": key.hour_path(),
                        "ADSTRD_CODE_SE": "11200690",
                        "OA_CD": tract,
                        "TOT_LVPOP_CO": format!("{}", u32::from(key.hour()) * 10),
                        "CHINA_STAYPOP_CO": "0",
                        "OTHER_STAYPOP_CO": "0"
                    })
                })
                .collect();
            Ok(serde_json::json!({ "TEMP_FOREIGNER": { "row": rows } }))
        }
    }

    fn fetcher(source: Arc<FakeSource>) -> PopulationFetcher {
        PopulationFetcher::new(
            source,
            TractPrefixes::new(["1104065", "1104066", "1104067", "1104068"]),
            "TEMP_FOREIGNER",
            HourlyCache::new(std::time::Duration::from_secs(3600)),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 5).unwrap()
    }

    #[tokio::test]
    async fn filters_rows_outside_district() {
        let source = Arc::new(FakeSource::new(vec!["1104065010001", "1102052010001"]));
        let fetcher = fetcher(Arc::clone(&source));

        let records = fetcher.fetch(HourKey::new(date(), 14).unwrap()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(
            records
                .iter()
                .all(|r| fetcher.prefixes.matches(&r.tract_id))
        );
    }

    #[tokio::test]
    async fn second_fetch_hits_cache() {
        let source = Arc::new(FakeSource::new(vec!["1104065010001"]));
        let fetcher = fetcher(Arc::clone(&source));
        let key = HourKey::new(date(), 14).unwrap();

        let first = fetcher.fetch(key).await.unwrap();
        let second = fetcher.fetch(key).await.unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_fetched_again() {
        let source = Arc::new(FakeSource::new(vec!["1104065010001"]));
        let fetcher = PopulationFetcher::new(
            Arc::clone(&source) as Arc<dyn PopulationSource>,
            TractPrefixes::new(["1104065"]),
            "TEMP_FOREIGNER",
            HourlyCache::new(std::time::Duration::ZERO),
        );
        let key = HourKey::new(date(), 14).unwrap();

        let first = fetcher.fetch(key).await.unwrap();
        let second = fetcher.fetch(key).await.unwrap();

        assert_eq!(first, second);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn remote_failure_is_not_cached() {
        let source = Arc::new(FakeSource {
            failing_hour: Some(3),
            ..FakeSource::new(vec!["1104065010001"])
        });
        let fetcher = fetcher(Arc::clone(&source));
        let key = HourKey::new(date(), 3).unwrap();

        assert!(matches!(
            fetcher.fetch(key).await,
            Err(PopulationError::RemoteService { status: 500, .. })
        ));
        assert!(fetcher.cache().is_empty());
    }

    #[tokio::test]
    async fn fetch_day_returns_hours_in_order() {
        let source = Arc::new(FakeSource::new(vec!["1104065010001"]));
        let fetcher = fetcher(Arc::clone(&source));

        let day = fetcher.fetch_day(date()).await.unwrap();
        assert_eq!(day.len(), 24);
        for (hour, records) in day.iter().enumerate() {
            assert_eq!(records[0].time_period, format!("{hour:02}"));
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 24);
    }

    #[tokio::test]
    async fn fetch_day_fails_if_any_hour_fails() {
        let source = Arc::new(FakeSource {
            failing_hour: Some(17),
            ..FakeSource::new(vec!["1104065010001"])
        });
        let fetcher = fetcher(source);

        assert!(fetcher.fetch_day(date()).await.is_err());
    }
}
