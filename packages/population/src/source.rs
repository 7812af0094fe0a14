//! Seoul open-data API client.
//!
//! Requests one page of the living-population dataset per hour:
//!
//! ```text
//! GET http://{host}/{api_key}/json/{service}/{start}/{end}/{YYYYMMDD}/{HH}/
//! ```
//!
//! See <https://data.seoul.go.kr/dataList/OA-22235/S/1/datasetView.do>

use async_trait::async_trait;
use visitor_map_district_models::ApiConfig;
use visitor_map_population_models::HourKey;

use crate::{PopulationError, PopulationSource};

/// [`PopulationSource`] backed by the Seoul open-data HTTP API.
pub struct SeoulOpenApi {
    client: reqwest::Client,
    api_key: String,
    api: ApiConfig,
}

impl SeoulOpenApi {
    /// Creates a client for the endpoint described by `api`.
    #[must_use]
    pub fn new(client: reqwest::Client, api_key: impl Into<String>, api: ApiConfig) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            api,
        }
    }

    /// Builds the request URL for `key`.
    #[must_use]
    pub fn url(&self, key: &HourKey) -> String {
        self.url_with_key(key, &self.api_key)
    }

    /// The request URL with the API key masked, for logging.
    fn redacted_url(&self, key: &HourKey) -> String {
        self.url_with_key(key, "****")
    }

    fn url_with_key(&self, key: &HourKey, api_key: &str) -> String {
        format!(
            "http://{host}/{api_key}/json/{service}/{start}/{end}/{date}/{hour}/",
            host = self.api.host,
            service = self.api.service,
            start = self.api.start_index,
            end = self.api.end_index,
            date = key.date_path(),
            hour = key.hour_path(),
        )
    }
}

#[async_trait]
impl PopulationSource for SeoulOpenApi {
    async fn fetch_envelope(&self, key: HourKey) -> Result<serde_json::Value, PopulationError> {
        log::debug!("GET {}", self.redacted_url(&key));

        let resp = self
            .client
            .get(self.url(&key))
            .send()
            .await
            .map_err(reqwest::Error::without_url)?;
        if !resp.status().is_success() {
            return Err(PopulationError::RemoteService {
                key,
                status: resp.status().as_u16(),
            });
        }
        let body = resp.text().await.map_err(reqwest::Error::without_url)?;

        Ok(serde_json::from_str(&body).unwrap_or_else(|e| {
            log::warn!(
                "{} response for {key} is not JSON ({e}), treating as empty",
                self.api.service
            );
            serde_json::Value::Null
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn api() -> ApiConfig {
        ApiConfig {
            host: "openapi.seoul.go.kr:8088".to_string(),
            service: "TEMP_FOREIGNER".to_string(),
            start_index: 1,
            end_index: 1000,
            cache_ttl_secs: 3600,
        }
    }

    #[test]
    fn builds_request_url() {
        let source = SeoulOpenApi::new(reqwest::Client::new(), "secret", api());
        let key = HourKey::new(NaiveDate::from_ymd_opt(2025, 9, 5).unwrap(), 14).unwrap();
        assert_eq!(
            source.url(&key),
            "http://openapi.seoul.go.kr:8088/secret/json/TEMP_FOREIGNER/1/1000/20250905/14/"
        );
        assert!(!source.redacted_url(&key).contains("secret"));
    }
}
