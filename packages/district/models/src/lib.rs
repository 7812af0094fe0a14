#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! District definition types.
//!
//! A district is the area of interest shown on the map: the set of census
//! tract code prefixes that belong to it, the open-data endpoint that
//! serves its living-population statistics, and the initial map view.
//! Definitions are TOML files embedded at compile time by the
//! `visitor_map_district` registry.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Number of leading characters of a tract code that identify its district.
pub const TRACT_PREFIX_LEN: usize = 7;

/// A district definition, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictConfig {
    /// Unique district identifier (e.g., `"seongsu"`).
    pub id: String,
    /// Human-readable name (e.g., "Seongsu-dong").
    pub name: String,
    /// Allow-list of 7-character tract code prefixes.
    pub tract_prefixes: TractPrefixes,
    /// Open-data API settings.
    pub api: ApiConfig,
    /// Initial map view.
    pub map: MapViewConfig,
}

/// Settings for the living-population open-data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host and port (e.g., `"openapi.seoul.go.kr:8088"`).
    pub host: String,
    /// Service name used in the request path and as the envelope key.
    pub service: String,
    /// First row index requested (1-based, inclusive).
    #[serde(default = "default_start_index")]
    pub start_index: u32,
    /// Last row index requested (inclusive). The API caps a single page.
    #[serde(default = "default_end_index")]
    pub end_index: u32,
    /// How long a fetched hour stays cached, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

const fn default_start_index() -> u32 {
    1
}

const fn default_end_index() -> u32 {
    1000
}

const fn default_cache_ttl_secs() -> u64 {
    3600
}

/// Initial map view for a district.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapViewConfig {
    /// Center latitude.
    pub center_lat: f64,
    /// Center longitude.
    pub center_lng: f64,
    /// Initial zoom level.
    pub zoom: u8,
    /// Base tile set name (e.g., `"CartoDB dark_matter"`).
    pub tiles: String,
}

/// Allow-list of tract code prefixes.
///
/// Both boundary features and population rows are kept only when their
/// tract code starts with one of these prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TractPrefixes(BTreeSet<String>);

impl TractPrefixes {
    /// Builds an allow-list from prefix strings.
    #[must_use]
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(prefixes.into_iter().map(Into::into).collect())
    }

    /// Returns `true` if the first [`TRACT_PREFIX_LEN`] characters of
    /// `tract_id` are in the allow-list.
    ///
    /// Codes shorter than the prefix length never match.
    #[must_use]
    pub fn matches(&self, tract_id: &str) -> bool {
        tract_id
            .get(..TRACT_PREFIX_LEN)
            .is_some_and(|prefix| self.0.contains(prefix))
    }

    /// Iterates over the prefixes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Number of prefixes in the allow-list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the allow-list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_on_first_seven_characters() {
        let prefixes = TractPrefixes::new(["1104065", "1104066"]);
        assert!(prefixes.matches("1104065010001"));
        assert!(prefixes.matches("1104066"));
        assert!(!prefixes.matches("1104067010001"));
        assert!(!prefixes.matches("110406"));
        assert!(!prefixes.matches(""));
    }

    #[test]
    fn api_config_defaults_apply() {
        let api: ApiConfig = toml::de::from_str(
            r#"
            host = "example.org:8088"
            service = "TEMP_FOREIGNER"
            "#,
        )
        .unwrap();
        assert_eq!(api.start_index, 1);
        assert_eq!(api.end_index, 1000);
        assert_eq!(api.cache_ttl_secs, 3600);
    }
}
