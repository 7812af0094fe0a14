#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Compile-time registry of district definitions.
//!
//! Each entry is a `(name, toml_content)` pair embedded via `include_str!`.
//! Adding a district requires creating a TOML file in `districts/` and
//! adding a corresponding entry here.

use visitor_map_district_models::DistrictConfig;

/// District used when none is configured.
pub const DEFAULT_DISTRICT_ID: &str = "seongsu";

/// Number of registered districts. Enforced by a test.
#[cfg(test)]
const EXPECTED_DISTRICT_COUNT: usize = 1;

/// Embedded TOML district definitions.
const DISTRICT_TOMLS: &[(&str, &str)] = &[("seongsu", include_str!("../districts/seongsu.toml"))];

/// Returns all registered districts.
///
/// # Panics
///
/// Panics if any embedded TOML file fails to parse. Since these are
/// compile-time constants, parse failures indicate a development error
/// and are caught by the tests below.
#[must_use]
pub fn all_districts() -> Vec<DistrictConfig> {
    DISTRICT_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str)
                .unwrap_or_else(|e| panic!("Failed to parse district '{name}': {e}"))
        })
        .collect()
}

/// Looks up a district by its identifier.
#[must_use]
pub fn district(id: &str) -> Option<DistrictConfig> {
    all_districts().into_iter().find(|d| d.id == id)
}

/// Returns the default district.
///
/// # Panics
///
/// Panics if [`DEFAULT_DISTRICT_ID`] is not registered.
#[must_use]
pub fn default_district() -> DistrictConfig {
    district(DEFAULT_DISTRICT_ID)
        .unwrap_or_else(|| panic!("Default district '{DEFAULT_DISTRICT_ID}' is not registered"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use visitor_map_district_models::TRACT_PREFIX_LEN;

    #[test]
    fn loads_all_districts() {
        let districts = all_districts();
        assert_eq!(
            districts.len(),
            EXPECTED_DISTRICT_COUNT,
            "Expected {EXPECTED_DISTRICT_COUNT} districts, found {}. \
             Update EXPECTED_DISTRICT_COUNT after adding/removing districts.",
            districts.len()
        );
    }

    #[test]
    fn district_ids_are_unique() {
        let mut seen = BTreeSet::new();
        for district in &all_districts() {
            assert!(
                seen.insert(district.id.clone()),
                "Duplicate district ID: {}",
                district.id
            );
        }
    }

    #[test]
    fn prefixes_have_expected_length() {
        for district in &all_districts() {
            assert!(
                !district.tract_prefixes.is_empty(),
                "District {} has no tract prefixes",
                district.id
            );
            for prefix in district.tract_prefixes.iter() {
                assert_eq!(
                    prefix.len(),
                    TRACT_PREFIX_LEN,
                    "District {} has malformed prefix {prefix}",
                    district.id
                );
            }
        }
    }

    #[test]
    fn seongsu_matches_dashboard_defaults() {
        let seongsu = default_district();
        assert_eq!(seongsu.tract_prefixes.len(), 4);
        assert!(seongsu.tract_prefixes.matches("1104068000000"));
        assert_eq!(seongsu.api.service, "TEMP_FOREIGNER");
        assert_eq!(seongsu.api.end_index, 1000);
        assert_eq!(seongsu.api.cache_ttl_secs, 3600);
        assert_eq!(seongsu.map.zoom, 15);
    }

    #[test]
    fn unknown_district_is_none() {
        assert!(district("gangnam").is_none());
    }
}
