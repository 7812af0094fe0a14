#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tract boundary loading for the visitor map.
//!
//! Parses an uploaded `GeoJSON` `FeatureCollection` of census tract
//! polygons, keeps only the tracts whose `OA_CD` code belongs to the
//! district allow-list, and precomputes a tract code -> centroid index
//! once per load so population rows can be placed on the map without
//! rescanning the polygons. Files in a Korean national grid are converted
//! to longitude/latitude on load.

pub mod projection;

use std::collections::BTreeMap;

use geo::{Centroid as _, CoordsIter as _, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde::Serialize;
use thiserror::Error;
use visitor_map_district_models::TractPrefixes;

pub use projection::CoordinateSystem;

/// Feature property holding the tract code.
pub const TRACT_ID_FIELD: &str = "OA_CD";

/// Errors that can occur while loading a boundary file.
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// The file is not a usable boundary file.
    #[error("Boundary format error: {message}")]
    Format {
        /// Description of what went wrong.
        message: String,
    },
}

impl BoundaryError {
    fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }
}

/// A single census tract polygon.
#[derive(Debug, Clone)]
pub struct BoundaryRecord {
    /// Tract code (e.g. `"1104065010001"`).
    pub tract_id: String,
    /// Tract geometry in WGS84 longitude/latitude.
    pub polygon: MultiPolygon<f64>,
}

/// Centroid of a tract polygon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Centroid {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// The district-filtered tracts of one uploaded boundary file.
///
/// Immutable once loaded; a new upload produces a new set.
#[derive(Debug, Clone, Default)]
pub struct BoundarySet {
    records: Vec<BoundaryRecord>,
    /// tract code -> centroid
    centroids: BTreeMap<String, Centroid>,
}

impl BoundarySet {
    /// Builds a set from already-filtered records, computing centroids.
    ///
    /// When a tract code appears more than once the first polygon wins.
    #[must_use]
    pub fn from_records(records: Vec<BoundaryRecord>) -> Self {
        let mut centroids = BTreeMap::new();
        let mut kept = Vec::with_capacity(records.len());

        for record in records {
            if centroids.contains_key(&record.tract_id) {
                log::warn!("Duplicate boundary for tract {}, ignoring", record.tract_id);
                continue;
            }
            let Some(point) = record.polygon.centroid() else {
                log::warn!("Tract {} has an empty polygon, ignoring", record.tract_id);
                continue;
            };
            centroids.insert(
                record.tract_id.clone(),
                Centroid {
                    latitude: point.y(),
                    longitude: point.x(),
                },
            );
            kept.push(record);
        }

        Self {
            records: kept,
            centroids,
        }
    }

    /// All retained tracts, in file order.
    #[must_use]
    pub fn records(&self) -> &[BoundaryRecord] {
        &self.records
    }

    /// Number of retained tracts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no tract was retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the centroid of a tract by exact code.
    #[must_use]
    pub fn centroid(&self, tract_id: &str) -> Option<Centroid> {
        self.centroids.get(tract_id).copied()
    }

    /// Returns the retained tracts as a `GeoJSON` `FeatureCollection` with
    /// the tract code as the only property. Used for the boundary outline
    /// layer.
    #[must_use]
    pub fn outline(&self) -> serde_json::Value {
        let features = self
            .records
            .iter()
            .map(|record| {
                let mut feature = Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(
                        &record.polygon,
                    ))),
                    id: None,
                    properties: None,
                    foreign_members: None,
                };
                feature.set_property(TRACT_ID_FIELD, record.tract_id.clone());
                feature
            })
            .collect::<FeatureCollection>();

        serde_json::to_value(&features).unwrap_or_else(|e| {
            log::error!("Failed to serialize boundary outline: {e}");
            serde_json::json!({ "type": "FeatureCollection", "features": [] })
        })
    }
}

/// Parses a boundary file and keeps the tracts in the district allow-list.
///
/// # Errors
///
/// Returns [`BoundaryError::Format`] if the bytes are not a `GeoJSON`
/// `FeatureCollection` (or single `Feature`), if the file declares a
/// coordinate system that cannot be converted to longitude/latitude, if a
/// retained polygon lies outside longitude/latitude range after
/// conversion, or if any feature lacks the [`TRACT_ID_FIELD`] property.
pub fn load_boundaries(
    bytes: &[u8],
    prefixes: &TractPrefixes,
) -> Result<BoundarySet, BoundaryError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| BoundaryError::format(format!("file is not valid UTF-8: {e}")))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| BoundaryError::format(format!("file is not valid GeoJSON: {e}")))?;

    let (crs, features) = match geojson {
        GeoJson::FeatureCollection(collection) => (
            coordinate_system(collection.foreign_members.as_ref())?,
            collection.features,
        ),
        GeoJson::Feature(feature) => (
            coordinate_system(feature.foreign_members.as_ref())?,
            vec![feature],
        ),
        GeoJson::Geometry(_) => {
            return Err(BoundaryError::format(
                "expected a FeatureCollection, found a bare geometry",
            ));
        }
    };

    let total = features.len();
    let mut records = Vec::new();

    for (index, feature) in features.into_iter().enumerate() {
        let tract_id = tract_id(&feature).ok_or_else(|| {
            BoundaryError::format(format!(
                "feature {index} is missing the {TRACT_ID_FIELD} field"
            ))
        })?;

        if !prefixes.matches(&tract_id) {
            continue;
        }

        let Some(polygon) = feature.geometry.and_then(to_multipolygon) else {
            log::warn!("Tract {tract_id} has no polygon geometry, skipping");
            continue;
        };

        let polygon = crs.to_wgs84(polygon);
        if !is_lon_lat(&polygon) {
            return Err(BoundaryError::format(format!(
                "tract {tract_id} has coordinates outside longitude/latitude range; \
                 declare the file's coordinate system (crs) or reproject to WGS84 (EPSG:4326)"
            )));
        }

        records.push(BoundaryRecord { tract_id, polygon });
    }

    let set = BoundarySet::from_records(records);
    log::info!(
        "Loaded {} of {total} boundary features inside the district",
        set.len()
    );
    Ok(set)
}

/// Extracts the tract code, accepting string or integer property values.
fn tract_id(feature: &Feature) -> Option<String> {
    match feature.property(TRACT_ID_FIELD)? {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => n.as_u64().map(|v| v.to_string()),
        _ => None,
    }
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Reads the legacy `crs` member. Files without one are longitude/latitude.
fn coordinate_system(
    foreign_members: Option<&geojson::JsonObject>,
) -> Result<CoordinateSystem, BoundaryError> {
    let Some(crs) = foreign_members.and_then(|m| m.get("crs")) else {
        return Ok(CoordinateSystem::LonLat);
    };
    let name = crs
        .get("properties")
        .and_then(|p| p.get("name"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();

    let system = CoordinateSystem::from_crs_name(name).ok_or_else(|| {
        BoundaryError::format(format!(
            "unsupported coordinate system {name}; use EPSG 4326, 5179, 5181, 5186, or 5174"
        ))
    })?;
    if let CoordinateSystem::Projected(_) = system {
        log::info!("Converting boundaries from {name} to WGS84");
    }
    Ok(system)
}

fn is_lon_lat(polygon: &MultiPolygon<f64>) -> bool {
    polygon
        .coords_iter()
        .all(|c| c.x.is_finite() && c.y.is_finite() && c.x.abs() <= 180.0 && c.y.abs() <= 90.0)
}
