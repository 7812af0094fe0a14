#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the visitor map server.
//!
//! These types are serialized to JSON for the map page. Population rows
//! in the summary table keep the open-data field names so the table
//! matches the source dataset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use visitor_map_overlay::{JoinReport, MapDocument, UnjoinedRecord, VisualizationMode};
use visitor_map_population_models::PopulationRecord;

/// Query parameters for the render endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderQueryParams {
    /// Reference date (`YYYY-MM-DD`).
    pub date: Option<NaiveDate>,
    /// Hour of day (0-23).
    pub hour: Option<u8>,
    /// Visualization mode (`points`, `heatmap`, `time_heatmap`).
    pub mode: Option<String>,
    /// Session token returned by the boundary upload.
    pub session: Option<String>,
}

/// Query parameters naming an upload session.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionQueryParams {
    /// Session token returned by the boundary upload.
    pub session: Option<String>,
}

/// A rendered dashboard view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiRender {
    /// Reference date.
    pub date: NaiveDate,
    /// Selected hour.
    pub hour: u8,
    /// Visualization mode.
    pub mode: VisualizationMode,
    /// What to draw.
    pub map: MapDocument,
    /// Number of district records for the selected hour.
    pub record_count: usize,
    /// Summary table of the selected hour's records.
    pub records: Vec<PopulationRecord>,
    /// Join counts for the selected hour.
    pub join: JoinReport,
    /// Records of the selected hour left off the map.
    pub unjoined: Vec<UnjoinedRecord>,
}

/// Response to a boundary upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiUploadResult {
    /// Number of district tracts retained from the file.
    pub tract_count: usize,
    /// Token to send with renders of this upload.
    pub session: String,
}

/// Dashboard settings for the page's controls.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDashboardConfig {
    /// District display name.
    pub district: String,
    /// Initial map center `[lat, lng]`.
    pub center: [f64; 2],
    /// Initial zoom.
    pub zoom: u8,
    /// Base tile set name.
    pub tiles: String,
    /// Default date input.
    pub default_date: NaiveDate,
    /// Default hour input.
    pub default_hour: u8,
    /// Default mode.
    pub default_mode: VisualizationMode,
    /// Selectable modes.
    pub modes: Vec<ApiModeOption>,
}

/// One entry of the mode selector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiModeOption {
    /// Mode value sent back in the render query.
    pub value: VisualizationMode,
    /// Display label.
    pub label: String,
}

impl From<VisualizationMode> for ApiModeOption {
    fn from(mode: VisualizationMode) -> Self {
        Self {
            value: mode,
            label: mode.label().to_string(),
        }
    }
}

/// A user-facing warning that stops rendering (e.g. no boundary file).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiWarning {
    /// Warning text.
    pub warning: String,
}

/// An error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error text.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_option_uses_snake_case_value() {
        let option = ApiModeOption::from(VisualizationMode::TimeHeatmap);
        let value = serde_json::to_value(&option).unwrap();
        assert_eq!(value["value"], "time_heatmap");
        assert_eq!(value["label"], "Time heatmap");
    }
}
