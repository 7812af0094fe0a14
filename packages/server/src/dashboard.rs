//! Dashboard orchestration.
//!
//! Runs one render in a fixed order: boundary check, fetch the selected
//! hour, join, build the overlay for the chosen mode (fetching the other
//! 23 hours for the time heatmap), and assemble the response.

use chrono::NaiveDate;
use thiserror::Error;
use visitor_map_boundary::BoundarySet;
use visitor_map_district_models::DistrictConfig;
use visitor_map_overlay::{
    JoinOutcome, MapDocument, OverlayError, VisualizationMode, builder, join,
};
use visitor_map_population::{PopulationError, PopulationFetcher};
use visitor_map_population_models::HourKey;
use visitor_map_server_models::{ApiDashboardConfig, ApiModeOption, ApiRender};

/// Hour shown when none is requested.
pub const DEFAULT_HOUR: u8 = 14;

/// Warning shown when rendering is requested before an upload.
pub const MISSING_BOUNDARIES_WARNING: &str = "Upload a boundary GeoJSON file.";

/// Date shown when none is requested.
#[must_use]
pub fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 5).unwrap_or_default()
}

/// Errors that abort a render.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The open-data API failed.
    #[error(transparent)]
    Population(#[from] PopulationError),

    /// Overlay construction failed.
    #[error(transparent)]
    Overlay(#[from] OverlayError),
}

/// What to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    /// Selected date and hour.
    pub key: HourKey,
    /// Selected overlay.
    pub mode: VisualizationMode,
}

/// Result of a render.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// No boundary file has been uploaded; nothing was drawn.
    MissingBoundaries,
    /// The rendered view.
    Rendered(Box<ApiRender>),
}

/// The district being shown and the fetcher that serves it.
pub struct Dashboard {
    district: DistrictConfig,
    fetcher: PopulationFetcher,
}

impl Dashboard {
    /// Creates a dashboard for `district`.
    #[must_use]
    pub const fn new(district: DistrictConfig, fetcher: PopulationFetcher) -> Self {
        Self { district, fetcher }
    }

    /// The district being shown.
    #[must_use]
    pub const fn district(&self) -> &DistrictConfig {
        &self.district
    }

    /// Settings for the page's controls.
    #[must_use]
    pub fn config(&self) -> ApiDashboardConfig {
        ApiDashboardConfig {
            district: self.district.name.clone(),
            center: [self.district.map.center_lat, self.district.map.center_lng],
            zoom: self.district.map.zoom,
            tiles: self.district.map.tiles.clone(),
            default_date: default_date(),
            default_hour: DEFAULT_HOUR,
            default_mode: VisualizationMode::default(),
            modes: VisualizationMode::ALL
                .iter()
                .copied()
                .map(ApiModeOption::from)
                .collect(),
        }
    }

    /// Renders one view.
    ///
    /// Returns [`RenderOutcome::MissingBoundaries`] without fetching
    /// anything when `boundaries` is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError`] if any fetch fails. For the time heatmap
    /// a failure in any hour aborts the whole render.
    pub async fn render(
        &self,
        boundaries: Option<&BoundarySet>,
        request: RenderRequest,
    ) -> Result<RenderOutcome, DashboardError> {
        let Some(boundaries) = boundaries else {
            log::warn!("Render requested before a boundary file was uploaded");
            return Ok(RenderOutcome::MissingBoundaries);
        };

        let RenderRequest { key, mode } = request;
        let records = self.fetcher.fetch(key).await?;
        let outcome = join(&records, boundaries);

        let overlay = match mode {
            VisualizationMode::Points => builder::points(&outcome),
            VisualizationMode::Heatmap => builder::heatmap(&outcome),
            VisualizationMode::TimeHeatmap => {
                let day = self.fetcher.fetch_day(key.date()).await?;
                let hours: Vec<JoinOutcome> = day
                    .iter()
                    .map(|records| join(records, boundaries))
                    .collect();
                builder::time_heatmap(&hours)?
            }
        };

        log::info!(
            "Rendered {mode} for {key}: {} records, {} on the map",
            records.len(),
            outcome.joined.len()
        );

        let join_report = outcome.report();
        Ok(RenderOutcome::Rendered(Box::new(ApiRender {
            date: key.date(),
            hour: key.hour(),
            mode,
            map: MapDocument::new(&self.district.map, boundaries, overlay),
            record_count: records.len(),
            records: records.to_vec(),
            join: join_report,
            unjoined: outcome.unjoined,
        })))
    }
}
