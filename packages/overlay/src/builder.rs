//! Map overlay construction.
//!
//! Produces a serializable description of what the map page draws: the
//! base view, a constant boundary outline, and one of three overlays
//! selected by [`VisualizationMode`]. Styling constants match the
//! dashboard's look (red markers, white outlines, dark base tiles).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;
use visitor_map_boundary::BoundarySet;
use visitor_map_district_models::MapViewConfig;
use visitor_map_population_models::HOURS_PER_DAY;

use crate::join::JoinOutcome;

/// Weight units per unit of marker radius.
pub const MARKER_WEIGHT_PER_RADIUS: f64 = 50.0;
/// Smallest marker radius.
pub const MIN_MARKER_RADIUS: f64 = 3.0;
/// Heat layer point radius.
pub const HEAT_RADIUS: u32 = 25;
/// Zoom at which heat intensity peaks.
pub const HEAT_MAX_ZOOM: u8 = 15;

/// Which overlay to draw.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VisualizationMode {
    /// One circle marker per tract.
    #[default]
    Points,
    /// A single weighted heat layer for the selected hour.
    Heatmap,
    /// 24 heat layers, one per hour of the selected date.
    TimeHeatmap,
}

impl VisualizationMode {
    /// All modes, in selector order.
    pub const ALL: &[Self] = &[Self::Points, Self::Heatmap, Self::TimeHeatmap];

    /// Label shown in the mode selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Points => "Points",
            Self::Heatmap => "Heatmap",
            Self::TimeHeatmap => "Time heatmap",
        }
    }
}

/// Errors from overlay construction.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// A time heatmap was built from the wrong number of hours.
    #[error("Time heatmap needs {expected} frames, got {count}", expected = HOURS_PER_DAY)]
    FrameCount {
        /// Number of frames supplied.
        count: usize,
    },
}

/// A circle marker for one tract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleMarker {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
    /// Radius in pixels.
    pub radius: f64,
    /// Stroke and fill color.
    pub color: &'static str,
    /// Whether the circle is filled.
    pub fill: bool,
    /// Fill opacity.
    pub fill_opacity: f64,
    /// Popup HTML.
    pub popup: String,
}

/// A weighted density layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatLayer {
    /// `[lat, lng, weight]` triples.
    pub points: Vec<[f64; 3]>,
    /// Point radius in pixels.
    pub radius: u32,
    /// Zoom at which intensity peaks.
    pub max_zoom: u8,
}

/// An hour-by-hour sequence of density layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeHeatLayer {
    /// One `[lat, lng, weight]` list per hour, hour 0 first.
    pub frames: Vec<Vec<[f64; 3]>>,
    /// Frame labels, `"00"` to `"23"`.
    pub index: Vec<String>,
    /// Whether playback starts automatically.
    pub auto_play: bool,
}

/// The mode-specific overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    /// Circle markers.
    Points {
        /// One marker per joined point.
        markers: Vec<CircleMarker>,
    },
    /// Static heat layer.
    Heatmap(HeatLayer),
    /// Animated heat layer.
    TimeHeatmap(TimeHeatLayer),
}

impl Overlay {
    /// The mode this overlay was built for.
    #[must_use]
    pub const fn mode(&self) -> VisualizationMode {
        match self {
            Self::Points { .. } => VisualizationMode::Points,
            Self::Heatmap(_) => VisualizationMode::Heatmap,
            Self::TimeHeatmap(_) => VisualizationMode::TimeHeatmap,
        }
    }
}

/// Outline of every district tract, drawn under any overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundaryOutline {
    /// `GeoJSON` `FeatureCollection` of the tracts.
    pub geojson: serde_json::Value,
    /// Stroke color.
    pub color: &'static str,
    /// Stroke width.
    pub weight: u32,
    /// Fill opacity (unfilled).
    pub fill_opacity: f64,
}

/// Initial view of the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    /// `[lat, lng]` center.
    pub center: [f64; 2],
    /// Zoom level.
    pub zoom: u8,
    /// Base tile set name.
    pub tiles: String,
}

impl From<&MapViewConfig> for MapView {
    fn from(config: &MapViewConfig) -> Self {
        Self {
            center: [config.center_lat, config.center_lng],
            zoom: config.zoom,
            tiles: config.tiles.clone(),
        }
    }
}

/// Everything the map page needs to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapDocument {
    /// Base view.
    pub view: MapView,
    /// Tract outlines.
    pub outline: BoundaryOutline,
    /// Mode-specific overlay.
    pub overlay: Overlay,
}

impl MapDocument {
    /// Assembles a document from its parts.
    #[must_use]
    pub fn new(view: &MapViewConfig, boundaries: &BoundarySet, overlay: Overlay) -> Self {
        Self {
            view: MapView::from(view),
            outline: outline(boundaries),
            overlay,
        }
    }
}

/// Marker radius for a weight: `weight / 50`, never below 3.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn marker_radius(weight: i64) -> f64 {
    (weight as f64 / MARKER_WEIGHT_PER_RADIUS).max(MIN_MARKER_RADIUS)
}

/// Escapes text for use inside popup HTML.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds the point overlay.
#[must_use]
pub fn points(outcome: &JoinOutcome) -> Overlay {
    let markers = outcome
        .joined
        .iter()
        .map(|point| CircleMarker {
            lat: point.latitude,
            lng: point.longitude,
            radius: marker_radius(point.weight),
            color: "red",
            fill: true,
            fill_opacity: 0.7,
            popup: format!(
                "Tract: {}<br>Total population: {}",
                escape_html(&point.tract_id),
                escape_html(&point.total_population)
            ),
        })
        .collect();

    Overlay::Points { markers }
}

/// Builds the static heat overlay.
#[must_use]
pub fn heatmap(outcome: &JoinOutcome) -> Overlay {
    Overlay::Heatmap(HeatLayer {
        points: outcome.heat_points(),
        radius: HEAT_RADIUS,
        max_zoom: HEAT_MAX_ZOOM,
    })
}

/// Builds the animated heat overlay from one outcome per hour, hour 0
/// first.
///
/// # Errors
///
/// Returns [`OverlayError::FrameCount`] unless exactly 24 outcomes are
/// given.
pub fn time_heatmap(hours: &[JoinOutcome]) -> Result<Overlay, OverlayError> {
    if hours.len() != usize::from(HOURS_PER_DAY) {
        return Err(OverlayError::FrameCount { count: hours.len() });
    }

    Ok(Overlay::TimeHeatmap(TimeHeatLayer {
        frames: hours.iter().map(JoinOutcome::heat_points).collect(),
        index: (0..HOURS_PER_DAY).map(|h| format!("{h:02}")).collect(),
        auto_play: false,
    }))
}

/// Builds the boundary outline layer from the full district set.
#[must_use]
pub fn outline(boundaries: &BoundarySet) -> BoundaryOutline {
    BoundaryOutline {
        geojson: boundaries.outline(),
        color: "white",
        weight: 2,
        fill_opacity: 0.0,
    }
}
