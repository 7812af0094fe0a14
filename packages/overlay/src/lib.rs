#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tract join and map overlay construction.
//!
//! [`join`] places population records at their tract centroids;
//! [`builder`] turns joined points into one of the three overlays the map
//! page draws.

pub mod builder;
pub mod join;

pub use builder::{MapDocument, Overlay, OverlayError, VisualizationMode};
pub use join::{JoinOutcome, JoinReport, JoinedPoint, UnjoinedReason, UnjoinedRecord, join};
