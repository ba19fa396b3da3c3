//! Map provider abstraction
//!
//! This module defines the capability contract between the viewport
//! controller and a map-rendering backend, and the two concrete variants:
//! a raster-tile backend ([`RasterProvider`]) and a vector/camera backend
//! ([`VectorProvider`]). The two share one call site behind [`MapProvider`];
//! they differ in camera model and in whether transition completion is
//! native or synthesized.
//!
//! # Factory
//!
//! ```ignore
//! use benchmap::provider::{create_provider, ProviderMode};
//! use tokio::sync::mpsc;
//!
//! let (events_tx, events_rx) = mpsc::unbounded_channel();
//! let provider = create_provider(ProviderMode::Raster, center, zoom, events_tx);
//! provider.notify_loaded();
//! ```

mod raster;
mod types;
mod vector;

pub use raster::RasterProvider;
pub use types::{MapProvider, ProviderEvent, ProviderEventSender, ProviderMode};
pub use vector::VectorProvider;

use std::sync::Arc;

use crate::coord::LatLon;

/// Construct the provider implementation for a mode.
pub fn create_provider(
    mode: ProviderMode,
    center: LatLon,
    zoom: f64,
    events: ProviderEventSender,
) -> Arc<dyn MapProvider> {
    match mode {
        ProviderMode::Raster => Arc::new(RasterProvider::new(center, zoom, events)),
        ProviderMode::Vector => Arc::new(VectorProvider::new(center, zoom, events)),
    }
}
