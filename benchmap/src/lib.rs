//! Benchmap - map session engine for geolocated points of interest
//!
//! This library provides the coordination core of a pannable/zoomable map of
//! geolocated benches: a single authoritative viewport reconciled between
//! user gestures and programmatic commands, a marker set kept in sync with
//! asynchronously fetched point data at minimal churn, and predictive
//! background prefetching of map imagery tiles ahead of user movement.
//!
//! Rendering is out of scope: map backends are consumed through the narrow
//! [`provider::MapProvider`] contract, and the whole engine runs headless on
//! a Tokio runtime.

pub mod api;
pub mod config;
pub mod coord;
pub mod fit;
pub mod markers;
pub mod model;
pub mod prefetch;
pub mod provider;
pub mod session;
pub mod telemetry;
pub mod tile;

pub use config::SessionConfig;
pub use coord::{BoundingBox, LatLon, TileCoord};
pub use model::Point;
pub use provider::ProviderMode;
pub use session::{
    MapSession, SessionCallbacks, SessionHandle, SessionServices, SessionSnapshot, Viewport,
};

use std::future::Future;
use std::pin::Pin;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
