//! Point-data REST client.
//!
//! Thin async client for the bench API: nearby/search queries returning
//! [`Point`](crate::model::Point) collections, per-point detail lookup, and
//! an optional reverse-geocoding lookup. All failures surface as
//! [`ApiError`], whose `Display` form is suitable for showing to the user;
//! nothing here retries; the caller re-issues the triggering action.
//!
//! The traits use boxed futures so sessions can hold `Arc<dyn PointClient>`
//! and tests can substitute mocks.

mod client;
mod types;

pub use client::{HttpPointClient, OpenCageGeocoder, PointClient, ReverseGeocoder};
pub use types::{ApiError, MediaItem, PointDetails};
