//! Map imagery tiles: sources, fetching, and the local cache.
//!
//! A [`TileSource`] names a slippy-map imagery server and builds tile URLs;
//! [`TileHttpClient`] abstracts the HTTP transport for testability; and
//! [`TileCache`] is the memory-bounded cache the prefetch worker warms ahead
//! of user movement. Tile content is immutable per coordinate+zoom, so cache
//! writes are idempotent and safe under concurrent overlapping jobs.

mod cache;
mod source;

pub use cache::{TileCache, TileCacheStats};
pub use source::{OsmTileSource, ReqwestTileClient, TileFetchError, TileHttpClient, TileSource};

#[cfg(test)]
pub use source::tests::MockTileClient;
