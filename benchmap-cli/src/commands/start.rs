//! Start command - run a headless demo session.
//!
//! Builds a full session against the real OSM tile server, feeds it points
//! from the point API, simulates a short eastward pan, and prints the
//! resulting telemetry. Useful for smoke-testing the engine and for warming
//! a tile cache from the command line.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use benchmap::api::{HttpPointClient, PointClient};
use benchmap::coord::LatLon;
use benchmap::session::Viewport;
use benchmap::tile::{OsmTileSource, ReqwestTileClient, TileCache};
use benchmap::{MapSession, SessionCallbacks, SessionConfig, SessionServices};

use crate::error::CliError;

/// Simulated pan: number of gesture steps.
const PAN_STEPS: u32 = 8;

/// Simulated pan: eastward degrees per step.
const PAN_STEP_DEG: f64 = 0.002;

/// Simulated pan: delay between gesture steps.
const PAN_STEP_DELAY: Duration = Duration::from_millis(150);

/// Run the start command.
pub async fn run(
    mut config: SessionConfig,
    lat: Option<f64>,
    lon: Option<f64>,
    zoom: Option<f64>,
    provider: Option<String>,
) -> Result<(), CliError> {
    // CLI flags override the config file
    let mut center = config.initial_viewport.center;
    if let Some(lat) = lat {
        center.latitude = lat;
    }
    if let Some(lon) = lon {
        center.longitude = lon;
    }
    let zoom = zoom.unwrap_or(config.initial_viewport.zoom);
    config.initial_viewport = Viewport::new(center, zoom);

    if let Some(provider) = provider {
        config.provider_mode = provider.parse().map_err(CliError::Config)?;
    }

    println!("Benchmap headless session");
    println!("=========================");
    println!();
    println!("Center:   {center}");
    println!("Zoom:     {zoom}");
    println!("Provider: {}", config.provider_mode);
    println!();

    // Points are a collaborator, not part of the session: fetch first
    let client = HttpPointClient::new(config.api.base_url.as_str())?;
    let points = match client.nearby(center, config.api.nearby_radius_m).await {
        Ok(points) => {
            println!("Fetched {} benches near the center", points.len());
            points
        }
        Err(e) => {
            // Data errors are non-fatal; the map still works without markers
            println!("Point fetch failed ({e}), continuing without markers");
            Vec::new()
        }
    };

    let tile_client = ReqwestTileClient::new()
        .map_err(|e| CliError::Config(format!("Tile client setup failed: {e}")))?;
    let services = SessionServices {
        tile_source: Arc::new(OsmTileSource::new()),
        tile_client: Arc::new(tile_client),
        tile_cache: Arc::new(TileCache::new(config.cache.max_size_bytes)),
    };

    let callbacks = SessionCallbacks::default()
        .on_viewport_changed(|viewport| {
            tracing::info!(center = %viewport.center, zoom = viewport.zoom, "viewport");
        })
        .on_point_selected(|id| println!("Selected bench #{id}"));

    let (session, handle) = MapSession::new(config, services, callbacks);
    let cancel = CancellationToken::new();
    let session_task = tokio::spawn(session.run(cancel.clone()));

    handle.provider_loaded();
    handle.set_user_location(Some(center));
    handle.set_points(points);

    // Simulate an eastward pan so direction-aware prefetch kicks in
    println!("Simulating an eastward pan ({PAN_STEPS} steps)...");
    for step in 1..=PAN_STEPS {
        let panned = LatLon::new(
            center.latitude,
            center.longitude + PAN_STEP_DEG * step as f64,
        );
        handle.gesture(panned, zoom);
        tokio::time::sleep(PAN_STEP_DELAY).await;
    }

    // Let settle prefetches and in-flight downloads finish
    tokio::time::sleep(Duration::from_millis(1500)).await;

    if let Some(snapshot) = handle.snapshot().await {
        let t = &snapshot.telemetry;
        println!();
        println!("Telemetry");
        println!("=========");
        println!("Gestures:            {}", t.gestures);
        println!("Prefetch jobs:       {} issued", t.prefetch_jobs_issued);
        println!("                     {} throttled", t.prefetch_jobs_throttled);
        println!("                     {} completed", t.prefetch_jobs_completed);
        println!("                     {} superseded", t.prefetch_jobs_superseded);
        println!("Tiles fetched:       {}", t.tiles_fetched);
        println!("Tile fetch failures: {}", t.tile_fetch_failures);
        println!("Markers:             {} added", t.markers_added);
        println!(
            "Tile cache:          {} tiles, {} KiB",
            snapshot.tile_cache.entry_count,
            snapshot.tile_cache.size_bytes / 1024
        );
    }

    handle.shutdown();
    cancel.cancel();
    let _ = session_task.await;

    Ok(())
}
