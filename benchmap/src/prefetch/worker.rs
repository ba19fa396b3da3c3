//! Background prefetch execution.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::coord::tiles_in_region;
use crate::telemetry::SessionMetrics;
use crate::tile::{TileCache, TileHttpClient, TileSource};

use super::config::PrefetchConfig;
use super::job::PrefetchJob;

/// Spawn the prefetch worker onto the Tokio runtime.
///
/// The worker watches the scheduler's job slot and executes whatever job is
/// newest when it becomes free; jobs published while one is running replace
/// each other in the slot, so outstanding work is bounded to one running
/// plus one pending.
///
/// Jobs are fire-and-forget: errors are logged and discarded, nothing is
/// retried, and a tile already in the cache is skipped (idempotence). A job
/// superseded mid-run stops at the next generation check; tiles it already
/// wrote remain valid.
pub fn spawn_prefetch_worker(
    mut slot: watch::Receiver<Option<PrefetchJob>>,
    source: Arc<dyn TileSource>,
    client: Arc<dyn TileHttpClient>,
    cache: Arc<TileCache>,
    generation: Arc<AtomicU64>,
    config: PrefetchConfig,
    metrics: Arc<SessionMetrics>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        debug!(source = source.name(), "Prefetch worker started");

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                changed = slot.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let job = slot.borrow_and_update().clone();
                    let Some(job) = job else { continue };
                    run_job(&job, &source, &client, &cache, &generation, &config, &metrics)
                        .await;
                }
            }
        }

        debug!("Prefetch worker stopped");
    })
}

async fn run_job(
    job: &PrefetchJob,
    source: &Arc<dyn TileSource>,
    client: &Arc<dyn TileHttpClient>,
    cache: &Arc<TileCache>,
    generation: &Arc<AtomicU64>,
    config: &PrefetchConfig,
    metrics: &Arc<SessionMetrics>,
) {
    let zoom = job.zoom.min(source.max_zoom());

    let tiles = match tiles_in_region(&job.region, zoom) {
        Ok(tiles) => tiles,
        Err(e) => {
            debug!(error = %e, "Prefetch region not enumerable, discarding job");
            return;
        }
    };

    let mut wanted: Vec<_> = tiles.take(config.max_tiles_per_job + 1).collect();
    if wanted.len() > config.max_tiles_per_job {
        wanted.truncate(config.max_tiles_per_job);
        debug!(
            cap = config.max_tiles_per_job,
            %job.region,
            zoom,
            "Prefetch region exceeds tile cap, truncating"
        );
    }

    // Already-cached tiles are a no-op; overlapping jobs never duplicate work
    wanted.retain(|tile| !cache.contains(tile));
    if wanted.is_empty() {
        metrics.prefetch_job_completed();
        return;
    }

    let fetched = Arc::new(AtomicU64::new(0));
    let superseded = Arc::new(std::sync::atomic::AtomicBool::new(false));

    futures::stream::iter(wanted)
        .for_each_concurrent(config.fetch_concurrency, |tile| {
            let source = Arc::clone(source);
            let client = Arc::clone(client);
            let cache = Arc::clone(cache);
            let generation = Arc::clone(generation);
            let metrics = Arc::clone(metrics);
            let fetched = Arc::clone(&fetched);
            let superseded = Arc::clone(&superseded);
            let job_generation = job.generation;
            async move {
                // Best-effort supersession: stop starting new fetches once
                // a newer job exists; fetches in flight run to completion
                if generation.load(Ordering::SeqCst) != job_generation {
                    superseded.store(true, Ordering::SeqCst);
                    return;
                }

                let url = source.url(&tile);
                match client.get(&url).await {
                    Ok(data) => {
                        cache.insert(tile, data).await;
                        fetched.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        // Never user-visible, never retried
                        debug!(%tile, error = %e, "Prefetch tile failed, discarding");
                        metrics.tile_fetch_failed();
                    }
                }
            }
        })
        .await;

    metrics.tiles_fetched(fetched.load(Ordering::Relaxed));
    if superseded.load(Ordering::SeqCst) {
        metrics.prefetch_job_superseded();
        debug!(generation = job.generation, "Prefetch job superseded mid-run");
    } else {
        metrics.prefetch_job_completed();
    }

    if job.issued_at.elapsed().as_secs() > 30 {
        warn!(
            %job.region,
            zoom,
            "Prefetch job ran unusually long"
        );
    }
}
