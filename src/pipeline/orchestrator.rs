//! Ingestion Orchestrator (§4.5): for a city, walk every non-blacklisted
//! complex and both advertisement kinds, fetch and persist listings under
//! a bounded worker pool, then archive whatever dropped out of the walk.
//!
//! Concurrency shape grounded in SPEC_FULL §5: a `tokio::sync::Semaphore`
//! bounds in-flight fetches, a bounded `mpsc` channel is the task queue,
//! and an `AtomicBool` carries the cancellation signal — the same
//! primitives `tokio` applications in this pack reach for around shared
//! mutable state (`tokio::sync::Mutex` in the rate limiter).

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::{mpsc, Mutex as TokioMutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::ScrapingConfig;
use crate::directory;
use crate::domain::{AdvertisementKind, ErrorHistogram, RunStats};
use crate::error::CancelledByOperator;
use crate::scraping::{self, RateLimiter};
use crate::store::Store;

const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(10);

/// One `(complex_id, flat_id, kind)` unit of work (§5 "bounded queue").
struct Task {
    complex_id: String,
    complex_name: String,
    flat_id: String,
    kind: AdvertisementKind,
}

struct BatchOutcome {
    seen_ids: HashSet<String>,
    listings_scraped: u64,
}

#[allow(clippy::too_many_arguments)]
async fn run_batch(
    client: &Client,
    limiter: &Arc<RateLimiter>,
    store: &Arc<Store>,
    city: &str,
    tasks: Vec<Task>,
    concurrency: usize,
    histogram: &Arc<StdMutex<ErrorHistogram>>,
    cancel: &Arc<AtomicBool>,
) -> BatchOutcome {
    let (tx, rx) = mpsc::channel::<Task>(concurrency * 2);
    let rx = Arc::new(TokioMutex::new(rx));
    let seen = Arc::new(StdMutex::new(HashSet::new()));
    let scraped = Arc::new(AtomicU64::new(0));
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let mut workers = JoinSet::new();
    for _ in 0..concurrency {
        let rx = Arc::clone(&rx);
        let seen = Arc::clone(&seen);
        let scraped = Arc::clone(&scraped);
        let semaphore = Arc::clone(&semaphore);
        let client = client.clone();
        let city = city.to_string();
        let limiter = Arc::clone(limiter);
        let store = Arc::clone(store);
        let histogram = Arc::clone(histogram);
        let cancel = Arc::clone(cancel);

        workers.spawn(async move {
            loop {
                if cancel.load(Ordering::Relaxed) {
                    break;
                }
                let task = {
                    let mut guard = rx.lock().await;
                    guard.recv().await
                };
                let Some(task) = task else { break };
                let _permit = semaphore.acquire().await.expect("semaphore never closed");

                seen.lock().unwrap().insert(task.flat_id.clone());
                match scraping::fetch(&client, &limiter, &task.flat_id, task.kind).await {
                    Ok(mut listing) => {
                        listing.city = Some(city.clone());
                        listing.residential_complex = Some(task.complex_name.clone());
                        let url = crate::scraping::http_client::listing_page_url(&task.flat_id);
                        let query_date = Utc::now().date_naive();
                        let snapshot =
                            crate::domain::Snapshot::from_listing(&listing, url, query_date);
                        let persisted = if task.kind.is_rental() {
                            store.upsert_rental(&snapshot)
                        } else {
                            store.upsert_sales(&snapshot)
                        };
                        if let Err(e) = persisted {
                            warn!(complex_id = %task.complex_id, error = %e, "store write failed");
                        } else {
                            scraped.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Err(e) => {
                        histogram.lock().unwrap().bump(&e.histogram_kind());
                    }
                }
            }
        });
    }

    for task in tasks {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if tx.send(task).await.is_err() {
            break;
        }
    }
    drop(tx);

    if cancel.load(Ordering::Relaxed) {
        let _ = tokio::time::timeout(DEFAULT_CANCEL_GRACE, async {
            while workers.join_next().await.is_some() {}
        })
        .await;
        workers.abort_all();
    } else {
        while workers.join_next().await.is_some() {}
    }

    BatchOutcome {
        seen_ids: Arc::try_unwrap(seen)
            .map(|m| m.into_inner().unwrap())
            .unwrap_or_default(),
        listings_scraped: scraped.load(Ordering::Relaxed),
    }
}

/// Public contract: `run(city) -> RunStats` (§4.5).
pub async fn run(
    store: Arc<Store>,
    client: Client,
    limiter: Arc<RateLimiter>,
    city: &str,
    scraping: &ScrapingConfig,
    cancel: Arc<AtomicBool>,
) -> Result<RunStats, CancelledByOperator> {
    let mut stats = RunStats {
        city: city.to_string(),
        started_at: Some(Utc::now()),
        ..Default::default()
    };
    let histogram = Arc::new(StdMutex::new(ErrorHistogram::new()));

    let blacklisted_names = store.blacklisted_complex_names().unwrap_or_default();
    let blacklisted_districts = store.blacklisted_district_pairs().unwrap_or_default();
    let all_complexes = store.list_for_city(city).unwrap_or_default();
    let complexes: Vec<_> =
        directory::list_excluding_blacklists(&all_complexes, &blacklisted_names, &blacklisted_districts)
            .into_iter()
            .cloned()
            .collect();

    stats.complexes_total = complexes.len() as u64;
    info!(city, count = complexes.len(), "starting ingestion run");

    for complex in &complexes {
        if cancel.load(Ordering::Relaxed) {
            break;
        }

        let mut complex_ok = true;
        for kind in [AdvertisementKind::Rental, AdvertisementKind::Sale] {
            let ids = scraping::walk(
                &client,
                city,
                &complex.complex_id,
                kind,
                scraping.max_pages_default,
            )
            .await;

            let tasks = ids
                .iter()
                .map(|flat_id| Task {
                    complex_id: complex.complex_id.clone(),
                    complex_name: complex.name.clone(),
                    flat_id: flat_id.clone(),
                    kind,
                })
                .collect();

            let outcome = run_batch(
                &client,
                &limiter,
                &store,
                city,
                tasks,
                scraping.concurrency.max(1),
                &histogram,
                &cancel,
            )
            .await;

            stats.listings_scraped += outcome.listings_scraped;

            if let Err(e) = store.archive_missing(&complex.name, kind.is_rental(), &outcome.seen_ids) {
                warn!(complex_id = %complex.complex_id, error = %e, "archival barrier failed");
                complex_ok = false;
            }
        }

        if complex_ok {
            stats.complexes_successful += 1;
        } else {
            stats.complexes_failed += 1;
        }
    }

    stats.finished_at = Some(Utc::now());
    stats.errors = Arc::try_unwrap(histogram)
        .map(|m| m.into_inner().unwrap())
        .unwrap_or_default();
    stats.cancelled = cancel.load(Ordering::Relaxed);

    if let Err(e) = store.insert_pipeline_run(&stats) {
        warn!(error = %e, "failed to persist pipeline run row");
    }

    if stats.cancelled {
        Err(CancelledByOperator)
    } else {
        Ok(stats)
    }
}
