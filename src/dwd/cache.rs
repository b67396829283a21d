//! Freshness-aware cache with single-flight refresh coalescing.
//!
//! The cache owns the last successfully parsed [`Document`] and decides on
//! every access whether it is still usable. Snapshots are replaced wholesale
//! behind an `Arc`, never mutated in place, so the fresh-read path is a
//! plain read-lock clone and readers never observe a half-updated document.
//!
//! At most one refresh is ever in flight: concurrent callers share the same
//! spawned refresh task through a [`Shared`] future. Running the refresh on
//! its own task means a caller that gives up waiting cannot abort the
//! refresh for everyone else.

use chrono::Utc;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::dwd::fetch::{FetchBackend, Fetcher};
use crate::dwd::parse;
use crate::dwd::types::Document;
use crate::error::{Error, FetchError};

type RefreshResult = Result<Arc<Document>, Error>;
type RefreshFuture = Shared<BoxFuture<'static, RefreshResult>>;

pub struct FreshnessCache {
  inner: Arc<Inner>,
}

struct Inner {
  fetcher: Fetcher,
  min_refresh_interval: Duration,
  /// The one shared mutable resource: the current snapshot.
  current: RwLock<Option<Arc<Document>>>,
  /// Single-flight slot; `Some` while a refresh is running.
  inflight: Mutex<Option<RefreshFuture>>,
  last_attempt: Mutex<Option<Instant>>,
}

impl FreshnessCache {
  pub fn new(config: &ClientConfig) -> Result<Self, Error> {
    let fetcher = Fetcher::new(config)?;
    Ok(Self::from_fetcher(fetcher, config))
  }

  /// Build against a custom backend (tests, alternative transports).
  pub fn with_backend(backend: Arc<dyn FetchBackend>, config: &ClientConfig) -> Self {
    Self::from_fetcher(Fetcher::with_backend(backend, config), config)
  }

  fn from_fetcher(fetcher: Fetcher, config: &ClientConfig) -> Self {
    Self {
      inner: Arc::new(Inner {
        fetcher,
        min_refresh_interval: config.min_refresh_interval,
        current: RwLock::new(None),
        inflight: Mutex::new(None),
        last_attempt: Mutex::new(None),
      }),
    }
  }

  /// The current snapshot, with no freshness check and no I/O.
  pub fn document(&self) -> Option<Arc<Document>> {
    self.inner.current.read().clone()
  }

  /// Seed an empty cache, e.g. from an on-disk snapshot. A populated cache
  /// is left untouched.
  pub fn prime(&self, doc: Document) {
    let mut current = self.inner.current.write();
    if current.is_none() {
      *current = Some(Arc::new(doc));
    }
  }

  /// Return a fresh document, refreshing if needed.
  ///
  /// The held document is fresh iff `force` is false, a document is present
  /// and Berlin-local now is strictly before its declared next update; that
  /// path does no I/O and takes no exclusive lock. Otherwise the caller
  /// joins the in-flight refresh (or starts one) and gets its result. A
  /// failed refresh leaves the previous document untouched; the error is
  /// reported to every caller that waited on that refresh.
  ///
  /// Must be called from within a tokio runtime.
  pub async fn ensure_fresh(&self, force: bool) -> RefreshResult {
    if !force {
      if let Some(doc) = self.document() {
        if doc.is_fresh_at(Utc::now()) {
          debug!("serving fresh cached document");
          return Ok(doc);
        }
      }
    }

    let refresh = {
      let mut inflight = self.inner.inflight.lock();
      match inflight.as_ref() {
        Some(running) => {
          debug!("joining in-flight refresh");
          running.clone()
        }
        None => {
          // Re-read under the lock: a refresh may have completed between
          // the fast-path check and here.
          if !force {
            if let Some(doc) = self.document() {
              if doc.is_fresh_at(Utc::now()) {
                return Ok(doc);
              }
              // Local floor on refresh frequency: when the upstream
              // timestamp is missing or long past, don't hammer the
              // endpoint. A forced refresh bypasses the floor.
              if self.inner.within_refresh_floor() {
                debug!("refresh floor active, serving stale document");
                return Ok(doc);
              }
            }
          }
          let refresh = self.inner.clone().spawn_refresh();
          *inflight = Some(refresh.clone());
          refresh
        }
      }
    };

    refresh.await
  }
}

impl Inner {
  fn within_refresh_floor(&self) -> bool {
    match *self.last_attempt.lock() {
      Some(at) => at.elapsed() < self.min_refresh_interval,
      None => false,
    }
  }

  fn spawn_refresh(self: Arc<Self>) -> RefreshFuture {
    *self.last_attempt.lock() = Some(Instant::now());
    let handle = tokio::spawn(async move { self.run_refresh().await });
    async move {
      handle
        .await
        .unwrap_or_else(|err| Err(Error::Fetch(FetchError::Transient(format!(
          "refresh task failed: {err}"
        )))))
    }
    .boxed()
    .shared()
  }

  async fn run_refresh(self: Arc<Self>) -> RefreshResult {
    let result = self.fetch_and_parse().await;
    match &result {
      Ok(doc) => {
        // Wholesale replacement; a failed refresh never reaches this point.
        *self.current.write() = Some(Arc::clone(doc));
        debug!(regions = doc.regions.len(), "refresh succeeded");
      }
      Err(err) => {
        warn!(error = %err, "refresh failed, keeping previous document");
      }
    }
    // Clear the single-flight slot only after the new snapshot is visible,
    // so a racing caller either joins this result or sees the fresh document.
    *self.inflight.lock() = None;
    result
  }

  async fn fetch_and_parse(&self) -> RefreshResult {
    let raw = self.fetcher.fetch().await?;
    let doc = parse::parse(&raw)?;
    Ok(Arc::new(doc))
  }
}

impl Clone for FreshnessCache {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dwd::fetch::testing::ScriptedBackend;
  use chrono::NaiveDateTime;

  fn payload() -> Vec<u8> {
    payload_for(50, "Brandenburg und Berlin")
  }

  fn payload_for(region_id: i32, region_name: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
      "last_update": "2019-04-19 11:00 Uhr",
      "next_update": "2100-01-01 11:00 Uhr",
      "content": [{
        "region_id": region_id,
        "region_name": region_name,
        "partregion_id": -1,
        "partregion_name": "",
        "Pollen": { "Birke": { "today": "3", "tomorrow": "2", "dayafter_to": "1" } }
      }]
    }))
    .unwrap()
  }

  fn config() -> ClientConfig {
    ClientConfig::default()
      .with_max_retries(1)
      .with_base_delay(Duration::from_millis(1))
      .with_min_refresh_interval(Duration::from_secs(60))
  }

  fn document(next_update: Option<&str>) -> Document {
    Document {
      regions: Vec::new(),
      last_update: None,
      next_update: next_update
        .map(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()),
      fetched_at: Utc::now(),
    }
  }

  fn transient() -> FetchError {
    FetchError::Transient("connection error".to_string())
  }

  #[tokio::test]
  async fn test_fresh_document_is_served_without_fetching() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(payload())]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());
    cache.prime(document(Some("2100-01-01 11:00")));

    for _ in 0..5 {
      let doc = cache.ensure_fresh(false).await.unwrap();
      assert!(doc.regions.is_empty());
    }
    assert_eq!(backend.calls(), 0);
  }

  #[tokio::test]
  async fn test_stale_document_triggers_one_refresh() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(payload())]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());
    cache.prime(document(Some("2019-04-20 11:00")));

    let doc = cache.ensure_fresh(false).await.unwrap();
    assert_eq!(doc.regions.len(), 1);
    assert_eq!(backend.calls(), 1);

    // The refreshed document is fresh until 2100; no further fetches.
    cache.ensure_fresh(false).await.unwrap();
    assert_eq!(backend.calls(), 1);
  }

  #[tokio::test]
  async fn test_unknown_next_update_is_stale_but_floored() {
    let backend = Arc::new(ScriptedBackend::new(vec![Err(transient())]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());
    cache.prime(document(None));

    // Always stale: the first call attempts a refresh, which fails; the
    // caller that triggered it sees the error.
    let err = cache.ensure_fresh(false).await.unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::Exhausted { .. })));
    assert_eq!(backend.calls(), 1);

    // Within the refresh floor the stale document is served silently.
    let doc = cache.ensure_fresh(false).await.unwrap();
    assert!(doc.regions.is_empty());
    assert_eq!(backend.calls(), 1);
  }

  #[tokio::test]
  async fn test_force_bypasses_freshness_and_floor() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(payload())]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());
    cache.prime(document(Some("2100-01-01 11:00")));

    cache.ensure_fresh(true).await.unwrap();
    assert_eq!(backend.calls(), 1);
    cache.ensure_fresh(true).await.unwrap();
    assert_eq!(backend.calls(), 2);
  }

  #[tokio::test]
  async fn test_concurrent_callers_share_one_refresh() {
    let mut backend = ScriptedBackend::new(vec![Ok(payload())]);
    // Hold the refresh open long enough for every caller to pile up on it.
    backend.delay = Some(Duration::from_millis(50));
    let backend = Arc::new(backend);
    let cache = FreshnessCache::with_backend(backend.clone(), &config());

    let mut handles = Vec::new();
    for _ in 0..16 {
      let cache = cache.clone();
      handles.push(tokio::spawn(async move { cache.ensure_fresh(false).await }));
    }
    for handle in handles {
      let doc = handle.await.unwrap().unwrap();
      assert_eq!(doc.regions.len(), 1);
    }
    assert_eq!(backend.calls(), 1);
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_previous_document() {
    let backend = Arc::new(ScriptedBackend::new(vec![Err(transient())]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());
    cache.prime(document(Some("2019-04-20 11:00")));

    let err = cache.ensure_fresh(true).await.unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::Exhausted { .. })));

    // The stale snapshot is still held and servable.
    let held = cache.document().expect("previous document dropped");
    assert!(held.regions.is_empty());
  }

  #[tokio::test]
  async fn test_empty_cache_with_failing_backend_reports_error() {
    let backend = Arc::new(ScriptedBackend::new(vec![Err(transient())]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());

    assert!(cache.ensure_fresh(false).await.is_err());
    assert!(cache.document().is_none());
  }

  #[tokio::test]
  async fn test_unparseable_payload_surfaces_parse_error() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(b"{\"content\": []}".to_vec())]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());

    let err = cache.ensure_fresh(false).await.unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
    assert!(cache.document().is_none());
  }

  #[tokio::test]
  async fn test_refresh_does_not_disturb_held_snapshot() {
    let backend = Arc::new(ScriptedBackend::new(vec![
      Ok(payload_for(50, "Brandenburg und Berlin")),
      Ok(payload_for(20, "Mecklenburg-Vorpommern")),
    ]));
    let cache = FreshnessCache::with_backend(backend.clone(), &config());

    let held = cache.ensure_fresh(false).await.unwrap();
    assert_eq!(held.regions[0].region_id, 50);

    cache.ensure_fresh(true).await.unwrap();
    assert_eq!(backend.calls(), 2);

    // The snapshot handed out before the refresh is untouched; only the
    // cache's current document moved on to the new fetch.
    assert_eq!(held.regions[0].region_id, 50);
    assert_eq!(held.regions[0].region_name, "Brandenburg und Berlin");
    let current = cache.document().unwrap();
    assert_eq!(current.regions[0].region_id, 20);
    assert_eq!(current.regions[0].region_name, "Mecklenburg-Vorpommern");
  }

  #[tokio::test]
  async fn test_prime_does_not_replace_populated_cache() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(payload())]));
    let cache = FreshnessCache::with_backend(backend, &config());

    cache.ensure_fresh(false).await.unwrap();
    cache.prime(document(None));

    let doc = cache.document().unwrap();
    assert_eq!(doc.regions.len(), 1);
  }
}
