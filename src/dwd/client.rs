//! Async client facade over the freshness cache.
//!
//! Query operations refresh implicitly and then project the cached
//! document. When a refresh fails but an older document is still held, the
//! query is answered from the stale snapshot with a warning; only a client
//! that never managed to load any document sees the fetch error. The
//! explicit [`DwdPollenApi::update`] always surfaces refresh errors.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::config::ClientConfig;
use crate::dwd::cache::FreshnessCache;
use crate::dwd::fetch::FetchBackend;
use crate::dwd::types::{AllergenForecast, Document, RegionForecast};
use crate::error::Error;

/// Asynchronous API client for the current pollen load in Germany.
#[derive(Clone)]
pub struct DwdPollenApi {
  cache: FreshnessCache,
}

impl DwdPollenApi {
  pub fn new() -> Result<Self, Error> {
    Self::with_config(ClientConfig::default())
  }

  pub fn with_config(config: ClientConfig) -> Result<Self, Error> {
    Ok(Self {
      cache: FreshnessCache::new(&config)?,
    })
  }

  /// Build against a custom fetch backend.
  pub fn with_backend(backend: Arc<dyn FetchBackend>, config: ClientConfig) -> Self {
    Self {
      cache: FreshnessCache::with_backend(backend, &config),
    }
  }

  /// Refresh the cached document. `force` bypasses the freshness check and
  /// the local refresh floor.
  pub async fn update(&self, force: bool) -> Result<(), Error> {
    self.cache.ensure_fresh(force).await.map(|_| ())
  }

  /// Get the pollen load of the requested region and partregion.
  pub async fn get_pollen(
    &self,
    region_id: i32,
    partregion_id: i32,
  ) -> Result<RegionForecast, Error> {
    let doc = self.snapshot().await?;
    doc
      .find_region(region_id, partregion_id)
      .cloned()
      .ok_or(Error::NotFound {
        region_id,
        partregion_id,
      })
  }

  /// Available regions as sorted
  /// `(region_id, partregion_id, region_name, partregion_name)` rows.
  pub async fn get_region_names(&self) -> Result<Vec<(i32, i32, String, String)>, Error> {
    Ok(self.snapshot().await?.region_names())
  }

  /// All allergen names in the current document, sorted.
  pub async fn get_allergen_names(&self) -> Result<Vec<String>, Error> {
    Ok(self.snapshot().await?.allergen_names())
  }

  /// One allergen's per-date forecast for a region.
  pub async fn get_allergen_for_region(
    &self,
    region_id: i32,
    partregion_id: i32,
    allergen_name: &str,
  ) -> Result<AllergenForecast, Error> {
    let region = self.get_pollen(region_id, partregion_id).await?;
    region
      .pollen
      .get(allergen_name)
      .cloned()
      .ok_or_else(|| Error::AllergenNotFound(allergen_name.to_string()))
  }

  /// Simplified per-date summary: date to (allergen to label).
  pub async fn get_forecast_summary(
    &self,
    region_id: i32,
    partregion_id: i32,
  ) -> Result<BTreeMap<NaiveDate, BTreeMap<String, String>>, Error> {
    let region = self.get_pollen(region_id, partregion_id).await?;

    let mut summary: BTreeMap<NaiveDate, BTreeMap<String, String>> = BTreeMap::new();
    for (allergen, forecast) in &region.pollen {
      for (date, level) in forecast {
        summary
          .entry(*date)
          .or_default()
          .insert(allergen.clone(), level.human.clone());
      }
    }
    Ok(summary)
  }

  /// The current snapshot, with no freshness check and no I/O.
  pub fn document(&self) -> Option<Arc<Document>> {
    self.cache.document()
  }

  /// Seed an empty cache from a previously persisted document.
  pub fn prime(&self, doc: Document) {
    self.cache.prime(doc);
  }

  /// Refresh-then-read used by all query operations, with the stale
  /// fallback described in the module docs.
  async fn snapshot(&self) -> Result<Arc<Document>, Error> {
    match self.cache.ensure_fresh(false).await {
      Ok(doc) => Ok(doc),
      Err(err) => match self.cache.document() {
        Some(doc) => {
          warn!(error = %err, "refresh failed, answering from stale document");
          Ok(doc)
        }
        None => Err(err),
      },
    }
  }
}
