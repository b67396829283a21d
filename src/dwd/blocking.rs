//! Blocking client facade.
//!
//! A thin adapter that drives the async client on an owned current-thread
//! runtime. Freshness, single-flight and retry semantics live entirely in
//! the shared core; nothing is duplicated here.

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::ClientConfig;
use crate::dwd::client;
use crate::dwd::fetch::FetchBackend;
use crate::dwd::types::{AllergenForecast, Document, RegionForecast};
use crate::error::Error;

/// Blocking API client for the current pollen load in Germany.
pub struct DwdPollenApi {
  runtime: tokio::runtime::Runtime,
  inner: client::DwdPollenApi,
}

impl DwdPollenApi {
  pub fn new() -> Result<Self, Error> {
    Self::with_config(ClientConfig::default())
  }

  pub fn with_config(config: ClientConfig) -> Result<Self, Error> {
    let inner = client::DwdPollenApi::with_config(config)?;
    Self::wrap(inner)
  }

  /// Build against a custom fetch backend.
  pub fn with_backend(
    backend: Arc<dyn FetchBackend>,
    config: ClientConfig,
  ) -> Result<Self, Error> {
    Self::wrap(client::DwdPollenApi::with_backend(backend, config))
  }

  fn wrap(inner: client::DwdPollenApi) -> Result<Self, Error> {
    let runtime = tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .map_err(|e| Error::Runtime(format!("failed to build tokio runtime: {e}")))?;
    Ok(Self { runtime, inner })
  }

  pub fn update(&self, force: bool) -> Result<(), Error> {
    self.runtime.block_on(self.inner.update(force))
  }

  pub fn get_pollen(&self, region_id: i32, partregion_id: i32) -> Result<RegionForecast, Error> {
    self
      .runtime
      .block_on(self.inner.get_pollen(region_id, partregion_id))
  }

  pub fn get_region_names(&self) -> Result<Vec<(i32, i32, String, String)>, Error> {
    self.runtime.block_on(self.inner.get_region_names())
  }

  pub fn get_allergen_names(&self) -> Result<Vec<String>, Error> {
    self.runtime.block_on(self.inner.get_allergen_names())
  }

  pub fn get_allergen_for_region(
    &self,
    region_id: i32,
    partregion_id: i32,
    allergen_name: &str,
  ) -> Result<AllergenForecast, Error> {
    self.runtime.block_on(self.inner.get_allergen_for_region(
      region_id,
      partregion_id,
      allergen_name,
    ))
  }

  pub fn get_forecast_summary(
    &self,
    region_id: i32,
    partregion_id: i32,
  ) -> Result<BTreeMap<NaiveDate, BTreeMap<String, String>>, Error> {
    self
      .runtime
      .block_on(self.inner.get_forecast_summary(region_id, partregion_id))
  }

  pub fn document(&self) -> Option<Arc<Document>> {
    self.inner.document()
  }

  pub fn prime(&self, doc: Document) {
    self.inner.prime(doc);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dwd::fetch::testing::ScriptedBackend;
  use std::time::Duration;

  fn payload() -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
      "last_update": "2019-04-19 11:00 Uhr",
      "next_update": "2100-01-01 11:00 Uhr",
      "content": [{
        "region_id": 50,
        "region_name": "Brandenburg und Berlin",
        "partregion_id": -1,
        "partregion_name": "",
        "Pollen": { "Birke": { "today": "3", "tomorrow": "2", "dayafter_to": "1" } }
      }]
    }))
    .unwrap()
  }

  #[test]
  fn test_blocking_facade_shares_cache_semantics() {
    let backend = Arc::new(ScriptedBackend::new(vec![Ok(payload())]));
    let config = ClientConfig::default()
      .with_max_retries(1)
      .with_base_delay(Duration::from_millis(1));
    let api = DwdPollenApi::with_backend(backend.clone(), config).unwrap();

    let region = api.get_pollen(50, -1).unwrap();
    assert_eq!(region.region_name, "Brandenburg und Berlin");
    assert_eq!(backend.calls(), 1);

    // Fresh document: further queries do not fetch.
    assert_eq!(api.get_allergen_names().unwrap(), vec!["Birke"]);
    assert_eq!(api.get_region_names().unwrap().len(), 1);
    assert_eq!(backend.calls(), 1);

    assert!(matches!(
      api.get_pollen(999, -1),
      Err(Error::NotFound { .. })
    ));
  }
}
