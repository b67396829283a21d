//! Typed snapshot of the upstream pollen document.
//!
//! A [`Document`] is replaced wholesale on every successful refresh and
//! handed out behind an `Arc`, so readers always see one self-consistent
//! snapshot from a single fetch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Europe::Berlin;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::severity::SeverityLevel;

/// Forecast for one allergen: calendar date to severity.
pub type AllergenForecast = BTreeMap<NaiveDate, SeverityLevel>;

/// The forecast for one region/partregion pair.
///
/// `last_update`/`next_update` are the upstream's own Berlin-local
/// timestamps, carried verbatim; `None` means the upstream value was
/// missing or malformed and the data is treated as always stale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionForecast {
  pub region_id: i32,
  pub region_name: String,
  /// `-1` means the region has no sub-division.
  pub partregion_id: i32,
  pub partregion_name: String,
  /// Allergen name to per-date severities.
  pub pollen: BTreeMap<String, AllergenForecast>,
  pub last_update: Option<NaiveDateTime>,
  pub next_update: Option<NaiveDateTime>,
}

/// One full upstream snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
  /// Regions in upstream publication order.
  pub regions: Vec<RegionForecast>,
  /// Document-level timestamps (Berlin-local, verbatim from upstream).
  pub last_update: Option<NaiveDateTime>,
  pub next_update: Option<NaiveDateTime>,
  /// Local wall-clock time at which this snapshot was retrieved.
  pub fetched_at: DateTime<Utc>,
}

impl Document {
  /// Freshness rule: fresh iff the upstream announced a next update and
  /// Berlin-local now is strictly before it. Unknown `next_update` means
  /// always stale.
  pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
    match self.next_update {
      Some(next) => now.with_timezone(&Berlin).naive_local() < next,
      None => false,
    }
  }

  pub fn find_region(&self, region_id: i32, partregion_id: i32) -> Option<&RegionForecast> {
    self
      .regions
      .iter()
      .find(|r| r.region_id == region_id && r.partregion_id == partregion_id)
  }

  /// All allergen names appearing anywhere in the document, sorted.
  pub fn allergen_names(&self) -> Vec<String> {
    let names: BTreeSet<&String> = self
      .regions
      .iter()
      .flat_map(|r| r.pollen.keys())
      .collect();
    names.into_iter().cloned().collect()
  }

  /// `(region_id, partregion_id, region_name, partregion_name)` rows, sorted.
  pub fn region_names(&self) -> Vec<(i32, i32, String, String)> {
    let mut rows: Vec<_> = self
      .regions
      .iter()
      .map(|r| {
        (
          r.region_id,
          r.partregion_id,
          r.region_name.clone(),
          r.partregion_name.clone(),
        )
      })
      .collect();
    rows.sort();
    rows
  }
}
