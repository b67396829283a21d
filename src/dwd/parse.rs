//! Tolerant parser for the upstream JSON document.
//!
//! Only a top-level shape problem fails the parse. A malformed region or
//! allergen entry is skipped with a warning so one bad data point never
//! blocks the rest of the country, and a malformed timestamp degrades to
//! "unknown" (always stale).

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Utc, Weekday};
use chrono_tz::Europe::Berlin;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::dwd::types::{AllergenForecast, Document, RegionForecast};
use crate::error::ParseError;
use crate::severity::SeverityLevel;

/// Upstream timestamp format, Berlin-local ("2019-04-19 11:00 Uhr").
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M Uhr";

/// Raw shape of one region entry.
#[derive(Debug, Deserialize)]
struct ApiRegion {
  region_id: i32,
  region_name: String,
  partregion_id: i32,
  partregion_name: String,
  #[serde(rename = "Pollen")]
  pollen: BTreeMap<String, Value>,
}

/// Raw per-allergen columns. The feed publishes relative day names; which
/// calendar dates they map to depends on the publication weekday.
#[derive(Debug, Deserialize)]
struct ApiAllergen {
  today: Option<String>,
  tomorrow: Option<String>,
  dayafter_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
  Today,
  Tomorrow,
  DayAfter,
}

/// Parse a raw payload using the current wall-clock time for date bucketing.
pub fn parse(raw: &[u8]) -> Result<Document, ParseError> {
  parse_at(raw, Utc::now())
}

/// Parse a raw payload as of `now` (injectable for tests).
pub fn parse_at(raw: &[u8], now: DateTime<Utc>) -> Result<Document, ParseError> {
  let value: Value =
    serde_json::from_slice(raw).map_err(|e| ParseError::Json(e.to_string()))?;
  let root = value
    .as_object()
    .ok_or_else(|| ParseError::Shape("top level is not an object".to_string()))?;
  let entries = root
    .get("content")
    .ok_or_else(|| ParseError::Shape("missing 'content' key".to_string()))?
    .as_array()
    .ok_or_else(|| ParseError::Shape("'content' is not a list".to_string()))?;
  if entries.is_empty() {
    return Err(ParseError::Empty);
  }

  let last_update = timestamp_field(root, "last_update");
  let next_update = timestamp_field(root, "next_update");

  let berlin_now = now.with_timezone(&Berlin);
  let slots = date_slots(berlin_now.date_naive(), berlin_now.weekday());

  let mut regions = Vec::new();
  for entry in entries {
    match parse_region(entry, &slots, last_update, next_update) {
      Ok(region) => regions.push(region),
      Err(reason) => warn!(%reason, "skipping malformed region entry"),
    }
  }
  if regions.is_empty() {
    return Err(ParseError::Empty);
  }

  Ok(Document {
    regions,
    last_update,
    next_update,
    fetched_at: now,
  })
}

fn parse_region(
  entry: &Value,
  slots: &[(Slot, NaiveDate)],
  last_update: Option<NaiveDateTime>,
  next_update: Option<NaiveDateTime>,
) -> Result<RegionForecast, String> {
  let api: ApiRegion = serde_json::from_value(entry.clone()).map_err(|e| e.to_string())?;

  let mut pollen = BTreeMap::new();
  for (allergen, value) in api.pollen {
    match serde_json::from_value::<ApiAllergen>(value) {
      Ok(columns) => {
        pollen.insert(allergen, build_forecast(&columns, slots));
      }
      Err(err) => warn!(
        allergen = %allergen,
        region_id = api.region_id,
        error = %err,
        "skipping malformed allergen entry"
      ),
    }
  }

  Ok(RegionForecast {
    region_id: api.region_id,
    region_name: api.region_name,
    partregion_id: api.partregion_id,
    partregion_name: api.partregion_name,
    pollen,
    last_update,
    next_update,
  })
}

fn build_forecast(columns: &ApiAllergen, slots: &[(Slot, NaiveDate)]) -> AllergenForecast {
  let mut forecast = AllergenForecast::new();
  for (slot, date) in slots {
    let raw = match slot {
      Slot::Today => columns.today.as_deref(),
      Slot::Tomorrow => columns.tomorrow.as_deref(),
      // "-1" in the day-after column means not yet published, not "no data".
      Slot::DayAfter => match columns.dayafter_to.as_deref() {
        Some("-1") | None => None,
        some => some,
      },
    };
    if let Some(raw) = raw {
      forecast.insert(*date, SeverityLevel::decode(raw));
    }
  }
  forecast
}

/// Which feed columns are published for which calendar dates.
///
/// The feed updates around 11:00 on working days. Monday to Thursday it
/// covers today and tomorrow; Friday additionally the day after; over the
/// weekend the Friday columns shift (Saturday's own load sits in the
/// `tomorrow` column, Sunday only has the day-after column left).
fn date_slots(today: NaiveDate, weekday: Weekday) -> Vec<(Slot, NaiveDate)> {
  let tomorrow = today + Days::new(1);
  let day_after = today + Days::new(2);
  match weekday {
    Weekday::Mon | Weekday::Tue | Weekday::Wed | Weekday::Thu => {
      vec![(Slot::Today, today), (Slot::Tomorrow, tomorrow)]
    }
    Weekday::Fri => vec![
      (Slot::Today, today),
      (Slot::Tomorrow, tomorrow),
      (Slot::DayAfter, day_after),
    ],
    Weekday::Sat => vec![(Slot::Tomorrow, today), (Slot::DayAfter, day_after)],
    Weekday::Sun => vec![(Slot::DayAfter, day_after)],
  }
}

fn timestamp_field(root: &Map<String, Value>, key: &str) -> Option<NaiveDateTime> {
  let raw = root.get(key)?.as_str()?;
  match NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
    Ok(ts) => Some(ts),
    Err(err) => {
      warn!(field = key, value = raw, error = %err, "malformed timestamp, treating as unknown");
      None
    }
  }
}
