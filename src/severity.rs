//! Severity codec: maps the raw DWD load codes to values and labels.
//!
//! The feed publishes seven codes: the four whole levels `0`..`3` and the
//! half-step composites `0-1`, `1-2`, `2-3` (load between two levels). `-1`
//! means "no data". Labels are the upstream's own German terms.

use serde::{Deserialize, Serialize};

/// Fixed legend: raw code, numeric value, German label.
const LEGEND: &[(&str, f64, &str)] = &[
  ("0", 0.0, "keine Belastung"),
  ("0-1", 0.5, "keine bis geringe Belastung"),
  ("1", 1.0, "geringe Belastung"),
  ("1-2", 1.5, "geringe bis mittlere Belastung"),
  ("2", 2.0, "mittlere Belastung"),
  ("2-3", 2.5, "mittlere bis hohe Belastung"),
  ("3", 3.0, "hohe Belastung"),
];

/// Label for `-1` and anything else the legend doesn't know.
const UNAVAILABLE_LABEL: &str = "keine Angabe";
const UNAVAILABLE_COLOR: &str = "#808080";

/// The pollen load for one allergen on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityLevel {
  /// Numeric load, 0.0 (none) to 3.0 (high); `None` when unavailable.
  pub value: Option<f64>,
  /// The raw source token, preserved verbatim.
  pub raw: String,
  /// Human-readable German label.
  pub human: String,
  /// Hex color for chart/table rendering.
  pub color: String,
}

impl SeverityLevel {
  /// Decode a raw severity token. Total: unrecognized tokens become the
  /// unavailable level with the raw token preserved, never an error.
  pub fn decode(raw: &str) -> Self {
    match LEGEND.iter().find(|(code, _, _)| *code == raw) {
      Some((_, value, human)) => Self {
        value: Some(*value),
        raw: raw.to_string(),
        human: (*human).to_string(),
        color: color_for_value(*value).to_string(),
      },
      None => Self {
        value: None,
        raw: raw.to_string(),
        human: UNAVAILABLE_LABEL.to_string(),
        color: UNAVAILABLE_COLOR.to_string(),
      },
    }
  }

  pub fn is_available(&self) -> bool {
    self.value.is_some()
  }
}

/// Severity color ramp, green (no load) to red (high load).
fn color_for_value(value: f64) -> &'static str {
  if value <= 0.0 {
    "#00FF00"
  } else if value <= 1.0 {
    "#ADFF2F"
  } else if value <= 2.0 {
    "#FFFF00"
  } else if value <= 2.5 {
    "#FFA500"
  } else {
    "#FF0000"
  }
}
