//! Typed errors for the bloomtracker crate.
//!
//! All variants are `Clone` and carry their causes as strings: the result of
//! a single-flight refresh is fanned out to every caller waiting on it, so
//! the error type has to be cheap to duplicate.

use thiserror::Error;

/// Network-level failures from the fetcher.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
  /// Connection failures, timeouts and 5xx responses. Worth retrying.
  #[error("transient fetch failure: {0}")]
  Transient(String),

  /// The request itself is rejected (4xx) or cannot be built. Never retried.
  #[error("permanent fetch failure: {message}")]
  Permanent {
    /// HTTP status, when the failure came from a response.
    status: Option<u16>,
    message: String,
  },

  /// Every retry attempt failed with a transient error.
  #[error("fetch failed after {attempts} attempts: {last_cause}")]
  Exhausted { attempts: u32, last_cause: String },
}

impl FetchError {
  /// Whether another attempt might succeed.
  pub fn is_transient(&self) -> bool {
    matches!(self, FetchError::Transient(_))
  }
}

/// The upstream document was structurally unusable.
///
/// Individual malformed regions or allergen entries never produce this; they
/// are skipped with a warning during parsing.
#[derive(Debug, Clone, Error)]
pub enum ParseError {
  #[error("invalid JSON: {0}")]
  Json(String),

  #[error("unexpected document shape: {0}")]
  Shape(String),

  #[error("document contains no regions")]
  Empty,
}

/// Top-level error type returned by the client facades.
#[derive(Debug, Clone, Error)]
pub enum Error {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Parse(#[from] ParseError),

  /// The requested region/partregion pair is not in the current document.
  #[error("region {region_id}-{partregion_id} not found")]
  NotFound { region_id: i32, partregion_id: i32 },

  /// The requested allergen is not present in the region's forecast.
  #[error("allergen {0:?} not found")]
  AllergenNotFound(String),

  /// HTTP client or runtime construction failed.
  #[error("runtime error: {0}")]
  Runtime(String),
}
