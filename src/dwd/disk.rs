//! On-disk snapshot of the last fetched document.
//!
//! A collaborator-level optimization: the CLI seeds the in-memory cache
//! from this file on startup and writes it back after a successful run.
//! Load and store are best-effort; any problem is a logged cache miss, and
//! whether a loaded snapshot is still usable is decided by the freshness
//! cache's normal rule, not by file age.

use std::path::PathBuf;
use tracing::{debug, warn};

use crate::dwd::types::Document;

pub struct DiskCache {
  path: PathBuf,
}

impl DiskCache {
  pub fn new(path: PathBuf) -> Self {
    Self { path }
  }

  /// Default snapshot location under the user cache directory.
  pub fn default_path() -> Option<PathBuf> {
    Some(
      dirs::cache_dir()?
        .join("bloomtracker")
        .join("pollen_data.json"),
    )
  }

  pub fn load(&self) -> Option<Document> {
    let contents = match std::fs::read_to_string(&self.path) {
      Ok(contents) => contents,
      Err(err) => {
        debug!(path = %self.path.display(), error = %err, "no disk snapshot");
        return None;
      }
    };

    match serde_json::from_str(&contents) {
      Ok(doc) => {
        debug!(path = %self.path.display(), "loaded disk snapshot");
        Some(doc)
      }
      Err(err) => {
        warn!(path = %self.path.display(), error = %err, "discarding unreadable disk snapshot");
        None
      }
    }
  }

  pub fn store(&self, doc: &Document) {
    if let Some(parent) = self.path.parent() {
      if let Err(err) = std::fs::create_dir_all(parent) {
        warn!(path = %parent.display(), error = %err, "failed to create cache directory");
        return;
      }
    }

    let json = match serde_json::to_string_pretty(doc) {
      Ok(json) => json,
      Err(err) => {
        warn!(error = %err, "failed to serialize snapshot");
        return;
      }
    };

    if let Err(err) = std::fs::write(&self.path, json) {
      warn!(path = %self.path.display(), error = %err, "failed to write disk snapshot");
    }
  }
}
