//! HTTP retrieval with bounded retries and exponential backoff.
//!
//! The network edge sits behind [`FetchBackend`] so the retry loop and the
//! cache can be exercised against scripted backends in tests.

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{Error, FetchError};

/// One attempt against the upstream endpoint.
#[async_trait]
pub trait FetchBackend: Send + Sync {
  async fn get(&self) -> Result<Vec<u8>, FetchError>;
}

/// Real backend over reqwest with a per-attempt timeout.
pub struct HttpBackend {
  client: reqwest::Client,
  url: String,
}

impl HttpBackend {
  pub fn new(url: &str, timeout: Duration) -> Result<Self, Error> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Runtime(format!("failed to build HTTP client: {e}")))?;

    Ok(Self {
      client,
      url: url.to_string(),
    })
  }
}

/// Keep chained causes so network failures (DNS/TLS/socket) are visible.
fn format_reqwest_error(err: &reqwest::Error) -> String {
  let mut message = err.to_string();
  let mut source = err.source();

  while let Some(cause) = source {
    let cause_msg = cause.to_string();
    if !cause_msg.is_empty() && !message.contains(&cause_msg) {
      message.push_str(": ");
      message.push_str(&cause_msg);
    }
    source = cause.source();
  }

  message
}

#[async_trait]
impl FetchBackend for HttpBackend {
  async fn get(&self) -> Result<Vec<u8>, FetchError> {
    let response = self
      .client
      .get(&self.url)
      .send()
      .await
      .map_err(|e| FetchError::Transient(format_reqwest_error(&e)))?;

    let status = response.status();
    if status.is_client_error() {
      // The request itself is malformed or forbidden; retrying cannot help.
      return Err(FetchError::Permanent {
        status: Some(status.as_u16()),
        message: format!("HTTP {status} from {}", self.url),
      });
    }
    if !status.is_success() {
      return Err(FetchError::Transient(format!(
        "HTTP {status} from {}",
        self.url
      )));
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| FetchError::Transient(format_reqwest_error(&e)))?;
    Ok(body.to_vec())
  }
}

/// Drives up to `max_retries` attempts with exponential backoff.
pub struct Fetcher {
  backend: Arc<dyn FetchBackend>,
  max_retries: u32,
  base_delay: Duration,
  max_delay: Duration,
}

impl Fetcher {
  pub fn new(config: &ClientConfig) -> Result<Self, Error> {
    let backend = HttpBackend::new(&config.url, config.timeout)?;
    Ok(Self::with_backend(Arc::new(backend), config))
  }

  pub fn with_backend(backend: Arc<dyn FetchBackend>, config: &ClientConfig) -> Self {
    Self {
      backend,
      max_retries: config.max_retries.max(1),
      base_delay: config.base_delay,
      max_delay: config.max_delay,
    }
  }

  /// Fetch the raw document.
  ///
  /// Transient failures are retried with doubling, capped delays; a
  /// permanent failure aborts immediately; running out of attempts yields
  /// [`FetchError::Exhausted`] carrying the last cause.
  pub async fn fetch(&self) -> Result<Vec<u8>, FetchError> {
    let mut delay = self.base_delay;
    let mut last_cause = String::new();

    for attempt in 1..=self.max_retries {
      match self.backend.get().await {
        Ok(body) => {
          debug!(attempt, bytes = body.len(), "fetch succeeded");
          return Ok(body);
        }
        Err(err) if err.is_transient() => {
          warn!(attempt, max_retries = self.max_retries, error = %err, "fetch attempt failed");
          last_cause = err.to_string();
          if attempt < self.max_retries {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.max_delay);
          }
        }
        Err(err) => return Err(err),
      }
    }

    Err(FetchError::Exhausted {
      attempts: self.max_retries,
      last_cause,
    })
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};

  /// Backend that plays back a fixed script of responses and counts calls.
  pub struct ScriptedBackend {
    script: Vec<Result<Vec<u8>, FetchError>>,
    calls: AtomicUsize,
    /// Optional per-call delay, to hold a refresh open in concurrency tests.
    pub delay: Option<Duration>,
  }

  impl ScriptedBackend {
    pub fn new(script: Vec<Result<Vec<u8>, FetchError>>) -> Self {
      Self {
        script,
        calls: AtomicUsize::new(0),
        delay: None,
      }
    }

    pub fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  #[async_trait]
  impl FetchBackend for ScriptedBackend {
    async fn get(&self) -> Result<Vec<u8>, FetchError> {
      let index = self.calls.fetch_add(1, Ordering::SeqCst);
      if let Some(delay) = self.delay {
        tokio::time::sleep(delay).await;
      }
      match self.script.get(index) {
        Some(step) => step.clone(),
        // Script exhausted: repeat the last step.
        None => self
          .script
          .last()
          .cloned()
          .unwrap_or_else(|| Err(FetchError::Transient("empty script".to_string()))),
      }
    }
  }
}
