//! bloomtracker - API client for the "Deutscher Wetterdienst" to get the
//! current pollen load in Germany.
//!
//! The upstream publishes one nationwide JSON forecast roughly once a day
//! at an announced time. This crate fetches it with bounded retries, parses
//! it into typed per-region, per-allergen records and serves them through a
//! freshness-aware cache that refetches only when the upstream's own
//! next-update timestamp has passed, coalescing concurrent refreshes into a
//! single in-flight request.
//!
//! Two facades share the same cache core: [`DwdPollenApi`] for async
//! callers and [`blocking::DwdPollenApi`] for blocking ones.
//!
//! ```no_run
//! # async fn example() -> Result<(), bloomtracker::Error> {
//! let api = bloomtracker::DwdPollenApi::new()?;
//! let forecast = api.get_pollen(50, -1).await?;
//! println!("{}", forecast.region_name);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod dwd;
pub mod error;
pub mod regions;
pub mod severity;

pub use config::{ClientConfig, DWD_URL};
pub use dwd::blocking;
pub use dwd::client::DwdPollenApi;
pub use dwd::types::{AllergenForecast, Document, RegionForecast};
pub use error::{Error, FetchError, ParseError};
pub use regions::{ALLERGENS, ALLERGEN_BOTANICAL_NAMES, REGIONS};
pub use severity::SeverityLevel;
