//! JSON-only command-line interface.
//!
//! Thin consumer of the client facade: argument parsing, JSON rendering and
//! the disk-snapshot plumbing. No caching or retry logic of its own.

use clap::Parser;
use color_eyre::Result;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;

use crate::config::ConfigFile;
use crate::dwd::client::DwdPollenApi;
use crate::dwd::disk::DiskCache;
use crate::error::Error;
use crate::regions::region_entries;

#[derive(Parser, Debug)]
#[command(name = "bloomtracker")]
#[command(about = "Get pollen load data from the Deutscher Wetterdienst (JSON output only)")]
#[command(version)]
pub struct Args {
  /// Region ID
  #[arg(short, long)]
  pub region: Option<i32>,

  /// Partregion ID
  #[arg(short, long, default_value_t = -1)]
  pub partregion: i32,

  /// Output file (default: stdout)
  #[arg(short, long)]
  pub output: Option<PathBuf>,

  /// Bypass the cache and force a data update
  #[arg(long)]
  pub no_cache: bool,

  /// List all available regions
  #[arg(short, long)]
  pub list: bool,

  /// List allergen names present in the current forecast
  #[arg(long)]
  pub allergens: bool,

  /// Path to config file (default: $XDG_CONFIG_HOME/bloomtracker/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,
}

pub async fn run(args: Args) -> Result<()> {
  let config = ConfigFile::load(args.config.as_deref())?.into_client_config();

  let disk = config
    .cache_file
    .clone()
    .map(DiskCache::new)
    .or_else(|| DiskCache::default_path().map(DiskCache::new));

  let api = DwdPollenApi::with_config(config)?;

  // The region list is static reference data; it needs no network at all.
  if args.list {
    let value = json!({ "regions": region_entries() });
    return write_output(args.output.as_deref(), &value);
  }

  if !args.no_cache {
    if let Some(disk) = &disk {
      if let Some(doc) = disk.load() {
        api.prime(doc);
      }
    }
  }

  if args.no_cache {
    api.update(true).await?;
  }

  let result = if args.allergens {
    let names = api.get_allergen_names().await?;
    write_output(args.output.as_deref(), &json!({ "allergens": names }))
  } else {
    let Some(region_id) = args.region else {
      let help = json!({
        "status": "error",
        "error": "Missing required argument: region",
        "help": "Run with --help for usage information"
      });
      write_output(None, &help)?;
      std::process::exit(1);
    };

    match api.get_pollen(region_id, args.partregion).await {
      Ok(forecast) => write_output(args.output.as_deref(), &serde_json::to_value(&forecast)?),
      Err(Error::NotFound { .. }) => {
        let value = json!({
          "error": format!("Region {}-{} not found.", region_id, args.partregion),
          "status": "error",
          "code": 404
        });
        write_output(args.output.as_deref(), &value)
      }
      Err(err) => Err(err.into()),
    }
  };

  // Persist whatever the run fetched, best-effort.
  if let Some(disk) = &disk {
    if let Some(doc) = api.document() {
      disk.store(&doc);
    }
  }

  result
}

fn write_output(path: Option<&std::path::Path>, value: &serde_json::Value) -> Result<()> {
  let output = serde_json::to_string_pretty(value)?;
  match path {
    Some(path) => {
      let mut file = std::fs::File::create(path)?;
      writeln!(file, "{output}")?;
    }
    None => println!("{output}"),
  }
  Ok(())
}
