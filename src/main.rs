use clap::Parser;
use color_eyre::Result;
use tracing_subscriber::EnvFilter;

use bloomtracker::cli::{self, Args};

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  // Logs go to stderr; stdout is reserved for the JSON output.
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  cli::run(args).await
}
