//! Binary entry point for the `evstress` harness.
//!
//! The runtime logic lives in `evstress::harness`; this binary installs the
//! log subscriber and delegates.

use std::process::ExitCode;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    evstress::harness::run().await
}
