//! Shared CLI type definitions for evstress build and runtime.
//!
//! This crate provides the CLI argument and configuration types used by both
//! the `build.rs` script (for man page generation) and the harness binary.
//! Keeping them in a separate crate lets the build script render the man page
//! without pulling in the Tokio runtime.

// FIXME: File-wide suppressions are unavoidable here. Clap and OrthoConfig derive macros
// inject generated code throughout the module, and there is no mechanism to narrow
// the scope without restructuring the crate.
#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![allow(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]
#![allow(
    unfulfilled_lint_expectations,
    reason = "derive macros conditionally generate items"
)]

use clap::{Args, Parser, Subcommand};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

/// Default target host for both transports.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default TCP port of the receiver under test.
pub const DEFAULT_TCP_PORT: u16 = 9000;
/// Default UDP port of the receiver under test.
pub const DEFAULT_UDP_PORT: u16 = 9001;
/// Default receiver-side queue capacity assumed by the overflow scenario.
pub const DEFAULT_OVERFLOW_CAPACITY: u64 = 16_384;

/// CLI subcommands exposed by `evstress`.
#[derive(Subcommand, Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List the built-in scenarios and their expected receiver-side effect.
    #[command(name = "list")]
    List,
}

/// Harness configuration merged from defaults, `.evstress.toml`, the
/// environment (`EVSTRESS_*`) and the command line.
#[derive(Args, OrthoConfig, Serialize, Deserialize, Default, Debug, Clone)]
#[ortho_config(prefix = "EVSTRESS_")]
pub struct HarnessConfig {
    /// Host name or address of the receiver under test.
    #[ortho_config(default = DEFAULT_HOST.to_owned())]
    #[arg(long, default_value_t = String::from(DEFAULT_HOST))]
    pub host: String,
    /// TCP port of the receiver.
    #[ortho_config(default = DEFAULT_TCP_PORT)]
    #[arg(long, default_value_t = DEFAULT_TCP_PORT)]
    pub tcp_port: u16,
    /// UDP port of the receiver.
    #[ortho_config(default = DEFAULT_UDP_PORT)]
    #[arg(long, default_value_t = DEFAULT_UDP_PORT)]
    pub udp_port: u16,
    /// Number of workers (simulated clients) to launch.
    #[ortho_config(default = 10)]
    #[arg(long, default_value_t = 10)]
    pub workers: u32,
    /// Maximum number of workers running at the same time.
    #[ortho_config(default = 10)]
    #[arg(long, default_value_t = 10)]
    pub pool_size: u32,
    /// Events each worker plans to send.
    #[ortho_config(default = 1000)]
    #[arg(long, default_value_t = 1000)]
    pub events_per_worker: u64,
    /// Comma-separated payload sizes in bytes, for example `64,256,1024`.
    #[ortho_config(default = "256".to_owned())]
    #[arg(long, default_value_t = String::from("256"))]
    pub payload_sizes: String,
    /// Comma-separated scenario names; workers are assigned round-robin.
    #[ortho_config(default = "sweep".to_owned())]
    #[arg(long, default_value_t = String::from("sweep"))]
    pub scenario: String,
    /// Base seed for randomised scenarios; zero derives one from the clock.
    #[ortho_config(default = 0)]
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Run deadline in seconds.
    #[ortho_config(default = 300)]
    #[arg(long, default_value_t = 300)]
    pub timeout_secs: u64,
    /// Reconnect backoff for supervised stream workers, in milliseconds.
    #[ortho_config(default = 1000)]
    #[arg(long, default_value_t = 1000)]
    pub backoff_ms: u64,
    /// Per-write I/O timeout in milliseconds.
    #[ortho_config(default = 5000)]
    #[arg(long, default_value_t = 5000)]
    pub io_timeout_ms: u64,
    /// Delay between writes in microseconds; zero sends as fast as possible.
    #[ortho_config(default = 0)]
    #[arg(long, default_value_t = 0)]
    pub pace_us: u64,
    /// Receiver queue capacity the overflow scenario tries to exceed.
    #[ortho_config(default = DEFAULT_OVERFLOW_CAPACITY)]
    #[arg(long, default_value_t = DEFAULT_OVERFLOW_CAPACITY)]
    pub overflow_capacity: u64,
    /// Fresh events between two injected duplicates.
    #[ortho_config(default = 10)]
    #[arg(long, default_value_t = 10)]
    pub duplicate_interval: u32,
    /// Event id partition width per worker (`worker_id * stride + index`).
    #[ortho_config(default = 10_000)]
    #[arg(long, default_value_t = 10_000)]
    pub id_stride: u64,
}

/// Top-level CLI entry point consumed by binaries.
#[derive(Parser, Deserialize, Serialize, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// Harness configuration.
    #[command(flatten)]
    pub config: HarnessConfig,
    /// Optional subcommand.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use figment::Jail;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn env_config_loading() {
        Jail::expect_with(|j| {
            j.set_env("EVSTRESS_HOST", "10.0.0.7");
            j.set_env("EVSTRESS_TCP_PORT", "7000");
            let cfg = HarnessConfig::load_from_iter(["evstress"]).expect("load");
            assert_eq!(cfg.host, "10.0.0.7");
            assert_eq!(cfg.tcp_port, 7000);
            assert_eq!(cfg.udp_port, DEFAULT_UDP_PORT);
            Ok(())
        });
    }

    #[rstest]
    fn cli_overrides_env() {
        Jail::expect_with(|j| {
            j.set_env("EVSTRESS_WORKERS", "3");
            let cfg =
                HarnessConfig::load_from_iter(["evstress", "--workers", "25"]).expect("load");
            assert_eq!(cfg.workers, 25);
            Ok(())
        });
    }

    #[rstest]
    fn loads_from_dotfile() {
        Jail::expect_with(|j| {
            j.create_file(".evstress.toml", "scenario = \"chaos,burst\"")?;
            let cfg = HarnessConfig::load_from_iter(["evstress"]).expect("load");
            assert_eq!(cfg.scenario, "chaos,burst");
            Ok(())
        });
    }

    #[rstest]
    fn defaults_match_receiver_ports() {
        Jail::expect_with(|_j| {
            let cfg = HarnessConfig::load_from_iter(["evstress"]).expect("load");
            assert_eq!(cfg.tcp_port, 9000);
            assert_eq!(cfg.udp_port, 9001);
            assert_eq!(cfg.backoff_ms, 1000);
            assert_eq!(cfg.payload_sizes, "256");
            Ok(())
        });
    }

    #[rstest]
    #[case(&["evstress", "list"], Some(Commands::List))]
    #[case(&["evstress", "--scenario", "burst"], None)]
    fn parses_subcommand(#[case] args: &[&str], #[case] expected: Option<Commands>) {
        let cli = Cli::try_parse_from(args).expect("parse");
        assert_eq!(cli.command, expected);
    }
}
