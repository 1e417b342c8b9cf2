use std::net::{Ipv4Addr, SocketAddr};

use figment::Jail;
use rstest::{fixture, rstest};

use super::*;
use crate::scenario::TransportChoice;

#[fixture]
fn cfg() -> HarnessConfig {
    HarnessConfig {
        host: "127.0.0.1".to_owned(),
        tcp_port: 9000,
        udp_port: 9001,
        workers: 4,
        pool_size: 2,
        events_per_worker: 100,
        payload_sizes: "64, 256".to_owned(),
        scenario: "burst,udp-burst".to_owned(),
        seed: 7,
        timeout_secs: 30,
        backoff_ms: 250,
        io_timeout_ms: 1000,
        pace_us: 0,
        overflow_capacity: 16_384,
        duplicate_interval: 10,
        id_stride: 10_000,
    }
}

fn addr(port: u16) -> SocketAddr { SocketAddr::from((Ipv4Addr::LOCALHOST, port)) }

#[rstest]
fn settings_carry_configuration(cfg: HarnessConfig) {
    let settings = RunSettings::from_config(&cfg, 99).expect("valid");
    assert_eq!(settings.pool_size.get(), 2);
    assert_eq!(settings.params.payload_sizes.as_slice(), [64, 256]);
    assert_eq!(settings.params.seed, 7);
    assert_eq!(settings.backoff.delay(), Duration::from_millis(250));
    assert_eq!(settings.deadline, Duration::from_secs(30));
}

#[rstest]
fn zero_seed_uses_fallback(mut cfg: HarnessConfig) {
    cfg.seed = 0;
    let settings = RunSettings::from_config(&cfg, 99).expect("valid");
    assert_eq!(settings.params.seed, 99);
}

#[rstest]
#[case::unknown_scenario(|c: &mut HarnessConfig| c.scenario = "burst,nope".to_owned(),
    ConfigError::UnknownScenario("nope".to_owned()))]
#[case::empty_scenario(|c: &mut HarnessConfig| c.scenario = " , ".to_owned(), ConfigError::NoScenario)]
#[case::zero_pool(|c: &mut HarnessConfig| c.pool_size = 0, ConfigError::ZeroPoolSize)]
#[case::zero_workers(|c: &mut HarnessConfig| c.workers = 0, ConfigError::ZeroWorkers)]
#[case::bad_sizes(|c: &mut HarnessConfig| c.payload_sizes = "12,abc".to_owned(),
    ConfigError::PayloadSizes(PayloadSizeError::Invalid("abc".to_owned())))]
#[case::stride_overflow(|c: &mut HarnessConfig| c.id_stride = u64::MAX,
    ConfigError::IdSpaceOverflow { stride: u64::MAX, workers: 4 })]
fn rejects_invalid_settings(
    mut cfg: HarnessConfig,
    #[case] tweak: fn(&mut HarnessConfig),
    #[case] expected: ConfigError,
) {
    tweak(&mut cfg);
    assert_eq!(RunSettings::from_config(&cfg, 1).expect_err("invalid"), expected);
}

#[rstest]
fn jobs_partition_ids_and_rotate_scenarios(cfg: HarnessConfig) {
    let settings = RunSettings::from_config(&cfg, 1).expect("valid");
    let jobs = settings.jobs(addr(9000), addr(9001));
    assert_eq!(jobs.len(), 4);
    let names: Vec<&str> = jobs.iter().map(|j| j.spec.name.as_str()).collect();
    assert_eq!(names, ["burst", "udp-burst", "burst", "udp-burst"]);
    for (worker, job) in (0_u64..).zip(&jobs) {
        assert_eq!(job.spec.id_base, worker * 10_000);
        assert_eq!(job.spec.seed, 7 + worker);
        assert_eq!(job.target.tcp, addr(9000));
        assert_eq!(job.target.io_timeout, Duration::from_millis(1000));
    }
    assert_eq!(jobs[1].spec.transport, TransportChoice::Datagram);
}

#[rstest]
#[case::overflow("overflow", 2, 20_480)]
#[case::sweep("sweep", 10_001, 10_080)]
#[case::burst_fits("burst", 100, 10_000)]
fn stride_covers_largest_scenario(
    mut cfg: HarnessConfig,
    #[case] scenario: &str,
    #[case] events_per_worker: u64,
    #[case] stride: u64,
) {
    cfg.scenario = format!("{scenario},burst");
    cfg.workers = 2;
    cfg.events_per_worker = events_per_worker;
    let settings = RunSettings::from_config(&cfg, 1).expect("valid");
    assert_eq!(settings.id_stride, stride);

    let ranges: Vec<(u64, u64)> = settings
        .jobs(addr(9000), addr(9001))
        .iter()
        .map(|job| (job.spec.id_base, job.spec.id_base + job.spec.count - 1))
        .collect();
    assert!(ranges[0].1 < ranges[1].0, "{ranges:?}");
}

#[rstest]
fn events_beyond_stride_widen_it(mut cfg: HarnessConfig) {
    cfg.events_per_worker = 25_000;
    let settings = RunSettings::from_config(&cfg, 1).expect("valid");
    assert_eq!(settings.id_stride, 25_000);
}

#[rstest]
fn widened_stride_still_checks_overflow(mut cfg: HarnessConfig) {
    cfg.id_stride = 1;
    cfg.events_per_worker = u64::MAX / 2;
    assert_eq!(
        RunSettings::from_config(&cfg, 1).expect_err("overflow"),
        ConfigError::IdSpaceOverflow {
            stride: u64::MAX / 2,
            workers: 4,
        }
    );
}

#[rstest]
fn load_cli_merges_layers_for_runs() {
    Jail::expect_with(|j| {
        j.set_env("EVSTRESS_TCP_PORT", "7100");
        j.create_file(".evstress.toml", "scenario = \"chaos\"")?;
        let cli = load_cli(["evstress", "--workers", "3"]).expect("resolve");
        assert_eq!(cli.command, None);
        assert_eq!(cli.config.workers, 3);
        assert_eq!(cli.config.tcp_port, 7100);
        assert_eq!(cli.config.scenario, "chaos");
        Ok(())
    });
}

#[rstest]
fn load_cli_keeps_subcommand() {
    Jail::expect_with(|_j| {
        let cli = load_cli(["evstress", "list"]).expect("resolve");
        assert_eq!(cli.command, Some(Commands::List));
        Ok(())
    });
}
