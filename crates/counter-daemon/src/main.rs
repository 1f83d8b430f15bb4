//! Counter demo entry point.
//!
//! Mounts the four interval counter variants side by side, drives them from
//! real timer threads or a simulated clock, and renders their values as the
//! page would.

mod display;
mod signals;

use anyhow::{Context, Result};
use clap::Parser;
use counter_common::config::CounterConfig;
use counter_common::time::TickInterval;
use counter_core::{build_variant, ManualClock, ThreadTimer, TimerFacility};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::display::Page;
use crate::signals::{wait_for_shutdown, SignalHandler};

/// Ticks rendered in simulated mode when `--ticks` is 0.
const DEFAULT_SIMULATED_TICKS: u64 = 10;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "counter-demo",
    about = "Render periodic counter variants side by side",
    version,
    long_about = None
)]
struct Args {
    /// Path to a counter configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Tick interval, e.g. "1s" or "250ms" (overrides config file).
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    /// Ticks to run before exiting (0 = until interrupted).
    #[arg(long, short = 'n', default_value = "0")]
    ticks: u64,

    /// Drive the counters from a simulated clock instead of real time.
    #[arg(long, short = 's')]
    simulated: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting counter demo");

    let mut config = load_config(&args)?;
    if let Some(interval) = args.interval {
        config.interval = interval;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        interval = %humantime::format_duration(config.interval),
        variants = config.display.variants.len(),
        simulated = args.simulated,
        "Configuration loaded"
    );

    let signal_handler = SignalHandler::new().context("Failed to set up signal handlers")?;

    run_demo(&config, &signal_handler, args.ticks, args.simulated)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("counter_daemon={level},counter_core={level},counter_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `COUNTER_CONFIG_PATH` environment variable
/// 3. `config/default.toml` (local development)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<CounterConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return CounterConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("COUNTER_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from COUNTER_CONFIG_PATH");
            return CounterConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from COUNTER_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "COUNTER_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("config/default.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return CounterConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {local_path:?}"));
    }

    info!("No config file found, using built-in defaults");
    Ok(CounterConfig::default())
}

/// Mount, run, and unmount the page.
fn run_demo(
    config: &CounterConfig,
    signal_handler: &SignalHandler,
    ticks: u64,
    simulated: bool,
) -> Result<()> {
    let interval = config.tick_interval()?;

    let clock = simulated.then(|| Arc::new(ManualClock::new()));
    let facility: Arc<dyn TimerFacility> = match &clock {
        Some(clock) => clock.clone(),
        None => Arc::new(ThreadTimer::new()),
    };

    let variants = config
        .display
        .variants
        .iter()
        .map(|kind| build_variant(*kind, config, Arc::clone(&facility)))
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to build counters")?;
    let page = Page::mount(variants);
    page.start_all().context("Failed to start counters")?;
    info!(variants = ?page.kinds(), "Counters started");

    match clock {
        Some(clock) => run_simulated(&page, &clock, interval, ticks, signal_handler),
        None => run_realtime(&page, interval, ticks, signal_handler),
    }

    info!("Shutting down...");
    let reports = page.unmount();

    if config.display.show_metrics {
        let json =
            serde_json::to_string_pretty(&reports).context("Failed to serialize metrics")?;
        println!("{json}");
    }

    info!(
        signals = signal_handler.state().signal_count(),
        "Demo shutdown complete"
    );
    Ok(())
}

fn run_simulated(
    page: &Page,
    clock: &ManualClock,
    interval: TickInterval,
    ticks: u64,
    signal_handler: &SignalHandler,
) {
    let ticks = if ticks == 0 {
        info!(
            ticks = DEFAULT_SIMULATED_TICKS,
            "Simulated mode needs a tick limit, using default"
        );
        DEFAULT_SIMULATED_TICKS
    } else {
        ticks
    };

    print_if_changed(page);
    for _ in 0..ticks {
        if signal_handler.shutdown_requested() {
            break;
        }
        clock.advance(interval.as_duration());
        print_if_changed(page);
    }
}

fn run_realtime(page: &Page, interval: TickInterval, ticks: u64, signal_handler: &SignalHandler) {
    let deadline = realtime_deadline(Instant::now(), interval, ticks);
    if ticks > 0 && deadline.is_none() {
        warn!(ticks, interval = %interval, "Tick limit out of range, running until interrupted");
    }
    let poll = interval.as_duration().min(Duration::from_millis(50));

    print_if_changed(page);
    loop {
        if wait_for_shutdown(signal_handler, poll) {
            info!("Shutdown signal received, stopping counters");
            break;
        }
        print_if_changed(page);

        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!(ticks, "Tick limit reached");
            break;
        }
    }
}

/// When a run of `ticks` intervals starting at `now` should end.
///
/// `None` when unbounded or when the end is not representable.
fn realtime_deadline(now: Instant, interval: TickInterval, ticks: u64) -> Option<Instant> {
    if ticks == 0 {
        return None;
    }
    let period = interval.as_duration();
    let runtime = period.checked_mul(u32::try_from(ticks).ok()?)?;
    // Half an interval of slack so the last tick lands before the deadline.
    now.checked_add(runtime)?.checked_add(period / 2)
}

fn print_if_changed(page: &Page) {
    if let Some(frame) = page.render_if_changed() {
        println!("{frame}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["counter-demo", "--simulated", "-n", "5"]);
        assert!(args.simulated);
        assert_eq!(args.ticks, 5);
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_interval() {
        let args = Args::parse_from(["counter-demo", "-i", "250ms", "-c", "demo.toml"]);
        assert_eq!(args.interval, Some(Duration::from_millis(250)));
        assert_eq!(args.config, Some(PathBuf::from("demo.toml")));
    }

    #[test]
    fn test_realtime_deadline() {
        let now = Instant::now();
        let interval = TickInterval::from_millis(100).unwrap();
        assert_eq!(realtime_deadline(now, interval, 0), None);
        assert_eq!(
            realtime_deadline(now, interval, 3),
            Some(now + Duration::from_millis(350))
        );

        let huge = TickInterval::from_duration(Duration::from_secs(u64::MAX / 2)).unwrap();
        assert_eq!(realtime_deadline(now, huge, 4), None);
        assert_eq!(realtime_deadline(now, interval, u64::MAX), None);
    }

    #[test]
    fn test_config_policies_reach_counters() {
        let handler = SignalHandler::new().unwrap();
        let config = CounterConfig::from_toml(
            r#"
            interval = "100ms"
            restart_policy = "reset"

            [display]
            variants = ["stable_setter"]
            show_metrics = false
            "#,
        )
        .unwrap();
        assert!(run_demo(&config, &handler, 2, true).is_ok());
    }

    #[test]
    fn test_simulated_run_completes() {
        let handler = SignalHandler::new().unwrap();
        let config = CounterConfig {
            interval: Duration::from_millis(100),
            ..Default::default()
        };
        assert!(run_demo(&config, &handler, 3, true).is_ok());
    }
}
