pub mod cancel_key;
pub mod check;
pub mod cli_args;
pub mod console;

use std::sync::Arc;

use anyhow::Result;
use ar_config::{Config, MonitorMode};
use ar_core::{CoordinatorSettings, CycleStats, ResponseCoordinator};
use ar_host::SleepDetector;
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cancel_key::EscapeKey;
use cli_args::{Cli, Command};
use console::Console;

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli);

    let config = Config::load_with_overrides(cli.config.as_deref(), cli.overrides())?;
    debug!("Effective configuration: {:?}", config);

    if let Some(Command::Check { file }) = &cli.command {
        return check::run_check(file, &config);
    }

    let console = Arc::new(Console::new());
    print_banner(&console, &config);

    let host = ar_host::create_host(&config)?;
    let (signal_tx, signal_rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    let sleep_task = config.monitor.enable_sleep_detection.then(|| {
        console.status("💤 Sleep detection enabled");
        SleepDetector::default().spawn(signal_tx.clone(), shutdown.clone())
    });
    tokio::spawn(wait_for_shutdown(shutdown.clone()));

    let coordinator = ResponseCoordinator::new(host, CoordinatorSettings::from_config(&config))
        .with_status_writer(console.clone())
        .with_cancel_signal(Box::new(EscapeKey::new()));

    let stats = coordinator.run(signal_rx, shutdown.clone()).await;
    shutdown.cancel();
    if let Some(task) = sleep_task {
        let _ = task.await;
    }

    print_summary(&console, &stats);
    Ok(())
}

fn initialize_logging(cli: &Cli) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    // Console status lines already cover normal operation, so the default stays quiet.
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let directives = [
        env!("CARGO_PKG_NAME").replace('-', "_"),
        "autorespond".to_string(),
        "ar_core".to_string(),
        "ar_config".to_string(),
        "ar_detection".to_string(),
        "ar_host".to_string(),
    ]
    .iter()
    .map(|target| format!("{}={}", target, level))
    .collect::<Vec<_>>()
    .join(",");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
                    _ = term.recv() => info!("Terminated, shutting down"),
                    _ = shutdown.cancelled() => return,
                }
            }
            Err(e) => {
                debug!("SIGTERM handler unavailable: {}", e);
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
                    _ = shutdown.cancelled() => return,
                }
            }
        }
    }
    #[cfg(not(unix))]
    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
        _ = shutdown.cancelled() => return,
    }
    shutdown.cancel();
}

fn print_banner(console: &Console, config: &Config) {
    let mode = match config.monitor.mode {
        MonitorMode::All => "all terminal windows",
        MonitorMode::Single => "the focused terminal window",
    };
    console.status(&format!("Starting auto-responder for {}", mode));
    console.status(&format!(
        "Response delay {}s, check interval {}s",
        config.timing.response_delay_secs, config.timing.check_interval_secs
    ));
    console.status(&format!("Whitelisted tools: {}", config.whitelist().join(", ")));
    console.status("Press Escape during a countdown to cancel, Ctrl-C to quit");
}

fn print_summary(console: &Console, stats: &CycleStats) {
    console.status(&format!("Stopped after {}", stats));
}
