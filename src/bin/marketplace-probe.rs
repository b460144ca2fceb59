//! # Marketplace Availability Probe
//!
//! Loads the marketplace configuration, starts the availability monitor and
//! reports where it settles: connected, retry budget exhausted, or no
//! database configured. Useful before deploying to check that a process
//! would come up on the database rather than on the fallback store.
//!
//! ```bash
//! MARKETPLACE_ENV=production marketplace-probe [--wait-seconds 30]
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use marketplace_core::availability::AvailabilityState;
use marketplace_core::config::ConfigManager;
use marketplace_core::logging::init_tracing;
use marketplace_core::MarketplaceCore;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "marketplace-probe")]
#[command(about = "Check whether the marketplace would start on its database")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Seconds to wait for the availability monitor to settle
    #[arg(long, default_value_t = 30)]
    wait_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let wait = Duration::from_secs(cli.wait_seconds);

    let manager = ConfigManager::load().context("failed to load marketplace configuration")?;
    let config = manager.config();
    println!("Environment:      {}", manager.environment());
    println!("Config directory: {}", manager.config_directory().display());
    println!(
        "Database URL:     {}",
        if config.database.database_url().is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    println!("Retry limit:      {}", config.database.retry_limit);
    println!("Blocks file:      {}", config.fallback.blocks_path().display());

    let core = MarketplaceCore::from_config(config).context("failed to assemble marketplace core")?;
    println!(
        "Fallback store:   {} block(s) loaded",
        core.fallback.blocks.len().await
    );

    let monitor = core.start();
    let deadline = Instant::now() + wait;

    let state = loop {
        let state = core.state();
        if state == AvailabilityState::Connected || state.is_terminal() {
            break state;
        }
        if Instant::now() >= deadline {
            warn!(state = ?state, attempts = core.monitor.attempts(), "Probe timed out before the monitor settled");
            break state;
        }
        sleep(POLL_INTERVAL).await;
    };
    monitor.abort();

    info!(state = ?state, attempts = core.monitor.attempts(), "Probe finished");
    println!("State:            {state:?}");
    println!("Attempts:         {}", core.monitor.attempts());

    match state {
        AvailabilityState::Connected => Ok(()),
        AvailabilityState::Unconfigured => {
            println!("No database configured; the process would serve from the fallback store.");
            Ok(())
        }
        other => bail!("database not reachable (state {other:?}); the process would run degraded"),
    }
}
