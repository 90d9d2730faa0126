use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use roomwatch_client::{HttpListingSource, ListingSelectors, ListingTarget, PageLocator};
use roomwatch_client::extractor::{
    DEFAULT_ADDRESS_SELECTOR, DEFAULT_ITEM_SELECTOR, DEFAULT_NAME_SELECTOR,
};
use roomwatch_core::monitor::{Monitor, MonitorEvent, MonitorReporter, TracingMonitorReporter};
use roomwatch_core::traits::PageFetcherFactory;
use roomwatch_core::{CycleReport, MonitorConfig, PageRange};

#[derive(Parser)]
#[command(
    name = "roomwatch",
    version,
    about = "Watch a paginated listing site for new and removed entries"
)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the listing pages forever and report what changed each cycle
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        /// Seconds to wait between cycles
        #[arg(short, long, env = "ROOMWATCH_INTERVAL_SECS", default_value_t = 60)]
        interval: u64,

        /// Stop after this many cycles instead of running forever
        #[arg(long, env = "ROOMWATCH_CYCLES")]
        cycles: Option<u64>,

        /// Print each cycle report as a JSON line
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Fetch every page once and print the listings found
    Check {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the snapshot as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// Page URL template; `{page}` is replaced by the page number
    #[arg(short, long, env = "ROOMWATCH_URL")]
    url: String,

    /// First page to fetch
    #[arg(long, env = "ROOMWATCH_START_PAGE", default_value_t = 1)]
    start_page: u32,

    /// Last page to fetch (inclusive)
    #[arg(long, env = "ROOMWATCH_END_PAGE", default_value_t = 5)]
    end_page: u32,

    /// Number of pages fetched at the same time
    #[arg(long, env = "ROOMWATCH_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Render pages in headless Chromium (requires the `browser` feature)
    #[arg(long, env = "ROOMWATCH_BROWSER", default_value_t = false)]
    browser: bool,

    /// Per-page fetch timeout in seconds
    #[arg(long, env = "ROOMWATCH_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// Milliseconds to let page scripts run before reading the DOM (browser only)
    #[arg(long, env = "ROOMWATCH_RENDER_WAIT_MS", default_value_t = 3000)]
    render_wait: u64,

    /// CSS selector of one listing
    #[arg(long, env = "ROOMWATCH_ITEM_SELECTOR", default_value = DEFAULT_ITEM_SELECTOR)]
    item_selector: String,

    /// CSS selector of the listing name, relative to the listing
    #[arg(long, env = "ROOMWATCH_NAME_SELECTOR", default_value = DEFAULT_NAME_SELECTOR)]
    name_selector: String,

    /// CSS selector of the listing address, relative to the listing
    #[arg(long, env = "ROOMWATCH_ADDRESS_SELECTOR", default_value = DEFAULT_ADDRESS_SELECTOR)]
    address_selector: String,
}

impl SourceArgs {
    fn target(&self) -> Result<ListingTarget> {
        let locator = PageLocator::new(&self.url)?;
        let selectors = ListingSelectors {
            item: self.item_selector.clone(),
            name: self.name_selector.clone(),
            address: self.address_selector.clone(),
        };
        Ok(ListingTarget::new(locator, &selectors)?)
    }

    fn monitor_config(&self) -> Result<MonitorConfig> {
        Ok(MonitorConfig::default()
            .with_pages(PageRange::new(self.start_page, self.end_page)?)
            .with_concurrency(self.concurrency))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// What to do once the page source is built.
enum Mode {
    Watch {
        config: MonitorConfig,
        reporter: ConsoleReporter,
    },
    Check {
        config: MonitorConfig,
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(format!("roomwatch={level}").parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (source, mode) = match cli.command {
        Commands::Watch {
            source,
            interval,
            cycles,
            json,
        } => {
            let config = source
                .monitor_config()?
                .with_interval(Duration::from_secs(interval))
                .with_max_cycles(cycles);
            (
                source,
                Mode::Watch {
                    config,
                    reporter: ConsoleReporter { json },
                },
            )
        }
        Commands::Check { source, json } => {
            let config = source.monitor_config()?;
            (source, Mode::Check { config, json })
        }
    };

    let target = source.target().context("Invalid listing source")?;
    tracing::debug!(
        url = %source.url,
        browser = source.browser,
        timeout_secs = source.timeout,
        render_wait_ms = source.render_wait,
        "Listing source configured"
    );

    if source.browser {
        #[cfg(feature = "browser")]
        {
            let factory = roomwatch_client::BrowserListingSource::new(
                target,
                source.timeout(),
                Duration::from_millis(source.render_wait),
            );
            return execute(factory, mode).await;
        }
        #[cfg(not(feature = "browser"))]
        anyhow::bail!("--browser requires roomwatch to be built with the `browser` feature");
    }

    execute(HttpListingSource::new(target, source.timeout()), mode).await
}

async fn execute<F: PageFetcherFactory>(factory: F, mode: Mode) -> Result<()> {
    match mode {
        Mode::Watch { config, reporter } => cmd_watch(factory, config, &reporter).await,
        Mode::Check { config, json } => cmd_check(factory, config, json).await,
    }
}

async fn cmd_watch<F: PageFetcherFactory>(
    factory: F,
    config: MonitorConfig,
    reporter: &ConsoleReporter,
) -> Result<()> {
    config.validate().context("Invalid monitor configuration")?;

    let cancel_token = CancellationToken::new();
    let shutdown = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            shutdown.cancel();
        }
    });

    let mut monitor = Monitor::new(factory, config);
    monitor.run(cancel_token, reporter).await;

    Ok(())
}

async fn cmd_check<F: PageFetcherFactory>(
    factory: F,
    config: MonitorConfig,
    json: bool,
) -> Result<()> {
    config.validate().context("Invalid monitor configuration")?;

    let monitor = Monitor::new(factory, config);
    let aggregation = monitor
        .aggregate()
        .await
        .context("Could not fetch the listing pages")?;

    for page in aggregation.failed_pages() {
        tracing::warn!(page = page.page(), "Page failed, listings on it are missing");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregation.snapshot)?);
        return Ok(());
    }

    if aggregation.snapshot.is_empty() {
        println!("No listings found.");
        return Ok(());
    }

    for entry in &aggregation.snapshot {
        println!("- {entry}");
    }
    println!(
        "\nTotal: {} listings on {} pages ({} failed)",
        aggregation.snapshot.len(),
        aggregation.pages.len(),
        aggregation.failed_count()
    );

    Ok(())
}

/// Prints cycle reports to stdout and logs everything else.
struct ConsoleReporter {
    json: bool,
}

impl ConsoleReporter {
    fn print(&self, report: &CycleReport) {
        if self.json {
            match serde_json::to_string(report) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::error!(error = %e, "Failed to serialize cycle report"),
            }
            return;
        }

        println!(
            "\nMonitoring results (cycle {}, {}):",
            report.cycle,
            report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        if report.diff.added.is_empty() {
            println!("No new listings.");
        } else {
            println!("New listings: {}", report.diff.added.len());
            for entry in &report.diff.added {
                println!("  + {entry}");
            }
        }

        if report.diff.removed.is_empty() {
            println!("No listings removed.");
        } else {
            println!("Removed listings: {}", report.diff.removed.len());
            for entry in &report.diff.removed {
                println!("  - {entry}");
            }
        }
    }
}

impl MonitorReporter for ConsoleReporter {
    fn report(&self, event: MonitorEvent<'_>) {
        match event {
            MonitorEvent::ChangesReported { report } => {
                tracing::info!(
                    cycle = report.cycle,
                    entries = report.entry_count,
                    added = report.diff.added.len(),
                    removed = report.diff.removed.len(),
                    pages_failed = report.pages_failed,
                    "Cycle complete"
                );
                self.print(report);
            }
            other => TracingMonitorReporter.report(other),
        }
    }
}
