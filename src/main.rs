use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use stockwatch::server::{self, AppState};
use stockwatch::{CycleResult, PositionInput, Settings, StockService};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "stockwatch", version, about = "Stock Agent - Autonomous Stock Monitoring System")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze a stock once without tracking it
    Analyze(PositionArgs),

    /// Add a stock to the tracking list
    Track(PositionArgs),

    /// Replace the prices of a tracked stock
    Update(PositionArgs),

    /// Stop tracking a stock
    Delete {
        /// Stock symbol (e.g., TCS.NS, AAPL)
        #[arg(long)]
        symbol: String,
    },

    /// List tracked stocks
    List,

    /// Run one analysis cycle over all tracked stocks
    Run,

    /// Run a cycle every interval until Ctrl+C
    Watch {
        /// Seconds between cycles (defaults to poll_interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Start the HTTP API
    Serve {
        /// Host to bind to (defaults to api_host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to api_port)
        #[arg(long)]
        port: Option<u16>,
    },
}

#[derive(Args, Debug)]
struct PositionArgs {
    /// Stock symbol (e.g., TCS.NS, AAPL)
    #[arg(long)]
    symbol: String,

    /// Buy price
    #[arg(long)]
    buy_price: f64,

    /// Target price
    #[arg(long)]
    target_price: f64,
}

impl From<PositionArgs> for PositionInput {
    fn from(args: PositionArgs) -> Self {
        PositionInput::new(args.symbol, args.buy_price, args.target_price)
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;
    // flushes the file log on drop
    let _log_guard = setup_logging(&settings);

    let service = Arc::new(StockService::from_settings(&settings).await?);

    match cli.command {
        Command::Analyze(args) => {
            let result = service.analyze(args.into()).await?;
            println!("\n{}", result.decision);
            println!("Symbol: {}", result.symbol);
            println!("Current Price: ${:.2}", result.current_price);
            println!("Profit: ${:.2} ({:.2}%)", result.profit, result.profit_percent);
        }

        Command::Track(args) => {
            let position = service.track(args.into()).await?;
            println!("✅ {} added to tracking list", position.symbol);
        }

        Command::Update(args) => {
            let symbol = args.symbol.clone();
            let position = service.update(&symbol, args.into()).await?;
            println!(
                "✅ {} updated: ${:.2} → ${:.2}",
                position.symbol, position.buy_price, position.target_price
            );
        }

        Command::Delete { symbol } => {
            service.delete(&symbol).await?;
            println!("🗑️  {} removed from tracking list", symbol.trim().to_uppercase());
        }

        Command::List => {
            let positions = service.list().await?;
            if positions.is_empty() {
                println!("No stocks being tracked");
            } else {
                println!("\n📊 Tracking {} stock(s):\n", positions.len());
                for p in &positions {
                    println!("  • {}: ${:.2} → ${:.2}", p.symbol, p.buy_price, p.target_price);
                }
            }
        }

        Command::Run => {
            let result = service.run_cycle().await?;
            print_cycle(&result);
        }

        Command::Watch { interval_secs } => {
            let secs = interval_secs.unwrap_or(settings.poll_interval_secs).max(1);
            watch(&service, Duration::from_secs(secs)).await;
        }

        Command::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.api_host.clone());
            let port = port.unwrap_or(settings.api_port);
            let state = Arc::new(AppState::new(service, Arc::new(settings)));
            server::serve(state, &host, port).await?;
        }
    }

    Ok(())
}

/// Console logging plus the rolling file log when one is configured
fn setup_logging(settings: &Settings) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "stockwatch={}",
            settings.log_level.to_lowercase()
        ))
    });

    let (file_layer, guard, file_error) = match settings.log_file_appender() {
        Ok(Some(appender)) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard), None)
        }
        Ok(None) => (None, None, None),
        Err(e) => (None, None, Some(e)),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init();

    if let Some(e) = file_error {
        tracing::warn!(error = %e, "Failed to setup file logging");
    }

    guard
}

/// Periodic poll; a failed cycle is logged and the next tick tries again
async fn watch(service: &StockService, every: Duration) {
    tracing::info!("🔄 Running a cycle every {}s, press Ctrl+C to stop", every.as_secs());

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("⚠️  Received Ctrl+C, shutting down...");
                break;
            }
            _ = ticker.tick() => {
                match service.run_cycle().await {
                    Ok(result) => print_cycle(&result),
                    Err(e) => tracing::error!(error = %e, "Cycle failed"),
                }
            }
        }
    }
}

fn print_cycle(result: &CycleResult) {
    println!("\n🤖 Agent analyzed {} stock(s)\n", result.analyses.len());
    for a in &result.analyses {
        println!("{} - {}: ${:.2}", a.decision, a.symbol, a.current_price);
    }

    if !result.failures.is_empty() {
        println!("\n❌ {} stock(s) failed:", result.failed_count());
        for f in &result.failures {
            println!("  • {}: {}", f.symbol, f.reason);
        }
    }
}
