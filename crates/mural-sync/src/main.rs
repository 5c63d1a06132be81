//! mural - daily wallpaper sync daemon.
//!
//! Run with: `mural run` (or no subcommand) for the daemon, or use the
//! one-shot subcommands (`sync`, `reconcile`, `status`, `records`,
//! `daily on|off`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use mural_feed::HttpImageFeed;
use mural_store::Store;
use mural_sync::engine::local_today;
use mural_sync::{
    AppState, CommandWallpaper, Config, IntervalTrigger, RefreshOutcome, SyncEngine, run_triggered,
};

/// mural - keeps a local gallery in sync with an image-of-the-day feed
/// and optionally applies the newest image as the wallpaper.
#[derive(Parser, Debug)]
#[command(name = "mural")]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path (overrides config).
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Image cache directory (overrides config).
    #[arg(long, global = true)]
    image_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the sync daemon in the foreground (default behavior).
    Run,

    /// Run one sync cycle and exit.
    Sync,

    /// Validate cached files, repairing or deleting broken records.
    Reconcile,

    /// Show sync and daily-mode status.
    Status,

    /// List stored wallpaper records.
    Records {
        /// Maximum number of records to show.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Control daily wallpaper mode.
    Daily {
        #[command(subcommand)]
        action: DailyAction,
    },
}

#[derive(Subcommand, Debug)]
enum DailyAction {
    /// Arm daily mode and apply the newest wallpaper now.
    On,
    /// Disarm daily mode.
    Off,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mural_sync=info".parse()?)
                .add_directive("mural_feed=info".parse()?)
                .add_directive("mural_store=warn".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_default(),
    };
    if let Some(database) = args.database {
        config.storage.database = database;
    }
    if let Some(image_dir) = args.image_dir {
        config.storage.image_dir = image_dir;
    }
    config.validate()?;

    let store = Store::open(&config.storage.database)?;
    let (state, engine) = build_engine(store, config).await?;

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run_daemon(state, engine).await,
        Command::Sync => {
            let summary = engine.run_cycle().await?;
            println!(
                "{} fetched, {} inserted, {} skipped, {} repaired, {} deleted{}",
                summary.fetched,
                summary.inserted,
                summary.skipped,
                summary.repaired,
                summary.deleted,
                if summary.refreshed { ", wallpaper refreshed" } else { "" },
            );
            Ok(())
        }
        Command::Reconcile => {
            let results = engine.reconcile_existing_records(local_today()).await?;
            let broken = results.iter().filter(|(_, s)| !s.is_valid()).count();
            println!("{} record(s) checked, {} removed", results.len(), broken);
            Ok(())
        }
        Command::Status => show_status(&state).await,
        Command::Records { limit, json } => show_records(&state, limit, json).await,
        Command::Daily { action } => match action {
            DailyAction::On => {
                let outcome = engine.enable_daily_mode().await?;
                match outcome {
                    RefreshOutcome::Applied { date, .. } => {
                        println!("Daily mode on; applied wallpaper of {date}")
                    }
                    RefreshOutcome::NoImage => {
                        println!("Daily mode on; no image imported yet (run `mural sync`)")
                    }
                    RefreshOutcome::NotAllowed => {
                        println!("Daily mode on; device refused the wallpaper change for now")
                    }
                    _ => println!("Daily mode on"),
                }
                Ok(())
            }
            DailyAction::Off => {
                engine.disable_daily_mode().await?;
                println!("Daily mode off");
                Ok(())
            }
        },
    }
}

async fn build_engine(
    store: Store,
    config: Config,
) -> anyhow::Result<(Arc<AppState>, Arc<SyncEngine>)> {
    let feed = Arc::new(HttpImageFeed::with_endpoint(
        &config.feed.base_url,
        &config.feed.image_host,
        &config.feed.market,
    ));
    let backend = Arc::new(CommandWallpaper::new(
        config.wallpaper.spool_dir.clone(),
        config.wallpaper.apply_command.clone(),
        config.wallpaper.display_size(),
    ));

    let state = AppState::new(store, config);
    let engine = Arc::new(SyncEngine::new(state.clone(), feed, backend).await?);
    Ok((state, engine))
}

async fn run_daemon(state: Arc<AppState>, engine: Arc<SyncEngine>) -> anyhow::Result<()> {
    let period = Duration::from_secs(state.config.read().await.daemon.sync_interval);
    info!("Starting sync daemon (interval {}s)", period.as_secs());

    let triggers = IntervalTrigger::new(period, state.subscribe_stop());

    let stop_state = state.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            stop_state.signal_stop();
        }
    });

    run_triggered(engine, triggers).await;
    Ok(())
}

async fn show_status(state: &AppState) -> anyhow::Result<()> {
    let store = state.store.lock().await;
    let sync_state = store.sync_state()?;
    let count = store.count_images()?;
    let newest = store.most_recent_image()?;

    println!("Stored images:   {}", count);
    match sync_state.last_sync_date {
        Some(date) => println!("Last sync:       {}", date),
        None => println!("Last sync:       never"),
    }
    println!(
        "Daily mode:      {}",
        if sync_state.daily_mode_on { "armed" } else { "off" }
    );
    println!("Target surface:  {}", sync_state.target);
    if let Some(date) = sync_state.last_applied_date {
        println!("Last applied:    {}", date);
    }
    if let Some(image) = newest {
        println!("Newest image:    {} - {}", image.date, image.headline);
    }

    Ok(())
}

async fn show_records(state: &AppState, limit: usize, json: bool) -> anyhow::Result<()> {
    let store = state.store.lock().await;
    let mut images = store.list_images()?;
    images.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&images)?);
    } else if images.is_empty() {
        println!("No records (run `mural sync`)");
    } else {
        for image in &images {
            println!("{}  {}  {}", image.date, image.headline, image.local_path);
        }
    }

    Ok(())
}
