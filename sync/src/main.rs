//! Favorites Sync CLI - inspect and edit favorites from the command line.
//!
//! Uses the file-backed local store and the HTTP remote. Writes are queued
//! durably; the command waits a bounded time for them to reach the remote
//! store and leaves the rest for the next run.

use clap::{Parser, Subcommand};
use favorites_sync::{
    Category, ConfigError, FavoriteRecord, FavoritesService, FileStore, HttpRemote, Snapshot,
    SyncConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(name = "favorites-sync", version, about = "Local-first favorites")]
struct Cli {
    /// Signed-in identity; omit for the anonymous store
    #[arg(long, global = true)]
    identity: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List favorites, newest first
    List {
        #[arg(long)]
        category: Option<Category>,
    },
    /// Show favorite counts per category
    Counts,
    /// Add or remove a favorite
    Toggle {
        category: Category,
        id: String,
        /// Display name stored with the favorite
        #[arg(long)]
        label: Option<String>,
    },
    /// Remove every favorite
    Clear,
    /// Reconcile with the remote store
    Sync,
    /// Show remote writes not yet delivered
    Pending,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "favorites_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = SyncConfig::from_env()?;

    let remote_url = config
        .remote_url
        .clone()
        .ok_or(ConfigError::MissingRemoteUrl)?;
    let store = Arc::new(FileStore::open(&config.data_dir)?);
    let remote = Arc::new(HttpRemote::new(&remote_url)?);

    tracing::debug!(data_dir = %config.data_dir.display(), remote = %remote_url, "Starting");

    let service = Arc::new(FavoritesService::new(config, store, remote));
    let worker = service.spawn_outbox_worker();
    let reconciliation = service.observe_identity(cli.identity.clone());

    match cli.command {
        Command::Sync => {
            match reconciliation {
                Some(handle) => handle.await?,
                None => println!("Anonymous session: nothing to reconcile"),
            }
            let counts = service.counts();
            println!(
                "{} favorites ({} businesses, {} coupons)",
                counts.total, counts.business, counts.coupon
            );
            if let Some(error) = service.error() {
                println!("Partial sync: {error}");
            }
        }
        command => {
            // One-shot commands act on local data; the pull can wait for `sync`.
            if let Some(handle) = reconciliation {
                handle.abort();
            }
            run_local(&service, command);
        }
    }

    if service.pending_writes() > 0 && !service.wait_for_outbox(DRAIN_TIMEOUT).await {
        tracing::warn!(
            pending = service.pending_writes(),
            "Remote writes still queued; they will be retried on the next run"
        );
    }
    worker.shutdown().await;

    Ok(())
}

fn run_local(service: &FavoritesService, command: Command) {
    match command {
        Command::List { category } => {
            let favorites = match category {
                Some(category) => service.favorites_by_type(category),
                None => service.favorites().as_ref().clone(),
            };
            if favorites.is_empty() {
                println!("No favorites");
            }
            for record in &favorites {
                print_record(record);
            }
        }
        Command::Counts => {
            let counts = service.counts();
            println!("business: {}", counts.business);
            println!("coupon:   {}", counts.coupon);
            println!("total:    {}", counts.total);
        }
        Command::Toggle { category, id, label } => {
            let snapshot = label.map(|label| match category {
                Category::Business => Snapshot::business(label),
                Category::Coupon => Snapshot::coupon(label),
            });
            let favorited = service.toggle_favorite(&id, category, snapshot);
            println!(
                "{} {} {}",
                category.label(),
                id,
                if favorited { "added" } else { "removed" }
            );
        }
        Command::Clear => {
            service.clear_all_favorites();
            println!("All favorites cleared");
        }
        Command::Pending => {
            println!("{} remote writes pending", service.pending_writes());
        }
        Command::Sync => {}
    }
}

fn print_record(record: &FavoriteRecord) {
    let marker = if record.synced { ' ' } else { '*' };
    println!(
        "{marker} {:<8} {:<24} {}",
        record.category.as_str(),
        record.id,
        record.snapshot.display_name()
    );
}
