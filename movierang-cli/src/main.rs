//! # Movierang CLI
//!
//! Operator front end for the Movierang core: refresh the daily box-office
//! board from a saved KOBIS document, open movie details (counting a view),
//! toggle and list wishlists, and inspect popularity counters.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate};
use clap::{Args as ClapArgs, Parser, Subcommand};
use movierang_core::box_office::JsonFileSource;
use movierang_core::config::CoreConfig;
use movierang_core::database::infrastructure::postgres::{
    self, PostgresCatalogRepository, PostgresMovieStatsRepository, PostgresWishlistRepository,
};
use movierang_core::domain::reconcile::Reconciler;
use movierang_core::domain::stats::{MovieDetailService, StatsCounter};
use movierang_core::domain::wishlist::WishlistService;
use movierang_model::{MovieId, UserId};
use sqlx::PgPool;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ConfigLoad;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "movierang")]
#[command(about = "Box-office reconciliation, movie counters and wishlists")]
struct Cli {
    #[command(flatten)]
    database: DatabaseArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
struct DatabaseArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply database migrations and exit
    Migrate,
    /// Reconcile a saved KOBIS daily document against the catalog
    Reconcile {
        /// Path to the KOBIS daily box-office JSON
        #[arg(long)]
        feed: PathBuf,
        /// Day the feed covers (defaults to yesterday)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Show a movie and count one view
    View {
        #[arg(long)]
        movie: i64,
    },
    /// Show a movie's counters without counting a view
    Stats {
        #[arg(long)]
        movie: i64,
    },
    /// Flip a movie in or out of a user's wishlist
    Toggle {
        #[arg(long)]
        user: i64,
        #[arg(long)]
        movie: i64,
    },
    /// List a user's wishlist, newest first
    Wishlist {
        #[arg(long)]
        user: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let ConfigLoad {
        core,
        env_file_loaded,
        config_path,
    } = config::load().context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Override via RUST_LOG.
                "info,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config_path {
        info!(path = %path.display(), "loaded config file");
    }

    let database_url = cli
        .database
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set")?;
    let pool = postgres::connect(database_url, &core.database)
        .await
        .context("failed to open database")?;

    let catalog = Arc::new(PostgresCatalogRepository::new(pool.clone()));
    let stats = Arc::new(PostgresMovieStatsRepository::new(pool.clone()));
    let counter = StatsCounter::new(stats, core.counter);

    match cli.command {
        Command::Migrate => {
            info!("Database migrations applied successfully");
        }
        Command::Reconcile { feed, date } => {
            let target = date.unwrap_or_else(|| Local::now().date_naive() - Duration::days(1));
            let source = JsonFileSource::new(feed);
            let board = Reconciler::new(catalog)
                .refresh(&source, target)
                .await
                .with_context(|| format!("failed to load feed {}", source.path().display()))?;
            let unmatched = board.rows.len() - board.matched_count();
            if unmatched > 0 {
                warn!(unmatched, "some box office titles have no catalog data");
            }
            print_json(&board)?;
        }
        Command::View { movie } => {
            let detail = MovieDetailService::new(catalog, counter)
                .view(MovieId(movie))
                .await?;
            print_json(&detail)?;
        }
        Command::Stats { movie } => {
            let stats = MovieDetailService::new(catalog, counter)
                .stats(MovieId(movie))
                .await?;
            print_json(&stats)?;
        }
        Command::Toggle { user, movie } => {
            let present = wishlist_service(pool, catalog, &core)
                .toggle(UserId(user), MovieId(movie))
                .await?;
            println!("{}", if present { "wishlisted" } else { "removed" });
        }
        Command::Wishlist { user } => {
            let items = wishlist_service(pool, catalog, &core)
                .wishlist_for(UserId(user))
                .await?;
            print_json(&items)?;
        }
    }

    Ok(())
}

type PgWishlistService = WishlistService<PostgresCatalogRepository, PostgresWishlistRepository>;

fn wishlist_service(
    pool: PgPool,
    catalog: Arc<PostgresCatalogRepository>,
    core: &CoreConfig,
) -> PgWishlistService {
    let memberships = Arc::new(PostgresWishlistRepository::new(pool));
    WishlistService::new(catalog, memberships, core.counter, core.toggle)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
