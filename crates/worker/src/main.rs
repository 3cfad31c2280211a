use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use counterlock_core::config::{CounterSourceKind, Settings};
use counterlock_core::seed::SeedFile;
use counterlock_core::{Catalog, CounterEngine, Roster};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "counterlock_worker")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load heroes, items, counters and item pools into the database.
    Seed {
        /// Seed JSON file. Defaults to COUNTER_SEED_PATH.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Resolve the file against the catalog without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },
    /// Rank counter items for an enemy roster and print the result as JSON.
    Rank {
        /// Comma-separated enemy hero ids.
        #[arg(long, value_parser = Roster::parse_list)]
        enemy: Roster,

        /// Comma-separated friendly hero ids; switches to a full team analysis.
        #[arg(long, value_parser = Roster::parse_list)]
        friendly: Option<Roster>,

        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let result = match args.command {
        Command::Seed { file, dry_run } => seed(&settings, file, dry_run).await,
        Command::Rank {
            enemy,
            friendly,
            limit,
        } => rank(&settings, enemy, friendly, limit).await,
    };

    if let Err(err) = &result {
        sentry_anyhow::capture_anyhow(err);
    }
    result
}

async fn connect(settings: &Settings) -> anyhow::Result<sqlx::PgPool> {
    let db_url = settings.require_database_url()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .context("connect DATABASE_URL failed")?;
    counterlock_core::storage::migrate(&pool).await?;
    Ok(pool)
}

async fn seed(settings: &Settings, file: Option<PathBuf>, dry_run: bool) -> anyhow::Result<()> {
    let path = file
        .or_else(|| settings.counter_seed_path.clone().map(PathBuf::from))
        .context("no seed file given (pass --file or set COUNTER_SEED_PATH)")?;

    let catalog = Catalog::seeded()?;
    let resolved = SeedFile::load(&path)?.resolve(&catalog);

    if dry_run {
        tracing::info!(
            path = %path.display(),
            dry_run = true,
            heroes = catalog.hero_count(),
            items = catalog.item_count(),
            counters = resolved.counters.len(),
            pools = resolved.pools.len(),
            skipped = resolved.skipped.len(),
            "seed resolved"
        );
        return Ok(());
    }

    let pool = connect(settings).await?;
    let summary =
        counterlock_core::storage::seed::seed_reference_data(&pool, &catalog, &resolved).await?;

    tracing::info!(
        path = %path.display(),
        heroes = summary.heroes,
        items = summary.items,
        counters = summary.counters,
        pools = summary.pools,
        skipped = resolved.skipped.len(),
        "seeded reference data"
    );
    Ok(())
}

async fn rank(
    settings: &Settings,
    enemy: Roster,
    friendly: Option<Roster>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let (catalog, pool) = match settings.counter_source {
        CounterSourceKind::Postgres => {
            let pool = connect(settings).await?;
            let catalog = counterlock_core::storage::catalog::load_catalog(&pool).await?;
            anyhow::ensure!(
                catalog.hero_count() > 0,
                "heroes table is empty; run `counterlock_worker seed` first"
            );
            (catalog, Some(pool))
        }
        _ => (Catalog::seeded()?, None),
    };

    let catalog = Arc::new(catalog);
    let source = counterlock_core::source::from_settings(settings, catalog.clone(), pool)?;
    let engine = CounterEngine::new(catalog, source);

    let out = match friendly {
        Some(friendly) => {
            let mut analysis = engine.analyze_teams(&enemy, &friendly).await;
            if let Some(limit) = limit {
                analysis.recommended_items.truncate(limit);
            }
            serde_json::to_string_pretty(&analysis)?
        }
        None => serde_json::to_string_pretty(&engine.rank_counters(&enemy, limit).await)?,
    };

    println!("{out}");
    Ok(())
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
