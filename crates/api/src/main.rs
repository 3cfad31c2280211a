use std::sync::Arc;

use counterlock_core::config::{CounterSourceKind, Settings};
use counterlock_core::source::{self, CounterSource, UnavailableCounterSource};
use counterlock_core::{Catalog, CounterEngine};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod handlers;

use handlers::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool = match settings.counter_source {
        CounterSourceKind::Postgres => connect(&settings).await,
        _ => None,
    };

    let catalog = Arc::new(load_catalog(pool.as_ref()).await?);
    let source: Arc<dyn CounterSource> =
        match source::from_settings(&settings, catalog.clone(), pool) {
            Ok(source) => source,
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "counter source unavailable; starting API in degraded mode");
                Arc::new(UnavailableCounterSource::new(format!("{e:#}")))
            }
        };

    let port = settings.listen_port();
    let state = AppState {
        engine: CounterEngine::new(catalog, source),
        settings: Arc::new(settings),
    };

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn connect(settings: &Settings) -> Option<PgPool> {
    let db_url = match settings.require_database_url() {
        Ok(url) => url,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing; starting API in degraded mode");
            return None;
        }
    };

    let pool = match sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "db connect failed; starting API in degraded mode");
            return None;
        }
    };

    match counterlock_core::storage::migrate(&pool).await {
        Ok(()) => Some(pool),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "db migrations failed; starting API in degraded mode");
            None
        }
    }
}

/// Catalog from the database when it has one, otherwise the bundled roster.
async fn load_catalog(pool: Option<&PgPool>) -> anyhow::Result<Catalog> {
    if let Some(pool) = pool {
        match counterlock_core::storage::catalog::load_catalog(pool).await {
            Ok(catalog) if catalog.hero_count() > 0 => return Ok(catalog),
            Ok(_) => tracing::warn!("heroes table is empty; using bundled catalog (run `counterlock_worker seed`)"),
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "catalog load failed; using bundled catalog");
            }
        }
    }
    Catalog::seeded()
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
