use crate::config::{CounterSourceKind, Settings};
use crate::domain::catalog::Catalog;
use crate::domain::hero::{CounterFact, Hero, Item};
use crate::error::CounterError;
use anyhow::Context;
use std::sync::Arc;

pub mod cache;
pub mod sheets;
pub mod static_source;

pub use cache::{CacheOptions, CachedCounterSource};
pub use sheets::SheetsCounterSource;
pub use static_source::StaticCounterSource;

/// Where counter facts and friendly item pools come from.
///
/// Implementations answer for one hero at a time; results carry no ordering guarantee.
#[async_trait::async_trait]
pub trait CounterSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn counters_for(&self, hero: &Hero) -> Result<Vec<CounterFact>, CounterError>;

    /// Items the hero can buy, used for friendly-team recommendations.
    async fn item_pool_for(&self, hero: &Hero) -> Result<Vec<Item>, CounterError>;

    /// Drop cached lookups for `hero`, or for every hero when `None`.
    /// Returns the number of entries dropped.
    async fn invalidate(&self, _hero: Option<&Hero>) -> usize {
        0
    }
}

/// Stand-in used when the configured backend could not be initialised.
#[derive(Debug, Clone)]
pub struct UnavailableCounterSource {
    reason: String,
}

impl UnavailableCounterSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn error(&self) -> CounterError {
        CounterError::upstream(self.source_name(), &self.reason)
    }
}

#[async_trait::async_trait]
impl CounterSource for UnavailableCounterSource {
    fn source_name(&self) -> &'static str {
        "unavailable"
    }

    async fn counters_for(&self, _hero: &Hero) -> Result<Vec<CounterFact>, CounterError> {
        Err(self.error())
    }

    async fn item_pool_for(&self, _hero: &Hero) -> Result<Vec<Item>, CounterError> {
        Err(self.error())
    }
}

/// Build the configured backend wrapped in the freshness cache.
///
/// `pool` is required for the Postgres backend and ignored otherwise.
pub fn from_settings(
    settings: &Settings,
    catalog: Arc<Catalog>,
    pool: Option<sqlx::PgPool>,
) -> anyhow::Result<Arc<dyn CounterSource>> {
    let inner: Arc<dyn CounterSource> = match settings.counter_source {
        CounterSourceKind::Postgres => {
            let pool = pool.context("postgres counter source requires a database connection")?;
            Arc::new(crate::storage::counters::PgCounterSource::new(pool, catalog))
        }
        CounterSourceKind::Sheets => Arc::new(SheetsCounterSource::from_settings(settings, catalog)?),
        CounterSourceKind::Static => {
            let source = match settings.counter_seed_path.as_deref() {
                Some(path) => StaticCounterSource::from_seed_path(path.as_ref(), &catalog)?,
                None => {
                    tracing::warn!("COUNTER_SEED_PATH not set; static source has no counters");
                    StaticCounterSource::default()
                }
            };
            Arc::new(source)
        }
    };

    tracing::info!(
        source = inner.source_name(),
        ttl_secs = settings.cache.ttl.as_secs(),
        max_entries = settings.cache.max_entries,
        "counter source ready"
    );

    Ok(Arc::new(CachedCounterSource::new(inner, settings.cache.clone())))
}
