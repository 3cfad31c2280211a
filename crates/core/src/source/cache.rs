use crate::domain::hero::{CounterFact, Hero, Item};
use crate::error::CounterError;
use crate::source::CounterSource;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_TTL_SECS: u64 = 300;
pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone)]
enum Cached {
    Counters(Vec<CounterFact>),
    Pool(Vec<Item>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Cached,
    fetched_at: Instant,
}

/// Freshness-bounded cache in front of another source, keyed by hero name.
///
/// Only successful lookups are stored. Two requests missing the same key at once both hit
/// the upstream and the later write wins.
pub struct CachedCounterSource {
    inner: Arc<dyn CounterSource>,
    opts: CacheOptions,
    entries: RwLock<HashMap<String, Entry>>,
}

impl CachedCounterSource {
    pub fn new(inner: Arc<dyn CounterSource>, opts: CacheOptions) -> Self {
        Self {
            inner,
            opts,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn counters_key(hero: &Hero) -> String {
        format!("hero_counters_{}", hero.name)
    }

    fn pool_key(hero: &Hero) -> String {
        format!("hero_items_{}", hero.name)
    }

    async fn lookup(&self, key: &str) -> Option<Cached> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() <= self.opts.ttl)
            .map(|e| e.value.clone())
    }

    async fn store(&self, key: String, value: Cached) {
        if self.opts.max_entries == 0 {
            return;
        }

        let mut entries = self.entries.write().await;
        let ttl = self.opts.ttl;
        entries.retain(|_, e| e.fetched_at.elapsed() <= ttl);

        if !entries.contains_key(&key) && entries.len() >= self.opts.max_entries {
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, e)| e.fetched_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&victim);
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait::async_trait]
impl CounterSource for CachedCounterSource {
    fn source_name(&self) -> &'static str {
        self.inner.source_name()
    }

    async fn counters_for(&self, hero: &Hero) -> Result<Vec<CounterFact>, CounterError> {
        let key = Self::counters_key(hero);
        if let Some(Cached::Counters(facts)) = self.lookup(&key).await {
            tracing::debug!(hero = %hero.name, "counter cache hit");
            return Ok(facts);
        }

        let facts = self.inner.counters_for(hero).await?;
        tracing::debug!(hero = %hero.name, facts = facts.len(), "counter cache refreshed");
        self.store(key, Cached::Counters(facts.clone())).await;
        Ok(facts)
    }

    async fn item_pool_for(&self, hero: &Hero) -> Result<Vec<Item>, CounterError> {
        let key = Self::pool_key(hero);
        if let Some(Cached::Pool(items)) = self.lookup(&key).await {
            tracing::debug!(hero = %hero.name, "item pool cache hit");
            return Ok(items);
        }

        let items = self.inner.item_pool_for(hero).await?;
        self.store(key, Cached::Pool(items.clone())).await;
        Ok(items)
    }

    async fn invalidate(&self, hero: Option<&Hero>) -> usize {
        let mut entries = self.entries.write().await;
        let dropped = match hero {
            Some(hero) => [Self::counters_key(hero), Self::pool_key(hero)]
                .iter()
                .filter(|k| entries.remove(k.as_str()).is_some())
                .count(),
            None => {
                let n = entries.len();
                entries.clear();
                n
            }
        };
        tracing::info!(hero = ?hero.map(|h| &h.name), dropped, "counter cache invalidated");
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hero::ItemCategory;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl CountingSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl CounterSource for CountingSource {
        fn source_name(&self) -> &'static str {
            "counting"
        }

        async fn counters_for(&self, hero: &Hero) -> Result<Vec<CounterFact>, CounterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(CounterError::upstream("counting", "boom"));
            }
            let item = Item::new(1, "Decay", ItemCategory::Spirit);
            Ok(vec![CounterFact::new(hero.clone(), item, Some(0.5))])
        }

        async fn item_pool_for(&self, _hero: &Hero) -> Result<Vec<Item>, CounterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![Item::new(2, "Healbane", ItemCategory::Vitality)])
        }
    }

    fn cached(inner: &Arc<CountingSource>, ttl_secs: u64, max_entries: usize) -> CachedCounterSource {
        CachedCounterSource::new(
            inner.clone(),
            CacheOptions {
                ttl: Duration::from_secs(ttl_secs),
                max_entries,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn serves_fresh_entries_without_refetching() {
        let inner = Arc::new(CountingSource::default());
        let cache = cached(&inner, 300, 100);
        let hero = Hero::new(1, "Abrams");

        cache.counters_for(&hero).await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        let facts = cache.counters_for(&hero).await.unwrap();

        assert_eq!(facts.len(), 1);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn refetches_after_freshness_window() {
        let inner = Arc::new(CountingSource::default());
        let cache = cached(&inner, 300, 100);
        let hero = Hero::new(1, "Abrams");

        cache.counters_for(&hero).await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        cache.counters_for(&hero).await.unwrap();

        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = Arc::new(CountingSource::default());
        inner.failing.store(true, Ordering::SeqCst);
        let cache = cached(&inner, 300, 100);
        let hero = Hero::new(1, "Abrams");

        assert!(cache.counters_for(&hero).await.is_err());
        inner.failing.store(false, Ordering::SeqCst);
        assert_eq!(cache.counters_for(&hero).await.unwrap().len(), 1);
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn counters_and_pools_use_separate_keys() {
        let inner = Arc::new(CountingSource::default());
        let cache = cached(&inner, 300, 100);
        let hero = Hero::new(1, "Abrams");

        cache.counters_for(&hero).await.unwrap();
        let pool = cache.item_pool_for(&hero).await.unwrap();
        assert_eq!(pool[0].name, "Healbane");
        assert_eq!(cache.len().await, 2);
        assert_eq!(inner.calls(), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_refresh() {
        let inner = Arc::new(CountingSource::default());
        let cache = cached(&inner, 300, 100);
        let abrams = Hero::new(1, "Abrams");
        let bebop = Hero::new(2, "Bebop");

        cache.counters_for(&abrams).await.unwrap();
        cache.counters_for(&bebop).await.unwrap();
        cache.item_pool_for(&bebop).await.unwrap();

        assert_eq!(cache.invalidate(Some(&abrams)).await, 1);
        cache.counters_for(&abrams).await.unwrap();
        assert_eq!(inner.calls(), 4);

        assert_eq!(cache.invalidate(None).await, 3);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_oldest_entry_when_full() {
        let inner = Arc::new(CountingSource::default());
        let cache = cached(&inner, 300, 2);
        let heroes: Vec<_> = ["Abrams", "Bebop", "Calico"]
            .iter()
            .zip(1..)
            .map(|(name, id)| Hero::new(id, *name))
            .collect();

        for hero in &heroes {
            cache.counters_for(hero).await.unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(cache.len().await, 2);

        // Abrams was evicted; Calico is still cached.
        cache.counters_for(&heroes[2]).await.unwrap();
        assert_eq!(inner.calls(), 3);
        cache.counters_for(&heroes[0]).await.unwrap();
        assert_eq!(inner.calls(), 4);
    }
}
