use crate::domain::catalog::Catalog;
use crate::domain::hero::{CounterFact, Hero, HeroId, Item};
use crate::error::CounterError;
use crate::seed::{ResolvedSeed, SeedFile};
use crate::source::CounterSource;
use std::collections::HashMap;
use std::path::Path;

/// In-memory facts, loaded once from a seed file.
#[derive(Debug, Clone, Default)]
pub struct StaticCounterSource {
    counters: HashMap<HeroId, Vec<CounterFact>>,
    pools: HashMap<HeroId, Vec<Item>>,
}

impl StaticCounterSource {
    pub fn new(facts: Vec<CounterFact>) -> Self {
        let mut out = Self::default();
        for fact in facts {
            out.counters.entry(fact.hero.id).or_default().push(fact);
        }
        out
    }

    pub fn with_pool(mut self, hero: HeroId, items: Vec<Item>) -> Self {
        self.pools.entry(hero).or_default().extend(items);
        self
    }

    pub fn from_resolved(seed: ResolvedSeed) -> Self {
        let mut out = Self::new(seed.counters);
        for (hero, item) in seed.pools {
            out.pools.entry(hero).or_default().push(item);
        }
        out
    }

    pub fn from_seed_path(path: &Path, catalog: &Catalog) -> anyhow::Result<Self> {
        let seed = SeedFile::load(path)?.resolve(catalog);
        tracing::info!(
            path = %path.display(),
            counters = seed.counters.len(),
            pools = seed.pools.len(),
            "loaded static counter seed"
        );
        Ok(Self::from_resolved(seed))
    }
}

#[async_trait::async_trait]
impl CounterSource for StaticCounterSource {
    fn source_name(&self) -> &'static str {
        "static"
    }

    async fn counters_for(&self, hero: &Hero) -> Result<Vec<CounterFact>, CounterError> {
        Ok(self.counters.get(&hero.id).cloned().unwrap_or_default())
    }

    async fn item_pool_for(&self, hero: &Hero) -> Result<Vec<Item>, CounterError> {
        Ok(self.pools.get(&hero.id).cloned().unwrap_or_default())
    }
}
