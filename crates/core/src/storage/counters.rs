use crate::domain::catalog::Catalog;
use crate::domain::hero::{CounterFact, Hero, Item, ItemId};
use crate::error::CounterError;
use crate::source::CounterSource;
use std::sync::Arc;

/// Counter facts and item pools from the `counters` and `hero_items` tables.
#[derive(Debug, Clone)]
pub struct PgCounterSource {
    pool: sqlx::PgPool,
    catalog: Arc<Catalog>,
}

impl PgCounterSource {
    pub fn new(pool: sqlx::PgPool, catalog: Arc<Catalog>) -> Self {
        Self { pool, catalog }
    }

    fn catalog_item(&self, hero: &Hero, item_id: ItemId) -> Option<&Item> {
        let item = self.catalog.item(item_id);
        if item.is_none() {
            // Rows added after startup reference items the in-memory catalog never saw.
            tracing::warn!(hero = %hero.name, item_id, "counter row references unknown item; skipping");
        }
        item
    }
}

#[async_trait::async_trait]
impl CounterSource for PgCounterSource {
    fn source_name(&self) -> &'static str {
        "postgres"
    }

    async fn counters_for(&self, hero: &Hero) -> Result<Vec<CounterFact>, CounterError> {
        let rows = sqlx::query_as::<_, (i32, Option<f64>, Option<String>)>(
            "SELECT item_id, effectiveness, reason \
             FROM counters \
             WHERE hero_id = $1 \
             ORDER BY id ASC",
        )
        .persistent(false)
        .bind(hero.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CounterError::upstream(self.source_name(), e))?;

        let mut out = Vec::with_capacity(rows.len());
        for (item_id, effectiveness, reason) in rows {
            let Some(item) = self.catalog_item(hero, item_id) else {
                continue;
            };
            let mut fact = CounterFact::new(hero.clone(), item.clone(), effectiveness);
            if let Some(reason) = reason {
                fact = fact.with_reason(reason);
            }
            out.push(fact);
        }
        Ok(out)
    }

    async fn item_pool_for(&self, hero: &Hero) -> Result<Vec<Item>, CounterError> {
        let rows = sqlx::query_as::<_, (i32,)>(
            "SELECT item_id FROM hero_items WHERE hero_id = $1 ORDER BY item_id ASC",
        )
        .persistent(false)
        .bind(hero.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CounterError::upstream(self.source_name(), e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(item_id,)| self.catalog_item(hero, item_id).cloned())
            .collect())
    }
}
