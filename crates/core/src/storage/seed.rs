use crate::domain::catalog::Catalog;
use crate::seed::ResolvedSeed;
use anyhow::Context;

const BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub heroes: u64,
    pub items: u64,
    pub counters: u64,
    pub pools: u64,
}

/// Upsert catalog heroes and items, then replace every counter and pool row with `seed`.
/// Runs in one transaction.
pub async fn seed_reference_data(
    pool: &sqlx::PgPool,
    catalog: &Catalog,
    seed: &ResolvedSeed,
) -> anyhow::Result<SeedSummary> {
    let mut tx = pool.begin().await.context("begin transaction failed")?;
    let mut summary = SeedSummary::default();

    let heroes: Vec<_> = catalog.heroes().collect();
    for chunk in heroes.chunks(BATCH_SIZE) {
        let mut qb = sqlx::QueryBuilder::new("INSERT INTO heroes (id, name, image_path) ");
        qb.push_values(chunk, |mut b, hero| {
            b.push_bind(hero.id)
                .push_bind(&hero.name)
                .push_bind(&hero.image_path);
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE \
               SET name = EXCLUDED.name, image_path = EXCLUDED.image_path",
        );
        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("upsert heroes failed")?;
        summary.heroes += res.rows_affected();
    }

    let items = catalog.items_by_category();
    for chunk in items.chunks(BATCH_SIZE) {
        let mut qb = sqlx::QueryBuilder::new("INSERT INTO items (id, name, category, image_path) ");
        qb.push_values(chunk, |mut b, item| {
            b.push_bind(item.id)
                .push_bind(&item.name)
                .push_bind(item.category.as_str())
                .push_bind(&item.image_path);
        });
        qb.push(
            " ON CONFLICT (id) DO UPDATE \
               SET name = EXCLUDED.name, category = EXCLUDED.category, image_path = EXCLUDED.image_path",
        );
        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("upsert items failed")?;
        summary.items += res.rows_affected();
    }

    sqlx::query("DELETE FROM counters")
        .persistent(false)
        .execute(&mut *tx)
        .await
        .context("clear counters failed")?;
    sqlx::query("DELETE FROM hero_items")
        .persistent(false)
        .execute(&mut *tx)
        .await
        .context("clear hero_items failed")?;

    for chunk in seed.counters.chunks(BATCH_SIZE) {
        let mut qb = sqlx::QueryBuilder::new(
            "INSERT INTO counters (hero_id, item_id, effectiveness, reason) ",
        );
        qb.push_values(chunk, |mut b, fact| {
            b.push_bind(fact.hero.id)
                .push_bind(fact.item.id)
                .push_bind(fact.effectiveness.filter(|v| v.is_finite()).map(|_| fact.weight()))
                .push_bind(&fact.reason);
        });
        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("insert counters failed")?;
        summary.counters += res.rows_affected();
    }

    for chunk in seed.pools.chunks(BATCH_SIZE) {
        let mut qb = sqlx::QueryBuilder::new("INSERT INTO hero_items (hero_id, item_id) ");
        qb.push_values(chunk, |mut b, (hero_id, item)| {
            b.push_bind(*hero_id).push_bind(item.id);
        });
        qb.push(" ON CONFLICT (hero_id, item_id) DO NOTHING");
        let res = qb
            .build()
            .persistent(false)
            .execute(&mut *tx)
            .await
            .context("insert hero_items failed")?;
        summary.pools += res.rows_affected();
    }

    tx.commit().await.context("commit transaction failed")?;
    tracing::info!(?summary, "seeded reference data");
    Ok(summary)
}
