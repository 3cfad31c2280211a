use crate::domain::catalog::Catalog;
use crate::domain::hero::{Hero, Item, ItemCategory};
use anyhow::Context;

pub async fn load_catalog(pool: &sqlx::PgPool) -> anyhow::Result<Catalog> {
    let hero_rows = sqlx::query_as::<_, (i32, String, String)>(
        "SELECT id, name, image_path FROM heroes ORDER BY id ASC",
    )
    .persistent(false)
    .fetch_all(pool)
    .await
    .context("select heroes failed")?;

    let item_rows = sqlx::query_as::<_, (i32, String, String, String)>(
        "SELECT id, name, category, image_path FROM items ORDER BY id ASC",
    )
    .persistent(false)
    .fetch_all(pool)
    .await
    .context("select items failed")?;

    let heroes = hero_rows
        .into_iter()
        .map(|(id, name, image_path)| Hero {
            id,
            name,
            image_path,
        })
        .collect();

    let mut items = Vec::with_capacity(item_rows.len());
    for (id, name, category, image_path) in item_rows {
        let category = category
            .parse::<ItemCategory>()
            .with_context(|| format!("invalid category for item id={id}"))?;
        items.push(Item {
            id,
            name,
            category,
            image_path,
        });
    }

    let catalog = Catalog::new(heroes, items)?;
    tracing::info!(
        heroes = catalog.hero_count(),
        items = catalog.item_count(),
        "loaded catalog from database"
    );
    Ok(catalog)
}
