use crate::domain::hero::{normalize_name, Hero, HeroId, Item, ItemCategory, ItemId};
use crate::seed;
use anyhow::ensure;
use std::collections::{BTreeMap, HashMap};

/// Immutable hero and item reference data, shared by every request.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    heroes: BTreeMap<HeroId, Hero>,
    items: BTreeMap<ItemId, Item>,
    hero_names: HashMap<String, HeroId>,
    item_names: HashMap<String, ItemId>,
}

impl Catalog {
    pub fn new(heroes: Vec<Hero>, items: Vec<Item>) -> anyhow::Result<Self> {
        let mut out = Self::default();

        for hero in heroes {
            let key = normalize_name(&hero.name);
            ensure!(!key.is_empty(), "hero {} has an empty name", hero.id);
            ensure!(
                out.hero_names.insert(key, hero.id).is_none(),
                "duplicate hero name: {}",
                hero.name
            );
            let id = hero.id;
            ensure!(
                out.heroes.insert(id, hero).is_none(),
                "duplicate hero id: {id}"
            );
        }

        for item in items {
            let key = normalize_name(&item.name);
            ensure!(!key.is_empty(), "item {} has an empty name", item.id);
            ensure!(
                out.item_names.insert(key, item.id).is_none(),
                "duplicate item name: {}",
                item.name
            );
            let id = item.id;
            ensure!(out.items.insert(id, item).is_none(), "duplicate item id: {id}");
        }

        Ok(out)
    }

    /// Catalog built from the bundled hero and item lists, ids assigned from 1.
    pub fn seeded() -> anyhow::Result<Self> {
        Self::new(seed::bundled_heroes(), seed::bundled_items())
    }

    pub fn hero(&self, id: HeroId) -> Option<&Hero> {
        self.heroes.get(&id)
    }

    pub fn hero_by_name(&self, name: &str) -> Option<&Hero> {
        self.hero_names
            .get(&normalize_name(name))
            .and_then(|id| self.heroes.get(id))
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn item_by_name(&self, name: &str) -> Option<&Item> {
        self.item_names
            .get(&normalize_name(name))
            .and_then(|id| self.items.get(id))
    }

    /// Heroes ordered by id.
    pub fn heroes(&self) -> impl Iterator<Item = &Hero> {
        self.heroes.values()
    }

    /// Items grouped by category, then ordered by name.
    pub fn items_by_category(&self) -> Vec<&Item> {
        let mut out: Vec<&Item> = self.items.values().collect();
        out.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        out
    }

    pub fn hero_count(&self) -> usize {
        self.heroes.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn count_in(&self, category: ItemCategory) -> usize {
        self.items.values().filter(|i| i.category == category).count()
    }
}
