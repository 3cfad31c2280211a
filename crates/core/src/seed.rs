use crate::domain::catalog::Catalog;
use crate::domain::hero::{CounterFact, Hero, HeroId, Item, ItemCategory};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

const HEROES: &[&str] = &[
    "Abrams", "Bebop", "Calico", "Dynamo", "Grey Talon", "Haze", "Holliday", "Infernus", "Ivy",
    "Kelvin", "Lady Geist", "Lash", "Mcginnis", "Mirage", "Mo & Krill", "Paradox", "Pocket",
    "Seven", "Shiv", "Sinclair", "Vindicta", "Viscous", "Vyper", "Warden", "Wraith", "Yamato",
];

const SPIRIT_ITEMS: &[&str] = &[
    "Ammo Scavenger", "Arcane Surge", "Boundless Spirit", "Bullet Resist Shredder",
    "Cold Front", "Curse", "Decay", "Diviners Kevlar", "Duration Extender", "Echo Shard",
    "Escalating Exposure", "Ethereal Shift", "Extra Charge", "Extra Spirit",
    "Improved Burst", "Improved Cooldown", "Improved Reach", "Improved Spirit", "Infuser",
    "Knockdown", "Magic Carpet", "Mystic Burst", "Mystic Reach", "Mystic Reverb",
    "Mystic Slow", "Mystic Vulnerability", "Quick Silver Reload", "Rapid Recharge",
    "Refresher", "Silence Glyph", "Slowing Hex", "Spirit Snatch", "Spirit Strike",
    "Superior Cooldown", "Superior Duration", "Suppressor", "Surge Of Power",
    "Torment Pulse", "Withering Whip",
];

const VITALITY_ITEMS: &[&str] = &[
    "Bullet Armor", "Bullet Lifesteal", "Colossus", "Combat Barrier", "Debuff Reducer",
    "Debuff Remover", "Divine Barrier", "Enchanters Barrier", "Enduring Speed",
    "Enduring Spirit", "Extra Health", "Extra Regen", "Extra Stamina", "Fortitude",
    "Healbane", "Healing Booster", "Healing Rite", "Health Nova", "Improved Bullet Armor",
    "Improved Spirit Armor", "Inhibitor", "Leech", "Lifestrike", "Majestic Leap",
    "Melee Lifesteal", "Metal Skin", "Phantom Strike", "Reactive Barrier", "Rescue Beam",
    "Restorative Locket", "Return Fire", "Siphon Bullets", "Soul Rebirth", "Spirit Armor",
    "Spirit Lifesteal", "Sprint Boots", "Superior Stamina", "Unstoppable", "Veil Walker",
];

const WEAPON_ITEMS: &[&str] = &[
    "Active Reload", "Alchemical Fire", "Basic Magazine", "Berserker", "Burst Fire",
    "CloseQuarters", "Crippling Headshot", "Escalating Resilience", "Fleetfoot", "Frenzy",
    "Glass Cannon", "Head Hunter", "Headshot Booster", "Heroic Aura", "High Velocity Mag",
    "Hollow Point Ward", "Hunters Aura", "Intensifying Magazine", "Kinetic Dash",
    "Long Range", "Lucky Shot", "Medic Bullets", "Melee Charge", "Monster Rounds",
    "Mystic Shot", "Point Blank", "Pristine Emblem", "Rapid Rounds", "Ricochet",
    "Shadow Weave", "Sharpshooter", "Silencer", "Slowing Bullets", "Soul Shredder Bullets",
    "SpellslingerHeadshot", "Spiritual Overflow", "Swift Striker", "Tesla Bullets",
    "Titanic Magazine", "Toxic Bullets", "Vampiric Burst", "Warp Stone",
];

pub fn bundled_heroes() -> Vec<Hero> {
    HEROES
        .iter()
        .zip(1..)
        .map(|(name, id)| Hero::new(id, *name))
        .collect()
}

/// Spirit, then Vitality, then Weapon items, ids assigned in that order.
pub fn bundled_items() -> Vec<Item> {
    let by_category = [
        (ItemCategory::Spirit, SPIRIT_ITEMS),
        (ItemCategory::Vitality, VITALITY_ITEMS),
        (ItemCategory::Weapon, WEAPON_ITEMS),
    ];

    by_category
        .into_iter()
        .flat_map(|(category, names)| names.iter().map(move |name| (category, *name)))
        .zip(1..)
        .map(|((category, name), id)| Item::new(id, name, category))
        .collect()
}

/// Counter and item-pool rows keyed by display name, as exported from the sheet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub counters: Vec<SeedCounter>,
    #[serde(default)]
    pub pools: Vec<SeedPoolEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCounter {
    pub hero: String,
    pub item: String,
    pub effectiveness: Option<f64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPoolEntry {
    pub hero: String,
    pub item: String,
}

/// Seed rows resolved against a catalog.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSeed {
    pub counters: Vec<CounterFact>,
    pub pools: Vec<(HeroId, Item)>,
    /// Rows naming a hero or item the catalog does not know.
    pub skipped: Vec<String>,
}

impl SeedFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("seed file {} is not valid JSON", path.display()))
    }

    pub fn resolve(&self, catalog: &Catalog) -> ResolvedSeed {
        let mut out = ResolvedSeed::default();

        for row in &self.counters {
            match (catalog.hero_by_name(&row.hero), catalog.item_by_name(&row.item)) {
                (Some(hero), Some(item)) => {
                    let mut fact = CounterFact::new(hero.clone(), item.clone(), row.effectiveness);
                    if let Some(reason) = &row.reason {
                        fact = fact.with_reason(reason);
                    }
                    out.counters.push(fact);
                }
                _ => out.skipped.push(format!("counter {} -> {}", row.hero, row.item)),
            }
        }

        for row in &self.pools {
            match (catalog.hero_by_name(&row.hero), catalog.item_by_name(&row.item)) {
                (Some(hero), Some(item)) => out.pools.push((hero.id, item.clone())),
                _ => out.skipped.push(format!("pool {} -> {}", row.hero, row.item)),
            }
        }

        if !out.skipped.is_empty() {
            tracing::warn!(
                skipped = out.skipped.len(),
                first = %out.skipped[0],
                "seed rows reference unknown heroes or items"
            );
        }

        out
    }
}
