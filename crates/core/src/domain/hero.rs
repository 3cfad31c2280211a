use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type HeroId = i32;
pub type ItemId = i32;

/// Upper bound of the effectiveness scale used by counter facts.
pub const MAX_EFFECTIVENESS: f64 = 10.0;

/// Weight substituted when a source records no effectiveness for a fact.
pub const DEFAULT_EFFECTIVENESS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub image_path: String,
}

impl Hero {
    pub fn new(id: HeroId, name: impl Into<String>) -> Self {
        let name = name.into();
        let image_path = hero_image_path(&name);
        Self {
            id,
            name,
            image_path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Spirit,
    Vitality,
    Weapon,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 3] = [Self::Spirit, Self::Vitality, Self::Weapon];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spirit => "Spirit",
            Self::Vitality => "Vitality",
            Self::Weapon => "Weapon",
        }
    }

    /// Directory name used for item artwork.
    pub fn asset_dir(self) -> &'static str {
        match self {
            Self::Spirit => "SpiritItems",
            Self::Vitality => "VitalityItems",
            Self::Weapon => "WeaponItems",
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept the legacy "SpiritItems" spelling used by older datasets.
        let trimmed = s.trim();
        let base = trimmed.strip_suffix("Items").unwrap_or(trimmed);
        match base.to_ascii_lowercase().as_str() {
            "spirit" => Ok(Self::Spirit),
            "vitality" => Ok(Self::Vitality),
            "weapon" => Ok(Self::Weapon),
            _ => anyhow::bail!("unknown item category: {s:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub category: ItemCategory,
    pub image_path: String,
}

impl Item {
    pub fn new(id: ItemId, name: impl Into<String>, category: ItemCategory) -> Self {
        let name = name.into();
        let image_path = format!("images/items/{}/{name}.png", category.asset_dir());
        Self {
            id,
            name,
            category,
            image_path,
        }
    }
}

/// "`item` counters `hero`", optionally weighted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterFact {
    pub hero: Hero,
    pub item: Item,
    pub effectiveness: Option<f64>,
    pub reason: Option<String>,
}

impl CounterFact {
    pub fn new(hero: Hero, item: Item, effectiveness: Option<f64>) -> Self {
        Self {
            hero,
            item,
            effectiveness,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.reason = Some(reason.trim().to_string()).filter(|s| !s.is_empty());
        self
    }

    /// Effectiveness on the [0, 10] scale, defaulting when absent or unusable.
    pub fn weight(&self) -> f64 {
        match self.effectiveness {
            Some(v) if v.is_finite() => v.clamp(0.0, MAX_EFFECTIVENESS),
            _ => DEFAULT_EFFECTIVENESS,
        }
    }
}

/// Lookup key for hero and item names: lowercase ASCII alphanumerics only.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn hero_image_path(name: &str) -> String {
    let file = name.replace(" & ", "&").replace(' ', "");
    format!("images/heroes/{file}.png")
}
