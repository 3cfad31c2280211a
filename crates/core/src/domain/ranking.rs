use crate::domain::hero::{Hero, HeroId, Item};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use uuid::Uuid;

/// Highest display tier; items countering more heroes still show this level.
pub const MAX_LEVEL: u8 = 6;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub item: Item,
    pub heroes_countered: usize,
    pub effectiveness: f64,
    pub level: u8,
    pub countered_heroes: Vec<Hero>,
}

pub fn level_for(heroes_countered: usize) -> u8 {
    // Bounded by MAX_LEVEL, so the narrowing is lossless.
    heroes_countered.clamp(1, usize::from(MAX_LEVEL)) as u8
}

/// Ranking order: more heroes countered, then higher effectiveness, then name.
pub fn ranking_order(a: &RankedItem, b: &RankedItem) -> Ordering {
    b.heroes_countered
        .cmp(&a.heroes_countered)
        .then_with(|| b.effectiveness.total_cmp(&a.effectiveness))
        .then_with(|| a.item.name.cmp(&b.item.name))
}

/// Higher effectiveness first, ties broken by item name.
pub fn effectiveness_order(a: (f64, &Item), b: (f64, &Item)) -> Ordering {
    b.0.total_cmp(&a.0).then_with(|| a.1.name.cmp(&b.1.name))
}

/// How one roster hero's lookup went. Keeps "no counters" apart from "lookup failed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolutionStatus {
    Countered { facts: usize },
    NoCounters,
    NotFound,
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeroResolution {
    pub hero_id: HeroId,
    pub hero_name: Option<String>,
    #[serde(flatten)]
    pub status: ResolutionStatus,
}

pub fn not_found_ids(resolutions: &[HeroResolution]) -> Vec<HeroId> {
    resolutions
        .iter()
        .filter(|r| r.status == ResolutionStatus::NotFound)
        .map(|r| r.hero_id)
        .collect()
}

pub fn degraded_ids(resolutions: &[HeroResolution]) -> Vec<HeroId> {
    resolutions
        .iter()
        .filter(|r| matches!(r.status, ResolutionStatus::Degraded { .. }))
        .map(|r| r.hero_id)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingReport {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub items: Vec<RankedItem>,
    pub resolutions: Vec<HeroResolution>,
}

impl RankingReport {
    pub fn not_found(&self) -> Vec<HeroId> {
        not_found_ids(&self.resolutions)
    }

    pub fn degraded(&self) -> Vec<HeroId> {
        degraded_ids(&self.resolutions)
    }

    /// True when at least one hero was skipped rather than resolved.
    pub fn is_partial(&self) -> bool {
        self.resolutions.iter().any(|r| {
            matches!(
                r.status,
                ResolutionStatus::NotFound | ResolutionStatus::Degraded { .. }
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterPick {
    pub item: Item,
    pub effectiveness: f64,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnemyBreakdown {
    pub hero: Hero,
    pub counter_items: Vec<CounterPick>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendlyPick {
    pub item: Item,
    pub effectiveness: f64,
    pub countered_heroes: Vec<Hero>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendlyBreakdown {
    pub hero: Hero,
    pub recommended_items: Vec<FriendlyPick>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamAnalysis {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub enemy_analysis: Vec<EnemyBreakdown>,
    pub recommended_items: Vec<RankedItem>,
    pub friendly_recommendations: Vec<FriendlyBreakdown>,
    pub enemy_resolutions: Vec<HeroResolution>,
    pub friendly_resolutions: Vec<HeroResolution>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hero::ItemCategory;
    use rstest::rstest;

    #[rstest]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(4, 4)]
    #[case(6, 6)]
    #[case(9, 6)]
    fn level_is_clamped(#[case] countered: usize, #[case] level: u8) {
        assert_eq!(level_for(countered), level);
    }

    fn ranked(name: &str, countered: usize, effectiveness: f64) -> RankedItem {
        RankedItem {
            item: Item::new(1, name, ItemCategory::Spirit),
            heroes_countered: countered,
            effectiveness,
            level: level_for(countered),
            countered_heroes: vec![],
        }
    }

    #[test]
    fn ranking_order_uses_all_three_keys() {
        let mut items = vec![
            ranked("Toxic Bullets", 1, 0.7),
            ranked("Slowing Hex", 2, 0.1),
            ranked("Decay", 1, 0.7),
            ranked("Reactive Barrier", 1, 0.9),
        ];
        items.sort_by(ranking_order);
        let names: Vec<_> = items.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Slowing Hex", "Reactive Barrier", "Decay", "Toxic Bullets"]
        );
    }

    #[test]
    fn resolution_serializes_with_status_tag() {
        let r = HeroResolution {
            hero_id: 4,
            hero_name: Some("Dynamo".to_string()),
            status: ResolutionStatus::Degraded {
                reason: "timeout".to_string(),
            },
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "hero_id": 4,
                "hero_name": "Dynamo",
                "status": "degraded",
                "reason": "timeout",
            })
        );
    }
}
