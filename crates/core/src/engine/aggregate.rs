use crate::domain::hero::{CounterFact, Hero, HeroId, Item, ItemId};
use crate::domain::ranking::{
    effectiveness_order, level_for, ranking_order, CounterPick, RankedItem,
};
use std::collections::{BTreeMap, HashMap};

struct ItemGroup {
    item: Item,
    // One contribution per hero; duplicate facts keep the strongest weight.
    heroes: BTreeMap<HeroId, (Hero, f64)>,
}

/// Merge counter facts into a ranking, one entry per item.
///
/// Facts are commutative: input order never changes the output.
pub fn aggregate(facts: impl IntoIterator<Item = CounterFact>) -> Vec<RankedItem> {
    let mut groups: HashMap<ItemId, ItemGroup> = HashMap::new();

    for fact in facts {
        let weight = fact.weight();
        let group = groups.entry(fact.item.id).or_insert_with(|| ItemGroup {
            item: fact.item.clone(),
            heroes: BTreeMap::new(),
        });
        group
            .heroes
            .entry(fact.hero.id)
            .and_modify(|(_, w)| *w = w.max(weight))
            .or_insert((fact.hero, weight));
    }

    let mut out: Vec<RankedItem> = groups
        .into_values()
        .map(|group| {
            let heroes_countered = group.heroes.len();
            let total: f64 = group.heroes.values().map(|(_, w)| w).sum();
            RankedItem {
                item: group.item,
                heroes_countered,
                effectiveness: total / heroes_countered as f64,
                level: level_for(heroes_countered),
                countered_heroes: group.heroes.into_values().map(|(h, _)| h).collect(),
            }
        })
        .collect();

    out.sort_by(ranking_order);
    out
}

/// One hero's counters, one pick per item, strongest first.
pub fn counter_picks(facts: &[CounterFact]) -> Vec<CounterPick> {
    let mut by_item: HashMap<ItemId, CounterPick> = HashMap::new();
    for fact in facts {
        let weight = fact.weight();
        by_item
            .entry(fact.item.id)
            .and_modify(|pick| {
                if weight > pick.effectiveness {
                    pick.effectiveness = weight;
                    pick.reason = fact.reason.clone();
                }
            })
            .or_insert_with(|| CounterPick {
                item: fact.item.clone(),
                effectiveness: weight,
                reason: fact.reason.clone(),
            });
    }

    let mut out: Vec<CounterPick> = by_item.into_values().collect();
    out.sort_by(|a, b| effectiveness_order((a.effectiveness, &a.item), (b.effectiveness, &b.item)));
    out
}
