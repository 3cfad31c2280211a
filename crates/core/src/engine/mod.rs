use crate::domain::catalog::Catalog;
use crate::domain::hero::{CounterFact, Hero, HeroId, ItemId};
use crate::domain::ranking::{
    effectiveness_order, EnemyBreakdown, FriendlyBreakdown, FriendlyPick, HeroResolution,
    RankedItem, RankingReport, ResolutionStatus, TeamAnalysis,
};
use crate::domain::roster::Roster;
use crate::error::CounterError;
use crate::source::CounterSource;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub mod aggregate;

pub use aggregate::{aggregate, counter_picks};

/// Ranks counter items for rosters against the catalog, reading facts through a
/// [`CounterSource`].
#[derive(Clone)]
pub struct CounterEngine {
    catalog: Arc<Catalog>,
    source: Arc<dyn CounterSource>,
}

struct Resolved {
    // Per hero, in first-occurrence roster order; only heroes that resolved.
    facts: Vec<(Hero, Vec<CounterFact>)>,
    resolutions: Vec<HeroResolution>,
}

impl CounterEngine {
    pub fn new(catalog: Arc<Catalog>, source: Arc<dyn CounterSource>) -> Self {
        Self { catalog, source }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn source(&self) -> &dyn CounterSource {
        self.source.as_ref()
    }

    /// Rank the items countering `roster`. Repeated ids count once; unknown heroes and
    /// failed lookups are skipped and reported in `resolutions`.
    pub async fn rank_counters(&self, roster: &Roster, limit: Option<usize>) -> RankingReport {
        let request_id = uuid::Uuid::new_v4();
        let resolved = self.resolve_counters(roster).await;

        let mut items = aggregate(resolved.facts.into_iter().flat_map(|(_, facts)| facts));
        if let Some(limit) = limit {
            items.truncate(limit);
        }

        let report = RankingReport {
            request_id,
            generated_at: chrono::Utc::now(),
            items,
            resolutions: resolved.resolutions,
        };

        tracing::info!(
            %request_id,
            roster_len = roster.len(),
            items = report.items.len(),
            not_found = ?report.not_found(),
            degraded = ?report.degraded(),
            "ranked counters"
        );
        report
    }

    /// Enemy ranking plus, for each friendly hero, which of their items answer it.
    pub async fn analyze_teams(&self, enemy: &Roster, friendly: &Roster) -> TeamAnalysis {
        let request_id = uuid::Uuid::new_v4();
        let resolved = self.resolve_counters(enemy).await;

        let enemy_analysis = breakdowns(&resolved.facts);
        let recommended_items = aggregate(
            resolved
                .facts
                .iter()
                .flat_map(|(_, facts)| facts.iter().cloned()),
        );

        let (friendly_recommendations, friendly_resolutions) =
            self.friendly_picks(friendly, &recommended_items).await;

        tracing::info!(
            %request_id,
            enemy_len = enemy.len(),
            friendly_len = friendly.len(),
            items = recommended_items.len(),
            "analyzed teams"
        );

        TeamAnalysis {
            request_id,
            generated_at: chrono::Utc::now(),
            enemy_analysis,
            recommended_items,
            friendly_recommendations,
            enemy_resolutions: resolved.resolutions,
            friendly_resolutions,
        }
    }

    /// Counter picks for every catalog hero that has any.
    pub async fn counter_table(&self) -> (Vec<EnemyBreakdown>, Vec<HeroResolution>) {
        let roster = Roster::new(self.catalog.heroes().map(|h| h.id).collect());
        let resolved = self.resolve_counters(&roster).await;
        let mut table = breakdowns(&resolved.facts);
        table.retain(|b| !b.counter_items.is_empty());
        (table, resolved.resolutions)
    }

    /// Drop cached lookups for one hero, or all heroes.
    pub async fn refresh(&self, hero_id: Option<HeroId>) -> Result<usize, CounterError> {
        match hero_id {
            Some(id) => {
                let hero = self.catalog.hero(id).ok_or(CounterError::NotFound(id))?;
                Ok(self.source.invalidate(Some(hero)).await)
            }
            None => Ok(self.source.invalidate(None).await),
        }
    }

    async fn resolve_counters(&self, roster: &Roster) -> Resolved {
        let mut out = Resolved {
            facts: Vec::new(),
            resolutions: Vec::new(),
        };

        for id in roster.distinct() {
            let Some(hero) = self.catalog.hero(id) else {
                tracing::debug!(hero_id = id, "roster hero not in catalog; skipping");
                out.resolutions.push(resolution(id, None, ResolutionStatus::NotFound));
                continue;
            };

            let status = match self.source.counters_for(hero).await {
                Ok(mut facts) => {
                    // A source answering for another hero must not inflate counts.
                    facts.retain(|f| f.hero.id == hero.id);
                    let status = if facts.is_empty() {
                        ResolutionStatus::NoCounters
                    } else {
                        ResolutionStatus::Countered { facts: facts.len() }
                    };
                    out.facts.push((hero.clone(), facts));
                    status
                }
                Err(err) => lookup_failure(hero, err),
            };
            out.resolutions.push(resolution(id, Some(hero), status));
        }

        out
    }

    async fn friendly_picks(
        &self,
        friendly: &Roster,
        ranked: &[RankedItem],
    ) -> (Vec<FriendlyBreakdown>, Vec<HeroResolution>) {
        let needed: HashMap<ItemId, &RankedItem> =
            ranked.iter().map(|r| (r.item.id, r)).collect();
        let mut breakdowns = Vec::new();
        let mut resolutions = Vec::new();

        for id in friendly.distinct() {
            let Some(hero) = self.catalog.hero(id) else {
                resolutions.push(resolution(id, None, ResolutionStatus::NotFound));
                continue;
            };

            let pool = match self.source.item_pool_for(hero).await {
                Ok(pool) => pool,
                Err(err) => {
                    resolutions.push(resolution(id, Some(hero), lookup_failure(hero, err)));
                    continue;
                }
            };

            let mut seen = HashSet::new();
            let mut picks: Vec<FriendlyPick> = pool
                .iter()
                .filter(|item| seen.insert(item.id))
                .filter_map(|item| needed.get(&item.id))
                .map(|r| FriendlyPick {
                    item: r.item.clone(),
                    effectiveness: r.effectiveness,
                    countered_heroes: r.countered_heroes.clone(),
                })
                .collect();
            picks.sort_by(|a, b| effectiveness_order((a.effectiveness, &a.item), (b.effectiveness, &b.item)));

            let status = if pool.is_empty() {
                ResolutionStatus::NoCounters
            } else {
                ResolutionStatus::Countered { facts: pool.len() }
            };
            resolutions.push(resolution(id, Some(hero), status));
            breakdowns.push(FriendlyBreakdown {
                hero: hero.clone(),
                recommended_items: picks,
            });
        }

        (breakdowns, resolutions)
    }
}

fn resolution(hero_id: HeroId, hero: Option<&Hero>, status: ResolutionStatus) -> HeroResolution {
    HeroResolution {
        hero_id,
        hero_name: hero.map(|h| h.name.clone()),
        status,
    }
}

fn lookup_failure(hero: &Hero, err: CounterError) -> ResolutionStatus {
    match err {
        CounterError::NotFound(_) => ResolutionStatus::NotFound,
        err => {
            tracing::warn!(hero = %hero.name, error = %err, "counter lookup failed; degrading to empty");
            ResolutionStatus::Degraded {
                reason: err.to_string(),
            }
        }
    }
}

/// One breakdown per resolved hero, empty when the hero has no counters.
fn breakdowns(facts: &[(Hero, Vec<CounterFact>)]) -> Vec<EnemyBreakdown> {
    facts
        .iter()
        .map(|(hero, facts)| EnemyBreakdown {
            hero: hero.clone(),
            counter_items: counter_picks(facts),
        })
        .collect()
}
