use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use counterlock_core::config::Settings;
use counterlock_core::domain::ranking::{
    degraded_ids, not_found_ids, EnemyBreakdown, FriendlyBreakdown, HeroResolution,
    ResolutionStatus,
};
use counterlock_core::{CounterEngine, CounterError, Hero, HeroId, Item, RankedItem, Roster};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

const NOT_FOUND_HEADER: HeaderName = HeaderName::from_static("x-counterlock-not-found");
const DEGRADED_HEADER: HeaderName = HeaderName::from_static("x-counterlock-degraded");

#[derive(Clone)]
pub struct AppState {
    pub engine: CounterEngine,
    pub settings: Arc<Settings>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/heroes", get(list_heroes))
        .route("/api/items", get(list_items))
        .route("/api/counters", get(list_counters))
        .route("/api/recommend", post(recommend))
        .route("/api/team_analysis", post(team_analysis))
        .route("/api/cache/refresh", post(refresh_cache))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl From<CounterError> for ApiError {
    fn from(err: CounterError) -> Self {
        let status = match &err {
            CounterError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CounterError::NotFound(_) => StatusCode::NOT_FOUND,
            CounterError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_input",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(status = %self.status, kind = self.kind, message = %self.message, "request rejected");
        let body = json!({"error": {"kind": self.kind, "message": self.message}});
        (self.status, Json(body)).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct HeroView {
    id: HeroId,
    name: String,
    image_url: String,
}

#[derive(Debug, Serialize)]
struct ItemView {
    id: i32,
    name: String,
    category: &'static str,
    image_url: String,
}

#[derive(Debug, Serialize)]
struct HeroRef {
    id: HeroId,
    name: String,
}

impl From<&Hero> for HeroRef {
    fn from(h: &Hero) -> Self {
        Self {
            id: h.id,
            name: h.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RankedItemView {
    id: i32,
    name: String,
    category: &'static str,
    level: u8,
    heroes_countered: usize,
    effectiveness: f64,
    countered_heroes: Vec<HeroRef>,
}

impl From<&RankedItem> for RankedItemView {
    fn from(r: &RankedItem) -> Self {
        Self {
            id: r.item.id,
            name: r.item.name.clone(),
            category: r.item.category.as_str(),
            level: r.level,
            heroes_countered: r.heroes_countered,
            effectiveness: r.effectiveness,
            countered_heroes: r.countered_heroes.iter().map(HeroRef::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CounterItemView {
    id: i32,
    name: String,
    category: &'static str,
    effectiveness: f64,
    reason: Option<String>,
}

#[derive(Debug, Serialize)]
struct HeroCountersView {
    hero_id: HeroId,
    hero_name: String,
    counter_items: Vec<CounterItemView>,
}

impl From<&EnemyBreakdown> for HeroCountersView {
    fn from(b: &EnemyBreakdown) -> Self {
        Self {
            hero_id: b.hero.id,
            hero_name: b.hero.name.clone(),
            counter_items: b
                .counter_items
                .iter()
                .map(|p| CounterItemView {
                    id: p.item.id,
                    name: p.item.name.clone(),
                    category: p.item.category.as_str(),
                    effectiveness: p.effectiveness,
                    reason: p.reason.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FriendlyItemView {
    id: i32,
    name: String,
    category: &'static str,
    effectiveness: f64,
    countered_heroes: Vec<HeroRef>,
}

#[derive(Debug, Serialize)]
struct FriendlyView {
    hero_name: String,
    recommended_items: Vec<FriendlyItemView>,
}

impl From<&FriendlyBreakdown> for FriendlyView {
    fn from(b: &FriendlyBreakdown) -> Self {
        Self {
            hero_name: b.hero.name.clone(),
            recommended_items: b
                .recommended_items
                .iter()
                .map(|p| FriendlyItemView {
                    id: p.item.id,
                    name: p.item.name.clone(),
                    category: p.item.category.as_str(),
                    effectiveness: p.effectiveness,
                    countered_heroes: p.countered_heroes.iter().map(HeroRef::from).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DegradedView {
    hero_id: HeroId,
    reason: String,
}

#[derive(Debug, Serialize)]
struct TeamAnalysisView {
    enemy_analysis: BTreeMap<HeroId, HeroCountersView>,
    recommended_items: Vec<RankedItemView>,
    friendly_recommendations: BTreeMap<HeroId, FriendlyView>,
    not_found: Vec<HeroId>,
    degraded: Vec<DegradedView>,
}

fn item_view(settings: &Settings, item: &Item) -> ItemView {
    ItemView {
        id: item.id,
        name: item.name.clone(),
        category: item.category.as_str(),
        image_url: settings.asset_url(&item.image_path),
    }
}

/// Headers listing heroes that were skipped; empty when every hero resolved.
fn partial_headers(resolutions: &[HeroResolution]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, ids) in [
        (NOT_FOUND_HEADER, not_found_ids(resolutions)),
        (DEGRADED_HEADER, degraded_ids(resolutions)),
    ] {
        if ids.is_empty() {
            continue;
        }
        let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
        if let Ok(value) = HeaderValue::from_str(&joined) {
            headers.insert(name, value);
        }
    }
    headers
}

fn degraded_views(resolutions: &[HeroResolution]) -> Vec<DegradedView> {
    resolutions
        .iter()
        .filter_map(|r| match &r.status {
            ResolutionStatus::Degraded { reason } => Some(DegradedView {
                hero_id: r.hero_id,
                reason: reason.clone(),
            }),
            _ => None,
        })
        .collect()
}

fn body_object(payload: Result<Json<Value>, JsonRejection>) -> Result<serde_json::Map<String, Value>, ApiError> {
    let Json(body) = payload?;
    match body {
        Value::Object(obj) => Ok(obj),
        _ => Err(CounterError::InvalidInput("request body must be a JSON object".to_string()).into()),
    }
}

fn parse_limit(value: Option<&Value>) -> Result<Option<usize>, CounterError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| CounterError::InvalidInput(format!("limit must be a non-negative integer (got {v})"))),
    }
}

async fn list_heroes(State(state): State<AppState>) -> Json<Vec<HeroView>> {
    let heroes = state
        .engine
        .catalog()
        .heroes()
        .map(|h| HeroView {
            id: h.id,
            name: h.name.clone(),
            image_url: state.settings.asset_url(&h.image_path),
        })
        .collect();
    Json(heroes)
}

async fn list_items(State(state): State<AppState>) -> Json<Vec<ItemView>> {
    let items = state
        .engine
        .catalog()
        .items_by_category()
        .into_iter()
        .map(|item| item_view(&state.settings, item))
        .collect();
    Json(items)
}

async fn list_counters(State(state): State<AppState>) -> impl IntoResponse {
    let (table, resolutions) = state.engine.counter_table().await;
    let body: Vec<HeroCountersView> = table.iter().map(HeroCountersView::from).collect();
    (partial_headers(&resolutions), Json(body))
}

async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body_object(payload)?;
    let roster = Roster::from_json("enemy_team", body.get("enemy_team"))?;
    let limit = parse_limit(body.get("limit"))?;

    let report = state.engine.rank_counters(&roster, limit).await;
    let items: Vec<RankedItemView> = report.items.iter().map(RankedItemView::from).collect();
    Ok((partial_headers(&report.resolutions), Json(items)))
}

async fn team_analysis(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<TeamAnalysisView>, ApiError> {
    let body = body_object(payload)?;
    let enemy = Roster::from_json("enemy_team", body.get("enemy_team"))?;
    let friendly = Roster::from_json("friendly_team", body.get("friendly_team"))?;

    let analysis = state.engine.analyze_teams(&enemy, &friendly).await;

    let resolutions: Vec<HeroResolution> = analysis
        .enemy_resolutions
        .iter()
        .chain(analysis.friendly_resolutions.iter())
        .cloned()
        .collect();
    let mut not_found = not_found_ids(&resolutions);
    not_found.sort_unstable();
    not_found.dedup();

    Ok(Json(TeamAnalysisView {
        enemy_analysis: analysis
            .enemy_analysis
            .iter()
            .map(|b| (b.hero.id, HeroCountersView::from(b)))
            .collect(),
        recommended_items: analysis
            .recommended_items
            .iter()
            .map(RankedItemView::from)
            .collect(),
        friendly_recommendations: analysis
            .friendly_recommendations
            .iter()
            .map(|b| (b.hero.id, FriendlyView::from(b)))
            .collect(),
        not_found,
        degraded: degraded_views(&resolutions),
    }))
}

async fn refresh_cache(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let hero_id = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        let value: Value = serde_json::from_slice(&body).map_err(|e| {
            CounterError::InvalidInput(format!("request body is not valid JSON: {e}"))
        })?;
        let Value::Object(obj) = value else {
            return Err(CounterError::InvalidInput("request body must be a JSON object".to_string()).into());
        };
        match obj.get("hero_id") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_i64()
                    .and_then(|n| HeroId::try_from(n).ok())
                    .ok_or_else(|| CounterError::InvalidInput(format!("hero_id must be an integer (got {v})")))?,
            ),
        }
    };

    let invalidated = state.engine.refresh(hero_id).await?;
    Ok(Json(json!({"invalidated": invalidated})))
}
