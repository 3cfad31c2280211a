use crate::config::Settings;
use crate::domain::catalog::Catalog;
use crate::domain::hero::{normalize_name, CounterFact, Hero, Item};
use crate::error::CounterError;
use crate::source::CounterSource;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_COUNTERS_RANGE: &str = "CounterItems!A:C";
const DEFAULT_POOL_RANGE: &str = "FriendlyItems!A:B";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Google Sheets `values.get` response.
#[derive(Debug, Clone, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Counter facts read from a shared spreadsheet.
///
/// `CounterItems` rows are `hero, item, reason-or-effectiveness`; `FriendlyItems` rows are
/// `hero, item`. The first row of each tab is a header.
#[derive(Debug, Clone)]
pub struct SheetsCounterSource {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: Option<String>,
    counters_range: String,
    pool_range: String,
    catalog: Arc<Catalog>,
}

impl SheetsCounterSource {
    pub fn from_settings(settings: &Settings, catalog: Arc<Catalog>) -> Result<Self> {
        let sheets = &settings.sheets;
        let spreadsheet_id = settings.require_sheets_spreadsheet_id()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(
                sheets.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ))
            .build()
            .context("failed to build sheets http client")?;

        Ok(Self {
            http,
            base_url: sheets
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            spreadsheet_id,
            api_key: sheets.api_key.clone(),
            counters_range: sheets
                .counters_range
                .clone()
                .unwrap_or_else(|| DEFAULT_COUNTERS_RANGE.to_string()),
            pool_range: sheets
                .pool_range
                .clone()
                .unwrap_or_else(|| DEFAULT_POOL_RANGE.to_string()),
            catalog,
        })
    }

    fn url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url.trim_end_matches('/'),
            self.spreadsheet_id,
            range
        )
    }

    async fn fetch_rows(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let mut req = self.http.get(self.url(range));
        if let Some(key) = &self.api_key {
            req = req.query(&[("key", key.as_str())]);
        }

        let res = req.send().await.context("sheets request failed")?;
        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read sheets response")?;

        if !status.is_success() {
            anyhow::bail!("sheets HTTP {status}: {text}");
        }

        let parsed = serde_json::from_str::<ValueRange>(&text)
            .with_context(|| format!("sheets response is not a value range: {text}"))?;
        Ok(parsed.values)
    }
}

#[async_trait::async_trait]
impl CounterSource for SheetsCounterSource {
    fn source_name(&self) -> &'static str {
        "sheets"
    }

    async fn counters_for(&self, hero: &Hero) -> Result<Vec<CounterFact>, CounterError> {
        tracing::debug!(hero = %hero.name, range = %self.counters_range, "fetching counters from sheet");
        let rows = self
            .fetch_rows(&self.counters_range)
            .await
            .map_err(|e| CounterError::upstream(self.source_name(), e))?;
        Ok(counter_rows_for(&rows, hero, &self.catalog))
    }

    async fn item_pool_for(&self, hero: &Hero) -> Result<Vec<Item>, CounterError> {
        tracing::debug!(hero = %hero.name, range = %self.pool_range, "fetching item pool from sheet");
        let rows = self
            .fetch_rows(&self.pool_range)
            .await
            .map_err(|e| CounterError::upstream(self.source_name(), e))?;
        Ok(pool_rows_for(&rows, hero, &self.catalog))
    }
}

/// Rows after the header whose first cell names `hero`, paired with their catalog item.
fn rows_for<'a>(
    rows: &'a [Vec<String>],
    hero: &'a Hero,
    catalog: &'a Catalog,
) -> impl Iterator<Item = (&'a Vec<String>, &'a Item)> + 'a {
    let hero_key = normalize_name(&hero.name);
    rows.iter()
        .skip(1)
        .filter(move |row| row.len() > 1 && normalize_name(&row[0]) == hero_key)
        .filter_map(move |row| match catalog.item_by_name(&row[1]) {
            Some(item) => Some((row, item)),
            None => {
                tracing::warn!(hero = %hero.name, item = %row[1], "sheet names an unknown item; skipping");
                None
            }
        })
}

fn counter_rows_for(rows: &[Vec<String>], hero: &Hero, catalog: &Catalog) -> Vec<CounterFact> {
    rows_for(rows, hero, catalog)
        .map(|(row, item)| {
            let note = row.get(2).map(|s| s.trim()).unwrap_or_default();
            match note.parse::<f64>() {
                Ok(effectiveness) => CounterFact::new(hero.clone(), item.clone(), Some(effectiveness)),
                Err(_) => CounterFact::new(hero.clone(), item.clone(), None).with_reason(note),
            }
        })
        .collect()
}

fn pool_rows_for(rows: &[Vec<String>], hero: &Hero, catalog: &Catalog) -> Vec<Item> {
    rows_for(rows, hero, catalog)
        .map(|(_, item)| item.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn parses_value_range_shape() {
        let v = json!({
            "range": "CounterItems!A1:C3",
            "majorDimension": "ROWS",
            "values": [["Hero", "Item", "Reason"], ["Abrams", "Decay"]]
        });
        let parsed: ValueRange = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.values.len(), 2);
        assert_eq!(parsed.values[1], vec!["Abrams", "Decay"]);
    }

    #[test]
    fn empty_sheet_has_no_values_key() {
        let parsed: ValueRange = serde_json::from_value(json!({"range": "X!A:B"})).unwrap();
        assert!(parsed.values.is_empty());
    }

    #[test]
    fn counter_rows_skip_header_and_other_heroes() {
        let catalog = Catalog::seeded().unwrap();
        let abrams = catalog.hero_by_name("Abrams").unwrap().clone();
        let sheet = rows(&[
            &["Abrams", "Decay", "header row is skipped"],
            &["Abrams", "Decay", "0.7"],
            &["abrams", "Toxic Bullets", "shreds his regen"],
            &["Bebop", "Reactive Barrier", "0.9"],
            &["Abrams"],
            &["Abrams", "Mystery Gun", "1"],
        ]);

        let facts = counter_rows_for(&sheet, &abrams, &catalog);
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].item.name, "Decay");
        assert_eq!(facts[0].effectiveness, Some(0.7));
        assert_eq!(facts[0].reason, None);
        assert_eq!(facts[1].item.name, "Toxic Bullets");
        assert_eq!(facts[1].effectiveness, None);
        assert_eq!(facts[1].reason.as_deref(), Some("shreds his regen"));
    }

    #[test]
    fn pool_rows_resolve_items() {
        let catalog = Catalog::seeded().unwrap();
        let haze = catalog.hero_by_name("Haze").unwrap().clone();
        let sheet = rows(&[
            &["Hero", "Item"],
            &["Haze", "Healbane"],
            &["Haze", "slowing hex"],
            &["Wraith", "Decay"],
        ]);

        let items = pool_rows_for(&sheet, &haze, &catalog);
        let names: Vec<_> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Healbane", "Slowing Hex"]);
    }

    #[test]
    fn url_joins_base_and_range() {
        let mut settings = Settings::default();
        settings.sheets.spreadsheet_id = Some("sheet-123".to_string());
        settings.sheets.base_url = Some("http://localhost:9000/".to_string());
        let source =
            SheetsCounterSource::from_settings(&settings, Arc::new(Catalog::default())).unwrap();
        assert_eq!(
            source.url("CounterItems!A:C"),
            "http://localhost:9000/v4/spreadsheets/sheet-123/values/CounterItems!A:C"
        );
    }

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn source_at(base_url: String, catalog: Arc<Catalog>) -> SheetsCounterSource {
        let mut settings = Settings::default();
        settings.sheets.spreadsheet_id = Some("sheet-123".to_string());
        settings.sheets.api_key = Some("k".to_string());
        settings.sheets.base_url = Some(base_url);
        SheetsCounterSource::from_settings(&settings, catalog).unwrap()
    }

    #[tokio::test]
    async fn reads_counters_and_pools_over_http() {
        let app = axum::Router::new().fallback(|uri: axum::http::Uri| async move {
            let body = if uri.path().contains("FriendlyItems") {
                json!({"values": [["Hero", "Item"], ["Haze", "Decay"]]})
            } else {
                json!({"values": [["Hero", "Item", "Why"], ["Abrams", "Decay", "0.7"]]})
            };
            axum::Json(body)
        });
        let catalog = Arc::new(Catalog::seeded().unwrap());
        let source = source_at(serve(app).await, catalog.clone());

        let abrams = catalog.hero_by_name("Abrams").unwrap();
        let facts = source.counters_for(abrams).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].effectiveness, Some(0.7));

        let haze = catalog.hero_by_name("Haze").unwrap();
        let pool = source.item_pool_for(haze).await.unwrap();
        assert_eq!(pool[0].name, "Decay");
    }

    #[tokio::test]
    async fn error_status_is_upstream_unavailable() {
        let app = axum::Router::new().fallback(|| async {
            (axum::http::StatusCode::SERVICE_UNAVAILABLE, "backend overloaded")
        });
        let catalog = Arc::new(Catalog::seeded().unwrap());
        let source = source_at(serve(app).await, catalog.clone());

        let abrams = catalog.hero_by_name("Abrams").unwrap();
        let err = source.counters_for(abrams).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
        let msg = err.to_string();
        assert!(msg.contains("sheets"), "{msg}");
        assert!(msg.contains("503"), "{msg}");
        assert!(msg.contains("backend overloaded"), "{msg}");
        assert!(source.item_pool_for(abrams).await.is_err());
    }

    #[tokio::test]
    async fn non_value_range_body_is_upstream_unavailable() {
        let app = axum::Router::new().fallback(|| async { "<html>quota exceeded</html>" });
        let catalog = Arc::new(Catalog::seeded().unwrap());
        let source = source_at(serve(app).await, catalog.clone());

        let abrams = catalog.hero_by_name("Abrams").unwrap();
        let err = source.counters_for(abrams).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_unavailable");
        assert!(err.to_string().contains("not a value range"), "{err}");
    }

    #[test]
    fn requires_spreadsheet_id() {
        let settings = Settings::default();
        assert!(SheetsCounterSource::from_settings(&settings, Arc::new(Catalog::default())).is_err());
    }
}
