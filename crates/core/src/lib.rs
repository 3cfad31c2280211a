pub mod domain;
pub mod engine;
pub mod error;
pub mod seed;
pub mod source;
pub mod storage;

pub use domain::catalog::Catalog;
pub use domain::hero::{CounterFact, Hero, HeroId, Item, ItemCategory, ItemId};
pub use domain::ranking::{RankedItem, RankingReport, TeamAnalysis};
pub use domain::roster::Roster;
pub use engine::CounterEngine;
pub use error::CounterError;

pub mod config {
    use crate::source::CacheOptions;
    use anyhow::Context;
    use std::str::FromStr;
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub enum CounterSourceKind {
        Postgres,
        Sheets,
        #[default]
        Static,
    }

    impl FromStr for CounterSourceKind {
        type Err = anyhow::Error;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s.trim().to_ascii_lowercase().as_str() {
                "postgres" | "db" => Ok(Self::Postgres),
                "sheets" => Ok(Self::Sheets),
                "static" => Ok(Self::Static),
                other => anyhow::bail!("unknown COUNTER_SOURCE {other:?} (expected postgres, sheets or static)"),
            }
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct SheetsSettings {
        pub spreadsheet_id: Option<String>,
        pub api_key: Option<String>,
        pub base_url: Option<String>,
        pub counters_range: Option<String>,
        pub pool_range: Option<String>,
        pub timeout_secs: Option<u64>,
    }

    #[derive(Debug, Clone, Default)]
    pub struct Settings {
        pub database_url: Option<String>,
        pub sentry_dsn: Option<String>,
        pub port: Option<u16>,
        pub counter_source: CounterSourceKind,
        pub counter_seed_path: Option<String>,
        pub cache: CacheOptions,
        pub sheets: SheetsSettings,
        pub static_base_url: String,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let counter_source = match std::env::var("COUNTER_SOURCE") {
                Ok(s) => s.parse()?,
                Err(_) => CounterSourceKind::default(),
            };

            let mut cache = CacheOptions::default();
            if let Some(secs) = env_parse::<u64>("COUNTER_CACHE_TTL_SECS")? {
                cache.ttl = Duration::from_secs(secs);
            }
            if let Some(n) = env_parse::<usize>("COUNTER_CACHE_MAX_ENTRIES")? {
                cache.max_entries = n;
            }

            Ok(Self {
                database_url: std::env::var("DATABASE_URL").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                port: env_parse("PORT")?,
                counter_source,
                counter_seed_path: std::env::var("COUNTER_SEED_PATH").ok(),
                cache,
                sheets: SheetsSettings {
                    spreadsheet_id: std::env::var("SHEETS_SPREADSHEET_ID").ok(),
                    api_key: std::env::var("SHEETS_API_KEY").ok(),
                    base_url: std::env::var("SHEETS_BASE_URL").ok(),
                    counters_range: std::env::var("SHEETS_COUNTERS_RANGE").ok(),
                    pool_range: std::env::var("SHEETS_POOL_RANGE").ok(),
                    timeout_secs: env_parse("SHEETS_TIMEOUT_SECS")?,
                },
                static_base_url: std::env::var("STATIC_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "/static".to_string()),
            })
        }

        pub fn require_database_url(&self) -> anyhow::Result<&str> {
            self.database_url
                .as_deref()
                .context("DATABASE_URL is required")
        }

        pub fn require_sheets_spreadsheet_id(&self) -> anyhow::Result<&str> {
            self.sheets
                .spreadsheet_id
                .as_deref()
                .context("SHEETS_SPREADSHEET_ID is required")
        }

        pub fn listen_port(&self) -> u16 {
            self.port.unwrap_or(DEFAULT_PORT)
        }

        /// Public URL for a stored image path.
        pub fn asset_url(&self, image_path: &str) -> String {
            format!(
                "{}/{}",
                self.static_base_url.trim_end_matches('/'),
                image_path.trim_start_matches('/')
            )
        }
    }

    fn env_parse<T: FromStr>(key: &str) -> anyhow::Result<Option<T>>
    where
        T::Err: std::fmt::Display,
    {
        match std::env::var(key) {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("{key} is invalid ({s:?}): {e}")),
            _ => Ok(None),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn parses_source_kind() {
            assert_eq!("Postgres".parse::<CounterSourceKind>().unwrap(), CounterSourceKind::Postgres);
            assert_eq!(" sheets ".parse::<CounterSourceKind>().unwrap(), CounterSourceKind::Sheets);
            assert!("redis".parse::<CounterSourceKind>().is_err());
        }

        #[test]
        fn listen_port_defaults_to_3000() {
            assert_eq!(Settings::default().listen_port(), DEFAULT_PORT);
            let settings = Settings {
                port: Some(8080),
                ..Settings::default()
            };
            assert_eq!(settings.listen_port(), 8080);
        }

        #[test]
        fn env_parse_rejects_garbage() {
            std::env::set_var("COUNTERLOCK_TEST_PORT_GARBAGE", "eighty");
            let err = env_parse::<u16>("COUNTERLOCK_TEST_PORT_GARBAGE").unwrap_err();
            assert!(err.to_string().contains("COUNTERLOCK_TEST_PORT_GARBAGE is invalid"));

            std::env::set_var("COUNTERLOCK_TEST_PORT_OK", " 8081 ");
            assert_eq!(env_parse::<u16>("COUNTERLOCK_TEST_PORT_OK").unwrap(), Some(8081));
            assert_eq!(env_parse::<u16>("COUNTERLOCK_TEST_PORT_UNSET").unwrap(), None);
        }

        #[test]
        fn asset_url_joins_without_double_slashes() {
            let settings = Settings {
                static_base_url: "https://cdn.example.com/static/".to_string(),
                ..Settings::default()
            };
            assert_eq!(
                settings.asset_url("/images/heroes/Abrams.png"),
                "https://cdn.example.com/static/images/heroes/Abrams.png"
            );
        }
    }
}
