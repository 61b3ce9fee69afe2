use crate::config::ChampionConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Champion {
    pub id: String,
    pub key: String,
    pub name: String,
}

/// Champion list for one game patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChampionRoster {
    pub version: String,
    pub champions: Vec<Champion>,
}

/// Where champion data comes from
#[async_trait]
pub trait ChampionSource: Send + Sync {
    async fn fetch_roster(&self) -> AppResult<ChampionRoster>;
}

#[derive(Deserialize)]
struct ChampionFile {
    data: HashMap<String, Champion>,
}

/// Riot's Data Dragon CDN
pub struct DataDragonSource {
    client: reqwest::Client,
    base_url: String,
}

impl DataDragonSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn latest_version(&self) -> AppResult<String> {
        let url = format!("{}/api/versions.json", self.base_url);
        let versions: Vec<String> = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::ExternalService(format!("Version lookup failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid versions.json: {}", e)))?;

        versions
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ExternalService("versions.json is empty".to_string()))
    }
}

#[async_trait]
impl ChampionSource for DataDragonSource {
    async fn fetch_roster(&self) -> AppResult<ChampionRoster> {
        let version = self.latest_version().await?;
        let url = format!("{}/cdn/{}/data/en_US/champion.json", self.base_url, version);

        let file: ChampionFile = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::ExternalService(format!("Champion download failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid champion.json: {}", e)))?;

        let mut champions: Vec<Champion> = file.data.into_values().collect();
        champions.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(ChampionRoster { version, champions })
    }
}

struct CachedRoster {
    roster: Arc<ChampionRoster>,
    fetched_at: Instant,
}

/// Read-through cache over a `ChampionSource` with a fixed time-to-live
pub struct ChampionCatalog {
    source: Arc<dyn ChampionSource>,
    config: ChampionConfig,
    cache: RwLock<Option<CachedRoster>>,
}

impl ChampionCatalog {
    pub fn new(source: Arc<dyn ChampionSource>, config: ChampionConfig) -> Self {
        Self {
            source,
            config,
            cache: RwLock::new(None),
        }
    }

    /// Current roster. A failed fetch yields an empty roster at the fallback
    /// version and is not cached, so the next call tries again.
    pub async fn roster(&self) -> Arc<ChampionRoster> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.fetched_at.elapsed() < self.config.cache_ttl() {
                return cached.roster.clone();
            }
        }

        let mut cache = self.cache.write().await;
        // Another task may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.config.cache_ttl() {
                return cached.roster.clone();
            }
        }

        match self.source.fetch_roster().await {
            Ok(roster) => {
                info!(
                    "Loaded {} champions for patch {}",
                    roster.champions.len(),
                    roster.version
                );
                let roster = Arc::new(roster);
                *cache = Some(CachedRoster {
                    roster: roster.clone(),
                    fetched_at: Instant::now(),
                });
                roster
            }
            Err(e) => {
                error!("Error fetching champions: {}", e);
                Arc::new(ChampionRoster {
                    version: self.config.fallback_version.clone(),
                    champions: Vec::new(),
                })
            }
        }
    }

    /// Drop the cached roster
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Square portrait for a champion id, empty when no id is given
    pub async fn image_url(&self, champion_id: &str) -> String {
        if champion_id.is_empty() {
            return String::new();
        }
        let roster = self.roster().await;
        format!(
            "{}/cdn/{}/img/champion/{}.png",
            self.config.data_url.trim_end_matches('/'),
            roster.version,
            champion_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ChampionSource for CountingSource {
        async fn fetch_roster(&self) -> AppResult<ChampionRoster> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::ExternalService("offline".into()));
            }
            Ok(ChampionRoster {
                version: "14.20.1".into(),
                champions: vec![Champion {
                    id: "Ahri".into(),
                    key: "103".into(),
                    name: "Ahri".into(),
                }],
            })
        }
    }

    fn config(ttl_secs: u64) -> ChampionConfig {
        ChampionConfig {
            cache_ttl_secs: ttl_secs,
            ..ChampionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_roster_is_cached_until_invalidated() {
        let source = CountingSource::new(false);
        let catalog = ChampionCatalog::new(source.clone(), config(3600));

        assert_eq!(catalog.roster().await.champions.len(), 1);
        catalog.roster().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        catalog.invalidate().await;
        catalog.roster().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_expired_entries_are_refetched() {
        let source = CountingSource::new(false);
        let catalog = ChampionCatalog::new(source.clone(), config(0));

        catalog.roster().await;
        catalog.roster().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_falls_back_without_caching() {
        let source = CountingSource::new(true);
        let catalog = ChampionCatalog::new(source.clone(), config(3600));

        let roster = catalog.roster().await;
        assert_eq!(roster.version, "14.1.1");
        assert!(roster.champions.is_empty());

        catalog.roster().await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_image_url() {
        let catalog = ChampionCatalog::new(CountingSource::new(false), config(3600));
        assert_eq!(
            catalog.image_url("Ahri").await,
            "https://ddragon.leagueoflegends.com/cdn/14.20.1/img/champion/Ahri.png"
        );
        assert_eq!(catalog.image_url("").await, "");
    }
}
