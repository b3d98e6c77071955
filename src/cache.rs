use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::compat::{self, RunningVersions};
use crate::error::FetchError;
use crate::models::Catalog;
use crate::transient::TransientStore;

pub const TEMPLATES_KEY: &str = "prisma_companion_demo_templates";
const LAST_GOOD_KEY: &str = "prisma_companion_demo_templates_last_good";

/// How long good catalogs and failure markers are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub error_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::hours(24),
            error_ttl: Duration::days(30),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "state", content = "catalog", rename_all = "snake_case")]
enum CachedCatalog {
    Ready(Catalog),
    Error,
}

/// The demo catalog cache entry, shared by every request in the process.
pub struct CatalogCache {
    store: Arc<TransientStore>,
    policy: CachePolicy,
    running: RunningVersions,
}

impl CatalogCache {
    pub fn new(store: Arc<TransientStore>, policy: CachePolicy, running: RunningVersions) -> Self {
        Self {
            store,
            policy,
            running,
        }
    }

    /// Cached catalog, if the entry is live.
    ///
    /// A live failure marker yields the last good catalog (or an empty one);
    /// `None` means nothing is cached at all.
    pub fn get(&self) -> Option<Catalog> {
        match self.store.get::<CachedCatalog>(TEMPLATES_KEY)? {
            CachedCatalog::Ready(catalog) => Some(catalog),
            CachedCatalog::Error => Some(self.last_good().unwrap_or_default()),
        }
    }

    /// Cached catalog, refreshed through `fetch` on a miss.
    ///
    /// Fetch and parse failures never escape: they store a failure marker and
    /// return the last good catalog, or an empty one.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Catalog
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, FetchError>>,
    {
        if let Some(catalog) = self.get() {
            debug!("Demo catalog served from cache ({} templates)", catalog.len());
            return catalog;
        }

        let parsed = match fetch().await {
            Ok(body) => Catalog::from_manifest(&body).map_err(anyhow::Error::from),
            Err(e) => Err(anyhow::Error::from(e)),
        };

        match parsed {
            Ok(catalog) => {
                let filtered = compat::filter(&catalog, &self.running);
                info!(
                    "Fetched demo catalog: {} templates, {} compatible",
                    catalog.len(),
                    filtered.len()
                );
                self.store_entry(&CachedCatalog::Ready(filtered.clone()), self.policy.ttl);
                if let Err(e) = self.store.set(LAST_GOOD_KEY, &filtered, None) {
                    warn!("Failed to keep last good demo catalog: {:#}", e);
                }
                filtered
            }
            Err(e) => {
                warn!("Demo catalog unavailable: {:#}", e);
                self.store_entry(&CachedCatalog::Error, self.policy.error_ttl);
                self.last_good().unwrap_or_default()
            }
        }
    }

    /// Drops the cache entry regardless of its TTL.
    pub fn invalidate(&self) {
        self.store.delete(TEMPLATES_KEY);
        debug!("Demo catalog cache invalidated");
    }

    fn last_good(&self) -> Option<Catalog> {
        self.store.get(LAST_GOOD_KEY)
    }

    fn store_entry(&self, entry: &CachedCatalog, ttl: Duration) {
        if let Err(e) = self.store.set(TEMPLATES_KEY, entry, Some(ttl)) {
            warn!("Failed to cache demo catalog: {:#}", e);
        }
    }
}
