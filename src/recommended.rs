use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{Endpoint, ManifestClient};
use crate::transient::TransientStore;

pub const RECOMMENDED_KEY: &str = "prisma_core_check_plugin_update";

/// A plugin the theme suggests installing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedPlugin {
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Recommended plugins keyed by slug.
pub type PluginMap = BTreeMap<String, RecommendedPlugin>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "state", content = "plugins", rename_all = "snake_case")]
enum CachedPlugins {
    Ready(PluginMap),
    Error,
}

/// Remote list of recommended plugins, cached independently of the demo catalog.
pub struct RecommendedPlugins {
    endpoint: Endpoint,
    store: Arc<TransientStore>,
    ttl: Duration,
    error_ttl: Duration,
}

impl RecommendedPlugins {
    pub fn new(
        endpoint: Endpoint,
        store: Arc<TransientStore>,
        ttl: Duration,
        error_ttl: Duration,
    ) -> Self {
        Self {
            endpoint,
            store,
            ttl,
            error_ttl,
        }
    }

    /// Remote recommendations, or `defaults` while the endpoint is unusable.
    pub async fn fetch_or_default(
        &self,
        client: &ManifestClient,
        defaults: PluginMap,
    ) -> PluginMap {
        match self.store.get::<CachedPlugins>(RECOMMENDED_KEY) {
            Some(CachedPlugins::Ready(plugins)) => return plugins,
            Some(CachedPlugins::Error) => {
                debug!("Recommended plugins endpoint marked unavailable, using defaults");
                return defaults;
            }
            None => {}
        }

        let body = match client.fetch(&self.endpoint).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Recommended plugins unavailable: {}", e);
                self.remember(&CachedPlugins::Error, self.error_ttl);
                return defaults;
            }
        };

        match serde_json::from_str::<PluginMap>(&body) {
            Ok(plugins) if !plugins.is_empty() => {
                self.remember(&CachedPlugins::Ready(plugins.clone()), self.ttl);
                plugins
            }
            Ok(_) => {
                warn!("Recommended plugins endpoint returned nothing");
                self.remember(&CachedPlugins::Error, self.error_ttl);
                defaults
            }
            Err(e) => {
                warn!("Malformed recommended plugins response: {}", e);
                self.remember(&CachedPlugins::Error, self.error_ttl);
                defaults
            }
        }
    }

    fn remember(&self, entry: &CachedPlugins, ttl: Duration) {
        if let Err(e) = self.store.set(RECOMMENDED_KEY, entry, Some(ttl)) {
            warn!("Failed to cache recommended plugins: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> PluginMap {
        let mut map = PluginMap::new();
        map.insert(
            "wpforms-lite".into(),
            RecommendedPlugin {
                name: "WPForms Lite".into(),
                extra: Map::new(),
            },
        );
        map
    }

    fn service(server: &mockito::ServerGuard, store: Arc<TransientStore>) -> RecommendedPlugins {
        RecommendedPlugins::new(
            Endpoint {
                url: format!("{}/wp-json/api/v1/plugins", server.url()),
                timeout: std::time::Duration::from_secs(5),
            },
            store,
            Duration::days(3),
            Duration::days(30),
        )
    }

    #[tokio::test]
    async fn remote_list_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/wp-json/api/v1/plugins")
            .with_status(200)
            .with_body(r#"{"elementor": {"name": "Elementor", "description": "Builder"}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = ManifestClient::new("1.0.0").unwrap();
        let plugins = service(&server, Arc::new(TransientStore::in_memory()));

        let first = plugins.fetch_or_default(&client, defaults()).await;
        let second = plugins.fetch_or_default(&client, defaults()).await;

        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["elementor"]);
        assert_eq!(first, second);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_falls_back_without_retrying() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/wp-json/api/v1/plugins")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = ManifestClient::new("1.0.0").unwrap();
        let plugins = service(&server, Arc::new(TransientStore::in_memory()));

        assert_eq!(plugins.fetch_or_default(&client, defaults()).await, defaults());
        assert_eq!(plugins.fetch_or_default(&client, defaults()).await, defaults());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_response_is_treated_as_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/wp-json/api/v1/plugins")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = ManifestClient::new("1.0.0").unwrap();
        let store = Arc::new(TransientStore::in_memory());
        let plugins = service(&server, store.clone());

        assert_eq!(plugins.fetch_or_default(&client, defaults()).await, defaults());
        assert!(store.get::<CachedPlugins>(RECOMMENDED_KEY).is_some());
    }
}
