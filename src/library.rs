use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::{Endpoint, ManifestClient};
use crate::cache::CatalogCache;
use crate::config::Config;
use crate::deps::{self, DirectoryRegistry, PluginRegistry};
use crate::error::RequestError;
use crate::models::{Catalog, Template};
use crate::query::{self, TemplateFilters};
use crate::recommended::{PluginMap, RecommendedPlugins};
use crate::security::{Capability, NonceRegistry, Requester};
use crate::transient::TransientStore;

pub const FILTER_NONCE_ACTION: &str = "prisma_core_nonce";
pub const REFRESH_NONCE_ACTION: &str = "refresh_templates";
pub const LIBRARY_VIEW: &str = "admin.php?page=prisma-core-demo-library";

/// A demo filter request as it arrives at the boundary.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub requester: Requester,
    pub nonce: Option<String>,
    /// `None` when the request carried no filters at all.
    pub filters: Option<TemplateFilters>,
}

/// Envelope sent back to the filter caller.
#[derive(Debug, Clone, Serialize)]
pub struct AjaxResponse {
    pub success: bool,
    pub data: AjaxPayload,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AjaxPayload {
    Templates(BTreeMap<String, Template>),
    Error { message: String, code: String },
}

impl AjaxResponse {
    fn success(catalog: Catalog) -> Self {
        Self {
            success: true,
            data: AjaxPayload::Templates(catalog.templates),
        }
    }

    fn error(err: RequestError) -> Self {
        Self {
            success: false,
            data: AjaxPayload::Error {
                message: err.to_string(),
                code: err.code().to_string(),
            },
        }
    }
}

/// Result of the refresh trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache cleared; the caller should show this view.
    Redirect(String),
    /// Missing or invalid token; nothing was touched.
    Ignored,
}

/// The demo library service: one per process, shared by every request.
pub struct DemoLibrary {
    client: ManifestClient,
    endpoint: Endpoint,
    cache: CatalogCache,
    registry: Option<Box<dyn PluginRegistry>>,
    recommended: RecommendedPlugins,
    nonces: NonceRegistry,
}

impl DemoLibrary {
    pub fn new(
        client: ManifestClient,
        endpoint: Endpoint,
        cache: CatalogCache,
        registry: Option<Box<dyn PluginRegistry>>,
        recommended: RecommendedPlugins,
    ) -> Self {
        Self {
            client,
            endpoint,
            cache,
            registry,
            recommended,
            nonces: NonceRegistry::default(),
        }
    }

    /// Wires the service from configuration and a transient store.
    pub fn from_config(config: &Config, store: Arc<TransientStore>) -> Result<Self> {
        let running = config.environment.running_versions()?;
        let client = ManifestClient::new(&running.host.to_string())?;

        let registry: Option<Box<dyn PluginRegistry>> =
            config.environment.plugins_dir.as_ref().map(|dir| {
                Box::new(DirectoryRegistry::new(
                    dir.clone(),
                    config.environment.active_plugins.iter().cloned(),
                )) as Box<dyn PluginRegistry>
            });
        if registry.is_none() {
            debug!("No plugins directory configured; plugin status will be omitted");
        }

        let cache = CatalogCache::new(store.clone(), config.library.policy(), running);
        let recommended = RecommendedPlugins::new(
            config.recommended.endpoint(),
            store,
            chrono::Duration::days(config.recommended.ttl_days),
            chrono::Duration::days(config.recommended.error_ttl_days),
        );

        Ok(Self::new(
            client,
            config.library.endpoint(),
            cache,
            registry,
            recommended,
        ))
    }

    pub fn nonces(&self) -> &NonceRegistry {
        &self.nonces
    }

    pub fn registry(&self) -> Option<&dyn PluginRegistry> {
        self.registry.as_deref()
    }

    /// Compatible templates with live plugin status.
    pub async fn templates(&self) -> Catalog {
        let catalog = self
            .cache
            .get_or_refresh(|| self.client.fetch(&self.endpoint))
            .await;

        let registry = self.registry();
        Catalog {
            templates: catalog
                .templates
                .iter()
                .map(|(id, template)| (id.clone(), deps::resolve(template, registry)))
                .collect(),
            captured_at: catalog.captured_at,
        }
    }

    /// Handles a filter request from the library view.
    pub async fn filter_templates(&self, request: FilterRequest) -> AjaxResponse {
        if let Err(e) = self.authorize(&request) {
            debug!("Filter request rejected: {}", e);
            return AjaxResponse::error(e);
        }

        let templates = self.templates().await;
        match request.filters {
            None => AjaxResponse::success(templates),
            Some(filters) => {
                let filters = filters.sanitized();
                AjaxResponse::success(query::query(&templates, &filters))
            }
        }
    }

    /// Clears the catalog cache when `token` is a valid refresh nonce.
    pub fn refresh_templates(&self, token: Option<&str>) -> RefreshOutcome {
        match token {
            Some(token) if self.nonces.consume(REFRESH_NONCE_ACTION, token) => {
                self.cache.invalidate();
                info!("Demo templates refresh requested");
                RefreshOutcome::Redirect(LIBRARY_VIEW.to_string())
            }
            _ => RefreshOutcome::Ignored,
        }
    }

    pub async fn recommended_plugins(&self, defaults: PluginMap) -> PluginMap {
        self.recommended.fetch_or_default(&self.client, defaults).await
    }

    fn authorize(&self, request: &FilterRequest) -> Result<(), RequestError> {
        let nonce_ok = request
            .nonce
            .as_deref()
            .is_some_and(|token| self.nonces.verify(FILTER_NONCE_ACTION, token));
        if !nonce_ok {
            return Err(RequestError::InvalidNonce);
        }
        if !request.requester.can(Capability::ManageOptions) {
            return Err(RequestError::PermissionDenied);
        }
        Ok(())
    }
}
