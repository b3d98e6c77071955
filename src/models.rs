use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::CatalogError;
use crate::version;

/// Install state of a required plugin, derived at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    Active,
    Installed,
    NotInstalled,
}

impl PluginStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PluginStatus::Active => "active",
            PluginStatus::Installed => "installed",
            PluginStatus::NotInstalled => "not installed",
        }
    }
}

/// A plugin a demo needs before it can be imported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginReference {
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PluginStatus>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One demo (starter site) entry of the remote manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Category key to display label.
    #[serde(default, deserialize_with = "deserialize_categories")]
    pub categories: BTreeMap<String, String>,
    #[serde(rename = "page-builder", default)]
    pub page_builder: String,
    #[serde(
        rename = "prisma-companion-version",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "version::deserialize_opt"
    )]
    pub min_companion_version: Option<Version>,
    #[serde(
        rename = "prisma-core-theme-version",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "version::deserialize_opt"
    )]
    pub min_host_version: Option<Version>,
    #[serde(rename = "plugins", default)]
    pub required_plugins: Vec<PluginReference>,
    /// Manifest fields this crate does not interpret (screenshots, URLs, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Template {
    /// The manifest name, or the id for entries that omit one.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CategoriesRepr {
    Labeled(BTreeMap<String, String>),
    Keys(Vec<String>),
}

fn deserialize_categories<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<CategoriesRepr>::deserialize(deserializer)? {
        None => BTreeMap::new(),
        Some(CategoriesRepr::Labeled(map)) => map,
        Some(CategoriesRepr::Keys(keys)) => keys.into_iter().map(|k| (k.clone(), k)).collect(),
    })
}

/// Snapshot of the demo manifest, keyed by template id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub templates: BTreeMap<String, Template>,
    pub captured_at: DateTime<Utc>,
}

impl Catalog {
    /// Parses a manifest body: a JSON object keyed by template id.
    ///
    /// The object key always wins over an `id` field inside the entry.
    pub fn from_manifest(body: &str) -> Result<Self, CatalogError> {
        let raw: BTreeMap<String, Template> = serde_json::from_str(body)?;
        if raw.is_empty() {
            return Err(CatalogError::Empty);
        }

        let templates = raw
            .into_iter()
            .map(|(id, mut template)| {
                template.id = id.clone();
                (id, template)
            })
            .collect();

        Ok(Self {
            templates,
            captured_at: Utc::now(),
        })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Copy of this catalog holding only the templates `keep` accepts.
    pub fn retain_cloned<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&Template) -> bool,
    {
        Self {
            templates: self
                .templates
                .iter()
                .filter(|(_, t)| keep(t))
                .map(|(id, t)| (id.clone(), t.clone()))
                .collect(),
            captured_at: self.captured_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "agency": {
            "name": "Agency",
            "categories": {"business": "Business", "blog": "Blog"},
            "page-builder": "elementor",
            "prisma-companion-version": "1.1",
            "screenshot": "https://example.com/agency.jpg",
            "plugins": [
                {"slug": "elementor", "name": "Elementor", "required": true}
            ]
        },
        "minimal": {
            "name": "Minimal Blog",
            "categories": ["blog"]
        }
    }"#;

    #[test]
    fn parses_manifest_entries() {
        let catalog = Catalog::from_manifest(MANIFEST).unwrap();
        assert_eq!(catalog.len(), 2);

        let agency = &catalog.templates["agency"];
        assert_eq!(agency.id, "agency");
        assert_eq!(agency.page_builder, "elementor");
        assert_eq!(agency.min_companion_version, Some(Version::new(1, 1, 0)));
        assert!(agency.min_host_version.is_none());
        assert_eq!(agency.categories.get("blog").map(String::as_str), Some("Blog"));
        assert_eq!(agency.required_plugins[0].slug, "elementor");
        assert_eq!(agency.required_plugins[0].extra["required"], Value::Bool(true));
        assert!(agency.extra.contains_key("screenshot"));

        let minimal = &catalog.templates["minimal"];
        assert!(minimal.categories.contains_key("blog"));
        assert!(minimal.required_plugins.is_empty());
    }

    #[test]
    fn rejects_empty_and_malformed_manifests() {
        assert!(matches!(Catalog::from_manifest("{}"), Err(CatalogError::Empty)));
        assert!(matches!(
            Catalog::from_manifest("<html>oops</html>"),
            Err(CatalogError::Malformed(_))
        ));
        assert!(matches!(
            Catalog::from_manifest("[1, 2, 3]"),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[test]
    fn malformed_version_rejects_whole_manifest() {
        let body = r#"{"a": {"name": "A", "prisma-core-theme-version": "soon"}}"#;
        assert!(matches!(
            Catalog::from_manifest(body),
            Err(CatalogError::Malformed(_))
        ));
    }

    #[test]
    fn loose_entries_keep_their_siblings() {
        let body = r#"{
            "good": {"name": "Good", "prisma-companion-version": "1.0.0"},
            "four": {"name": "Four", "prisma-core-theme-version": "1.0.0.1"},
            "number": {"name": "Number", "prisma-companion-version": 1.1},
            "nameless": {"page-builder": "gutenberg"}
        }"#;
        let catalog = Catalog::from_manifest(body).unwrap();
        assert_eq!(catalog.len(), 4);

        let four = catalog.templates["four"].min_host_version.clone().unwrap();
        assert!(four > Version::new(1, 0, 0));
        assert!(four < Version::new(1, 0, 1));
        assert_eq!(
            catalog.templates["number"].min_companion_version,
            Some(Version::new(1, 1, 0))
        );
        assert_eq!(catalog.templates["nameless"].name, "");
        assert_eq!(catalog.templates["nameless"].display_name(), "nameless");
        assert_eq!(catalog.templates["good"].display_name(), "Good");
        assert_eq!(catalog.templates["nameless"].page_builder, "gutenberg");
        assert!(catalog.templates.contains_key("good"));
    }

    #[test]
    fn status_is_omitted_until_resolved() {
        let plugin = fixtures::plugin("wpforms-lite");
        let json = serde_json::to_value(&plugin).unwrap();
        assert!(json.get("status").is_none());

        let resolved = PluginReference {
            status: Some(PluginStatus::NotInstalled),
            ..plugin
        };
        let json = serde_json::to_value(&resolved).unwrap();
        assert_eq!(json["status"], "not_installed");
    }
}
