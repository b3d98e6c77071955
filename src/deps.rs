use std::collections::HashSet;
use std::path::PathBuf;

use crate::models::{PluginReference, PluginStatus, Template};

/// Host capability that knows which plugins are installed and active.
pub trait PluginRegistry: Send + Sync {
    fn is_activated(&self, slug: &str) -> bool;
    fn is_installed(&self, slug: &str) -> bool;
}

pub fn plugin_status(registry: &dyn PluginRegistry, slug: &str) -> PluginStatus {
    if registry.is_activated(slug) {
        PluginStatus::Active
    } else if registry.is_installed(slug) {
        PluginStatus::Installed
    } else {
        PluginStatus::NotInstalled
    }
}

/// Copy of `template` with each required plugin annotated with its live status.
///
/// Without a registry the plugin list is returned unannotated.
pub fn resolve(template: &Template, registry: Option<&dyn PluginRegistry>) -> Template {
    let mut resolved = template.clone();
    if let Some(registry) = registry {
        resolved.required_plugins = template
            .required_plugins
            .iter()
            .map(|plugin| PluginReference {
                status: Some(plugin_status(registry, &plugin.slug)),
                ..plugin.clone()
            })
            .collect();
    }
    resolved
}

/// Registry over a plugins directory: one subdirectory per installed slug.
pub struct DirectoryRegistry {
    plugins_dir: PathBuf,
    active: HashSet<String>,
}

impl DirectoryRegistry {
    pub fn new(plugins_dir: PathBuf, active: impl IntoIterator<Item = String>) -> Self {
        Self {
            plugins_dir,
            active: active.into_iter().collect(),
        }
    }
}

impl PluginRegistry for DirectoryRegistry {
    fn is_activated(&self, slug: &str) -> bool {
        self.active.contains(slug) && self.is_installed(slug)
    }

    fn is_installed(&self, slug: &str) -> bool {
        !slug.is_empty() && !slug.contains(['/', '\\']) && self.plugins_dir.join(slug).is_dir()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::fixtures::{plugin, template};
    use std::fs;
    use tempfile::TempDir;

    /// Registry with fixed answers.
    pub struct StaticRegistry {
        pub active: Vec<&'static str>,
        pub installed: Vec<&'static str>,
    }

    impl PluginRegistry for StaticRegistry {
        fn is_activated(&self, slug: &str) -> bool {
            self.active.contains(&slug)
        }

        fn is_installed(&self, slug: &str) -> bool {
            self.installed.contains(&slug)
        }
    }

    fn demo() -> Template {
        let mut t = template("demo", "Demo");
        t.required_plugins = vec![plugin("a"), plugin("x"), plugin("z")];
        t
    }

    #[test]
    fn annotates_three_states() {
        let registry = StaticRegistry {
            active: vec!["a"],
            installed: vec!["a", "x"],
        };
        let resolved = resolve(&demo(), Some(&registry));
        let statuses: Vec<_> = resolved
            .required_plugins
            .iter()
            .map(|p| p.status)
            .collect();

        assert_eq!(
            statuses,
            vec![
                Some(PluginStatus::Active),
                Some(PluginStatus::Installed),
                Some(PluginStatus::NotInstalled)
            ]
        );
    }

    #[test]
    fn missing_registry_leaves_plugins_unannotated() {
        let original = demo();
        let resolved = resolve(&original, None);
        assert_eq!(resolved, original);
        assert!(resolved.required_plugins.iter().all(|p| p.status.is_none()));
    }

    #[test]
    fn directory_registry_reads_plugin_folders() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("elementor")).unwrap();
        fs::create_dir(dir.path().join("wpforms-lite")).unwrap();

        let registry = DirectoryRegistry::new(
            dir.path().to_path_buf(),
            vec!["elementor".to_string(), "ghost".to_string()],
        );

        assert_eq!(plugin_status(&registry, "elementor"), PluginStatus::Active);
        assert_eq!(plugin_status(&registry, "wpforms-lite"), PluginStatus::Installed);
        assert_eq!(plugin_status(&registry, "ghost"), PluginStatus::NotInstalled);
        assert!(!registry.is_installed("../elementor"));
    }
}
