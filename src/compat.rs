use semver::Version;

use crate::models::{Catalog, Template};

/// Versions of the companion plugin and host theme actually running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningVersions {
    pub companion: Version,
    pub host: Version,
}

impl RunningVersions {
    pub fn supports(&self, template: &Template) -> bool {
        let companion_ok = template
            .min_companion_version
            .as_ref()
            .is_none_or(|min| self.companion >= *min);
        let host_ok = template
            .min_host_version
            .as_ref()
            .is_none_or(|min| self.host >= *min);
        companion_ok && host_ok
    }
}

/// Drops templates that need a newer companion plugin or host theme.
pub fn filter(catalog: &Catalog, running: &RunningVersions) -> Catalog {
    catalog.retain_cloned(|template| running.supports(template))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{catalog, template};

    fn running(companion: &str, host: &str) -> RunningVersions {
        RunningVersions {
            companion: Version::parse(companion).unwrap(),
            host: Version::parse(host).unwrap(),
        }
    }

    fn requires_companion(id: &str, min: &str) -> Template {
        let mut t = template(id, id);
        t.min_companion_version = Some(Version::parse(min).unwrap());
        t
    }

    #[test]
    fn companion_minimum_is_inclusive() {
        let cat = catalog(vec![requires_companion("a", "2.0.0")]);

        assert!(filter(&cat, &running("1.9.0", "1.0.0")).is_empty());
        assert_eq!(filter(&cat, &running("2.0.0", "1.0.0")).len(), 1);
        assert_eq!(filter(&cat, &running("2.3.1", "1.0.0")).len(), 1);
    }

    #[test]
    fn compares_numerically_not_lexically() {
        let cat = catalog(vec![requires_companion("a", "1.10.0")]);
        assert!(filter(&cat, &running("1.9.0", "1.0.0")).is_empty());
        assert_eq!(filter(&cat, &running("1.10.0", "1.0.0")).len(), 1);
    }

    #[test]
    fn host_minimum_and_unconstrained_templates() {
        let mut needs_host = template("host", "Host");
        needs_host.min_host_version = Some(Version::new(3, 0, 0));
        let cat = catalog(vec![needs_host, template("free", "Free")]);

        let result = filter(&cat, &running("1.0.0", "2.5.0"));
        assert_eq!(result.templates.keys().collect::<Vec<_>>(), vec!["free"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let mut both = requires_companion("both", "1.0.0");
        both.min_host_version = Some(Version::new(9, 0, 0));
        let cat = catalog(vec![
            requires_companion("old", "0.5.0"),
            requires_companion("new", "5.0.0"),
            both,
            template("plain", "Plain"),
        ]);
        let versions = running("1.2.0", "2.0.0");

        let once = filter(&cat, &versions);
        let twice = filter(&once, &versions);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }
}
