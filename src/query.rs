use serde::Deserialize;

use crate::models::{Catalog, Template};

/// Filter fields of a demo-library request. Empty fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TemplateFilters {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub builder: String,
    #[serde(default, alias = "s")]
    pub search: String,
}

impl TemplateFilters {
    /// Cleans every field the way untrusted text input is cleaned at the boundary.
    pub fn sanitized(self) -> Self {
        Self {
            category: sanitize_text(&self.category),
            builder: sanitize_text(&self.builder),
            search: sanitize_text(&self.search),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_empty() && self.builder.is_empty() && self.search.is_empty()
    }

    pub fn matches(&self, template: &Template) -> bool {
        if !self.category.is_empty() && !template.categories.contains_key(&self.category) {
            return false;
        }
        if !self.builder.is_empty() && template.page_builder != self.builder {
            return false;
        }
        if !self.search.is_empty()
            && !template
                .name
                .to_lowercase()
                .contains(&self.search.to_lowercase())
        {
            return false;
        }
        true
    }
}

/// Subset of `catalog` matching every non-empty filter field.
pub fn query(catalog: &Catalog, filters: &TemplateFilters) -> Catalog {
    if filters.is_empty() {
        return catalog.clone();
    }
    catalog.retain_cloned(|template| filters.matches(template))
}

/// Strips markup and control characters, then collapses whitespace.
pub fn sanitize_text(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut in_tag = false;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' if !in_tag && chars.peek().is_some_and(|n| opens_tag(*n)) => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            c if c.is_control() => stripped.push(' '),
            c => stripped.push(c),
        }
    }
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A `<` only starts markup when followed by a tag name, `/` or `!`.
fn opens_tag(next: char) -> bool {
    next.is_ascii_alphabetic() || next == '/' || next == '!'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{catalog, template};

    fn categorized(id: &str, category: &str) -> Template {
        let mut t = template(id, id);
        t.categories.insert(category.to_string(), category.to_string());
        t
    }

    #[test]
    fn category_is_exact_key_match() {
        let cat = catalog(vec![categorized("A", "blog"), categorized("B", "shop")]);
        let filters = TemplateFilters {
            category: "blog".into(),
            builder: String::new(),
            search: String::new(),
        };

        let result = query(&cat, &filters);
        assert_eq!(result.templates.keys().collect::<Vec<_>>(), vec!["A"]);

        let partial = TemplateFilters {
            category: "blo".into(),
            ..Default::default()
        };
        assert!(query(&cat, &partial).is_empty());
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let cat = catalog(vec![
            template("posts", "My Posts Page"),
            template("shop", "Shop Layout"),
        ]);
        let filters = TemplateFilters {
            search: "Post".into(),
            ..Default::default()
        };
        let result = query(&cat, &filters);
        assert_eq!(result.templates.keys().collect::<Vec<_>>(), vec!["posts"]);

        let lower = TemplateFilters {
            search: "LAYOUT".into(),
            ..Default::default()
        };
        assert_eq!(query(&cat, &lower).templates.keys().collect::<Vec<_>>(), vec!["shop"]);
    }

    #[test]
    fn filters_compose_with_and() {
        let mut a = categorized("a", "blog");
        a.page_builder = "elementor".into();
        let mut b = categorized("b", "blog");
        b.page_builder = "gutenberg".into();
        let cat = catalog(vec![a, b, categorized("c", "shop")]);

        let filters = TemplateFilters {
            category: "blog".into(),
            builder: "gutenberg".into(),
            search: String::new(),
        };
        assert_eq!(query(&cat, &filters).templates.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn no_filters_returns_everything() {
        let cat = catalog(vec![template("a", "A"), template("b", "B")]);
        assert_eq!(query(&cat, &TemplateFilters::default()), cat);
    }

    #[test]
    fn payload_accepts_short_search_key() {
        let filters: TemplateFilters =
            serde_json::from_str(r#"{"category": "blog", "s": "post"}"#).unwrap();
        assert_eq!(filters.search, "post");
        assert!(filters.builder.is_empty());
    }

    #[test]
    fn sanitizes_markup_and_whitespace() {
        assert_eq!(sanitize_text("  <b>My</b>\n\tPosts  "), "My Posts");
        assert_eq!(sanitize_text("<script>x</script>shop"), "xshop");
        assert_eq!(sanitize_text("plain"), "plain");
        assert_eq!(sanitize_text("<!-- note -->kept"), "kept");
    }

    #[test]
    fn lone_less_than_is_kept_as_text() {
        assert_eq!(sanitize_text("a < b"), "a < b");
        assert_eq!(sanitize_text("<3 posts"), "<3 posts");
        assert_eq!(sanitize_text("x<"), "x<");
    }
}
