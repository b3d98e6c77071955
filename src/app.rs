use std::collections::BTreeSet;

use crate::models::{Catalog, PluginStatus, Template};
use crate::query::{self, TemplateFilters};

#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Demo library browser state.
pub struct App {
    /// Compatible templates with plugin status, as last loaded.
    pub catalog: Catalog,
    /// Templates matching the current filters, sorted by name.
    pub filtered_templates: Vec<Template>,
    /// Current index in the filtered templates list.
    pub highlighted_index: usize,
    /// Current search input string.
    pub search_query: String,
    pub category: Option<String>,
    pub builder: Option<String>,
    pub input_mode: InputMode,
    /// Whether the catalog is still being fetched.
    pub is_loading: bool,
    pub error: Option<String>,
    pub notification: Option<String>,
    /// Scroll offset for the details pane.
    pub details_scroll: u16,
}

impl App {
    pub fn new() -> Self {
        Self {
            catalog: Catalog::default(),
            filtered_templates: Vec::new(),
            highlighted_index: 0,
            search_query: String::new(),
            category: None,
            builder: None,
            input_mode: InputMode::Normal,
            is_loading: true,
            error: None,
            notification: None,
            details_scroll: 0,
        }
    }

    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        if self
            .category
            .as_ref()
            .is_some_and(|c| !self.categories().contains(c))
        {
            self.category = None;
        }
        if self
            .builder
            .as_ref()
            .is_some_and(|b| !self.builders().contains(b))
        {
            self.builder = None;
        }
        self.is_loading = false;
        self.apply_filter();
    }

    pub fn filters(&self) -> TemplateFilters {
        TemplateFilters {
            category: self.category.clone().unwrap_or_default(),
            builder: self.builder.clone().unwrap_or_default(),
            search: self.search_query.clone(),
        }
        .sanitized()
    }

    pub fn apply_filter(&mut self) {
        let matching = query::query(&self.catalog, &self.filters());
        let mut templates: Vec<Template> = matching.templates.into_values().collect();
        templates.sort_by_key(|t| t.name.to_lowercase());
        self.filtered_templates = templates;

        if self.highlighted_index >= self.filtered_templates.len()
            && !self.filtered_templates.is_empty()
        {
            self.highlighted_index = self.filtered_templates.len() - 1;
        } else if self.filtered_templates.is_empty() {
            self.highlighted_index = 0;
        }
    }

    /// Every category key in the catalog, sorted.
    pub fn categories(&self) -> Vec<String> {
        let keys: BTreeSet<&String> = self
            .catalog
            .templates
            .values()
            .flat_map(|t| t.categories.keys())
            .collect();
        keys.into_iter().cloned().collect()
    }

    /// Every page builder targeted by the catalog, sorted.
    pub fn builders(&self) -> Vec<String> {
        let builders: BTreeSet<&String> = self
            .catalog
            .templates
            .values()
            .map(|t| &t.page_builder)
            .filter(|b| !b.is_empty())
            .collect();
        builders.into_iter().cloned().collect()
    }

    pub fn cycle_category(&mut self) {
        self.category = next_option(&self.categories(), self.category.as_deref());
        self.apply_filter();
    }

    pub fn cycle_builder(&mut self) {
        self.builder = next_option(&self.builders(), self.builder.as_deref());
        self.apply_filter();
    }

    pub fn clear_filters(&mut self) {
        self.category = None;
        self.builder = None;
        self.search_query.clear();
        self.apply_filter();
    }

    pub fn next(&mut self) {
        if !self.filtered_templates.is_empty() {
            self.highlighted_index = (self.highlighted_index + 1) % self.filtered_templates.len();
            self.details_scroll = 0;
        }
    }

    pub fn previous(&mut self) {
        if !self.filtered_templates.is_empty() {
            if self.highlighted_index > 0 {
                self.highlighted_index -= 1;
            } else {
                self.highlighted_index = self.filtered_templates.len() - 1;
            }
            self.details_scroll = 0;
        }
    }

    pub fn get_current_highlighted(&self) -> Option<&Template> {
        self.filtered_templates.get(self.highlighted_index)
    }

    pub fn get_details(&self) -> String {
        let Some(t) = self.get_current_highlighted() else {
            return "No demo highlighted.".to_string();
        };

        let mut details = format!("--- {} ({}) ---\n\n", t.display_name(), t.id);
        let builder = if t.page_builder.is_empty() {
            "any"
        } else {
            t.page_builder.as_str()
        };
        details.push_str(&format!("Page builder: {}\n", builder));

        let categories: Vec<&str> = t.categories.values().map(String::as_str).collect();
        if !categories.is_empty() {
            details.push_str(&format!("Categories:   {}\n", categories.join(", ")));
        }
        if let Some(v) = &t.min_companion_version {
            details.push_str(&format!("Requires Prisma Companion {}\n", v));
        }
        if let Some(v) = &t.min_host_version {
            details.push_str(&format!("Requires Prisma Core {}\n", v));
        }

        details.push_str("\nRequired plugins:\n");
        if t.required_plugins.is_empty() {
            details.push_str("  none\n");
        }
        for plugin in &t.required_plugins {
            let name = if plugin.name.is_empty() {
                &plugin.slug
            } else {
                &plugin.name
            };
            match plugin.status {
                Some(status) => details.push_str(&format!("  {} [{}]\n", name, status.label())),
                None => details.push_str(&format!("  {}\n", name)),
            }
        }
        details
    }

    pub fn get_details_line_count(&self) -> usize {
        self.get_details().lines().count()
    }

    /// Number of highlighted-demo plugins still missing.
    pub fn missing_plugin_count(&self) -> usize {
        self.get_current_highlighted()
            .map(|t| {
                t.required_plugins
                    .iter()
                    .filter(|p| p.status == Some(PluginStatus::NotInstalled))
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Steps through `None -> options[0] -> ... -> options[n-1] -> None`.
fn next_option(options: &[String], current: Option<&str>) -> Option<String> {
    match current {
        None => options.first().cloned(),
        Some(current) => options
            .iter()
            .position(|o| o == current)
            .and_then(|i| options.get(i + 1))
            .cloned(),
    }
}
