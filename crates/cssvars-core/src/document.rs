//! In-memory rendering surface.
//!
//! `Document` keeps the root's inline custom properties, a set of addressable
//! elements with their own inline properties, and named style containers
//! holding keyed media rules. Computed reads follow the two rules custom
//! properties need here: an inline declaration wins, and elements inherit
//! from the root. Root values not set inline come from the matching
//! media rule with the largest `min-width`.

use std::fmt::Write as _;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::sink::{MediaRule, StyleSink};

/// Viewport width used when none is configured.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

type Declarations = IndexMap<String, String>;

#[derive(Debug, Clone)]
pub struct Document {
    viewport_width: u32,
    root: Declarations,
    elements: IndexMap<String, Declarations>,
    containers: IndexMap<String, IndexMap<String, Vec<MediaRule>>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH)
    }
}

impl Document {
    pub fn new(viewport_width: u32) -> Self {
        Self {
            viewport_width,
            root: IndexMap::new(),
            elements: IndexMap::new(),
            containers: IndexMap::new(),
        }
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    /// Register an element id. Existing elements keep their declarations.
    pub fn add_element(&mut self, id: impl Into<String>) {
        self.elements.entry(id.into()).or_default();
    }

    pub fn has_element(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Set an inline property on an element, bypassing any registry.
    pub fn set_element_property(&mut self, id: &str, property: &str, value: &str) -> Result<()> {
        let declarations = self
            .elements
            .get_mut(id)
            .ok_or_else(|| Error::UnknownElement(id.to_string()))?;
        declarations.insert(property.to_string(), value.to_string());
        Ok(())
    }

    /// Inline value of a root property, as last written.
    pub fn root_property(&self, property: &str) -> Option<&str> {
        self.root.get(property).map(String::as_str)
    }

    /// Root inline properties in the order they were first set.
    pub fn root_properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.root.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn has_container(&self, id: &str) -> bool {
        self.containers.contains_key(id)
    }

    /// All rules of a container, in key order then rule order.
    pub fn rules(&self, container: &str) -> Vec<&MediaRule> {
        self.containers
            .get(container)
            .map(|keyed| keyed.values().flatten().collect())
            .unwrap_or_default()
    }

    /// Rules stored under one key of a container.
    pub fn rules_for(&self, container: &str, key: &str) -> &[MediaRule] {
        self.containers
            .get(container)
            .and_then(|keyed| keyed.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn root_computed(&self, property: &str) -> String {
        if let Some(value) = self.root.get(property) {
            return value.trim().to_string();
        }

        let mut best: Option<&MediaRule> = None;
        for rule in self.containers.values().flat_map(|keyed| keyed.values().flatten()) {
            if rule.property != property || !rule.matches(self.viewport_width) {
                continue;
            }
            // Later rules win ties, as they would in a stylesheet.
            if best.is_none_or(|b| rule.min_width >= b.min_width) {
                best = Some(rule);
            }
        }

        best.map(|rule| rule.value.trim().to_string())
            .unwrap_or_default()
    }

    /// The root's inline declarations as a `:root` block.
    pub fn root_css(&self) -> String {
        let mut css = String::from(":root {\n");
        for (property, value) in &self.root {
            let _ = writeln!(css, "    {}: {};", property, value);
        }
        css.push_str("}\n");
        css
    }

    /// Every style container, each headed by a comment with its id.
    pub fn stylesheet(&self) -> String {
        let mut css = String::new();
        for (id, keyed) in &self.containers {
            let _ = writeln!(css, "/* #{} */", id);
            for rule in keyed.values().flatten() {
                let _ = writeln!(css, "{}", rule);
            }
        }
        css
    }

    /// Root block followed by the stylesheet.
    pub fn to_css(&self) -> String {
        let mut css = self.root_css();
        let sheet = self.stylesheet();
        if !sheet.is_empty() {
            css.push('\n');
            css.push_str(&sheet);
        }
        css
    }
}

impl StyleSink for Document {
    fn set_property(&mut self, property: &str, value: &str) {
        self.root.insert(property.to_string(), value.to_string());
    }

    fn replace_rules(&mut self, container: &str, key: &str, rules: Vec<MediaRule>) {
        self.containers
            .entry(container.to_string())
            .or_default()
            .insert(key.to_string(), rules);
    }

    fn remove_rules(&mut self, container: &str, key: &str) {
        if let Some(keyed) = self.containers.get_mut(container) {
            keyed.shift_remove(key);
        }
    }

    fn computed_value(&self, element: Option<&str>, property: &str) -> Result<String> {
        let Some(id) = element else {
            return Ok(self.root_computed(property));
        };

        let declarations = self
            .elements
            .get(id)
            .ok_or_else(|| Error::UnknownElement(id.to_string()))?;

        Ok(match declarations.get(property) {
            Some(value) => value.trim().to_string(),
            None => self.root_computed(property),
        })
    }
}

/// A [`Document`] shared between the registry and its readers.
#[derive(Debug, Clone, Default)]
pub struct SharedDocument(Arc<RwLock<Document>>);

impl SharedDocument {
    pub fn new(document: Document) -> Self {
        Self(Arc::new(RwLock::new(document)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.0.write()
    }
}

impl StyleSink for SharedDocument {
    fn set_property(&mut self, property: &str, value: &str) {
        self.0.write().set_property(property, value);
    }

    fn replace_rules(&mut self, container: &str, key: &str, rules: Vec<MediaRule>) {
        self.0.write().replace_rules(container, key, rules);
    }

    fn remove_rules(&mut self, container: &str, key: &str) {
        self.0.write().remove_rules(container, key);
    }

    fn computed_value(&self, element: Option<&str>, property: &str) -> Result<String> {
        self.0.read().computed_value(element, property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responsive_doc(viewport: u32) -> Document {
        let mut doc = Document::new(viewport);
        doc.replace_rules(
            "c",
            "gap",
            vec![
                MediaRule::new(300, "--gap", "4px"),
                MediaRule::new(600, "--gap", "8px"),
            ],
        );
        doc
    }

    #[test]
    fn test_inline_root_value_is_trimmed() {
        let mut doc = Document::default();
        doc.set_property("--a", "  1rem ");
        assert_eq!(doc.computed_value(None, "--a").unwrap(), "1rem");
        assert_eq!(doc.root_property("--a"), Some("  1rem "));
    }

    #[test]
    fn test_unset_property_computes_to_empty() {
        let doc = Document::default();
        assert_eq!(doc.computed_value(None, "--missing").unwrap(), "");
    }

    #[test]
    fn test_media_rules_follow_viewport() {
        assert_eq!(responsive_doc(200).computed_value(None, "--gap").unwrap(), "");
        assert_eq!(responsive_doc(300).computed_value(None, "--gap").unwrap(), "4px");
        assert_eq!(responsive_doc(599).computed_value(None, "--gap").unwrap(), "4px");
        assert_eq!(responsive_doc(1920).computed_value(None, "--gap").unwrap(), "8px");
    }

    #[test]
    fn test_inline_root_beats_media_rules() {
        let mut doc = responsive_doc(1920);
        doc.set_property("--gap", "2px");
        assert_eq!(doc.computed_value(None, "--gap").unwrap(), "2px");
    }

    #[test]
    fn test_elements_inherit_and_override() {
        let mut doc = Document::default();
        doc.set_property("--fg", "#111");
        doc.add_element("card");

        assert_eq!(doc.computed_value(Some("card"), "--fg").unwrap(), "#111");

        doc.set_element_property("card", "--fg", "#222").unwrap();
        assert_eq!(doc.computed_value(Some("card"), "--fg").unwrap(), "#222");
        assert_eq!(doc.computed_value(None, "--fg").unwrap(), "#111");
    }

    #[test]
    fn test_unknown_element_errors() {
        let mut doc = Document::default();
        assert!(matches!(
            doc.computed_value(Some("nope"), "--a"),
            Err(Error::UnknownElement(id)) if id == "nope"
        ));
        assert!(doc.set_element_property("nope", "--a", "1").is_err());
    }

    #[test]
    fn test_replace_rules_overwrites_key() {
        let mut doc = responsive_doc(1024);
        doc.replace_rules("c", "gap", vec![MediaRule::new(900, "--gap", "1px")]);

        assert_eq!(doc.rules("c").len(), 1);
        assert_eq!(doc.rules_for("c", "gap")[0].min_width, 900);
    }

    #[test]
    fn test_remove_rules() {
        let mut doc = responsive_doc(1024);
        doc.remove_rules("c", "gap");
        doc.remove_rules("missing", "gap");

        assert!(doc.rules("c").is_empty());
        assert!(doc.has_container("c"));
        assert!(!doc.has_container("missing"));
    }

    #[test]
    fn test_to_css_layout() {
        let mut doc = responsive_doc(1024);
        doc.set_property("--bg", "#fff");

        let css = doc.to_css();
        assert_eq!(
            css,
            ":root {\n    --bg: #fff;\n}\n\n/* #c */\n\
             @media (min-width: 300px) { :root { --gap: 4px; } }\n\
             @media (min-width: 600px) { :root { --gap: 8px; } }\n"
        );
    }

    #[test]
    fn test_shared_document_sees_sink_writes() {
        let shared = SharedDocument::default();
        let mut sink = shared.clone();
        sink.set_property("--a", "1");

        assert_eq!(shared.read().root_property("--a"), Some("1"));
        assert_eq!(shared.computed_value(None, "--a").unwrap(), "1");
    }
}
