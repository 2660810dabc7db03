//! Rendering targets for the registry.
//!
//! The registry never inspects its environment. It is handed a [`StyleSink`]
//! at construction time and writes every root property and generated rule
//! through it. [`NoopSink`] stands in when there is no rendering surface;
//! [`Document`](crate::Document) is an in-memory one.

use std::fmt;

use crate::error::{Error, Result};

/// A `@media (min-width: ..)` rule assigning one root custom property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRule {
    /// Minimum viewport width in pixels.
    pub min_width: u32,
    /// Full custom-property name, including the leading `--`.
    pub property: String,
    pub value: String,
}

impl MediaRule {
    pub fn new(min_width: u32, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            min_width,
            property: property.into(),
            value: value.into(),
        }
    }

    /// Whether the rule applies at the given viewport width.
    pub fn matches(&self, viewport_width: u32) -> bool {
        viewport_width >= self.min_width
    }
}

impl fmt::Display for MediaRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@media (min-width: {}px) {{ :root {{ {}: {}; }} }}",
            self.min_width, self.property, self.value
        )
    }
}

/// Capability interface for a style surface.
///
/// `container` names a style container (created by the sink on first use);
/// `key` identifies one rule set inside it. Replacing a key drops whatever
/// rules it held before.
pub trait StyleSink {
    /// Set a custom property on the document root.
    fn set_property(&mut self, property: &str, value: &str);

    /// Replace the rules stored under `key` in `container`.
    fn replace_rules(&mut self, container: &str, key: &str, rules: Vec<MediaRule>);

    /// Drop the rules stored under `key` in `container`, if any.
    fn remove_rules(&mut self, container: &str, key: &str);

    /// Read the rendered value of `property` on `element` (`None` = root).
    fn computed_value(&self, element: Option<&str>, property: &str) -> Result<String>;
}

/// Sink for hosts without a rendering surface.
///
/// Writes are dropped and computed reads fail with
/// [`Error::MissingContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl StyleSink for NoopSink {
    fn set_property(&mut self, _property: &str, _value: &str) {}

    fn replace_rules(&mut self, _container: &str, _key: &str, _rules: Vec<MediaRule>) {}

    fn remove_rules(&mut self, _container: &str, _key: &str) {}

    fn computed_value(&self, _element: Option<&str>, property: &str) -> Result<String> {
        Err(Error::MissingContext(property.to_string()))
    }
}

impl<S: StyleSink + ?Sized> StyleSink for Box<S> {
    fn set_property(&mut self, property: &str, value: &str) {
        (**self).set_property(property, value);
    }

    fn replace_rules(&mut self, container: &str, key: &str, rules: Vec<MediaRule>) {
        (**self).replace_rules(container, key, rules);
    }

    fn remove_rules(&mut self, container: &str, key: &str) {
        (**self).remove_rules(container, key);
    }

    fn computed_value(&self, element: Option<&str>, property: &str) -> Result<String> {
        (**self).computed_value(element, property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_rule_css() {
        let rule = MediaRule::new(600, "--font-size", "2rem");
        assert_eq!(
            rule.to_string(),
            "@media (min-width: 600px) { :root { --font-size: 2rem; } }"
        );
    }

    #[test]
    fn test_media_rule_matches_inclusive() {
        let rule = MediaRule::new(600, "--x", "1");
        assert!(!rule.matches(599));
        assert!(rule.matches(600));
        assert!(rule.matches(1200));
    }

    #[test]
    fn test_noop_sink_has_no_computed_values() {
        let mut sink = NoopSink;
        sink.set_property("--a", "1");
        let err = sink.computed_value(None, "--a").unwrap_err();
        assert!(matches!(err, Error::MissingContext(p) if p == "--a"));
    }

    #[test]
    fn test_boxed_sink_forwards() {
        let mut sink: Box<dyn StyleSink> = Box::new(NoopSink);
        sink.replace_rules("c", "k", vec![MediaRule::new(1, "--a", "b")]);
        assert!(sink.computed_value(Some("el"), "--a").is_err());
    }
}
