//! Theme definitions.
//!
//! A theme maps variable names to either a single value or a set of
//! breakpoints (minimum viewport width -> value). Definitions keep the order
//! they were inserted in, which is the order a theme applies them in.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Values keyed by minimum viewport width, ascending. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoints(BTreeMap<u32, String>);

impl Breakpoints {
    /// Build a breakpoint map; fails when `entries` is empty.
    ///
    /// A width given twice keeps its last value.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let map: BTreeMap<u32, String> = entries.into_iter().map(|(w, v)| (w, v.into())).collect();
        if map.is_empty() {
            return Err(Error::EmptyBreakpoints);
        }
        Ok(Self(map))
    }

    /// The smallest width and its value, applied outside any media query.
    pub fn base(&self) -> (u32, &str) {
        self.0
            .first_key_value()
            .map(|(w, v)| (*w, v.as_str()))
            .expect("breakpoint maps are never empty")
    }

    /// Every breakpoint in ascending width order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.0.iter().map(|(w, v)| (*w, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse a breakpoint key such as `600` or `600px`.
pub fn parse_width(key: &str) -> Option<u32> {
    let key = key.trim();
    key.strip_suffix("px").unwrap_or(key).trim().parse().ok()
}

impl Serialize for Breakpoints {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (width, value) in &self.0 {
            map.serialize_entry(&width.to_string(), value)?;
        }
        map.end()
    }
}

/// One variable of a theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarDefinition {
    Static(String),
    Responsive(Breakpoints),
}

impl VarDefinition {
    pub fn is_responsive(&self) -> bool {
        matches!(self, VarDefinition::Responsive(_))
    }

    /// Every raw value this definition holds.
    pub fn values(&self) -> Vec<&str> {
        match self {
            VarDefinition::Static(value) => vec![value.as_str()],
            VarDefinition::Responsive(bps) => bps.iter().map(|(_, v)| v).collect(),
        }
    }
}

impl From<&str> for VarDefinition {
    fn from(value: &str) -> Self {
        VarDefinition::Static(value.to_string())
    }
}

impl From<String> for VarDefinition {
    fn from(value: String) -> Self {
        VarDefinition::Static(value)
    }
}

impl From<Breakpoints> for VarDefinition {
    fn from(value: Breakpoints) -> Self {
        VarDefinition::Responsive(value)
    }
}

impl Serialize for VarDefinition {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            VarDefinition::Static(value) => serializer.serialize_str(value),
            VarDefinition::Responsive(bps) => bps.serialize(serializer),
        }
    }
}

struct VarDefinitionVisitor;

impl<'de> Visitor<'de> for VarDefinitionVisitor {
    type Value = VarDefinition;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string value or a table of breakpoint widths to values")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> std::result::Result<Self::Value, E> {
        Ok(VarDefinition::Static(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> std::result::Result<Self::Value, E> {
        Ok(VarDefinition::Static(value))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some((key, value)) = access.next_entry::<String, String>()? {
            let width = parse_width(&key).ok_or_else(|| {
                de::Error::custom(format!(
                    "invalid breakpoint '{}', expected a width in pixels like 600 or \"600px\"",
                    key
                ))
            })?;
            entries.push((width, value));
        }
        Breakpoints::new(entries)
            .map(VarDefinition::Responsive)
            .map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for VarDefinition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(VarDefinitionVisitor)
    }
}

/// Ordered variable definitions of one theme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeDefinition(IndexMap<String, VarDefinition>);

impl ThemeDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, definition: impl Into<VarDefinition>) -> Self {
        self.insert(name, definition);
        self
    }

    /// Insert or replace a definition. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, definition: impl Into<VarDefinition>) {
        self.0.insert(name.into(), definition.into());
    }

    pub fn get(&self, name: &str) -> Option<&VarDefinition> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VarDefinition)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Single-value entries, in insertion order.
    pub fn statics(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter_map(|(name, def)| match def {
            VarDefinition::Static(value) => Some((name, value.as_str())),
            VarDefinition::Responsive(_) => None,
        })
    }

    /// Breakpoint entries, in insertion order.
    pub fn responsive(&self) -> impl Iterator<Item = (&str, &Breakpoints)> {
        self.iter().filter_map(|(name, def)| match def {
            VarDefinition::Responsive(bps) => Some((name, bps)),
            VarDefinition::Static(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<VarDefinition>> FromIterator<(K, V)> for ThemeDefinition {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut theme = ThemeDefinition::new();
        for (name, definition) in iter {
            theme.insert(name, definition);
        }
        theme
    }
}
