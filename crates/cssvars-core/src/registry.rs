//! The custom-property registry.
//!
//! `VariableRegistry` owns the resolved value of every variable, the table of
//! defined themes and the name of the active theme. Values may embed
//! `CssVars.get('name', 'fallback')` calls; these are resolved once, when the
//! value is set, against whatever the registry holds at that moment.
//!
//! Every write is mirrored to the [`StyleSink`] the registry was built with.
//! Responsive theme entries also produce `min-width` media rules, stored in
//! the sink's style container under the variable's property name so that
//! re-applying a theme replaces its rules instead of stacking new ones.

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use crate::Config;
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::sink::{MediaRule, NoopSink, StyleSink};
use crate::theme::{Breakpoints, ThemeDefinition};

/// Id of the style container that holds generated responsive rules.
pub const DEFAULT_CONTAINER_ID: &str = "cssvars-responsive";

/// Custom-property name for a variable: `gap` -> `--gap`.
///
/// Names that already carry the `--` prefix are returned unchanged.
pub fn custom_property(name: &str) -> String {
    if name.starts_with("--") {
        name.to_string()
    } else {
        format!("--{}", name)
    }
}

/// Native reference to a variable: `gap` -> `var(--gap)`.
pub fn var_reference(name: &str) -> String {
    format!("var({})", custom_property(name))
}

/// How malformed embedded references are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceMode {
    /// Reject the value with [`Error::MalformedReference`].
    #[default]
    Strict,
    /// Keep the malformed text verbatim and log a warning.
    Lenient,
}

impl ReferenceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferenceMode::Strict => "strict",
            ReferenceMode::Lenient => "lenient",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "strict" => Some(ReferenceMode::Strict),
            "lenient" => Some(ReferenceMode::Lenient),
            _ => None,
        }
    }
}

/// Variable and theme store bound to one style sink.
#[derive(Debug)]
pub struct VariableRegistry<S = NoopSink> {
    sink: S,
    /// Resolved values keyed by custom-property name.
    variables: IndexMap<String, String>,
    themes: IndexMap<String, ThemeDefinition>,
    current_theme: Option<String>,
    /// Variables whose generated rules are currently in the container.
    responsive: IndexSet<String>,
    mode: ReferenceMode,
    container_id: String,
}

impl VariableRegistry<NoopSink> {
    /// Registry for hosts without a rendering surface.
    pub fn headless() -> Self {
        Self::new(NoopSink)
    }
}

impl Default for VariableRegistry<NoopSink> {
    fn default() -> Self {
        Self::headless()
    }
}

impl<S: StyleSink> VariableRegistry<S> {
    /// Create an empty registry in strict mode writing to `sink`.
    pub fn new(sink: S) -> Self {
        Self::with_options(sink, ReferenceMode::default(), DEFAULT_CONTAINER_ID)
    }

    pub fn with_options(sink: S, mode: ReferenceMode, container_id: impl Into<String>) -> Self {
        Self {
            sink,
            variables: IndexMap::new(),
            themes: IndexMap::new(),
            current_theme: None,
            responsive: IndexSet::new(),
            mode,
            container_id: container_id.into(),
        }
    }

    /// Build a registry from configuration.
    ///
    /// Defines every configured theme, sets the global variables, then applies
    /// the default theme when one is configured.
    pub fn from_config(config: &Config, sink: S) -> Result<Self> {
        let mode = config.registry.reference_mode();
        let mut registry = Self::with_options(sink, mode, config.registry.container_id.clone());

        for (name, theme) in &config.themes {
            registry.define_theme(name.clone(), theme.clone());
        }

        registry.set_batch(&config.variables)?;

        if let Some(theme) = &config.registry.default_theme {
            registry.apply_theme(theme)?;
        }

        Ok(registry)
    }

    fn parse(&self, value: &str) -> Result<Expr> {
        match self.mode {
            ReferenceMode::Strict => Ok(Expr::parse(value)?),
            ReferenceMode::Lenient => {
                let (expr, errors) = Expr::parse_lenient(value);
                for err in errors {
                    warn!("Keeping malformed reference as text in {:?}: {}", value, err);
                }
                Ok(expr)
            }
        }
    }

    /// Resolve the references embedded in `value` without storing anything.
    pub fn resolve(&self, value: &str) -> Result<String> {
        let expr = self.parse(value)?;
        Ok(expr.resolve(|name| {
            self.variables
                .get(&custom_property(name))
                .map(String::as_str)
        }))
    }

    /// Resolve `value`, store it under `name` and mirror it to the sink.
    ///
    /// Returns the `var(--name)` reference for the variable. Any previous
    /// value is overwritten.
    pub fn set(&mut self, name: &str, value: &str) -> Result<String> {
        let resolved = self.resolve(value)?;
        let property = custom_property(name);

        debug!("Setting {} = {:?}", property, resolved);
        self.sink.set_property(&property, &resolved);
        self.variables.insert(property.clone(), resolved);

        Ok(format!("var({})", property))
    }

    /// `set` each entry in order.
    ///
    /// Not atomic: entries before a failing one stay applied.
    pub fn set_batch<I, K, V>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in entries {
            self.set(name.as_ref(), value.as_ref())?;
        }
        Ok(())
    }

    /// Register a theme, replacing any previous definition with that name.
    pub fn define_theme(&mut self, name: impl Into<String>, definitions: ThemeDefinition) {
        let name = name.into();
        debug!("Defining theme '{}' ({} variables)", name, definitions.len());
        self.themes.insert(name, definitions);
    }

    /// Apply a defined theme.
    ///
    /// Static entries are set first, then each responsive entry gets its base
    /// value and media rules. Rules left over from a previously applied theme
    /// for variables this theme does not make responsive are removed.
    /// Variable values set earlier are never cleared.
    pub fn apply_theme(&mut self, name: &str) -> Result<()> {
        let theme = self
            .themes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UndefinedTheme(name.to_string()))?;

        info!("Applying theme '{}'", name);

        let previous = std::mem::take(&mut self.responsive);
        if let Err(err) = self.apply_definitions(&theme) {
            self.responsive.extend(previous);
            return Err(err);
        }

        for stale in previous.difference(&self.responsive) {
            debug!("Removing stale responsive rules for {}", stale);
            self.sink.remove_rules(&self.container_id, stale);
        }

        self.current_theme = Some(name.to_string());
        Ok(())
    }

    fn apply_definitions(&mut self, theme: &ThemeDefinition) -> Result<()> {
        self.set_batch(theme.statics())?;
        for (name, breakpoints) in theme.responsive() {
            self.apply_responsive(name, breakpoints)?;
        }
        Ok(())
    }

    /// Set the base value of a responsive variable and replace its rules.
    ///
    /// Every breakpoint, the smallest included, gets a rule. Each value is
    /// resolved against the registry as it is after the base value was set.
    pub(crate) fn apply_responsive(&mut self, name: &str, breakpoints: &Breakpoints) -> Result<()> {
        let (_, base) = breakpoints.base();
        self.set(name, base)?;

        let property = custom_property(name);
        let mut rules = Vec::with_capacity(breakpoints.len());
        for (width, value) in breakpoints.iter() {
            rules.push(MediaRule::new(width, property.as_str(), self.resolve(value)?));
        }

        debug!("Replacing {} responsive rules for {}", rules.len(), property);
        self.sink.replace_rules(&self.container_id, &property, rules);
        self.responsive.insert(property);
        Ok(())
    }

    /// Stored value of `name`, else `fallback`, else `var(--name)`.
    pub fn get(&self, name: &str, fallback: Option<&str>) -> String {
        match (self.variables.get(&custom_property(name)), fallback) {
            (Some(value), _) => value.clone(),
            (None, Some(fallback)) => fallback.to_string(),
            (None, None) => var_reference(name),
        }
    }

    /// Rendered value of `name` on `element` (`None` = document root).
    ///
    /// Reads the sink, not the registry, so it reflects changes made to the
    /// surface by anyone else.
    pub fn get_computed(&self, name: &str, element: Option<&str>) -> Result<String> {
        let value = self
            .sink
            .computed_value(element, &custom_property(name))?;
        Ok(value.trim().to_string())
    }

    /// Name of the last successfully applied theme.
    pub fn current_theme(&self) -> Option<&str> {
        self.current_theme.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(&custom_property(name))
    }

    /// Stored custom properties and their resolved values, in first-set order.
    pub fn variables(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.keys().map(String::as_str)
    }

    pub fn theme(&self, name: &str) -> Option<&ThemeDefinition> {
        self.themes.get(name)
    }

    /// Custom properties whose generated rules are active.
    pub fn responsive_properties(&self) -> impl Iterator<Item = &str> {
        self.responsive.iter().map(String::as_str)
    }

    pub fn reference_mode(&self) -> ReferenceMode {
        self.mode
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
