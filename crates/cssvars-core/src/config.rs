//! Configuration types and parsing.
//!
//! A configuration file declares registry settings, the document the
//! command-line front end renders into, global variables and themes. User
//! files are merged over the embedded default (`cssvars.toml` at the
//! repository root).

use std::env;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::Table;

use crate::document::{DEFAULT_VIEWPORT_WIDTH, Document};
use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::registry::{DEFAULT_CONTAINER_ID, ReferenceMode};
use crate::theme::ThemeDefinition;

/// Known valid values for registry.references.
const VALID_REFERENCE_MODES: &[&str] = &["strict", "lenient"];

/// Characters that cannot appear in a variable name.
const FORBIDDEN_NAME_CHARS: &[char] = &[':', ';', '{', '}', '(', ')', '\'', '"', ','];

/// Top-level tables that a user file replaces instead of merging into.
const REPLACED_SECTIONS: &[&str] = &["variables", "themes"];

/// Embedded default configuration TOML, compiled into the binary.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../../cssvars.toml");

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: Config,
    /// Path where config was found, if any.
    pub source: Option<PathBuf>,
    /// Whether defaults were used (no config file found).
    pub used_defaults: bool,
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Registry behaviour.
    pub registry: RegistryConfig,

    /// Rendering surface used by the command-line front end.
    pub document: DocumentConfig,

    /// Variables set before any theme is applied, in file order.
    pub variables: IndexMap<String, String>,

    /// Theme definitions by name, in file order.
    pub themes: IndexMap<String, ThemeDefinition>,
}

impl Config {
    /// Load configuration from the embedded default TOML string.
    pub fn from_default_toml() -> Result<Self> {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TOML)?;
        Ok(config)
    }

    /// Load configuration from a TOML file, merging with embedded defaults.
    ///
    /// Returns an error if the file doesn't exist or can't be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::load_with_defaults(&content)
    }

    /// Load configuration from a TOML string, merging with embedded defaults.
    ///
    /// Tables merge recursively and user values win, except for
    /// `[variables]` and `[themes]`, which a user file replaces outright so
    /// that its themes are exactly the ones it declares.
    pub fn load_with_defaults(user_toml: &str) -> Result<Self> {
        // This should never fail since it's embedded and tested
        let mut base: Table = toml::from_str(DEFAULT_CONFIG_TOML)
            .expect("embedded DEFAULT_CONFIG_TOML should always be valid");

        let mut user: Table = toml::from_str(user_toml)?;

        // A user file that brings its own themes cannot inherit a default
        // theme name that may not exist among them.
        if user.contains_key("themes") && !user_sets_default_theme(&user) {
            if let Some(toml::Value::Table(registry)) = base.get_mut("registry") {
                registry.remove("default_theme");
            }
        }

        for section in REPLACED_SECTIONS {
            if let Some(value) = user.remove(*section) {
                base.insert((*section).to_string(), value);
            }
        }

        deep_merge_toml(&mut base, user);

        let config: Config = base.try_into()?;
        Ok(config)
    }

    /// Find and load configuration using the XDG lookup chain.
    ///
    /// If `explicit_path` is `Some`, that path is used directly and an error
    /// is returned if it doesn't exist or can't be parsed (no fallback).
    ///
    /// If `explicit_path` is `None`, searches in order:
    /// 1. `$XDG_CONFIG_HOME/cssvars/cssvars.toml`
    /// 2. `~/.config/cssvars/cssvars.toml`
    /// 3. `./cssvars.toml` (current working directory)
    ///
    /// If no config file is found in the search chain, the embedded default
    /// is used.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<ConfigLoadResult> {
        if let Some(path) = explicit_path {
            let config = Self::load(path)?;
            return Ok(ConfigLoadResult {
                config,
                source: Some(path.to_path_buf()),
                used_defaults: false,
            });
        }

        // A config file that exists but fails to load is an error, not a
        // reason to fall back to defaults.
        let search_paths = Self::config_search_paths();
        let mut first_error: Option<(PathBuf, Error)> = None;

        for path in &search_paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        return Ok(ConfigLoadResult {
                            config,
                            source: Some(path.clone()),
                            used_defaults: false,
                        });
                    }
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some((path.clone(), e));
                        }
                    }
                }
            }
        }

        if let Some((path, error)) = first_error {
            tracing::error!(
                "Config file {:?} exists but failed to load: {}",
                path,
                error
            );
            return Err(error);
        }

        tracing::info!("No config file found, using built-in default config");
        tracing::debug!(
            "Searched: {}",
            search_paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(ConfigLoadResult {
            config: Self::from_default_toml()?,
            source: None,
            used_defaults: true,
        })
    }

    /// Get the list of paths to search for config files.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_config).join("cssvars/cssvars.toml"));
        }

        if let Ok(home) = env::var("HOME") {
            paths.push(PathBuf::from(home).join(".config/cssvars/cssvars.toml"));
        }

        paths.push(PathBuf::from("cssvars.toml"));

        paths
    }

    /// Validate the configuration, returning every problem found.
    ///
    /// Embedded references in values are checked only in strict mode;
    /// lenient mode accepts malformed calls as text.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        let strict = self.registry.reference_mode() == ReferenceMode::Strict;

        if !VALID_REFERENCE_MODES.contains(&self.registry.references.as_str()) {
            errors.push(format!(
                "registry.references: invalid value '{}', expected one of: {}",
                self.registry.references,
                VALID_REFERENCE_MODES.join(", ")
            ));
        }

        if !is_valid_container_id(&self.registry.container_id) {
            errors.push(format!(
                "registry.container_id: invalid value '{}', expected letters, digits, '-' or '_' \
                 and not starting with a digit",
                self.registry.container_id
            ));
        }

        if let Some(ref theme) = self.registry.default_theme {
            if !self.themes.contains_key(theme) {
                errors.push(format!(
                    "registry.default_theme: theme '{}' is not defined under [themes]",
                    theme
                ));
            }
        }

        if self.document.viewport_width == 0 {
            errors.push("document.viewport_width: must be greater than 0".to_string());
        }

        for (id, declarations) in &self.document.elements {
            if id.trim().is_empty() {
                errors.push("document.elements: element id must not be empty".to_string());
            }
            for property in declarations.keys() {
                if !property.starts_with("--") || !is_valid_variable_name(property) {
                    errors.push(format!(
                        "document.elements.{}: invalid custom property '{}'",
                        id, property
                    ));
                }
            }
        }

        for (name, value) in &self.variables {
            let path = format!("variables.{}", name);
            check_variable(&path, name, &[value.as_str()], strict, &mut errors);
        }

        for (theme_name, theme) in &self.themes {
            for (name, definition) in theme.iter() {
                let path = format!("themes.{}.{}", theme_name, name);
                check_variable(&path, name, &definition.values(), strict, &mut errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigValidation(errors))
        }
    }

    /// Check for potential configuration issues and return warnings.
    ///
    /// Unlike `validate()`, these are non-fatal issues that might indicate
    /// typos or surprising results.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.registry.default_theme.is_none() && !self.themes.is_empty() {
            warnings.push(
                "registry.default_theme: not set; themes are defined but none is applied at startup"
                    .to_string(),
            );
        }

        let mut all_names: Vec<(String, &str)> = self
            .variables
            .keys()
            .map(|n| ("variables".to_string(), n.as_str()))
            .collect();
        for (theme_name, theme) in &self.themes {
            all_names.extend(theme.iter().map(|(n, _)| (format!("themes.{}", theme_name), n)));
        }
        for (section, name) in all_names {
            if name.starts_with("--") {
                warnings.push(format!(
                    "{}.{}: leading '--' is added automatically and can be dropped",
                    section, name
                ));
            }
        }

        for (theme_name, theme) in &self.themes {
            if theme.is_empty() {
                warnings.push(format!("themes.{}: theme defines no variables", theme_name));
            }
            for (name, _) in theme.responsive() {
                if self.variables.contains_key(name) {
                    warnings.push(format!(
                        "themes.{}.{}: responsive definition overrides global variable '{}'",
                        theme_name, name, name
                    ));
                }
            }
        }

        warnings
    }

    /// Print a human-readable summary of the configuration.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push("Registry:".to_string());
        lines.push(format!("  container_id: {}", self.registry.container_id));
        lines.push(format!("  references: {}", self.registry.references));
        lines.push(format!(
            "  default_theme: {}",
            self.registry.default_theme.as_deref().unwrap_or("(none)")
        ));

        lines.push("\nDocument:".to_string());
        lines.push(format!("  viewport_width: {}px", self.document.viewport_width));
        if !self.document.elements.is_empty() {
            let ids: Vec<&str> = self.document.elements.keys().map(String::as_str).collect();
            lines.push(format!("  elements: {}", ids.join(", ")));
        }

        lines.push(format!("\nVariables: {}", self.variables.len()));
        for (name, value) in &self.variables {
            lines.push(format!("    {} = {}", name, value));
        }

        lines.push(format!("\nThemes: {}", self.themes.len()));
        for (name, theme) in &self.themes {
            let responsive = theme.responsive().count();
            lines.push(format!(
                "  - {}: {} variable(s), {} responsive",
                name,
                theme.len(),
                responsive
            ));
        }

        lines.join("\n")
    }
}

fn check_variable(path: &str, name: &str, values: &[&str], strict: bool, errors: &mut Vec<String>) {
    if !is_valid_variable_name(name) {
        errors.push(format!("{}: invalid variable name '{}'", path, name));
    }
    if !strict {
        return;
    }
    for value in values {
        if let Err(e) = Expr::parse(value) {
            errors.push(format!("{}: {}", path, e));
        }
    }
}

/// Whether `name` can be used as a custom-property name.
pub fn is_valid_variable_name(name: &str) -> bool {
    let bare = name.strip_prefix("--").unwrap_or(name);
    !bare.is_empty()
        && !bare
            .chars()
            .any(|c| c.is_whitespace() || FORBIDDEN_NAME_CHARS.contains(&c))
}

fn is_valid_container_id(id: &str) -> bool {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '-' || first == '_' => chars
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        _ => false,
    }
}

fn user_sets_default_theme(user: &Table) -> bool {
    matches!(
        user.get("registry"),
        Some(toml::Value::Table(registry)) if registry.contains_key("default_theme")
    )
}

/// Deep merge two TOML tables, with `overlay` values taking precedence.
///
/// For nested tables, recursively merges. For arrays and other values,
/// the overlay value completely replaces the base value.
fn deep_merge_toml(base: &mut Table, overlay: Table) {
    for (key, overlay_value) in overlay {
        match (base.get_mut(&key), overlay_value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge_toml(base_table, overlay_table);
            }
            (_, overlay_value) => {
                base.insert(key, overlay_value);
            }
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Id of the style container receiving generated media rules.
    pub container_id: String,

    /// Handling of malformed embedded references: "strict" or "lenient".
    pub references: String,

    /// Theme applied once the registry is built.
    pub default_theme: Option<String>,
}

impl RegistryConfig {
    /// The configured reference mode; invalid values fall back to strict.
    pub fn reference_mode(&self) -> ReferenceMode {
        ReferenceMode::from_name(&self.references).unwrap_or_default()
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            references: ReferenceMode::Strict.as_str().to_string(),
            default_theme: None,
        }
    }
}

/// In-memory document configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentConfig {
    /// Viewport width in pixels.
    pub viewport_width: u32,

    /// Addressable elements and their inline custom properties.
    pub elements: IndexMap<String, IndexMap<String, String>>,
}

impl DocumentConfig {
    /// Build the described document.
    pub fn build(&self) -> Document {
        let mut document = Document::new(self.viewport_width);
        for (id, declarations) in &self.elements {
            document.add_element(id.clone());
            for (property, value) in declarations {
                // The element was added just above.
                let _ = document.set_element_property(id, property, value);
            }
        }
        document
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            elements: IndexMap::new(),
        }
    }
}
