//! End-to-end tests: configuration -> registry -> document.

use cssvars_core::{
    Config, DEFAULT_CONTAINER_ID, Document, Error, NoopSink, SharedDocument, StyleSink,
    VariableRegistry,
};

fn default_config() -> Config {
    Config::from_default_toml().expect("embedded default config should parse")
}

#[test]
fn test_from_config_applies_default_theme() {
    let config = default_config();
    let registry = VariableRegistry::from_config(&config, config.document.build()).unwrap();

    assert_eq!(registry.current_theme(), Some("light"));
    assert_eq!(registry.get("color-bg", None), "#ffffff");
    // Resolved against the theme's own accent, set earlier in the same batch.
    assert_eq!(registry.get("color-border", None), "#3584e4");
    // Global variable referenced from a responsive base value.
    assert_eq!(registry.get("spacing", None), "4px");
}

#[test]
fn test_from_config_generates_rules_for_viewport() {
    let mut config = default_config();
    config.document.viewport_width = 800;
    let registry = VariableRegistry::from_config(&config, config.document.build()).unwrap();

    let document = registry.sink();
    assert_eq!(
        document
            .rules_for(DEFAULT_CONTAINER_ID, "--font-size")
            .iter()
            .map(|r| r.min_width)
            .collect::<Vec<_>>(),
        vec![0, 768, 1280]
    );

    // The base value is set inline on the root, so it wins over media rules.
    assert_eq!(registry.get_computed("font-size", None).unwrap(), "14px");
}

#[test]
fn test_computed_reflects_external_changes() {
    let config = default_config();
    let registry = VariableRegistry::from_config(&config, config.document.build()).unwrap();

    assert_eq!(registry.get_computed("color-fg", None).unwrap(), "#1a1a1a");
    assert_eq!(
        registry.get_computed("color-fg", Some("alert")).unwrap(),
        "#b00020"
    );
    assert_eq!(
        registry.get_computed("color-fg", Some("card")).unwrap(),
        "#1a1a1a"
    );
    assert!(matches!(
        registry.get_computed("color-fg", Some("missing")),
        Err(Error::UnknownElement(_))
    ));
}

#[test]
fn test_switching_themes_rewrites_root_and_keeps_rule_count() {
    let config = default_config();
    let mut registry = VariableRegistry::from_config(&config, Document::default()).unwrap();
    let rules_before = registry.sink().rules(DEFAULT_CONTAINER_ID).len();

    registry.apply_theme("dark").unwrap();
    registry.apply_theme("light").unwrap();
    registry.apply_theme("dark").unwrap();

    assert_eq!(registry.current_theme(), Some("dark"));
    assert_eq!(registry.sink().rules(DEFAULT_CONTAINER_ID).len(), rules_before);
    assert_eq!(registry.sink().root_property("--color-bg"), Some("#111217"));
    assert_eq!(registry.get("color-border", None), "#adabe0");
}

#[test]
fn test_headless_registry_from_config() {
    let config = default_config();
    let registry = VariableRegistry::from_config(&config, NoopSink).unwrap();

    assert_eq!(registry.get("radius", None), "6px");
    assert!(matches!(
        registry.get_computed("radius", None),
        Err(Error::MissingContext(_))
    ));
}

#[test]
fn test_shared_document_renders_while_registry_owns_sink() {
    let config = default_config();
    let shared = SharedDocument::new(config.document.build());
    let mut registry = VariableRegistry::from_config(&config, shared.clone()).unwrap();

    registry.set("gutter", "CssVars.get('spacing-unit')").unwrap();

    let css = shared.read().to_css();
    assert!(css.starts_with(":root {\n"));
    assert!(css.contains("--gutter: 4px;"));
    assert!(css.contains("/* #cssvars-responsive */"));
    assert!(css.contains("@media (min-width: 1280px) { :root { --font-size: 16px; } }"));
    assert_eq!(shared.computed_value(None, "--gutter").unwrap(), "4px");
}

#[test]
fn test_from_config_with_undefined_default_theme_fails() {
    let mut config = default_config();
    config.registry.default_theme = Some("sepia".to_string());

    let err = VariableRegistry::from_config(&config, NoopSink).unwrap_err();
    assert!(matches!(err, Error::UndefinedTheme(name) if name == "sepia"));
}
