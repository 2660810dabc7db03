//! cssvars - render and inspect CSS variable themes.
//!
//! Loads a theme configuration, builds a registry over an in-memory document
//! and prints the result of the requested command.

mod watcher;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{debug, info, warn};

use cssvars_core::{Config, SharedDocument, VariableRegistry, logging};

/// cssvars - render and inspect CSS variable themes
#[derive(Parser, Debug)]
#[command(name = "cssvars", version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (uses XDG lookup if not specified)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Apply this theme instead of registry.default_theme
    #[arg(short, long)]
    theme: Option<String>,

    /// Viewport width in pixels, overriding document.viewport_width
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    viewport: Option<u32>,

    /// Print example configuration and exit
    #[arg(long)]
    print_example_config: bool,

    /// Validate configuration and exit (returns non-zero on errors)
    #[arg(long)]
    check_config: bool,

    /// Run the command again every time the configuration file changes
    #[arg(short, long)]
    watch: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Default)]
pub(crate) enum Command {
    /// Print the root variables and generated media rules (default)
    #[default]
    Render,
    /// Print the stored value of a variable
    Get {
        /// Variable name, with or without the leading `--`
        name: String,
        /// Value printed when the variable is not set
        #[arg(short, long)]
        fallback: Option<String>,
    },
    /// Print the rendered value of a variable on the root or an element
    Computed {
        /// Variable name, with or without the leading `--`
        name: String,
        /// Element id from [document.elements]
        #[arg(short, long)]
        element: Option<String>,
    },
    /// List defined themes, marking the applied one
    Themes {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// List every stored variable and its resolved value
    Vars {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve CssVars.get(...) references in a value without storing it
    Resolve {
        /// Raw value, e.g. "1px solid CssVars.get('color-border')"
        value: String,
    },
}

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub(crate) struct Overrides {
    pub theme: Option<String>,
    pub viewport: Option<u32>,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref theme) = self.theme {
            config.registry.default_theme = Some(theme.clone());
        }
        if let Some(width) = self.viewport {
            config.document.viewport_width = width;
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    logging::init(args.verbose);

    if args.print_example_config {
        print!("{}", cssvars_core::config::DEFAULT_CONFIG_TOML);
        return ExitCode::SUCCESS;
    }

    // If --config is specified, it must exist and be valid (no fallback)
    let load_result = match Config::find_and_load(args.config.as_deref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref source) = load_result.source {
        info!("Loaded configuration from {:?}", source);
    } else if load_result.used_defaults {
        warn!("Using default configuration (no config file found)");
    }

    let overrides = Overrides {
        theme: args.theme.clone(),
        viewport: args.viewport,
    };
    let mut config = load_result.config;
    overrides.apply(&mut config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    for warning in config.warnings() {
        warn!("{}", warning);
    }

    debug!("Configuration validated successfully");

    if args.check_config {
        if let Some(ref source) = load_result.source {
            println!("Configuration valid: {}", source.display());
        } else {
            println!("Configuration valid (using defaults)");
        }
        if args.verbose > 0 {
            println!("\n{}", config.summary());
        }
        return ExitCode::SUCCESS;
    }

    let command = args.command.unwrap_or_default();

    if args.watch {
        let Some(path) = load_result.source else {
            eprintln!("Error: --watch needs a configuration file to watch");
            return ExitCode::FAILURE;
        };
        return match watcher::watch(path, overrides, command, config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::FAILURE
            }
        };
    }

    match run_command(&config, &command) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Build a registry from `config` and produce the output of `command`.
pub(crate) fn run_command(config: &Config, command: &Command) -> Result<String> {
    let document = SharedDocument::new(config.document.build());
    let registry = VariableRegistry::from_config(config, document.clone())
        .context("failed to build registry from configuration")?;

    let output = match command {
        Command::Render => document.read().to_css(),
        Command::Get { name, fallback } => {
            format!("{}\n", registry.get(name, fallback.as_deref()))
        }
        Command::Computed { name, element } => {
            let value = registry
                .get_computed(name, element.as_deref())
                .with_context(|| format!("cannot compute '{}'", name))?;
            format!("{}\n", value)
        }
        Command::Themes { json } => {
            let current = registry.current_theme();
            if *json {
                let themes: Vec<_> = registry
                    .theme_names()
                    .map(|name| {
                        let size = registry.theme(name).map(|t| t.len()).unwrap_or(0);
                        json!({ "name": name, "variables": size, "current": (Some(name) == current) })
                    })
                    .collect();
                format!("{}\n", serde_json::to_string_pretty(&themes)?)
            } else {
                registry
                    .theme_names()
                    .map(|name| {
                        let marker = if Some(name) == current { "*" } else { " " };
                        format!("{} {}\n", marker, name)
                    })
                    .collect()
            }
        }
        Command::Vars { json } => {
            if *json {
                let vars: Vec<_> = registry
                    .variables()
                    .map(|(property, value)| json!({ "property": property, "value": value }))
                    .collect();
                format!("{}\n", serde_json::to_string_pretty(&vars)?)
            } else {
                registry
                    .variables()
                    .map(|(property, value)| format!("{}: {}\n", property, value))
                    .collect()
            }
        }
        Command::Resolve { value } => {
            let resolved = registry
                .resolve(value)
                .context("cannot resolve value")?;
            format!("{}\n", resolved)
        }
    };

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_default_toml().unwrap()
    }

    #[test]
    fn test_args_parse_subcommand() {
        let args = Args::try_parse_from(["cssvars", "-vv", "--theme", "dark", "get", "gap"]).unwrap();
        assert_eq!(args.verbose, 2);
        assert_eq!(args.theme.as_deref(), Some("dark"));
        assert!(matches!(args.command, Some(Command::Get { ref name, .. }) if name == "gap"));
    }

    #[test]
    fn test_args_reject_zero_viewport() {
        assert!(Args::try_parse_from(["cssvars", "--viewport", "0"]).is_err());
    }

    #[test]
    fn test_overrides_apply() {
        let mut config = config();
        Overrides {
            theme: Some("dark".to_string()),
            viewport: Some(320),
        }
        .apply(&mut config);

        assert_eq!(config.registry.default_theme.as_deref(), Some("dark"));
        assert_eq!(config.document.viewport_width, 320);
    }

    #[test]
    fn test_render_outputs_root_and_rules() {
        let output = run_command(&config(), &Command::Render).unwrap();
        assert!(output.starts_with(":root {"));
        assert!(output.contains("--color-bg: #ffffff;"));
        assert!(output.contains("@media (min-width: 768px)"));
    }

    #[test]
    fn test_get_and_resolve() {
        let get = Command::Get {
            name: "--color-accent".to_string(),
            fallback: None,
        };
        assert_eq!(run_command(&config(), &get).unwrap(), "#3584e4\n");

        let resolve = Command::Resolve {
            value: "1px solid CssVars.get('color-border')".to_string(),
        };
        assert_eq!(run_command(&config(), &resolve).unwrap(), "1px solid #3584e4\n");
    }

    #[test]
    fn test_computed_on_element() {
        let computed = Command::Computed {
            name: "color-fg".to_string(),
            element: Some("alert".to_string()),
        };
        assert_eq!(run_command(&config(), &computed).unwrap(), "#b00020\n");
    }

    #[test]
    fn test_themes_marks_current() {
        let output = run_command(&config(), &Command::Themes { json: false }).unwrap();
        assert_eq!(output, "* light\n  dark\n");

        let json = run_command(&config(), &Command::Themes { json: true }).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "light");
        assert_eq!(parsed[0]["current"], true);
        assert_eq!(parsed[1]["current"], false);
    }

    #[test]
    fn test_vars_json_lists_properties() {
        let json = run_command(&config(), &Command::Vars { json: true }).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["property"], "--spacing-unit");
        assert_eq!(parsed[0]["value"], "4px");
    }

    #[test]
    fn test_undefined_theme_is_an_error() {
        let mut config = config();
        config.registry.default_theme = Some("sepia".to_string());
        let err = run_command(&config, &Command::Render).unwrap_err();
        assert!(format!("{:#}", err).contains("theme 'sepia' is not defined"));
    }
}
