//! Re-run a command whenever the configuration file changes.
//!
//! A debounced watcher on the config file's parent directory reloads and
//! validates the file, then hands the result to the foreground loop over a
//! channel. Output is printed again only when it differs from the last run.
//! Invalid edits are logged and the previous configuration stays in effect.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tracing::{debug, error, info, warn};

use cssvars_core::Config;

use crate::{Command, Overrides, run_command};

/// Debounce interval (in ms) for file change events. Editors often trigger
/// multiple events for a single save; this batches them into one reload.
const FILE_CHANGE_DEBOUNCE_MS: u64 = 300;

/// Messages sent from the watcher callback to the foreground loop.
#[derive(Debug)]
pub enum ConfigMessage {
    /// A new valid config was loaded.
    Reloaded(Box<Config>),
    /// Config file changed but failed to load/validate.
    Error(String),
}

/// Print `command`'s output for `config`, then again whenever a change to
/// the file at `path` alters it. Returns only if the watcher stops.
pub fn watch(path: PathBuf, overrides: Overrides, command: Command, config: Config) -> Result<()> {
    // Canonicalize the path so we can compare with absolute paths from notify
    let canonical = path
        .canonicalize()
        .with_context(|| format!("cannot watch {}", path.display()))?;

    let (tx, rx) = mpsc::channel();
    let path_for_handler = canonical.clone();

    let mut debouncer = new_debouncer(
        Duration::from_millis(FILE_CHANGE_DEBOUNCE_MS),
        move |res: DebounceEventResult| match res {
            Ok(events) => {
                if events.iter().any(|e| e.path == path_for_handler) {
                    debug!("Config file change detected");
                    let msg = reload(&path_for_handler, &overrides);
                    if tx.send(msg).is_err() {
                        debug!("Watch loop has stopped, dropping reload");
                    }
                }
            }
            Err(err) => {
                error!("File watcher error: {}", err);
            }
        },
    )
    .context("failed to create file watcher")?;

    // Watch the parent directory; editors often replace the file on save
    let watch_dir = canonical.parent().unwrap_or(&canonical);
    debouncer
        .watcher()
        .watch(watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", watch_dir.display()))?;

    info!("File watcher started, watching: {}", watch_dir.display());

    let mut printed = PrintedOutput::default();
    if let Some(output) = printed.update(render(&config, &command)) {
        print!("{}", output);
    }

    for msg in rx {
        match msg {
            ConfigMessage::Reloaded(new_config) => match printed.update(render(&new_config, &command)) {
                Some(output) => print!("{}", output),
                None => debug!("Reloaded configuration produced no new output"),
            },
            ConfigMessage::Error(err) => {
                // Keep using the old config
                error!("Config reload error: {}", err);
            }
        }
    }

    debug!("Config file watcher stopped");
    Ok(())
}

/// Load, override and validate the file at `path`.
fn reload(path: &Path, overrides: &Overrides) -> ConfigMessage {
    match Config::load(path) {
        Ok(mut new_config) => {
            overrides.apply(&mut new_config);
            if let Err(e) = new_config.validate() {
                let msg = format!("Config validation failed: {}", e);
                warn!("{}", msg);
                return ConfigMessage::Error(msg);
            }
            for warning in new_config.warnings() {
                warn!("{}", warning);
            }

            info!("Config reloaded successfully from: {}", path.display());
            ConfigMessage::Reloaded(Box::new(new_config))
        }
        Err(e) => {
            let msg = format!("Failed to reload config: {}", e);
            warn!("{}", msg);
            ConfigMessage::Error(msg)
        }
    }
}

/// Output of `command` for `config`, or `None` after logging the error.
fn render(config: &Config, command: &Command) -> Option<String> {
    match run_command(config, command) {
        Ok(output) => Some(output),
        Err(e) => {
            error!("{:#}", e);
            None
        }
    }
}

/// The last output written to stdout.
#[derive(Debug, Default)]
struct PrintedOutput {
    last: Option<String>,
}

impl PrintedOutput {
    /// Record `output` and return it if it should be printed.
    ///
    /// The first successful output is always returned; later ones only when
    /// they differ from the last one returned. Failed renders return nothing
    /// and leave the record untouched.
    fn update(&mut self, output: Option<String>) -> Option<&str> {
        let output = output?;
        if self.last.as_deref() == Some(output.as_str()) {
            return None;
        }
        self.last = Some(output);
        self.last.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir_name: &str, contents: &str) -> (PathBuf, PathBuf) {
        let temp_dir = std::env::temp_dir().join(dir_name);
        let _ = std::fs::remove_dir_all(&temp_dir);
        std::fs::create_dir_all(&temp_dir).unwrap();

        let path = temp_dir.join("cssvars.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        (temp_dir, path)
    }

    #[test]
    fn test_reload_valid_config_applies_overrides() {
        let (dir, path) = write_config("cssvars_test_reload_valid", "[document]\nviewport_width = 900\n");
        let overrides = Overrides {
            theme: Some("dark".to_string()),
            viewport: None,
        };

        match reload(&path, &overrides) {
            ConfigMessage::Reloaded(config) => {
                assert_eq!(config.document.viewport_width, 900);
                assert_eq!(config.registry.default_theme.as_deref(), Some("dark"));
            }
            ConfigMessage::Error(e) => panic!("expected reload, got error: {}", e),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_reload_invalid_config_reports_error() {
        let (dir, path) = write_config(
            "cssvars_test_reload_invalid",
            "[registry]\nreferences = \"sloppy\"\n",
        );

        match reload(&path, &Overrides::default()) {
            ConfigMessage::Error(e) => assert!(e.contains("validation failed")),
            ConfigMessage::Reloaded(_) => panic!("invalid config should not reload"),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_reload_unparsable_config_reports_error() {
        let (dir, path) = write_config("cssvars_test_reload_broken", "not toml {{");

        match reload(&path, &Overrides::default()) {
            ConfigMessage::Error(e) => assert!(e.contains("Failed to reload config")),
            ConfigMessage::Reloaded(_) => panic!("broken config should not reload"),
        }

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_identical_output_is_printed_once() {
        let config = Config::from_default_toml().unwrap();
        let command = Command::Themes { json: false };
        let mut printed = PrintedOutput::default();

        let first = render(&config, &command);
        assert_eq!(printed.update(first), Some("* light\n  dark\n"));

        let again = render(&config, &command);
        assert!(again.is_some());
        assert_eq!(printed.update(again), None);
    }

    #[test]
    fn test_changed_output_is_printed() {
        let command = Command::Themes { json: false };
        let mut printed = PrintedOutput::default();
        let config = Config::from_default_toml().unwrap();
        assert!(printed.update(render(&config, &command)).is_some());

        let mut dark = Config::from_default_toml().unwrap();
        dark.registry.default_theme = Some("dark".to_string());
        assert_eq!(printed.update(render(&dark, &command)), Some("  light\n* dark\n"));
    }

    #[test]
    fn test_failed_render_keeps_last_output() {
        let command = Command::Themes { json: false };
        let mut printed = PrintedOutput::default();
        let config = Config::from_default_toml().unwrap();
        assert!(printed.update(render(&config, &command)).is_some());

        assert_eq!(printed.update(None), None);
        assert_eq!(printed.update(render(&config, &command)), None);
    }

    #[test]
    fn test_render_error_yields_none() {
        let mut config = Config::from_default_toml().unwrap();
        config.registry.default_theme = Some("sepia".to_string());
        assert_eq!(render(&config, &Command::Render), None);
    }
}
