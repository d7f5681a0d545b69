//! Configuration types and parsing.
//!
//! The schema is deliberately small: list timing and filtering, quality
//! display, and icon composition. Everything else about the window lives in
//! the widget layer.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use toml::Table;

use crate::error::{Error, Result};

/// Embedded default configuration TOML, compiled into the binary.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../../config.toml");

/// Upper bound for the removal slack. Anything larger means rows linger
/// visibly after their exit animation.
const MAX_REMOVAL_SLACK_MS: u64 = 1000;

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
    /// Row lifecycle and filtering.
    pub list: ListConfig,

    /// Link-quality display.
    pub quality: QualityConfig,

    /// Device icon composition.
    pub icons: IconsConfig,
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

    /// Parse a user TOML string and deep-merge it over the embedded defaults
    /// (user values win).
    pub fn load_with_defaults(user_toml: &str) -> Result<Self> {
        let mut base: Table = toml::from_str(DEFAULT_CONFIG_TOML)?;
        let user: Table = toml::from_str(user_toml)?;

        deep_merge_toml(&mut base, user);

        let config: Config = base.try_into()?;
        Ok(config)
    }

    /// Find and load configuration using the XDG lookup chain.
    ///
    /// If `explicit_path` is `Some`, that path is used directly and an error
    /// is returned if it doesn't exist or can't be parsed (no fallback).
    ///
    /// Otherwise searches, in order:
    /// 1. `$XDG_CONFIG_HOME/bluelist/config.toml`
    /// 2. `~/.config/bluelist/config.toml`
    /// 3. `./config.toml`
    ///
    /// A file that exists but fails to load is an error. Defaults are used
    /// only when no file exists at all.
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<ConfigLoadResult> {
        if let Some(path) = explicit_path {
            let config = Self::load(path)?;
            return Ok(ConfigLoadResult {
                config,
                source: Some(path.to_path_buf()),
                used_defaults: false,
            });
        }

        let search_paths = Self::config_search_paths();
        let mut first_error: Option<(PathBuf, Error)> = None;

        for path in &search_paths {
            if !path.exists() {
                continue;
            }
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

        if let Some((path, error)) = first_error {
            tracing::error!("Config file {:?} exists but failed to load: {}", path, error);
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
            paths.push(PathBuf::from(xdg_config).join("bluelist/config.toml"));
        }

        if let Ok(home) = env::var("HOME") {
            paths.push(PathBuf::from(home).join(".config/bluelist/config.toml"));
        }

        paths.push(PathBuf::from("config.toml"));

        paths
    }

    /// Validate the configuration, collecting every invalid value.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.list.transition_duration_ms == 0 {
            errors.push("list.transition_duration_ms: must be greater than 0".to_string());
        }

        if self.list.removal_slack_ms > MAX_REMOVAL_SLACK_MS {
            errors.push(format!(
                "list.removal_slack_ms: invalid value '{}', must be at most {}",
                self.list.removal_slack_ms, MAX_REMOVAL_SLACK_MS
            ));
        }

        if self.quality.pixmap_dir.as_os_str().is_empty() {
            errors.push("quality.pixmap_dir: must not be empty".to_string());
        }

        if self.quality.image_width == 0 || self.quality.image_height == 0 {
            errors.push("quality.image_width/image_height: must be greater than 0".to_string());
        }

        if self.icons.size == 0 {
            errors.push("icons.size: must be greater than 0".to_string());
        }

        if self.icons.emblem_size == 0 {
            errors.push("icons.emblem_size: must be greater than 0".to_string());
        } else if self.icons.emblem_size > self.icons.size {
            errors.push(format!(
                "icons.emblem_size: {} is larger than icons.size {}",
                self.icons.emblem_size, self.icons.size
            ));
        }

        if !(0.0..=1.0).contains(&self.icons.emblem_alpha) {
            errors.push(format!(
                "icons.emblem_alpha: invalid value '{}', must be between 0.0 and 1.0",
                self.icons.emblem_alpha
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigValidation(errors))
        }
    }

    /// Human-readable summary of the configuration.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push("List:".to_string());
        lines.push(format!(
            "  transition: {}ms (+{}ms slack)",
            self.list.transition_duration_ms, self.list.removal_slack_ms
        ));
        lines.push(format!("  hide_unnamed: {}", self.list.hide_unnamed));

        lines.push("\nQuality:".to_string());
        lines.push(format!(
            "  enabled: {}, pixmaps: {}",
            self.quality.enabled,
            self.quality.pixmap_dir.display()
        ));
        lines.push(format!(
            "  image: {}x{}px",
            self.quality.image_width, self.quality.image_height
        ));

        lines.push("\nIcons:".to_string());
        lines.push(format!(
            "  size: {}px, emblems: {}px @ {}",
            self.icons.size, self.icons.emblem_size, self.icons.emblem_alpha
        ));

        lines.join("\n")
    }
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

/// Row lifecycle and filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListConfig {
    /// Duration of the row reveal/exit transition in milliseconds.
    pub transition_duration_ms: u64,

    /// Extra delay after the transition before a removed row is destroyed,
    /// so teardown never races the animation's own completion.
    pub removal_slack_ms: u64,

    /// Hide devices that have no Alias.
    pub hide_unnamed: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            transition_duration_ms: 250,
            removal_slack_ms: 5,
            hide_unnamed: false,
        }
    }
}

impl ListConfig {
    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.transition_duration_ms)
    }

    pub fn removal_slack(&self) -> Duration {
        Duration::from_millis(self.removal_slack_ms)
    }
}

/// Link-quality display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    /// Read telemetry when a device connects.
    pub enabled: bool,

    /// Directory holding the `blueman-{rssi,lq,tpl}-N.png` assets.
    pub pixmap_dir: PathBuf,

    /// Scaled asset width in pixels.
    pub image_width: u32,

    /// Scaled asset height in pixels.
    pub image_height: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pixmap_dir: PathBuf::from("/usr/share/blueman/pixmaps"),
            image_width: 14,
            image_height: 48,
        }
    }
}

/// Device icon composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconsConfig {
    /// Device icon size in pixels.
    pub size: u32,

    /// Status emblem size in pixels.
    pub emblem_size: u32,

    /// Emblem opacity (0.0 - 1.0).
    pub emblem_alpha: f64,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            size: 48,
            emblem_size: 16,
            emblem_alpha: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.list.transition_duration_ms, 250);
        assert_eq!(config.list.removal_slack_ms, 5);
        assert!(!config.list.hide_unnamed);
        assert!(config.quality.enabled);
        assert_eq!(config.icons.size, 48);
        assert_eq!(config.icons.emblem_size, 16);
    }

    #[test]
    fn test_embedded_default_config_parses_and_validates() {
        let config = Config::from_default_toml().expect("embedded default config should parse");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_embedded_default_matches_struct_defaults() {
        let from_toml = Config::from_default_toml().unwrap();
        let from_struct = Config::default();

        assert_eq!(
            from_toml.list.transition_duration_ms,
            from_struct.list.transition_duration_ms
        );
        assert_eq!(from_toml.list.removal_slack_ms, from_struct.list.removal_slack_ms);
        assert_eq!(from_toml.quality.pixmap_dir, from_struct.quality.pixmap_dir);
        assert_eq!(from_toml.icons.size, from_struct.icons.size);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            [list]
            transition_duration_ms = 400
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.list.transition_duration_ms, 400);
        assert_eq!(config.list.removal_slack_ms, 5);
    }

    #[test]
    fn test_load_with_defaults_nested_override() {
        let user_toml = r#"
            [icons]
            emblem_alpha = 0.5
        "#;

        let config = Config::load_with_defaults(user_toml).unwrap();
        assert_eq!(config.icons.emblem_alpha, 0.5);
        assert_eq!(config.icons.size, 48);
        assert_eq!(config.list.transition_duration_ms, 250);
    }

    #[test]
    fn test_load_with_defaults_empty_config() {
        let config = Config::load_with_defaults("").unwrap();
        let default_config = Config::from_default_toml().unwrap();
        assert_eq!(
            config.list.transition_duration_ms,
            default_config.list.transition_duration_ms
        );
        assert_eq!(config.quality.enabled, default_config.quality.enabled);
    }

    #[test]
    fn test_deep_merge_toml_tables() {
        let mut base: Table = toml::from_str(
            r#"
            [section]
            a = 1
            b = 2
        "#,
        )
        .unwrap();

        let overlay: Table = toml::from_str(
            r#"
            [section]
            b = 99
            c = 3
        "#,
        )
        .unwrap();

        deep_merge_toml(&mut base, overlay);

        let section = base.get("section").unwrap().as_table().unwrap();
        assert_eq!(section.get("a").unwrap().as_integer(), Some(1));
        assert_eq!(section.get("b").unwrap().as_integer(), Some(99));
        assert_eq!(section.get("c").unwrap().as_integer(), Some(3));
    }

    #[test]
    fn test_deep_merge_toml_arrays_replace() {
        let mut base: Table = toml::from_str("items = [1, 2, 3]").unwrap();
        let overlay: Table = toml::from_str("items = [99]").unwrap();

        deep_merge_toml(&mut base, overlay);

        let items = base.get("items").unwrap().as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_integer(), Some(99));
    }

    #[test]
    fn test_load_with_defaults_rejects_unknown_fields() {
        let user_toml = r#"
            [list]
            hide_unamed = true
        "#;

        let err = Config::load_with_defaults(user_toml).unwrap_err().to_string();
        assert!(err.contains("hide_unamed"), "error should mention the unknown field");
    }

    #[test]
    fn test_load_with_defaults_rejects_unknown_section() {
        let err = Config::load_with_defaults("[lists]\nx = 1")
            .unwrap_err()
            .to_string();
        assert!(err.contains("lists"));
    }

    #[test]
    fn test_validate_zero_transition() {
        let mut config = Config::default();
        config.list.transition_duration_ms = 0;

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("list.transition_duration_ms"));
    }

    #[test]
    fn test_validate_emblem_larger_than_icon() {
        let mut config = Config::default();
        config.icons.emblem_size = 64;

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("icons.emblem_size"));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let mut config = Config::default();
        config.list.removal_slack_ms = 5000;
        config.icons.emblem_alpha = 1.5;
        config.quality.pixmap_dir = PathBuf::new();

        let err = config.validate().unwrap_err();
        match &err {
            Error::ConfigValidation(errors) => assert_eq!(errors.len(), 3),
            other => panic!("unexpected error: {}", other),
        }
        let msg = err.to_string();
        assert!(msg.contains("list.removal_slack_ms"));
        assert!(msg.contains("icons.emblem_alpha"));
        assert!(msg.contains("quality.pixmap_dir"));
    }

    #[test]
    fn test_durations() {
        let list = ListConfig::default();
        assert_eq!(list.transition_duration(), Duration::from_millis(250));
        assert_eq!(list.removal_slack(), Duration::from_millis(5));
    }

    #[test]
    fn test_config_search_paths() {
        let paths = Config::config_search_paths();
        assert!(!paths.is_empty());
        assert!(paths.iter().any(|p| p.ends_with("config.toml")));
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/definitely/not/here/config.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }
}
