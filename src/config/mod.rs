use crate::dialog::{
    config::{duration_ms, parse_duration},
    ControllerSettings, DialogConfig, Palette, ThemeTable,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::debug;

const DEFAULT_VIEWPORT_HEIGHT: f64 = 1080.0;
const DEFAULT_TIMEOUT_FACTOR: f64 = 2.0;
const DEFAULT_TIMEOUT_GRACE: Duration = Duration::from_millis(100);

/// Application settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Viewport height of the headless document, in pixels
    pub viewport_height: f64,

    /// Dispose dialogs whose close transition never reports completion
    pub fallback_timer: bool,

    /// Fallback timer length as a multiple of the animation duration
    pub close_timeout_factor: f64,

    /// Added to the scaled fallback timer
    #[serde(with = "duration_ms")]
    pub close_timeout_grace: Duration,

    /// Theme forced onto every dialog, overriding the dialog's own
    pub theme: Option<String>,

    /// Extra named palettes
    pub themes: HashMap<String, Palette>,

    /// Dialog configuration file used when none is given on the command line
    pub dialog: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            fallback_timer: true,
            close_timeout_factor: DEFAULT_TIMEOUT_FACTOR,
            close_timeout_grace: DEFAULT_TIMEOUT_GRACE,
            theme: None,
            themes: HashMap::new(),
            dialog: None,
        }
    }
}

impl Settings {
    /// Initialize settings: defaults, then the first settings file found,
    /// then `MODL_*` environment variables
    pub async fn init() -> Result<Self> {
        debug!("Initializing settings");

        let mut settings = Self::default();

        if let Ok(file_settings) = Self::load_from_file().await {
            settings.merge_with(file_settings);
        }

        settings.load_from_env();
        settings.validate()?;

        Ok(settings)
    }

    /// Load overrides from the process environment
    pub fn load_from_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Load overrides through `lookup`; unparsable values are ignored
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(height) = lookup("MODL_VIEWPORT_HEIGHT").and_then(|v| v.trim().parse().ok()) {
            self.viewport_height = height;
        }

        if let Some(enabled) = lookup("MODL_FALLBACK_TIMER") {
            self.fallback_timer = matches!(enabled.trim().to_lowercase().as_str(), "true" | "1" | "yes");
        }

        if let Some(factor) = lookup("MODL_CLOSE_TIMEOUT_FACTOR").and_then(|v| v.trim().parse().ok()) {
            self.close_timeout_factor = factor;
        }

        if let Some(grace) = lookup("MODL_CLOSE_TIMEOUT_GRACE").and_then(|v| parse_duration(&v).ok()) {
            self.close_timeout_grace = grace;
        }

        if let Some(theme) = lookup("MODL_THEME").filter(|v| !v.trim().is_empty()) {
            self.theme = Some(theme);
        }

        if let Some(path) = lookup("MODL_DIALOG").filter(|v| !v.trim().is_empty()) {
            self.dialog = Some(PathBuf::from(path));
        }
    }

    /// Load settings from the first file found:
    /// 1. ./.modl.json
    /// 2. ./modl.json
    /// 3. $CONFIG_DIR/modl/modl.json
    pub async fn load_from_file() -> Result<Self> {
        let mut paths = vec![PathBuf::from("./.modl.json"), PathBuf::from("./modl.json")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("modl").join("modl.json"));
        }

        Self::load_first(&paths).await
    }

    /// Load the first existing file among `paths`
    pub async fn load_first(paths: &[PathBuf]) -> Result<Self> {
        for path in paths {
            if path.exists() {
                return Self::load_from_path(path).await;
            }
        }

        Err(anyhow::anyhow!("No settings file found"))
    }

    /// Load settings from one JSON file
    pub async fn load_from_path(path: &Path) -> Result<Self> {
        debug!("Loading settings from: {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .context("Failed to read settings file")?;
        let settings: Self = serde_json::from_str(&content).context("Failed to parse settings file")?;
        Ok(settings)
    }

    /// Merge another settings value into this one; defaults never override
    pub fn merge_with(&mut self, other: Self) {
        let defaults = Self::default();

        if other.viewport_height != defaults.viewport_height {
            self.viewport_height = other.viewport_height;
        }
        if other.fallback_timer != defaults.fallback_timer {
            self.fallback_timer = other.fallback_timer;
        }
        if other.close_timeout_factor != defaults.close_timeout_factor {
            self.close_timeout_factor = other.close_timeout_factor;
        }
        if other.close_timeout_grace != defaults.close_timeout_grace {
            self.close_timeout_grace = other.close_timeout_grace;
        }
        if other.theme.is_some() {
            self.theme = other.theme;
        }
        if !other.themes.is_empty() {
            self.themes.extend(other.themes);
        }
        if other.dialog.is_some() {
            self.dialog = other.dialog;
        }
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if !self.viewport_height.is_finite() || self.viewport_height <= 0.0 {
            return Err(anyhow::anyhow!("viewport_height must be a positive number"));
        }

        if !self.close_timeout_factor.is_finite() || self.close_timeout_factor < 1.0 {
            return Err(anyhow::anyhow!("close_timeout_factor must be at least 1.0"));
        }

        if let Some(theme) = &self.theme {
            if theme.trim().is_empty() {
                return Err(anyhow::anyhow!("theme must not be empty"));
            }
        }

        if let Some(name) = self.themes.keys().find(|name| name.trim().is_empty()) {
            return Err(anyhow::anyhow!("Invalid palette name '{}'", name));
        }

        Ok(())
    }

    /// Tuning knobs for the dialog controller
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            fallback_timer: self.fallback_timer,
            close_timeout_factor: self.close_timeout_factor,
            close_timeout_grace: self.close_timeout_grace,
        }
    }

    /// The built-in palettes plus the configured ones
    pub fn theme_table(&self) -> ThemeTable {
        let mut table = ThemeTable::new();
        for (name, palette) in &self.themes {
            table.register(name.clone(), palette.clone());
        }
        table
    }
}

/// Load a dialog configuration; `.yaml`/`.yml` files are read as YAML,
/// anything else as JSON
pub async fn load_dialog_config(path: &Path) -> Result<DialogConfig> {
    let path = expand_home(path);
    let path = path.as_path();
    debug!("Loading dialog configuration from: {}", path.display());
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read dialog configuration {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    let config = if is_yaml {
        DialogConfig::from_yaml(&content)?
    } else {
        DialogConfig::from_json(&content)?
    };
    config.validate()?;

    Ok(config)
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(text) => PathBuf::from(shellexpand::tilde(text).into_owned()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{Content, Position};
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();

        assert_eq!(settings.viewport_height, 1080.0);
        assert!(settings.fallback_timer);
        assert_eq!(settings.close_timeout_factor, 2.0);
        assert_eq!(settings.close_timeout_grace, Duration::from_millis(100));
        assert!(settings.theme.is_none());
        assert!(settings.validate().is_ok());
        assert_eq!(settings.controller_settings(), ControllerSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MODL_VIEWPORT_HEIGHT", "640"),
            ("MODL_FALLBACK_TIMER", "false"),
            ("MODL_CLOSE_TIMEOUT_FACTOR", "3"),
            ("MODL_CLOSE_TIMEOUT_GRACE", "250ms"),
            ("MODL_THEME", "dark"),
            ("MODL_DIALOG", "dialogs/welcome.yaml"),
        ]);

        let mut settings = Settings::default();
        settings.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.viewport_height, 640.0);
        assert!(!settings.fallback_timer);
        assert_eq!(settings.close_timeout_factor, 3.0);
        assert_eq!(settings.close_timeout_grace, Duration::from_millis(250));
        assert_eq!(settings.theme.as_deref(), Some("dark"));
        assert_eq!(settings.dialog, Some(PathBuf::from("dialogs/welcome.yaml")));
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_env(|key| match key {
            "MODL_VIEWPORT_HEIGHT" => Some("tall".to_string()),
            "MODL_CLOSE_TIMEOUT_GRACE" => Some("later".to_string()),
            _ => None,
        });

        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_load_first_existing_file() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join(".modl.json");
        let present = temp_dir.path().join("modl.json");
        tokio::fs::write(
            &present,
            r##"{
                "viewport_height": 720,
                "close_timeout_grace": "1s",
                "themes": {
                    "dark": {
                        "wrapper_background": "rgba(0, 0, 0, 0.9)",
                        "dialog_background": "#1e1e1e",
                        "text": "#f5f5f5",
                        "close_button": "#f5f5f5"
                    }
                }
            }"##,
        )
        .await
        .unwrap();

        let settings = Settings::load_first(&[missing, present]).await.unwrap();

        assert_eq!(settings.viewport_height, 720.0);
        assert_eq!(settings.close_timeout_grace, Duration::from_secs(1));
        assert!(settings.fallback_timer);
        let table = settings.theme_table();
        assert!(table.contains("dark"));
        assert_eq!(table.resolve("dark").dialog_background, "#1e1e1e");
    }

    #[tokio::test]
    async fn test_load_first_without_files() {
        let temp_dir = tempdir().unwrap();
        let result = Settings::load_first(&[temp_dir.path().join("modl.json")]).await;

        assert!(result.is_err());
    }

    #[test]
    fn test_merge_keeps_non_default_values() {
        let mut settings = Settings {
            viewport_height: 900.0,
            theme: Some("light".to_string()),
            ..Settings::default()
        };

        settings.merge_with(Settings {
            close_timeout_factor: 4.0,
            ..Settings::default()
        });

        assert_eq!(settings.viewport_height, 900.0);
        assert_eq!(settings.close_timeout_factor, 4.0);
        assert_eq!(settings.theme.as_deref(), Some("light"));
    }

    #[test]
    fn test_validation() {
        let settings = Settings {
            viewport_height: 0.0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            close_timeout_factor: 0.5,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            theme: Some(" ".to_string()),
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home(Path::new("dialogs/a.json")), PathBuf::from("dialogs/a.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/a.json")), home.join("a.json"));
        }
    }

    #[tokio::test]
    async fn test_load_dialog_config_by_extension() {
        let temp_dir = tempdir().unwrap();

        let yaml = temp_dir.path().join("dialog.yml");
        tokio::fs::write(&yaml, "position: top-left\ncontent: <p>yaml</p>\n")
            .await
            .unwrap();
        let config = load_dialog_config(&yaml).await.unwrap();
        assert_eq!(config.position, Position::TopLeft);
        assert_eq!(config.content, Content::from("<p>yaml</p>"));

        let json = temp_dir.path().join("dialog.json");
        tokio::fs::write(&json, r#"{ "position": "bottom", "size": { "width": 300 } }"#)
            .await
            .unwrap();
        let config = load_dialog_config(&json).await.unwrap();
        assert_eq!(config.position, Position::Bottom);
        assert_eq!(config.size.width, 300);
    }

    #[tokio::test]
    async fn test_load_dialog_config_rejects_bad_files() {
        let temp_dir = tempdir().unwrap();

        let unknown = temp_dir.path().join("dialog.json");
        tokio::fs::write(&unknown, r#"{ "position": "middle" }"#).await.unwrap();
        assert!(load_dialog_config(&unknown).await.is_err());

        let invalid = temp_dir.path().join("invalid.json");
        tokio::fs::write(&invalid, r#"{ "classNames": ["ok", ""] }"#).await.unwrap();
        assert!(load_dialog_config(&invalid).await.is_err());

        assert!(load_dialog_config(&temp_dir.path().join("missing.json")).await.is_err());
    }
}
