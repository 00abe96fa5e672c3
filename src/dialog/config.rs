//! Dialog configuration
//!
//! A [`DialogConfig`] is handed to the controller by value and never changes
//! afterwards. Every field has a default, so partial JSON or YAML documents
//! deserialize into a complete configuration.

use super::{content::Content, position::Position, theme, types::ConfigError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::time::Duration;

/// Default fade duration
pub const DEFAULT_DURATION: Duration = Duration::from_millis(300);

/// Open/close transition settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub enabled: bool,
    /// Accepts integer milliseconds or a humantime string such as `"250ms"`
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    /// CSS timing function, e.g. `ease` or `cubic-bezier(.2,.8,.2,1)`
    pub effect: String,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            duration: DEFAULT_DURATION,
            effect: "ease".to_string(),
        }
    }
}

impl AnimationConfig {
    /// Duration the transition actually runs for
    pub fn effective_duration(&self) -> Duration {
        if self.enabled {
            self.duration
        } else {
            Duration::ZERO
        }
    }

    /// `transition-duration` value, in seconds
    pub fn css_duration(&self) -> String {
        format!("{}s", self.effective_duration().as_secs_f64())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloseButtonConfig {
    pub enabled: bool,
}

impl Default for CloseButtonConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Clicking the backdrop closes the dialog
    pub enabled: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    /// Dialog width in pixels; capped at 100% of the backdrop
    pub width: u32,
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self { width: 900 }
    }
}

/// Dialog configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DialogConfig {
    pub animation: AnimationConfig,
    /// Extra classes on the dialog element; a string is split on whitespace
    #[serde(deserialize_with = "class_names")]
    pub class_names: BTreeSet<String>,
    pub close_button: CloseButtonConfig,
    pub content: Content,
    pub overlay: OverlayConfig,
    pub position: Position,
    pub size: SizeConfig,
    pub theme: String,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            class_names: BTreeSet::from(["fade".to_string()]),
            close_button: CloseButtonConfig::default(),
            content: Content::default(),
            overlay: OverlayConfig::default(),
            position: Position::default(),
            size: SizeConfig::default(),
            theme: theme::LIGHT.to_string(),
        }
    }
}

impl DialogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.size.width = width;
        self
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class_names.insert(class.into());
        self
    }

    pub fn without_classes(mut self) -> Self {
        self.class_names.clear();
        self
    }

    pub fn with_animation(mut self, duration: Duration, effect: impl Into<String>) -> Self {
        self.animation = AnimationConfig {
            enabled: true,
            duration,
            effect: effect.into(),
        };
        self
    }

    pub fn without_animation(mut self) -> Self {
        self.animation.enabled = false;
        self
    }

    pub fn close_button(mut self, enabled: bool) -> Self {
        self.close_button.enabled = enabled;
        self
    }

    pub fn overlay(mut self, enabled: bool) -> Self {
        self.overlay.enabled = enabled;
        self
    }

    /// Parse a JSON document
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a YAML document
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check the values that end up inside class and style attributes
    pub fn validate(&self) -> Result<(), ConfigError> {
        let effect = self.animation.effect.trim();
        if effect.is_empty() {
            return Err(ConfigError::Invalid("animation effect must not be empty".to_string()));
        }
        if effect.contains([';', '{', '}', '"']) {
            return Err(ConfigError::Invalid(format!(
                "animation effect '{}' is not a timing function",
                effect
            )));
        }

        if let Some(class) = self
            .class_names
            .iter()
            .find(|class| class.is_empty() || class.contains(char::is_whitespace))
        {
            return Err(ConfigError::Invalid(format!("invalid class name '{}'", class)));
        }

        Ok(())
    }
}

fn class_names<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Classes {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match Classes::deserialize(deserializer)? {
        Classes::Joined(joined) => joined.split_whitespace().map(str::to_string).collect(),
        Classes::List(list) => list.into_iter().collect(),
    })
}

/// Durations as integer milliseconds, or humantime strings on input
pub(crate) mod duration_ms {
    use super::*;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Millis(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Millis(ms) => Ok(Duration::from_millis(ms)),
            Repr::Text(text) => parse(&text).map_err(serde::de::Error::custom),
        }
    }

    /// Parse `"300"` as milliseconds, anything else with humantime
    pub fn parse(text: &str) -> Result<Duration, String> {
        let text = text.trim();
        if let Ok(ms) = text.parse::<u64>() {
            return Ok(Duration::from_millis(ms));
        }
        humantime::parse_duration(text).map_err(|e| format!("invalid duration '{}': {}", text, e))
    }
}

pub use duration_ms::parse as parse_duration;
