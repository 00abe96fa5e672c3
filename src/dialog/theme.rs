//! Theme palettes for the injected stylesheet
//!
//! A theme name resolves to a [`Palette`] through a [`ThemeTable`]. The table
//! is open for extension; names it does not know fall back to the light
//! palette instead of failing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the built-in palette
pub const LIGHT: &str = "light";

/// Colors used by the dialog stylesheet (CSS color values)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Palette {
    /// Backdrop behind the dialog
    pub wrapper_background: String,
    pub dialog_background: String,
    pub text: String,
    pub close_button: String,
}

impl Palette {
    /// The light palette
    pub fn light() -> Self {
        Self {
            wrapper_background: "rgba(62, 61, 64, 0.8)".to_string(),
            dialog_background: "#ffffff".to_string(),
            text: "#000000".to_string(),
            close_button: "#000000".to_string(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::light()
    }
}

/// Lookup table from theme names to palettes
#[derive(Debug, Clone)]
pub struct ThemeTable {
    palettes: HashMap<String, Palette>,
    fallback: Palette,
}

impl ThemeTable {
    pub fn new() -> Self {
        let mut palettes = HashMap::new();
        palettes.insert(LIGHT.to_string(), Palette::light());
        Self {
            palettes,
            fallback: Palette::light(),
        }
    }

    /// Add or replace a named palette
    pub fn register(&mut self, name: impl Into<String>, palette: Palette) {
        self.palettes.insert(name.into(), palette);
    }

    /// Palette for `name`, or the fallback palette
    pub fn resolve(&self, name: &str) -> &Palette {
        self.palettes.get(name).unwrap_or(&self.fallback)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.palettes.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.palettes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ThemeTable {
    fn default() -> Self {
        Self::new()
    }
}
