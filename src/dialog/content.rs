//! Dialog content sources
//!
//! Markup is trusted: it is inserted verbatim, without escaping or
//! sanitization. Never feed user-supplied strings into a dialog unchecked.

use super::types::ConfigError;
use crate::surface::{ElementId, RenderSurface};
use serde::{Deserialize, Serialize};

/// What goes inside the dialog's content container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ContentRepr", into = "ContentRepr")]
pub enum Content {
    /// Raw markup, used as-is
    Markup(String),
    /// An existing element; its outer markup is copied at build time
    Element(ElementId),
    /// An existing template element; its inner markup is copied at build time
    Children(ElementId),
}

impl Content {
    /// Capture the markup this content stands for
    pub fn resolve(&self, surface: &dyn RenderSurface) -> Result<String, ConfigError> {
        match self {
            Self::Markup(markup) => Ok(markup.clone()),
            Self::Element(element) => surface
                .outer_markup(*element)
                .map_err(|e| ConfigError::InvalidContent(e.to_string())),
            Self::Children(element) => surface
                .inner_markup(*element)
                .map_err(|e| ConfigError::InvalidContent(e.to_string())),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Markup(String::new())
    }
}

impl From<&str> for Content {
    fn from(markup: &str) -> Self {
        Self::Markup(markup.to_string())
    }
}

impl From<String> for Content {
    fn from(markup: String) -> Self {
        Self::Markup(markup)
    }
}

/// Serialized form: a plain string, or `{ "element": id }` / `{ "children": id }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentRepr {
    Markup(String),
    Element { element: ElementId },
    Children { children: ElementId },
}

impl From<ContentRepr> for Content {
    fn from(repr: ContentRepr) -> Self {
        match repr {
            ContentRepr::Markup(markup) => Self::Markup(markup),
            ContentRepr::Element { element } => Self::Element(element),
            ContentRepr::Children { children } => Self::Children(children),
        }
    }
}

impl From<Content> for ContentRepr {
    fn from(content: Content) -> Self {
        match content {
            Content::Markup(markup) => Self::Markup(markup),
            Content::Element(element) => Self::Element { element },
            Content::Children(children) => Self::Children { children },
        }
    }
}
