//! Dialog anchoring inside the backdrop
//!
//! The backdrop is a flex container; a position maps to the pair of flex
//! alignments that puts the dialog at one of nine anchor points.

use super::types::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Flexbox alignment value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlexAlign {
    FlexStart,
    Center,
    FlexEnd,
}

impl FlexAlign {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::FlexStart => "flex-start",
            Self::Center => "center",
            Self::FlexEnd => "flex-end",
        }
    }
}

/// Resolved alignment: `horizontal` feeds `justify-content`, `vertical`
/// feeds `align-items`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alignment {
    pub horizontal: FlexAlign,
    pub vertical: FlexAlign,
}

/// Named anchor point for the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Position {
    #[default]
    Center,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
    TopLeft,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Position::Center,
        Position::Top,
        Position::TopRight,
        Position::Right,
        Position::BottomRight,
        Position::Bottom,
        Position::BottomLeft,
        Position::Left,
        Position::TopLeft,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::Top => "top",
            Self::TopRight => "top-right",
            Self::Right => "right",
            Self::BottomRight => "bottom-right",
            Self::Bottom => "bottom",
            Self::BottomLeft => "bottom-left",
            Self::Left => "left",
            Self::TopLeft => "top-left",
        }
    }

    /// Flex alignment pair for this anchor
    pub fn alignment(self) -> Alignment {
        use FlexAlign::*;

        let (horizontal, vertical) = match self {
            Self::Center => (Center, Center),
            Self::Top => (Center, FlexStart),
            Self::TopRight => (FlexEnd, FlexStart),
            Self::Right => (FlexEnd, Center),
            Self::BottomRight => (FlexEnd, FlexEnd),
            Self::Bottom => (Center, FlexEnd),
            Self::BottomLeft => (FlexStart, FlexEnd),
            Self::Left => (FlexStart, Center),
            Self::TopLeft => (FlexStart, FlexStart),
        };
        Alignment {
            horizontal,
            vertical,
        }
    }
}

impl FromStr for Position {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|position| position.as_str() == s.trim())
            .ok_or_else(|| ConfigError::UnknownPosition(s.to_string()))
    }
}

impl TryFrom<String> for Position {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.as_str().to_string()
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
