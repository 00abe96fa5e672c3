//! Modal dialog lifecycle
//!
//! A single [`DialogController`] owns at most one dialog at a time. Opening a
//! new dialog while one is active closes the active one first; the new dialog
//! is built only after the old one has been detached.

pub mod config;
pub mod content;
pub mod controller;
pub mod position;
pub mod styles;
pub mod theme;
pub mod types;

pub use config::{AnimationConfig, CloseButtonConfig, DialogConfig, OverlayConfig, SizeConfig};
pub use content::Content;
pub use controller::{ControllerSettings, DialogController, DialogInstance};
pub use position::{Alignment, FlexAlign, Position};
pub use styles::{StyleInjector, StylesheetInjector};
pub use theme::{Palette, ThemeTable};
pub use types::*;
