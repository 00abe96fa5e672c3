//! Modal dialog lifecycle controller
//!
//! - [`dialog`]: configuration, lookup tables and the lifecycle controller
//! - [`surface`]: the render surface, scheduler and transition contracts,
//!   plus a headless document and a manually pumped event loop
//! - [`runtime`]: a tokio task that drives a controller behind a handle
//! - [`config`]: application settings

pub mod config;
pub mod dialog;
pub mod runtime;
pub mod surface;

pub use dialog::{DialogConfig, DialogController, DialogError, DialogEvent, DialogResult, DialogState};
pub use runtime::{DialogHandle, DialogRuntime};
