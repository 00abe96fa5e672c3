//! Render surface abstraction
//!
//! The dialog controller never touches a document directly. Everything it
//! needs from the host page goes through the traits in this module:
//! - [`RenderSurface`] creates, styles, measures and removes elements
//! - [`Scheduler`] delivers deferred [`Signal`]s (zero-delay ticks and timers)
//! - [`TransitionNotifier`] reports when a CSS transition has finished
//!
//! [`HeadlessDocument`] and [`ManualLoop`] are in-memory implementations used
//! by the runtime driver, the CLI and the tests.

pub mod document;
pub mod queue;

pub use document::{HeadlessDocument, LayoutMetrics};
pub use queue::ManualLoop;

use crate::dialog::types::Signal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Handle to an element owned by a render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u64);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declarative click handler registered on an element
///
/// Clicks bubble from the target through its ancestors. An element carrying
/// `StopPropagation` still runs its own actions, but its ancestors never see
/// the click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Request the active dialog to close
    Close,
    /// Stop the click from reaching ancestor elements
    StopPropagation,
}

/// Result type for render surface operations
pub type SurfaceResult<T> = std::result::Result<T, SurfaceError>;

/// Render surface error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SurfaceError {
    #[error("Element {0} does not exist")]
    UnknownElement(ElementId),

    #[error("Element {0} cannot be appended to itself or its descendants")]
    InvalidHierarchy(ElementId),

    #[error("Failed to serialize element {0}: {1}")]
    Serialization(ElementId, String),
}

/// The subset of a document the dialog controller relies on
pub trait RenderSurface: Send {
    /// Root that dialogs are attached to
    fn body(&self) -> ElementId;

    /// Root that stylesheets are attached to
    fn head(&self) -> ElementId;

    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> ElementId;

    /// Replace the whole class list with a space separated list
    fn set_class_name(&mut self, element: ElementId, class_name: &str) -> SurfaceResult<()>;

    fn add_class(&mut self, element: ElementId, class: &str) -> SurfaceResult<()>;

    fn remove_class(&mut self, element: ElementId, class: &str) -> SurfaceResult<()>;

    fn has_class(&self, element: ElementId, class: &str) -> bool;

    /// Set an inline style property (CSS property names, e.g. `align-items`)
    fn set_style(&mut self, element: ElementId, property: &str, value: &str) -> SurfaceResult<()>;

    /// Inline style property, if set
    fn style(&self, element: ElementId, property: &str) -> Option<String>;

    /// Replace the element's children with raw, unsanitized markup
    fn set_inner_markup(&mut self, element: ElementId, markup: &str) -> SurfaceResult<()>;

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> SurfaceResult<()>;

    /// Detach the element and its subtree and release them; the ids are
    /// unknown afterwards
    fn remove(&mut self, element: ElementId) -> SurfaceResult<()>;

    /// Whether the element is reachable from the document root
    fn is_attached(&self, element: ElementId) -> bool;

    /// Rendered height of the element's border box, in pixels
    fn offset_height(&self, element: ElementId) -> SurfaceResult<f64>;

    /// Visible height of the viewport, in pixels
    fn viewport_height(&self) -> f64;

    /// Effective (cascaded) value of a style property
    fn computed_style(&self, element: ElementId, property: &str) -> SurfaceResult<Option<String>>;

    fn inner_markup(&self, element: ElementId) -> SurfaceResult<String>;

    fn outer_markup(&self, element: ElementId) -> SurfaceResult<String>;

    fn add_click_action(&mut self, element: ElementId, action: ClickAction) -> SurfaceResult<()>;

    /// Bubble a click from `target` and return every action it reached
    fn dispatch_click(&mut self, target: ElementId) -> Vec<ClickAction>;
}

/// Deferred signal delivery
pub trait Scheduler: Send {
    /// Deliver `signal` after the current task, with no delay
    fn defer(&mut self, signal: Signal);

    /// Deliver `signal` once `delay` has elapsed
    fn defer_after(&mut self, delay: Duration, signal: Signal);
}

/// Platform signal for finished CSS transitions
pub trait TransitionNotifier: Send {
    /// Watch `property` on `element`; the notifier delivers `signal` at most
    /// once, when the running transition completes. `expected` is the
    /// configured transition duration, for hosts that have to emulate it.
    fn watch(&mut self, element: ElementId, property: &str, expected: Duration, signal: Signal);
}

/// Everything the controller needs from its event loop
pub trait Host: Scheduler + TransitionNotifier {}

impl<T: Scheduler + TransitionNotifier> Host for T {}
