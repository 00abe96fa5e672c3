//! Core dialog types
//!
//! Identifiers, lifecycle states, signals, events and errors shared by the
//! controller, its collaborators and the runtime driver.

use crate::surface::{ElementId, SurfaceError};
use serde::{Deserialize, Serialize};

/// Identifier of one dialog instance, unique per controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dialog-{}", self.0)
    }
}

/// Dialog lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    /// No dialog is active
    #[default]
    Idle,
    /// Elements are being created and attached
    Building,
    /// Attached, waiting for the style flush before the open presentation
    Opening,
    /// Fully presented
    Open,
    /// Fading out, waiting for the transition to finish
    Closing,
    /// Detached; the instance is gone
    Disposed,
}

impl DialogState {
    /// Whether an instance in this state occupies the controller's slot
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Building | Self::Opening | Self::Open | Self::Closing
        )
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Opening => "opening",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Deferred notifications delivered back to the controller by its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Zero-delay tick after building; the open presentation may start
    Flush { instance: InstanceId },
    /// A watched transition has finished
    TransitionEnd {
        instance: InstanceId,
        element: ElementId,
        property: String,
    },
    /// The close transition took too long
    CloseTimeout { instance: InstanceId },
}

impl Signal {
    pub fn instance(&self) -> InstanceId {
        match self {
            Self::Flush { instance }
            | Self::TransitionEnd { instance, .. }
            | Self::CloseTimeout { instance } => *instance,
        }
    }
}

/// Lifecycle events published by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum DialogEvent {
    /// A new instance started building
    Building(InstanceId),
    /// The open presentation was applied
    Opened { instance: InstanceId, anchored: bool },
    /// The close presentation was applied
    Closing(InstanceId),
    /// The instance was detached; `forced` when the fallback timer fired
    Disposed { instance: InstanceId, forced: bool },
    /// A pending open request was replaced by a newer one or dropped by an
    /// explicit close
    RequestDropped,
}

/// Completion callback for `close`
pub type CloseCallback = Box<dyn FnOnce() + Send + 'static>;

/// Result type for dialog operations
pub type DialogResult<T> = std::result::Result<T, DialogError>;

/// Invalid dialog configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown dialog position '{0}'")]
    UnknownPosition(String),

    #[error("Invalid dialog content: {0}")]
    InvalidContent(String),

    #[error("Invalid dialog configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse dialog configuration: {0}")]
    Parse(String),
}

/// Dialog-specific error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DialogError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Render surface error: {0}")]
    Surface(#[from] SurfaceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_states() {
        assert!(!DialogState::Idle.is_live());
        assert!(DialogState::Building.is_live());
        assert!(DialogState::Opening.is_live());
        assert!(DialogState::Open.is_live());
        assert!(DialogState::Closing.is_live());
        assert!(!DialogState::Disposed.is_live());
    }

    #[test]
    fn test_signal_instance() {
        let signal = Signal::TransitionEnd {
            instance: InstanceId(4),
            element: ElementId(1),
            property: "opacity".to_string(),
        };
        assert_eq!(signal.instance(), InstanceId(4));
        assert_eq!(InstanceId(4).to_string(), "dialog-4");
    }

    #[test]
    fn test_error_messages() {
        let err = DialogError::from(ConfigError::UnknownPosition("middle".to_string()));
        assert_eq!(err.to_string(), "Unknown dialog position 'middle'");

        let err = DialogError::from(SurfaceError::UnknownElement(ElementId(3)));
        assert_eq!(err.to_string(), "Render surface error: Element #3 does not exist");
    }
}
