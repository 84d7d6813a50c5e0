//! Finite State Machine for a single release attempt

use serde::{Deserialize, Serialize};

/// Release attempt state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    /// Nothing done yet
    Idle,

    /// Building the upload archive
    Packaging,

    /// Multipart upload in flight
    Uploading,

    /// Server accepted the release
    Succeeded,

    Failed,
}

/// Release attempt event
#[derive(Debug, Clone)]
pub enum ReleaseEvent {
    /// Start preparing the archive
    Package,

    /// Archive ready, start the upload
    Upload,

    /// Server returned the new package
    Succeed,

    /// Packaging or upload failed
    Fail(String),
}

/// Tracks one release attempt. Attempts are never retried automatically,
/// so both end states are terminal.
#[derive(Debug, Clone)]
pub struct ReleaseFsm {
    state: ReleaseState,
    error: Option<String>,
}

impl ReleaseFsm {
    pub fn new() -> Self {
        Self {
            state: ReleaseState::Idle,
            error: None,
        }
    }

    pub fn state(&self) -> ReleaseState {
        self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, ReleaseState::Succeeded | ReleaseState::Failed)
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: ReleaseEvent) -> Result<(), String> {
        let new_state = match (&self.state, &event) {
            (ReleaseState::Idle, ReleaseEvent::Package) => ReleaseState::Packaging,
            (ReleaseState::Packaging, ReleaseEvent::Upload) => ReleaseState::Uploading,
            (ReleaseState::Uploading, ReleaseEvent::Succeed) => ReleaseState::Succeeded,
            (ReleaseState::Packaging | ReleaseState::Uploading, ReleaseEvent::Fail(err)) => {
                self.error = Some(err.clone());
                ReleaseState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for ReleaseFsm {
    fn default() -> Self {
        Self::new()
    }
}
