//! Upload progress tracking

use std::sync::{Arc, Mutex};

/// Callback invoked with the upload percentage (0-100)
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Turns byte counts into a non-decreasing percentage
pub struct UploadProgress {
    total: u64,
    callback: Option<ProgressFn>,
    state: Mutex<ProgressState>,
}

#[derive(Default)]
struct ProgressState {
    sent: u64,
    last_percent: f64,
}

impl UploadProgress {
    pub fn new(total: u64, callback: Option<ProgressFn>) -> Self {
        Self {
            total,
            callback,
            state: Mutex::new(ProgressState::default()),
        }
    }

    /// Record `bytes` more sent and notify the callback.
    ///
    /// The callback never sees a value lower than the previous one, and is
    /// not called at all when the total size is unknown (zero).
    pub fn advance(&self, bytes: u64) {
        if self.total == 0 {
            return;
        }

        let percent = {
            let mut state = match self.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            state.sent = state.sent.saturating_add(bytes);
            let percent = (state.sent as f64 / self.total as f64 * 100.0).min(100.0);
            if percent < state.last_percent {
                return;
            }
            state.last_percent = percent;
            percent
        };

        if let Some(callback) = &self.callback {
            callback(percent);
        }
    }

    /// Last percentage reported
    pub fn percent(&self) -> f64 {
        match self.state.lock() {
            Ok(state) => state.last_percent,
            Err(poisoned) => poisoned.into_inner().last_percent,
        }
    }
}
