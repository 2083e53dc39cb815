//! Progress recorder for asserting on reported fractions.

use std::sync::{Arc, Mutex, PoisonError};

/// Collects every progress value handed to its sinks.
#[derive(Clone, Debug, Default)]
pub struct ProgressRecorder {
    values: Arc<Mutex<Vec<f64>>>,
}

impl ProgressRecorder {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Closure that appends each reported value to this recorder.
    #[must_use]
    pub fn sink(&self) -> impl Fn(f64) + Send + Sync + 'static {
        let values = Arc::clone(&self.values);
        move |value| {
            values
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(value);
        }
    }

    /// Values recorded so far, in report order.
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the recorded values never decrease and stay within `[0.0, 1.0]`.
    #[must_use]
    pub fn is_monotonic(&self) -> bool {
        let values = self.values();
        values.iter().all(|value| (0.0..=1.0).contains(value))
            && values.windows(2).all(|pair| pair[0] <= pair[1])
    }
}
