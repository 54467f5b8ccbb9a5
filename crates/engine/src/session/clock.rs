use tracing::warn;

/// Monotonic session clock in seconds. Marker deadlines are absolute values
/// on this clock, so saving the elapsed value is enough to resume exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Clock {
    elapsed_seconds: f64,
}

impl Clock {
    pub(crate) fn at(elapsed_seconds: f64) -> Self {
        Self { elapsed_seconds }
    }

    /// Returns the delta actually applied; negative or non-finite deltas are
    /// dropped.
    pub fn advance(&mut self, dt_seconds: f64) -> f64 {
        if !dt_seconds.is_finite() || dt_seconds < 0.0 {
            warn!(dt_seconds, "clock_delta_ignored");
            return 0.0;
        }
        self.elapsed_seconds += dt_seconds;
        dt_seconds
    }

    pub fn now(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn has_reached(&self, deadline: f64) -> bool {
        self.elapsed_seconds >= deadline
    }
}
