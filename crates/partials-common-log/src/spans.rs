//! Spans and timers for rendering and pool operations.

use tracing::{debug_span, info_span, Span};

/// Span for one partial render.
pub fn partial_span(template: &str, mode: &'static str) -> Span {
    debug_span!(
        "partial",
        template = %template,
        mode = mode,
        error = tracing::field::Empty
    )
}

/// Span for a worker pool operation.
pub fn pool_span(pool: &str, operation: &'static str) -> Span {
    debug_span!("pool", name = %pool, op = operation, error = tracing::field::Empty)
}

/// Span for an application lifecycle phase.
pub fn lifecycle_span(app_id: u64, phase: &'static str) -> Span {
    info_span!("lifecycle", app = app_id, phase = phase)
}

/// Record an error on the current span.
pub fn record_error(error: &dyn std::error::Error) {
    Span::current().record("error", tracing::field::display(error));
}

/// Timing utility for operations.
pub struct Timer {
    start: std::time::Instant,
    operation: &'static str,
}

impl Timer {
    /// Start a new timer.
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: std::time::Instant::now(),
            operation,
        }
    }

    /// Elapsed time so far.
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Complete the timer and record duration.
    pub fn finish(self) {
        let duration = self.start.elapsed();
        tracing::debug!(
            operation = %self.operation,
            duration_us = %duration.as_micros(),
            "operation completed"
        );
    }
}

/// Macro for timing a block of code.
#[macro_export]
macro_rules! timed {
    ($name:expr, $body:expr) => {{
        let _timer = $crate::spans::Timer::start($name);
        let result = $body;
        _timer.finish();
        result
    }};
}
