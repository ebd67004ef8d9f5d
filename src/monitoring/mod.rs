mod telemetry;

pub use telemetry::{
    TelemetryManager,
    TelemetryConfig,
    LogLevel,
    PerformanceTracker,
};

/// Convenience macro for performance tracking
#[macro_export]
macro_rules! track_performance {
    ($name:expr) => {
        let _tracker = $crate::monitoring::PerformanceTracker::new($name);
    };
}
