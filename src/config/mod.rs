mod builder;

pub use builder::*;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Idle time of a unit when none is given explicitly
pub const DEFAULT_IDLE: Duration = Duration::from_millis(100);

/// What the scheduler does when a unit fails to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Return the error from `advance` and retry the same unit on the next tick
    #[default]
    Halt,
    /// Log the error, count the unit as skipped and move on
    SkipAndContinue,
}

/// Configuration for a frame-sliced load run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Pause before the first unit executes
    pub startup_delay: Duration,
    /// Idle time used by factory methods when the caller passes none
    pub default_idle: Duration,
    /// Handling of units whose backend call fails
    pub failure_policy: FailurePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            startup_delay: Duration::ZERO,
            default_idle: DEFAULT_IDLE,
            failure_policy: FailurePolicy::Halt,
        }
    }
}

impl LoaderConfig {
    /// Set the delay before the first unit
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Set the idle time used when a factory call passes none
    pub fn with_default_idle(mut self, idle: Duration) -> Self {
        self.default_idle = idle;
        self
    }

    /// Set the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Create a builder for more complex configuration
    pub fn builder() -> LoaderConfigBuilder {
        LoaderConfigBuilder::new()
    }
}

/// Convert caller-supplied seconds into an idle duration.
///
/// Negative, NaN and infinite inputs collapse to zero. Finite values too
/// large for a `Duration` saturate to `Duration::MAX`.
pub fn idle_from_secs(secs: f32) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
