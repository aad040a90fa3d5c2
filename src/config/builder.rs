use super::{FailurePolicy, LoaderConfig, idle_from_secs};
use std::time::Duration;

/// Builder for creating loader configurations with a fluent API
#[derive(Debug, Clone)]
pub struct LoaderConfigBuilder {
    startup_delay: Option<Duration>,
    default_idle: Option<Duration>,
    failure_policy: Option<FailurePolicy>,
}

impl LoaderConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            startup_delay: None,
            default_idle: None,
            failure_policy: None,
        }
    }

    /// Set the delay before the first unit
    pub fn startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = Some(delay);
        self
    }

    /// Set the startup delay in seconds
    pub fn startup_delay_secs(mut self, secs: f32) -> Self {
        self.startup_delay = Some(idle_from_secs(secs));
        self
    }

    /// Set the idle time used when a factory call passes none
    pub fn default_idle(mut self, idle: Duration) -> Self {
        self.default_idle = Some(idle);
        self
    }

    /// Set the default idle in seconds
    pub fn default_idle_secs(mut self, secs: f32) -> Self {
        self.default_idle = Some(idle_from_secs(secs));
        self
    }

    /// Halt on the first failing unit and retry it on the next tick
    pub fn halt_on_failure(mut self) -> Self {
        self.failure_policy = Some(FailurePolicy::Halt);
        self
    }

    /// Skip failing units and keep draining the queue
    pub fn skip_failed_units(mut self) -> Self {
        self.failure_policy = Some(FailurePolicy::SkipAndContinue);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> LoaderConfig {
        let defaults = LoaderConfig::default();
        LoaderConfig {
            startup_delay: self.startup_delay.unwrap_or(defaults.startup_delay),
            default_idle: self.default_idle.unwrap_or(defaults.default_idle),
            failure_policy: self.failure_policy.unwrap_or(defaults.failure_policy),
        }
    }
}

impl Default for LoaderConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience methods for common configurations
impl LoaderConfigBuilder {
    /// Splash or title screen: let the first frames render before loading starts
    pub fn for_splash_screen() -> Self {
        Self::new()
            .startup_delay(Duration::from_millis(300))
            .default_idle(Duration::from_millis(100))
            .halt_on_failure()
    }

    /// Background streaming during gameplay: long gaps, never stall on a bad asset
    pub fn for_level_streaming() -> Self {
        Self::new()
            .startup_delay(Duration::ZERO)
            .default_idle(Duration::from_millis(250))
            .skip_failed_units()
    }

    /// Deterministic runs with no idle time at all
    pub fn for_tests() -> Self {
        Self::new()
            .startup_delay(Duration::ZERO)
            .default_idle(Duration::ZERO)
    }
}
